//! 采集设备后端
//!
//! - [`TestPatternCamera`]: 合成测试图案，无需硬件
//! - [`ImageDirectoryCamera`]: 循环读取目录中的 JPEG 文件
//! - [`CommandCamera`]: 外部 MJPEG 命令（如 `rpicam-vid`），按 SOI/EOI 拆帧

mod command;
mod directory;
mod test_pattern;

pub use command::{CommandCamera, JpegSplitter};
pub use directory::ImageDirectoryCamera;
pub use test_pattern::TestPatternCamera;

/// 默认 JPEG 编码质量
pub const DEFAULT_JPEG_QUALITY: u8 = 80;
