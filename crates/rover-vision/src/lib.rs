//! # Rover Vision
//!
//! 每帧的视觉处理：解码 JPEG → 按处理模式运行检测器 → 标注 → 重新编码 JPEG。
//!
//! 检测器按注册顺序具有优先级：第一个产出检测框的检测器给出主目标（primary），
//! 其余检测框只用于标注。

mod annotate;
mod color;
mod detector;
mod engine;
mod error;

pub use annotate::{FOCUS_COLOR, annotate, decode_frame, encode_jpeg};
pub use color::{ColorRange, ColorRangeDetector};
pub use detector::Detector;
pub use engine::{DetectionEngine, Detections};
pub use error::VisionError;

// 重新导出图像类型，调用方无需直接依赖 image
pub use image::RgbImage;
