//! # Rover Protocol
//!
//! 图传链路与导航指令的协议定义（无 IO 依赖）
//!
//! ## 模块
//!
//! - `codec`: 帧长度前缀编解码（4 字节小端 u32，0 表示会话边界）
//! - `command`: 导航指令（转向 / 油门）
//! - `detection`: 检测框与检测器标识
//! - `frame`: 分辨率等帧几何信息
//! - `mode`: 处理模式（由控制服务器下发）
//! - `status`: 每周期重建的状态表
//!
//! ## 字节序
//!
//! 帧长度前缀使用小端字节序（Little Endian），与采集端保持一致。

pub mod codec;
pub mod command;
pub mod detection;
pub mod frame;
pub mod mode;
pub mod status;

// 重新导出常用类型
pub use codec::{
    FrameHeader, HEADER_LEN, decode_header, encode_header, encode_terminator, frame_length,
};
pub use command::{Command, CommandKind, format_decimal};
pub use detection::{BoundingBox, DetectorTag};
pub use frame::Resolution;
pub use mode::ProcessingMode;
pub use status::RobotStatus;

use thiserror::Error;

/// 协议层错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// 帧头长度错误（必须恰好 4 字节）
    #[error("Invalid frame header length: expected {expected}, got {actual}")]
    InvalidHeaderLength { expected: usize, actual: usize },

    /// 帧长度超出 u32 长度前缀的表示范围
    #[error("Frame too large: {len} bytes does not fit in a u32 length prefix")]
    FrameTooLarge { len: usize },

    /// 无法识别的指令字符串
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// 无法识别的处理模式
    #[error("Unknown processing mode: {0}")]
    UnknownMode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::InvalidHeaderLength {
            expected: 4,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "Invalid frame header length: expected 4, got 3"
        );

        let err = ProtocolError::UnknownCommand("jump".to_string());
        assert!(err.to_string().contains("jump"));

        let err = ProtocolError::UnknownMode("blue".to_string());
        assert!(err.to_string().contains("blue"));
    }
}
