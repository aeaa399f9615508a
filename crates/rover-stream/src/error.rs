//! 图传层错误类型定义

use rover_protocol::ProtocolError;
use thiserror::Error;

/// 图传层错误类型
#[derive(Error, Debug)]
pub enum StreamError {
    /// Socket IO 错误
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    /// 对端在完整读取帧头/帧数据之前关闭连接
    ///
    /// 帧格式错位同样表现为此错误，当前连接不可恢复。
    #[error("Connection closed by peer")]
    ConnectionClosed,

    /// 协议编解码错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 采集设备错误
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),
}

impl StreamError {
    /// 是否为对端关闭连接
    pub fn is_connection_closed(&self) -> bool {
        matches!(self, StreamError::ConnectionClosed)
    }
}

/// 采集设备错误
#[derive(Error, Debug)]
pub enum CaptureError {
    /// 打开设备失败
    #[error("Failed to open capture device {device}: {message}")]
    Open { device: String, message: String },

    /// 读取帧失败
    #[error("Capture read failed: {0}")]
    Read(String),

    /// 帧编码失败
    #[error("Frame encode failed: {0}")]
    Encode(String),

    /// 设备没有可用帧
    #[error("No frames available from {0}")]
    NoFrames(String),
}
