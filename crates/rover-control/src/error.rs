//! 控制层错误类型定义

use rover_stream::StreamError;
use thiserror::Error;

/// 上报错误
///
/// 非致命：记录日志后继续发送剩余指令，不重试。
#[derive(Error, Debug)]
pub enum ReportError {
    /// HTTP 请求失败（连接失败、超时、非 2xx 状态码）
    #[error("HTTP request failed: {0}")]
    Http(#[from] ureq::Error),

    /// 读取响应失败
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    /// 请求体编码失败
    #[error("Failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
}

/// 控制循环错误
///
/// 只有图传链路错误是致命的；检测与上报失败在循环内部处理。
#[derive(Error, Debug)]
pub enum ControlError {
    #[error("Frame stream error: {0}")]
    Stream(#[from] StreamError),
}

impl ControlError {
    /// 是否为采集端关闭连接
    pub fn is_connection_closed(&self) -> bool {
        match self {
            ControlError::Stream(e) => e.is_connection_closed(),
        }
    }
}
