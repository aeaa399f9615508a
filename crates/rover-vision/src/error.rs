//! 视觉层错误类型定义

use thiserror::Error;

/// 视觉层错误类型
///
/// 对控制循环而言均为非致命错误：本帧跳过检测，按"无目标"处理。
#[derive(Error, Debug)]
pub enum VisionError {
    /// 帧解码失败（非图像数据或数据损坏）
    #[error("Frame decode failed: {0}")]
    Decode(#[from] image::ImageError),

    /// 标注帧编码失败
    #[error("Frame encode failed: {0}")]
    Encode(String),

    /// 检测器执行失败
    #[error("Detector {tag} failed: {message}")]
    Detector { tag: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detector_error_display() {
        let err = VisionError::Detector {
            tag: "skin".to_string(),
            message: "empty frame".to_string(),
        };
        assert_eq!(err.to_string(), "Detector skin failed: empty frame");
    }
}
