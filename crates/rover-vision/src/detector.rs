//! 检测器抽象

use crate::error::VisionError;
use image::RgbImage;
use rover_protocol::{BoundingBox, DetectorTag};

/// 目标检测器
///
/// 返回的检测框按检测器自身的置信顺序排列（第一个最可信）。
/// 坐标可以超出帧范围，由 [`crate::DetectionEngine`] 统一裁剪。
pub trait Detector: Send {
    /// 检测器标识（名称 + 标注颜色）
    fn tag(&self) -> &DetectorTag;

    /// 在一帧上运行检测
    fn detect(&self, frame: &RgbImage) -> Result<Vec<BoundingBox>, VisionError>;
}

impl<T: Detector + ?Sized> Detector for Box<T> {
    fn tag(&self) -> &DetectorTag {
        (**self).tag()
    }

    fn detect(&self, frame: &RgbImage) -> Result<Vec<BoundingBox>, VisionError> {
        (**self).detect(frame)
    }
}
