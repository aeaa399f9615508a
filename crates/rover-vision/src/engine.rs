//! 检测引擎：按处理模式组织检测器，并选出主目标

use crate::detector::Detector;
use crate::error::VisionError;
use image::RgbImage;
use rover_protocol::{BoundingBox, ProcessingMode};
use smallvec::SmallVec;
use tracing::trace;

/// 单帧检测结果
///
/// `primary` 来自优先级最高且产出了检测框的检测器（取其第一个框），
/// `others` 保留其余全部检测框，仅用于标注。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detections {
    pub primary: Option<BoundingBox>,
    pub others: SmallVec<[BoundingBox; 4]>,
}

impl Detections {
    /// 从按优先级排序的检测框序列构造，第一个即为主目标
    pub fn from_ordered<I>(boxes: I) -> Self
    where
        I: IntoIterator<Item = BoundingBox>,
    {
        let mut iter = boxes.into_iter();
        let primary = iter.next();
        Self {
            primary,
            others: iter.collect(),
        }
    }

    pub fn primary(&self) -> Option<&BoundingBox> {
        self.primary.as_ref()
    }

    pub fn len(&self) -> usize {
        self.primary.is_some() as usize + self.others.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_none()
    }
}

/// 检测引擎
///
/// 每个处理模式对应一组有序检测器；`ProcessingMode::Idle` 不运行任何检测器。
#[derive(Default)]
pub struct DetectionEngine {
    face: Vec<Box<dyn Detector>>,
    red: Vec<Box<dyn Detector>>,
}

impl DetectionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为指定模式追加一个检测器（注册顺序即优先级）
    ///
    /// 为 `Idle` 注册的检测器会被忽略。
    pub fn register<D: Detector + 'static>(&mut self, mode: ProcessingMode, detector: D) {
        match mode {
            ProcessingMode::Face => self.face.push(Box::new(detector)),
            ProcessingMode::Red => self.red.push(Box::new(detector)),
            ProcessingMode::Idle => {},
        }
    }

    /// builder 风格的 [`register`](Self::register)
    pub fn with_detector<D>(mut self, mode: ProcessingMode, detector: D) -> Self
    where
        D: Detector + 'static,
    {
        self.register(mode, detector);
        self
    }

    /// 指定模式下的检测器（按优先级）
    pub fn detectors(&self, mode: ProcessingMode) -> &[Box<dyn Detector>] {
        match mode {
            ProcessingMode::Face => &self.face,
            ProcessingMode::Red => &self.red,
            ProcessingMode::Idle => &[],
        }
    }

    /// 在一帧上运行当前模式的全部检测器
    ///
    /// 检测框被裁剪到帧范围内，完全落在帧外的框被丢弃。
    /// 任一检测器失败即返回错误。
    pub fn detect(
        &self,
        mode: ProcessingMode,
        frame: &RgbImage,
    ) -> Result<Detections, VisionError> {
        let (width, height) = frame.dimensions();
        let mut ordered: Vec<BoundingBox> = Vec::new();

        for detector in self.detectors(mode) {
            let boxes = detector.detect(frame)?;
            trace!("Detector {} yielded {} boxes", detector.tag().name, boxes.len());
            ordered.extend(boxes.iter().filter_map(|b| b.clip_to(width, height)));
        }

        Ok(Detections::from_ordered(ordered))
    }
}
