//! 检测框定义

/// 检测器标识
///
/// `color` 用于在标注图像中绘制该检测器的检测框（RGB）。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DetectorTag {
    pub name: String,
    pub color: [u8; 3],
}

impl DetectorTag {
    pub fn new(name: impl Into<String>, color: [u8; 3]) -> Self {
        Self {
            name: name.into(),
            color,
        }
    }
}

/// 检测框（源图像像素坐标）
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// 产生此检测框的检测器
    pub tag: DetectorTag,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32, tag: DetectorTag) -> Self {
        Self {
            x,
            y,
            width,
            height,
            tag,
        }
    }

    /// 中心点 X（浮点）
    pub fn center_x(&self) -> f64 {
        self.x as f64 + self.width as f64 / 2.0
    }

    /// 中心点 Y（浮点）
    pub fn center_y(&self) -> f64 {
        self.y as f64 + self.height as f64 / 2.0
    }

    /// 右边界（不包含）
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// 下边界（不包含）
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    /// 裁剪到帧范围内
    ///
    /// 起点超出帧范围时返回 `None`。
    pub fn clip_to(&self, frame_width: u32, frame_height: u32) -> Option<Self> {
        if self.x >= frame_width || self.y >= frame_height {
            return None;
        }
        Some(Self {
            x: self.x,
            y: self.y,
            width: self.right().min(frame_width) - self.x,
            height: self.bottom().min(frame_height) - self.y,
            tag: self.tag.clone(),
        })
    }
}
