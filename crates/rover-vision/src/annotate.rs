//! 帧解码、检测框标注与 JPEG 编码

use crate::engine::Detections;
use crate::error::VisionError;
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use rover_protocol::BoundingBox;

/// 主目标的标注颜色
pub const FOCUS_COLOR: [u8; 3] = [255, 255, 0];

/// 标注线宽（像素）
const LINE_WIDTH: u32 = 2;

/// 解码一帧（JPEG / PNG）为 RGB 图像
pub fn decode_frame(bytes: &[u8]) -> Result<RgbImage, VisionError> {
    Ok(image::load_from_memory(bytes)?.to_rgb8())
}

/// 编码为 JPEG
pub fn encode_jpeg(frame: &RgbImage, quality: u8) -> Result<Vec<u8>, VisionError> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
        .encode_image(frame)
        .map_err(|e| VisionError::Encode(e.to_string()))?;
    Ok(buffer)
}

/// 在帧上绘制检测框
///
/// 先画次要目标（检测器颜色），最后画主目标（[`FOCUS_COLOR`]），主目标不会被覆盖。
pub fn annotate(frame: &mut RgbImage, detections: &Detections) {
    for b in &detections.others {
        draw_box(frame, b, Rgb(b.tag.color));
    }
    if let Some(primary) = detections.primary() {
        draw_box(frame, primary, Rgb(FOCUS_COLOR));
    }
}

fn draw_box(frame: &mut RgbImage, b: &BoundingBox, color: Rgb<u8>) {
    let (width, height) = frame.dimensions();
    let Some(b) = b.clip_to(width, height) else {
        return;
    };
    if b.width == 0 || b.height == 0 {
        return;
    }

    let left = b.x;
    let top = b.y;
    let right = b.right() - 1;
    let bottom = b.bottom() - 1;

    for t in 0..LINE_WIDTH {
        // 水平边
        if top + t <= bottom {
            for x in left..=right {
                frame.put_pixel(x, top + t, color);
                frame.put_pixel(x, bottom - t, color);
            }
        }
        // 垂直边
        if left + t <= right {
            for y in top..=bottom {
                frame.put_pixel(left + t, y, color);
                frame.put_pixel(right - t, y, color);
            }
        }
    }
}
