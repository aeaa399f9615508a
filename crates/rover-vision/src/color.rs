//! 颜色区间检测器
//!
//! 对每个像素做 RGB 区间判定，4 邻域连通分量即为候选目标，
//! 像素数不少于 `min_pixels` 的分量输出为检测框，按像素数从大到小排序。

use crate::detector::Detector;
use crate::error::VisionError;
use image::{Rgb, RgbImage};
use rover_protocol::{BoundingBox, DetectorTag};

/// RGB 闭区间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorRange {
    pub min: [u8; 3],
    pub max: [u8; 3],
}

impl ColorRange {
    pub fn new(min: [u8; 3], max: [u8; 3]) -> Self {
        Self { min, max }
    }

    /// 各通道下界不大于上界
    pub fn is_valid(&self) -> bool {
        (0..3).all(|c| self.min[c] <= self.max[c])
    }

    #[inline]
    pub fn contains(&self, pixel: &Rgb<u8>) -> bool {
        (0..3).all(|c| self.min[c] <= pixel[c] && pixel[c] <= self.max[c])
    }
}

/// 颜色区间检测器
#[derive(Debug, Clone)]
pub struct ColorRangeDetector {
    tag: DetectorTag,
    range: ColorRange,
    min_pixels: u32,
}

/// 连通分量统计
struct Blob {
    pixels: u32,
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
}

impl ColorRangeDetector {
    pub fn new(tag: DetectorTag, range: ColorRange, min_pixels: u32) -> Self {
        Self {
            tag,
            range,
            min_pixels: min_pixels.max(1),
        }
    }

    pub fn range(&self) -> ColorRange {
        self.range
    }

    pub fn min_pixels(&self) -> u32 {
        self.min_pixels
    }

    fn blobs(&self, frame: &RgbImage) -> Vec<Blob> {
        let (width, height) = frame.dimensions();
        let mut visited = vec![false; width as usize * height as usize];
        let mut stack: Vec<(u32, u32)> = Vec::new();
        let mut blobs = Vec::new();

        for (sx, sy, pixel) in frame.enumerate_pixels() {
            let start = sy as usize * width as usize + sx as usize;
            if visited[start] || !self.range.contains(pixel) {
                continue;
            }

            visited[start] = true;
            stack.push((sx, sy));
            let mut blob = Blob {
                pixels: 0,
                min_x: sx,
                min_y: sy,
                max_x: sx,
                max_y: sy,
            };

            while let Some((x, y)) = stack.pop() {
                blob.pixels += 1;
                blob.min_x = blob.min_x.min(x);
                blob.min_y = blob.min_y.min(y);
                blob.max_x = blob.max_x.max(x);
                blob.max_y = blob.max_y.max(y);

                let neighbours = [
                    (x.checked_sub(1), Some(y)),
                    (x.checked_add(1).filter(|&nx| nx < width), Some(y)),
                    (Some(x), y.checked_sub(1)),
                    (Some(x), y.checked_add(1).filter(|&ny| ny < height)),
                ];
                for (nx, ny) in neighbours {
                    let (Some(nx), Some(ny)) = (nx, ny) else {
                        continue;
                    };
                    let index = ny as usize * width as usize + nx as usize;
                    if !visited[index] && self.range.contains(frame.get_pixel(nx, ny)) {
                        visited[index] = true;
                        stack.push((nx, ny));
                    }
                }
            }

            if blob.pixels >= self.min_pixels {
                blobs.push(blob);
            }
        }

        // 稳定排序：像素数相同时保持扫描顺序（自上而下、自左而右）
        blobs.sort_by(|a, b| b.pixels.cmp(&a.pixels));
        blobs
    }
}

impl Detector for ColorRangeDetector {
    fn tag(&self) -> &DetectorTag {
        &self.tag
    }

    fn detect(&self, frame: &RgbImage) -> Result<Vec<BoundingBox>, VisionError> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(VisionError::Detector {
                tag: self.tag.name.clone(),
                message: "empty frame".to_string(),
            });
        }

        Ok(self
            .blobs(frame)
            .into_iter()
            .map(|blob| {
                BoundingBox::new(
                    blob.min_x,
                    blob.min_y,
                    blob.max_x - blob.min_x + 1,
                    blob.max_y - blob.min_y + 1,
                    self.tag.clone(),
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgb<u8> = Rgb([230, 20, 20]);
    const GREY: Rgb<u8> = Rgb([128, 128, 128]);

    fn red_detector(min_pixels: u32) -> ColorRangeDetector {
        ColorRangeDetector::new(
            DetectorTag::new("red", [255, 0, 0]),
            ColorRange::new([150, 0, 0], [255, 90, 90]),
            min_pixels,
        )
    }

    fn fill(image: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, color: Rgb<u8>) {
        for py in y..y + h {
            for px in x..x + w {
                image.put_pixel(px, py, color);
            }
        }
    }

    #[test]
    fn test_color_range() {
        let range = ColorRange::new([150, 0, 0], [255, 90, 90]);
        assert!(range.is_valid());
        assert!(range.contains(&RED));
        assert!(!range.contains(&GREY));
        assert!(range.contains(&Rgb([150, 90, 0])));
        assert!(!ColorRange::new([10, 0, 0], [5, 0, 0]).is_valid());
    }

    #[test]
    fn test_single_square() {
        let mut image = RgbImage::from_pixel(320, 240, GREY);
        fill(&mut image, 100, 50, 60, 60, RED);

        let boxes = red_detector(16).detect(&image).unwrap();
        assert_eq!(boxes.len(), 1);
        let b = &boxes[0];
        assert_eq!((b.x, b.y, b.width, b.height), (100, 50, 60, 60));
        assert_eq!(b.tag.name, "red");
    }

    #[test]
    fn test_largest_blob_first() {
        let mut image = RgbImage::from_pixel(200, 100, GREY);
        fill(&mut image, 5, 5, 10, 10, RED);
        fill(&mut image, 50, 20, 30, 30, RED);

        let boxes = red_detector(4).detect(&image).unwrap();
        assert_eq!(boxes.len(), 2);
        assert_eq!((boxes[0].x, boxes[0].width), (50, 30));
        assert_eq!((boxes[1].x, boxes[1].width), (5, 10));
    }

    #[test]
    fn test_diagonal_pixels_are_separate() {
        let mut image = RgbImage::from_pixel(4, 4, GREY);
        image.put_pixel(0, 0, RED);
        image.put_pixel(1, 1, RED);

        assert_eq!(red_detector(1).detect(&image).unwrap().len(), 2);
        assert!(red_detector(2).detect(&image).unwrap().is_empty());
    }

    #[test]
    fn test_blob_touching_edges() {
        let mut image = RgbImage::from_pixel(16, 8, GREY);
        fill(&mut image, 10, 0, 6, 8, RED);
        let boxes = red_detector(1).detect(&image).unwrap();
        assert_eq!((boxes[0].x, boxes[0].y, boxes[0].width, boxes[0].height), (10, 0, 6, 8));
    }

    #[test]
    fn test_empty_frame_is_error() {
        let image = RgbImage::new(0, 0);
        assert!(matches!(
            red_detector(1).detect(&image),
            Err(VisionError::Detector { .. })
        ));
    }
}
