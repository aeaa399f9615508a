//! 合成测试图案
//!
//! 灰色背景上一个红色方块：水平位置来回扫动，边长在 30..135 像素之间循环，
//! 依次覆盖前进 / 停止 / 后退各个油门区间。

use super::DEFAULT_JPEG_QUALITY;
use crate::device::{CaptureDevice, CaptureSession};
use crate::error::CaptureError;
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use rover_protocol::Resolution;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

const BACKGROUND: Rgb<u8> = Rgb([128, 128, 128]);
const TARGET: Rgb<u8> = Rgb([220, 30, 30]);
const MIN_SIDE: u32 = 30;
const SIDE_SPAN: u64 = 105;

/// 测试图案相机
pub struct TestPatternCamera {
    quality: u8,
    frame_interval: Duration,
    // 跨会话共享，重建会话后图案继续运动
    counter: Arc<AtomicU64>,
}

impl TestPatternCamera {
    /// 默认 15 FPS
    pub fn new() -> Self {
        Self {
            quality: DEFAULT_JPEG_QUALITY,
            frame_interval: Duration::from_millis(66),
            counter: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }

    /// 两帧之间的最小间隔（`Duration::ZERO` 表示不限速）
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }
}

impl Default for TestPatternCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureDevice for TestPatternCamera {
    fn name(&self) -> &str {
        "test-pattern"
    }

    fn open(&mut self, resolution: Resolution) -> Result<Box<dyn CaptureSession>, CaptureError> {
        if !resolution.is_valid() {
            return Err(CaptureError::Open {
                device: self.name().to_string(),
                message: format!("invalid resolution {}", resolution),
            });
        }
        Ok(Box::new(TestPatternSession {
            resolution,
            quality: self.quality,
            frame_interval: self.frame_interval,
            counter: self.counter.clone(),
            last_frame: None,
        }))
    }
}

struct TestPatternSession {
    resolution: Resolution,
    quality: u8,
    frame_interval: Duration,
    counter: Arc<AtomicU64>,
    last_frame: Option<Instant>,
}

impl CaptureSession for TestPatternSession {
    fn capture(&mut self, buf: &mut Vec<u8>) -> Result<(), CaptureError> {
        if let Some(last) = self.last_frame {
            let elapsed = last.elapsed();
            if elapsed < self.frame_interval {
                std::thread::sleep(self.frame_interval - elapsed);
            }
        }
        self.last_frame = Some(Instant::now());

        let index = self.counter.fetch_add(1, Ordering::Relaxed);
        let image = render_pattern(self.resolution, index);

        buf.clear();
        let mut encoder = JpegEncoder::new_with_quality(&mut *buf, self.quality);
        encoder
            .encode_image(&image)
            .map_err(|e| CaptureError::Encode(e.to_string()))?;
        Ok(())
    }
}

/// 生成第 `index` 帧的图案
fn render_pattern(resolution: Resolution, index: u64) -> RgbImage {
    let Resolution { width, height } = resolution;
    let mut image = RgbImage::from_pixel(width, height, BACKGROUND);

    let side = (MIN_SIDE + (index * 5 % SIDE_SPAN) as u32).min(width).min(height);
    let travel = u64::from(width - side);
    // 三角波扫动
    let phase = if travel == 0 { 0 } else { (index * 4) % (2 * travel) };
    let x = (if phase <= travel { phase } else { 2 * travel - phase }) as u32;
    let y = (height - side) / 2;

    for py in y..y + side {
        for px in x..x + side {
            image.put_pixel(px, py, TARGET);
        }
    }
    image
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_frames_are_jpeg() {
        let mut camera = TestPatternCamera::new().with_frame_interval(Duration::ZERO);
        let mut session = camera.open(Resolution::default()).unwrap();

        let mut buf = Vec::new();
        session.capture(&mut buf).unwrap();
        assert_eq!(&buf[..2], &[0xFF, 0xD8]);
        assert_eq!(&buf[buf.len() - 2..], &[0xFF, 0xD9]);

        let decoded = image::load_from_memory(&buf).unwrap();
        assert_eq!(decoded.width(), 320);
        assert_eq!(decoded.height(), 240);
    }

    #[test]
    fn test_counter_survives_sessions() {
        let mut camera = TestPatternCamera::new().with_frame_interval(Duration::ZERO);
        let mut buf = Vec::new();
        for _ in 0..2 {
            let mut session = camera.open(Resolution::new(64, 48)).unwrap();
            session.capture(&mut buf).unwrap();
        }
        assert_eq!(camera.counter.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_invalid_resolution() {
        let mut camera = TestPatternCamera::new();
        assert!(matches!(
            camera.open(Resolution::new(0, 240)),
            Err(CaptureError::Open { .. })
        ));
    }

    #[test]
    fn test_render_pattern_bounds() {
        let resolution = Resolution::new(80, 60);
        for index in 0..500 {
            let image = render_pattern(resolution, index);
            assert_eq!(image.dimensions(), (80, 60));
            assert!(image.pixels().any(|p| *p == TARGET));
        }
    }

    #[test]
    fn test_render_pattern_first_frame() {
        let image = render_pattern(Resolution::new(320, 240), 0);
        // 第 0 帧：30x30 方块位于左侧垂直居中
        assert_eq!(*image.get_pixel(0, 105), TARGET);
        assert_eq!(*image.get_pixel(29, 134), TARGET);
        assert_eq!(*image.get_pixel(30, 105), BACKGROUND);
        assert_eq!(*image.get_pixel(0, 104), BACKGROUND);
    }
}
