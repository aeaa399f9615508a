//! 图片目录相机：按文件名顺序循环发送目录中的 JPEG 文件

use crate::device::{CaptureDevice, CaptureSession};
use crate::error::CaptureError;
use rover_protocol::Resolution;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// 图片目录相机
///
/// 每次 `open()` 重新扫描目录，因此会话之间新增的文件会被拾取。
/// 分辨率参数被忽略，文件按原样发送。
pub struct ImageDirectoryCamera {
    directory: PathBuf,
    frame_interval: Duration,
    label: String,
}

impl ImageDirectoryCamera {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        let directory = directory.into();
        let label = format!("directory:{}", directory.display());
        Self {
            directory,
            frame_interval: Duration::ZERO,
            label,
        }
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// 列出目录中的 JPEG 文件（按文件名排序）
    pub fn scan(&self) -> Result<Vec<PathBuf>, CaptureError> {
        let entries = fs::read_dir(&self.directory).map_err(|e| CaptureError::Open {
            device: self.label.clone(),
            message: e.to_string(),
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_jpeg_path(path))
            .collect();
        files.sort();
        Ok(files)
    }
}

fn is_jpeg_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
        .unwrap_or(false)
}

impl CaptureDevice for ImageDirectoryCamera {
    fn name(&self) -> &str {
        &self.label
    }

    fn open(&mut self, resolution: Resolution) -> Result<Box<dyn CaptureSession>, CaptureError> {
        let files = self.scan()?;
        if files.is_empty() {
            return Err(CaptureError::NoFrames(self.directory.display().to_string()));
        }
        debug!(
            "Opened {} with {} files (requested {}, files are sent as-is)",
            self.label,
            files.len(),
            resolution
        );
        Ok(Box::new(DirectorySession {
            files,
            next: 0,
            frame_interval: self.frame_interval,
            last_frame: None,
        }))
    }
}

struct DirectorySession {
    files: Vec<PathBuf>,
    next: usize,
    frame_interval: Duration,
    last_frame: Option<Instant>,
}

impl CaptureSession for DirectorySession {
    fn capture(&mut self, buf: &mut Vec<u8>) -> Result<(), CaptureError> {
        if let Some(last) = self.last_frame {
            let elapsed = last.elapsed();
            if elapsed < self.frame_interval {
                std::thread::sleep(self.frame_interval - elapsed);
            }
        }
        self.last_frame = Some(Instant::now());

        let path = &self.files[self.next % self.files.len()];
        self.next = self.next.wrapping_add(1);

        buf.clear();
        match fs::read(path) {
            Ok(bytes) => {
                buf.extend_from_slice(&bytes);
                Ok(())
            },
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                Err(CaptureError::Read(format!("{}: {}", path.display(), e)))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cycles_sorted_jpeg_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.jpg"), b"second").unwrap();
        fs::write(dir.path().join("a.JPEG"), b"first").unwrap();
        fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let mut camera = ImageDirectoryCamera::new(dir.path());
        assert_eq!(camera.scan().unwrap().len(), 2);

        let mut session = camera.open(Resolution::default()).unwrap();
        let mut buf = Vec::new();
        let mut seen = Vec::new();
        for _ in 0..3 {
            session.capture(&mut buf).unwrap();
            seen.push(buf.clone());
        }
        assert_eq!(
            seen,
            vec![b"first".to_vec(), b"second".to_vec(), b"first".to_vec()]
        );
    }

    #[test]
    fn test_empty_directory() {
        let dir = TempDir::new().unwrap();
        let mut camera = ImageDirectoryCamera::new(dir.path());
        assert!(matches!(
            camera.open(Resolution::default()),
            Err(CaptureError::NoFrames(_))
        ));
    }

    #[test]
    fn test_missing_directory() {
        let dir = TempDir::new().unwrap();
        let mut camera = ImageDirectoryCamera::new(dir.path().join("missing"));
        assert!(matches!(
            camera.open(Resolution::default()),
            Err(CaptureError::Open { .. })
        ));
        assert!(camera.name().starts_with("directory:"));
    }
}
