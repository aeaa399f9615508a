//! # 配置文件
//!
//! 采集端与处理端共用一份 TOML 配置，每个段落都有默认值，
//! 命令行参数在加载之后覆盖对应字段。
//!
//! ```toml
//! [stream]
//! host = "127.0.0.1"
//! port = 8000
//!
//! [camera]
//! source = "test-pattern"
//!
//! [control]
//! server_address = "http://127.0.0.1"
//!
//! [[detectors.red]]
//! name = "red"
//! color = [255, 0, 0]
//! min = [150, 0, 0]
//! max = [255, 90, 90]
//! min_pixels = 32
//! ```

use rover_protocol::{ProcessingMode, Resolution};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// 配置错误
///
/// 对进程而言是致命错误：在进入主循环之前报告。
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// 完整配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoverConfig {
    pub stream: StreamConfig,
    pub camera: CameraConfig,
    pub control: ControlConfig,
    pub detectors: DetectorsConfig,
}

impl RoverConfig {
    /// 从文件加载配置（缺省字段取默认值）
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// 检查配置合法性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stream.port == 0 {
            return invalid("stream.port must be non-zero");
        }
        if self.stream.host.trim().is_empty() {
            return invalid("stream.host must not be empty");
        }
        self.camera.validate()?;
        self.control.validate()?;
        self.detectors.validate()?;
        Ok(())
    }
}

fn invalid<T>(message: impl Into<String>) -> Result<T, ConfigError> {
    Err(ConfigError::Invalid(message.into()))
}

// ============================================================
// [stream]
// ============================================================

/// 图传链路配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// 采集端连接的目标主机
    pub host: String,
    /// 服务端监听端口 / 采集端目标端口
    pub port: u16,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

// ============================================================
// [camera]
// ============================================================

/// 采集源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CameraSource {
    /// 合成测试图案
    #[default]
    TestPattern,
    /// 图片目录
    Directory,
    /// 外部 MJPEG 命令
    Command,
}

impl CameraSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CameraSource::TestPattern => "test-pattern",
            CameraSource::Directory => "directory",
            CameraSource::Command => "command",
        }
    }
}

impl std::str::FromStr for CameraSource {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "test-pattern" => Ok(CameraSource::TestPattern),
            "directory" => Ok(CameraSource::Directory),
            "command" => Ok(CameraSource::Command),
            other => invalid(format!("unknown camera source '{}'", other)),
        }
    }
}

/// 采集端配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub width: u32,
    pub height: u32,
    /// 采集会话预算（秒）
    pub session_secs: u64,
    pub source: CameraSource,
    /// `source = "directory"` 时的图片目录
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
    /// `source = "command"` 时的命令行（支持 `{width}` / `{height}` 占位符）
    pub command: Vec<String>,
    pub jpeg_quality: u8,
    /// 测试图案 / 图片目录的帧率上限
    pub fps: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            session_secs: 30,
            source: CameraSource::TestPattern,
            directory: None,
            command: [
                "rpicam-vid",
                "-t",
                "0",
                "-n",
                "--width",
                "{width}",
                "--height",
                "{height}",
                "--codec",
                "mjpeg",
                "-o",
                "-",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            jpeg_quality: 80,
            fps: 15,
        }
    }
}

impl CameraConfig {
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    pub fn session_budget(&self) -> Duration {
        Duration::from_secs(self.session_secs)
    }

    /// 两帧之间的最小间隔
    pub fn frame_interval(&self) -> Duration {
        if self.fps == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(1.0 / self.fps as f64)
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.resolution().is_valid() {
            return invalid(format!(
                "camera resolution must be non-zero, got {}",
                self.resolution()
            ));
        }
        if self.session_secs == 0 {
            return invalid("camera.session_secs must be non-zero");
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return invalid("camera.jpeg_quality must be within 1..=100");
        }
        match self.source {
            CameraSource::Directory if self.directory.is_none() => {
                invalid("camera.directory is required for source = \"directory\"")
            },
            CameraSource::Command if self.command.is_empty() => {
                invalid("camera.command is required for source = \"command\"")
            },
            _ => Ok(()),
        }
    }
}

// ============================================================
// [control]
// ============================================================

/// 处理端 / 控制服务器上报配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// 控制服务器地址（不含 `/command/` 路径）
    pub server_address: String,
    /// 指令前缀（`manual` → `manual-turn-…`），空字符串表示不加前缀
    pub command_prefix: String,
    /// 单次上报超时（毫秒）
    pub timeout_ms: u64,
    pub initial_mode: ProcessingMode,
    /// 每周期写入标注帧的路径
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<PathBuf>,
    /// 每周期输出状态日志
    pub display: bool,
    /// 上报图像的 JPEG 质量
    pub jpeg_quality: u8,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            server_address: "http://127.0.0.1".to_string(),
            command_prefix: "manual".to_string(),
            timeout_ms: 2000,
            initial_mode: ProcessingMode::Face,
            snapshot: None,
            display: true,
            jpeg_quality: 80,
        }
    }
}

impl ControlConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server_address.trim().is_empty() {
            return invalid("control.server_address must not be empty");
        }
        if self.timeout_ms == 0 {
            return invalid("control.timeout_ms must be non-zero");
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return invalid("control.jpeg_quality must be within 1..=100");
        }
        Ok(())
    }
}

// ============================================================
// [detectors]
// ============================================================

/// 颜色区间检测器描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorRangeSpec {
    pub name: String,
    /// 标注颜色
    pub color: [u8; 3],
    pub min: [u8; 3],
    pub max: [u8; 3],
    #[serde(default = "default_min_pixels")]
    pub min_pixels: u32,
}

fn default_min_pixels() -> u32 {
    32
}

impl ColorRangeSpec {
    fn validate(&self, section: &str) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return invalid(format!("detectors.{}: name must not be empty", section));
        }
        if (0..3).any(|c| self.min[c] > self.max[c]) {
            return invalid(format!(
                "detectors.{}.{}: min {:?} exceeds max {:?}",
                section, self.name, self.min, self.max
            ));
        }
        Ok(())
    }
}

/// 每个处理模式的检测器（数组顺序即优先级）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorsConfig {
    pub face: Vec<ColorRangeSpec>,
    pub red: Vec<ColorRangeSpec>,
}

impl Default for DetectorsConfig {
    fn default() -> Self {
        Self {
            face: vec![ColorRangeSpec {
                name: "skin".to_string(),
                color: [0, 255, 255],
                min: [95, 40, 20],
                max: [255, 220, 180],
                min_pixels: 64,
            }],
            red: vec![ColorRangeSpec {
                name: "red".to_string(),
                color: [255, 0, 0],
                min: [150, 0, 0],
                max: [255, 90, 90],
                min_pixels: 32,
            }],
        }
    }
}

impl DetectorsConfig {
    /// 指定模式下的检测器描述
    pub fn for_mode(&self, mode: ProcessingMode) -> &[ColorRangeSpec] {
        match mode {
            ProcessingMode::Face => &self.face,
            ProcessingMode::Red => &self.red,
            ProcessingMode::Idle => &[],
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for spec in &self.face {
            spec.validate("face")?;
        }
        for spec in &self.red {
            spec.validate("red")?;
        }
        Ok(())
    }
}
