//! # Rover Tools - 共享配置与工具函数
//!
//! **依赖原则**: 只依赖 `rover-protocol`，不依赖传输层和视觉层
//!
//! ## 包含模块
//!
//! - `config` - TOML 配置文件（采集端与处理端共用）
//! - `timestamp` - 时间戳（纯函数）

pub mod config;
pub mod timestamp;

// 重新导出常用类型
pub use config::{
    CameraConfig, CameraSource, ColorRangeSpec, ConfigError, ControlConfig, DetectorsConfig,
    RoverConfig, StreamConfig,
};
pub use timestamp::{epoch_millis, local_datetime_string};
