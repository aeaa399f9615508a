//! # Rover Stream
//!
//! 图传链路：采集端通过一条持久 TCP 连接，按长度前缀格式逐帧推送 JPEG，
//! 处理端只接受一个连接并逐帧拉取。
//!
//! - `device` / `camera`: 采集设备抽象与后端（测试图案、图片目录、外部 MJPEG 命令）
//! - `producer`: 采集会话循环（会话定时重建，连接保持不变）
//! - `server`: 单连接帧服务端，阻塞式 `next_frame()`
//!
//! # 已知限制
//!
//! 链路没有重新同步机制：任何一端违反帧格式后，字节流将永久错位。

pub mod camera;
pub mod device;
mod error;
pub mod producer;
pub mod server;

pub use camera::{CommandCamera, ImageDirectoryCamera, TestPatternCamera};
pub use device::{CaptureDevice, CaptureSession};
pub use error::{CaptureError, StreamError};
pub use producer::{
    DEFAULT_SESSION_BUDGET, FrameProducer, Session, SessionReport, connect, write_frame,
    write_session_boundary,
};
pub use rover_protocol::Resolution;
pub use server::{DEFAULT_PORT, FrameReader, FrameServer, NextFrame};
