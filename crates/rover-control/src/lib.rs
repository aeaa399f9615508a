//! # Rover Control
//!
//! 处理端的核心逻辑：
//!
//! - `planner`: 主目标检测框 → 导航指令（纯函数）
//! - `client`: 向控制服务器逐条上报指令，接收处理模式切换
//! - `control_loop`: 读帧 → 检测 → 规划 → 上报 的串行循环
//!
//! # 示例
//!
//! ```no_run
//! use rover_control::{ControlLoop, HttpControlClient, LoopExit};
//! use rover_stream::FrameServer;
//! use rover_vision::DetectionEngine;
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let frames = FrameServer::listen(8000)?;
//! let client = HttpControlClient::new("http://127.0.0.1", "manual", Duration::from_secs(2));
//! let mut control = ControlLoop::new(frames, DetectionEngine::new(), client);
//! match control.run(|report| println!("{:?}", report.commands))? {
//!     LoopExit::Stopped => println!("stopped"),
//!     LoopExit::ConnectionClosed => println!("camera disconnected"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod control_loop;
mod error;
pub mod planner;

pub use client::{
    CommandRequest, DEFAULT_COMMAND_PREFIX, DEFAULT_TIMEOUT, HttpControlClient, ReportOutcome,
    Reporter, parse_mode_hint, report_all,
};
pub use control_loop::{ControlLoop, CycleReport, LoopExit, LoopState, StepOutcome};
pub use error::{ControlError, ReportError};
pub use planner::{Commands, Plan, Planner, PlannerConfig, plan};
