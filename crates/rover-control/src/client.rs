//! 控制服务器上报
//!
//! 每条指令一个 HTTP POST（`<server>/command/`），请求体为 JSON：
//!
//! ```json
//! {
//!   "timestamp": 1714567512345,
//!   "command": "manual-turn-60.9375",
//!   "status": { "Timestamp": "...", "Has Camera": "true", "General": "Face found", ... },
//!   "image": "<base64 JPEG>"
//! }
//! ```
//!
//! 响应 JSON 可选携带 `state` 字段（`face` / `red` / `none`），用于切换处理模式。

use crate::error::ReportError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rover_protocol::{Command, ProcessingMode, RobotStatus};
use rover_tools::epoch_millis;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// 默认上报超时
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// 默认指令前缀
pub const DEFAULT_COMMAND_PREFIX: &str = "manual";

/// 上报通道
///
/// 一次调用对应一个请求；返回控制服务器要求切换到的处理模式（如有）。
pub trait Reporter {
    fn report(
        &mut self,
        command: Command,
        status: &RobotStatus,
        image: &[u8],
    ) -> Result<Option<ProcessingMode>, ReportError>;
}

impl<T: Reporter + ?Sized> Reporter for &mut T {
    fn report(
        &mut self,
        command: Command,
        status: &RobotStatus,
        image: &[u8],
    ) -> Result<Option<ProcessingMode>, ReportError> {
        (**self).report(command, status, image)
    }
}

/// 上报请求体
#[derive(Debug, Serialize)]
pub struct CommandRequest<'a> {
    /// Unix 毫秒
    pub timestamp: u64,
    pub command: String,
    pub status: &'a RobotStatus,
    /// base64 编码的 JPEG
    pub image: String,
}

/// 上报响应体
#[derive(Debug, Default, Deserialize)]
struct CommandResponse {
    #[serde(default)]
    state: Option<String>,
}

/// 解析响应体中的处理模式
///
/// 空响应、非 JSON、缺少或为空的 `state` 均视为不切换；无法识别的模式同样忽略。
pub fn parse_mode_hint(body: &str) -> Option<ProcessingMode> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    let response: CommandResponse = match serde_json::from_str(body) {
        Ok(response) => response,
        Err(e) => {
            warn!("Malformed control server response ({}): {:.64}", e, body);
            return None;
        },
    };

    let state = response.state?;
    if state.trim().is_empty() {
        return None;
    }
    match state.parse() {
        Ok(mode) => Some(mode),
        Err(e) => {
            warn!("Ignoring control server state: {}", e);
            None
        },
    }
}

/// HTTP 上报客户端
pub struct HttpControlClient {
    agent: ureq::Agent,
    endpoint: String,
    prefix: String,
}

impl HttpControlClient {
    /// # 参数
    ///
    /// - `server_address`: 控制服务器地址，如 `http://127.0.0.1`
    /// - `prefix`: 指令前缀，空字符串表示不加前缀
    /// - `timeout`: 单个请求的总超时
    pub fn new(server_address: &str, prefix: impl Into<String>, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            agent,
            endpoint: command_endpoint(server_address),
            prefix: prefix.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// 构造请求体
    pub fn build_request<'a>(
        &self,
        command: Command,
        status: &'a RobotStatus,
        image: &[u8],
    ) -> CommandRequest<'a> {
        CommandRequest {
            timestamp: epoch_millis(),
            command: command.to_wire(&self.prefix),
            status,
            image: STANDARD.encode(image),
        }
    }
}

impl Reporter for HttpControlClient {
    fn report(
        &mut self,
        command: Command,
        status: &RobotStatus,
        image: &[u8],
    ) -> Result<Option<ProcessingMode>, ReportError> {
        let request = self.build_request(command, status, image);
        let body = serde_json::to_vec(&request)?;
        trace!("POST {} {} ({} bytes)", self.endpoint, request.command, body.len());

        let response = self
            .agent
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .send(&body[..])?;

        let mut text = String::new();
        response.into_body().into_reader().read_to_string(&mut text)?;
        debug!("Control server accepted {}", request.command);
        Ok(parse_mode_hint(&text))
    }
}

/// `<server>/command/`
fn command_endpoint(server_address: &str) -> String {
    format!("{}/command/", server_address.trim().trim_end_matches('/'))
}

/// 一个周期的上报结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportOutcome {
    /// 成功的请求数
    pub sent: usize,
    /// 失败的请求数
    pub failed: usize,
    /// 最后一次响应中的处理模式
    pub mode: Option<ProcessingMode>,
}

/// 逐条上报指令（每条指令一个请求，共享同一状态表与图像）
///
/// 失败的请求不重试，剩余指令照常发送。
pub fn report_all<R: Reporter + ?Sized>(
    reporter: &mut R,
    commands: &[Command],
    status: &RobotStatus,
    image: &[u8],
) -> ReportOutcome {
    let mut outcome = ReportOutcome::default();
    for &command in commands {
        match reporter.report(command, status, image) {
            Ok(mode) => {
                outcome.sent += 1;
                if mode.is_some() {
                    outcome.mode = mode;
                }
            },
            Err(e) => {
                outcome.failed += 1;
                warn!("Failed to report {}: {}", command, e);
            },
        }
    }
    outcome
}
