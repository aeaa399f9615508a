//! 采集端帧生产者
//!
//! 外层无限循环 + 内层限时会话：
//!
//! ```text
//! loop {
//!     打开采集会话
//!     loop { 采集 → 写帧头 → 写帧数据 → flush；超出会话预算则退出 }
//!     关闭会话，写入会话边界标记（长度 0）
//! }
//! ```
//!
//! 只重建设备，不重建连接：整个进程生命周期内连接保持打开。

use crate::device::CaptureDevice;
use crate::error::StreamError;
use rover_protocol::{Resolution, encode_header, encode_terminator, frame_length};
use std::convert::Infallible;
use std::io::{BufWriter, Write};
use std::net::TcpStream;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// 默认采集会话预算（30 秒）
pub const DEFAULT_SESSION_BUDGET: Duration = Duration::from_secs(30);

/// 写缓冲区容量（足够容纳一帧 320x240 JPEG）
const WRITE_BUFFER_CAPACITY: usize = 64 * 1024;

/// 采集会话计时
///
/// 会话从 `start()` 开始计时，耗时超过预算后视为过期。
#[derive(Debug, Clone, Copy)]
pub struct Session {
    started: Instant,
    budget: Duration,
}

impl Session {
    pub fn start(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// 耗时是否已超过预算（严格大于）
    pub fn is_expired(&self) -> bool {
        self.elapsed() > self.budget
    }
}

/// 单个会话的统计
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionReport {
    /// 已发送帧数
    pub frames: u64,
    /// 已发送帧数据字节数（不含帧头）
    pub bytes: u64,
    /// 被跳过的空帧数
    pub skipped: u64,
    /// 会话耗时
    pub elapsed: Duration,
}

/// 帧生产者
pub struct FrameProducer<D: CaptureDevice> {
    device: D,
    session_budget: Duration,
    buffer: Vec<u8>,
}

impl<D: CaptureDevice> FrameProducer<D> {
    pub fn new(device: D) -> Self {
        Self {
            device,
            session_budget: DEFAULT_SESSION_BUDGET,
            buffer: Vec::new(),
        }
    }

    /// 设置会话预算
    pub fn with_session_budget(mut self, budget: Duration) -> Self {
        self.session_budget = budget;
        self
    }

    pub fn session_budget(&self) -> Duration {
        self.session_budget
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// 运行一个完整的采集会话
    ///
    /// 打开设备 → 逐帧发送直到超出预算 → 关闭设备 → 写入会话边界标记。
    /// 过期检查发生在每帧发送之后，因此每个会话至少发送一帧。
    pub fn run_session<W: Write>(
        &mut self,
        connection: &mut W,
        resolution: Resolution,
    ) -> Result<SessionReport, StreamError> {
        let mut capture = self.device.open(resolution)?;
        let session = Session::start(self.session_budget);
        info!(
            "Capture session opened on {} at {} (budget {:?})",
            self.device.name(),
            resolution,
            session.budget()
        );

        let mut report = SessionReport {
            frames: 0,
            bytes: 0,
            skipped: 0,
            elapsed: Duration::ZERO,
        };

        loop {
            capture.capture(&mut self.buffer)?;

            if self.buffer.is_empty() {
                // 长度 0 是会话边界标记，空帧不能写入链路
                warn!("Capture returned an empty frame, skipping");
                report.skipped += 1;
            } else {
                write_frame(connection, &self.buffer)?;
                report.frames += 1;
                report.bytes += self.buffer.len() as u64;
                trace!("Sent frame #{} ({} bytes)", report.frames, self.buffer.len());
            }

            if session.is_expired() {
                break;
            }
        }

        // 先关闭设备，再通知对端会话边界
        drop(capture);
        write_session_boundary(connection)?;

        report.elapsed = session.elapsed();
        info!(
            "Capture session closed after {:?}: {} frames, {} bytes",
            report.elapsed, report.frames, report.bytes
        );
        Ok(report)
    }

    /// 无限循环运行采集会话
    ///
    /// 正常情况下永不返回；采集或写入失败时返回错误（对进程而言是致命的）。
    pub fn run<W: Write>(
        &mut self,
        mut connection: W,
        resolution: Resolution,
    ) -> Result<Infallible, StreamError> {
        let mut sessions: u64 = 0;
        loop {
            let report = self.run_session(&mut connection, resolution)?;
            sessions += 1;
            debug!(
                "Session #{} finished ({} frames), reopening {}",
                sessions,
                report.frames,
                self.device.name()
            );
        }
    }
}

/// 写入一帧（帧头 + 帧数据）并立即 flush
pub fn write_frame<W: Write>(connection: &mut W, payload: &[u8]) -> Result<(), StreamError> {
    let len = frame_length(payload.len())?;
    connection.write_all(&encode_header(len))?;
    connection.write_all(payload)?;
    connection.flush()?;
    Ok(())
}

/// 写入会话边界标记并立即 flush
pub fn write_session_boundary<W: Write>(connection: &mut W) -> Result<(), StreamError> {
    connection.write_all(&encode_terminator())?;
    connection.flush()?;
    Ok(())
}

/// 连接处理端
///
/// 关闭 Nagle 算法，配合每帧 flush 降低延迟。
pub fn connect(host: &str, port: u16) -> Result<BufWriter<TcpStream>, StreamError> {
    let stream = TcpStream::connect((host, port))?;
    stream.set_nodelay(true)?;
    info!("Connected to frame server {}:{}", host, port);
    Ok(BufWriter::with_capacity(WRITE_BUFFER_CAPACITY, stream))
}
