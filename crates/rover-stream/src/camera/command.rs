//! 外部 MJPEG 命令相机
//!
//! 每个会话启动一次外部进程，从其 stdout 读取连续的 JPEG 数据，
//! 按 SOI (`FF D8`) / EOI (`FF D9`) 标记拆分为单帧。会话关闭时结束子进程。
//!
//! EXIF 缩略图本身是一张完整 JPEG，嵌在外层帧的 APP1 段中，
//! 因此拆帧时按 SOI/EOI 嵌套深度计数，外层 EOI 才结束一帧。

use crate::device::{CaptureDevice, CaptureSession};
use crate::error::CaptureError;
use rover_protocol::Resolution;
use std::io::Read;
use std::process::{Child, ChildStdout, Command, Stdio};
use tracing::{debug, info, warn};

const SOI: [u8; 2] = [0xFF, 0xD8];
const EOI: [u8; 2] = [0xFF, 0xD9];
const READ_CHUNK: usize = 16 * 1024;
/// 未成帧字节的上限，超过即丢弃并重新同步
const MAX_PENDING: usize = 8 * 1024 * 1024;

/// 外部命令相机
///
/// 参数中的 `{width}` / `{height}` 占位符在打开会话时替换为请求的分辨率。
pub struct CommandCamera {
    program: String,
    args: Vec<String>,
    label: String,
}

impl CommandCamera {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        let program = program.into();
        let label = format!("command:{}", program);
        Self {
            program,
            args,
            label,
        }
    }

    /// 从 `[program, args...]` 构造
    pub fn from_argv(argv: &[String]) -> Result<Self, CaptureError> {
        let (program, args) = argv.split_first().ok_or_else(|| CaptureError::Open {
            device: "command".to_string(),
            message: "empty command line".to_string(),
        })?;
        Ok(Self::new(program.clone(), args.to_vec()))
    }

    /// 替换占位符后的参数
    pub fn expand_args(&self, resolution: Resolution) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{width}", &resolution.width.to_string())
                    .replace("{height}", &resolution.height.to_string())
            })
            .collect()
    }
}

impl CaptureDevice for CommandCamera {
    fn name(&self) -> &str {
        &self.label
    }

    fn open(&mut self, resolution: Resolution) -> Result<Box<dyn CaptureSession>, CaptureError> {
        let args = self.expand_args(resolution);
        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| CaptureError::Open {
                device: self.label.clone(),
                message: e.to_string(),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| CaptureError::Open {
            device: self.label.clone(),
            message: "child stdout not captured".to_string(),
        })?;
        info!("Started {} (pid {}) {:?}", self.program, child.id(), args);

        Ok(Box::new(CommandSession {
            child,
            stdout,
            splitter: JpegSplitter::new(),
            chunk: vec![0u8; READ_CHUNK],
        }))
    }
}

struct CommandSession {
    child: Child,
    stdout: ChildStdout,
    splitter: JpegSplitter,
    chunk: Vec<u8>,
}

impl CaptureSession for CommandSession {
    fn capture(&mut self, buf: &mut Vec<u8>) -> Result<(), CaptureError> {
        loop {
            if self.splitter.next_frame(buf) {
                return Ok(());
            }
            let n = self
                .stdout
                .read(&mut self.chunk)
                .map_err(|e| CaptureError::Read(e.to_string()))?;
            if n == 0 {
                return Err(CaptureError::Read(
                    "camera command closed its output".to_string(),
                ));
            }
            self.splitter.push(&self.chunk[..n]);
        }
    }
}

impl Drop for CommandSession {
    fn drop(&mut self) {
        if let Err(e) = self.child.kill() {
            // 进程可能已自行退出
            debug!("kill camera command: {}", e);
        }
        match self.child.wait() {
            Ok(status) => debug!("Camera command exited: {}", status),
            Err(e) => warn!("Failed to reap camera command: {}", e),
        }
    }
}

/// MJPEG 字节流拆帧器
#[derive(Debug)]
pub struct JpegSplitter {
    pending: Vec<u8>,
    /// 当前帧内已扫描到的位置
    scan: usize,
    /// SOI/EOI 嵌套深度，0 表示尚未进入帧
    depth: usize,
    max_pending: usize,
}

impl Default for JpegSplitter {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
            scan: 0,
            depth: 0,
            max_pending: MAX_PENDING,
        }
    }
}

impl JpegSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加读取到的字节
    pub fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// 尝试取出一个完整帧（SOI..=EOI）
    ///
    /// 成功时 `out` 被替换为帧数据并返回 `true`。SOI 之前的垃圾字节被丢弃；
    /// 一帧迟迟不结束、缓冲超过上限时整段丢弃，从下一个 SOI 重新开始。
    pub fn next_frame(&mut self, out: &mut Vec<u8>) -> bool {
        if self.depth == 0 {
            let Some(start) = find(&self.pending, &SOI, 0) else {
                // 保留最后一个字节，防止 SOI 跨块
                let keep = self.pending.len().min(1);
                self.pending.drain(..self.pending.len() - keep);
                return false;
            };
            self.pending.drain(..start);
            self.depth = 1;
            self.scan = SOI.len();
        }

        let mut i = self.scan;
        while i + 1 < self.pending.len() {
            if self.pending[i] != 0xFF {
                i += 1;
                continue;
            }
            match self.pending[i + 1] {
                0xD8 => {
                    self.depth += 1;
                    i += 2;
                },
                0xD9 => {
                    self.depth -= 1;
                    i += 2;
                    if self.depth == 0 {
                        out.clear();
                        out.extend_from_slice(&self.pending[..i]);
                        self.pending.drain(..i);
                        self.scan = 0;
                        return true;
                    }
                },
                _ => i += 1,
            }
        }
        self.scan = i;

        if self.pending.len() > self.max_pending {
            warn!(
                "Dropping {} bytes of unterminated JPEG data (depth {})",
                self.pending.len(),
                self.depth
            );
            self.pending.clear();
            self.scan = 0;
            self.depth = 0;
        }
        false
    }
}

fn find(haystack: &[u8], needle: &[u8; 2], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(2)
        .position(|w| w == needle)
        .map(|pos| pos + from)
}
