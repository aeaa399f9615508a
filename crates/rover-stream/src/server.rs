//! 单连接帧服务端
//!
//! 只接受一个采集端连接，之后立即释放监听 socket，后续连接会被拒绝。

use crate::error::StreamError;
use rover_protocol::{FrameHeader, HEADER_LEN};
use std::io::{ErrorKind, Read};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use tracing::{debug, info, trace};

/// 默认监听端口
pub const DEFAULT_PORT: u16 = 8000;

/// `next_frame()` 的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextFrame {
    /// 一帧完整的帧数据
    Frame(Vec<u8>),
    /// 采集端完成了一个会话（长度 0 标记），连接仍然有效
    EndOfSession,
}

/// 帧服务端（绑定完成、尚未 accept）
pub struct FrameServer {
    listener: TcpListener,
}

impl FrameServer {
    /// 绑定到指定地址
    pub fn bind<A: ToSocketAddrs>(addr: A) -> Result<Self, StreamError> {
        let listener = TcpListener::bind(addr)?;
        info!("Frame server listening on {}", listener.local_addr()?);
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, StreamError> {
        Ok(self.listener.local_addr()?)
    }

    /// 阻塞等待一个连接
    ///
    /// 消耗 `self`：返回时监听 socket 已关闭。
    pub fn accept_one(self) -> Result<FrameReader<TcpStream>, StreamError> {
        let (stream, peer) = self.listener.accept()?;
        stream.set_nodelay(true)?;
        info!("Accepted frame connection from {}", peer);
        drop(self.listener);
        Ok(FrameReader::new(stream))
    }

    /// 在所有网卡的指定端口上监听并接受唯一的连接
    pub fn listen(port: u16) -> Result<FrameReader<TcpStream>, StreamError> {
        Self::listen_on(("0.0.0.0", port))
    }

    /// 在指定地址上监听并接受唯一的连接
    pub fn listen_on<A: ToSocketAddrs>(addr: A) -> Result<FrameReader<TcpStream>, StreamError> {
        Self::bind(addr)?.accept_one()
    }
}

/// 帧读取器
///
/// 按 `[u32 LE 长度][帧数据]` 格式从字节流中逐帧读取。
///
/// 注意：没有重新同步机制。读到错位的长度后，后续所有帧都会错位。
pub struct FrameReader<R: Read> {
    inner: R,
    frames: u64,
    sessions: u64,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            frames: 0,
            sessions: 0,
        }
    }

    /// 阻塞读取下一帧
    ///
    /// # 返回
    ///
    /// - `NextFrame::Frame`: 完整帧数据
    /// - `NextFrame::EndOfSession`: 会话边界（不消耗帧数据）
    /// - `StreamError::ConnectionClosed`: 对端在帧头或帧数据读完之前关闭
    pub fn next_frame(&mut self) -> Result<NextFrame, StreamError> {
        let mut header = [0u8; HEADER_LEN];
        read_exact_or_closed(&mut self.inner, &mut header)?;

        match FrameHeader::decode(&header)? {
            FrameHeader::SessionBoundary => {
                self.sessions += 1;
                debug!(
                    "End of capture session #{} after {} frames total",
                    self.sessions, self.frames
                );
                Ok(NextFrame::EndOfSession)
            },
            FrameHeader::Frame(len) => {
                let len = len as usize;
                // 逐步读取，避免错位的长度触发超大内存分配
                let mut payload = Vec::new();
                (&mut self.inner).take(len as u64).read_to_end(&mut payload)?;
                if payload.len() < len {
                    return Err(StreamError::ConnectionClosed);
                }
                self.frames += 1;
                trace!("Received frame #{} ({} bytes)", self.frames, len);
                Ok(NextFrame::Frame(payload))
            },
        }
    }

    /// 已接收帧数
    pub fn frames_received(&self) -> u64 {
        self.frames
    }

    /// 已接收会话边界数
    pub fn sessions_completed(&self) -> u64 {
        self.sessions
    }
}

/// 读满缓冲区；提前 EOF 视为对端关闭
fn read_exact_or_closed<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), StreamError> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(StreamError::ConnectionClosed),
        Err(e) => Err(StreamError::Io(e)),
    }
}
