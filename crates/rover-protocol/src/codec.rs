//! 帧长度前缀编解码
//!
//! 线上格式（采集端 → 处理端），每帧重复：
//!
//! ```text
//! 4 bytes          little-endian u32  byte_length
//! byte_length 字节  编码后的图像数据（JPEG）
//! ```
//!
//! `byte_length == 0` 是会话边界标记（采集端正在重建相机会话），
//! 不是流结束，接收端必须跳过它继续读取。

use crate::ProtocolError;

/// 帧头长度（字节）
pub const HEADER_LEN: usize = 4;

/// 会话边界标记（长度为 0 的帧头）
pub const SESSION_TERMINATOR: [u8; HEADER_LEN] = [0; HEADER_LEN];

/// 编码帧头
#[inline]
pub fn encode_header(byte_length: u32) -> [u8; HEADER_LEN] {
    byte_length.to_le_bytes()
}

/// 解码帧头
///
/// 输入必须恰好为 4 字节，否则返回 `InvalidHeaderLength`。
pub fn decode_header(bytes: &[u8]) -> Result<u32, ProtocolError> {
    let header: [u8; HEADER_LEN] =
        bytes.try_into().map_err(|_| ProtocolError::InvalidHeaderLength {
            expected: HEADER_LEN,
            actual: bytes.len(),
        })?;
    Ok(u32::from_le_bytes(header))
}

/// 编码会话边界标记
#[inline]
pub fn encode_terminator() -> [u8; HEADER_LEN] {
    SESSION_TERMINATOR
}

/// 将缓冲区长度转换为帧头长度
///
/// 超过 `u32::MAX` 的缓冲区无法用长度前缀表示，返回 `FrameTooLarge`。
pub fn frame_length(len: usize) -> Result<u32, ProtocolError> {
    u32::try_from(len).map_err(|_| ProtocolError::FrameTooLarge { len })
}

/// 解码后的帧头语义
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameHeader {
    /// 后续有 `n` 字节帧数据
    Frame(u32),
    /// 会话边界（无帧数据）
    SessionBoundary,
}

impl FrameHeader {
    /// 按长度值分类
    pub fn classify(byte_length: u32) -> Self {
        match byte_length {
            0 => FrameHeader::SessionBoundary,
            n => FrameHeader::Frame(n),
        }
    }

    /// 从 4 字节帧头解码
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        decode_header(bytes).map(Self::classify)
    }
}
