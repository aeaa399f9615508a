//! 采集设备抽象
//!
//! 一次 `open()` 对应一个采集会话；会话在被 drop 时关闭设备。
//! 部分相机后端在连续采集一段时间后会停止出帧，因此生产者会定期
//! 关闭并重新打开会话（见 [`crate::producer`]）。

use crate::error::CaptureError;
use rover_protocol::Resolution;

/// 采集设备
pub trait CaptureDevice: Send {
    /// 设备名称（用于日志）
    fn name(&self) -> &str;

    /// 以指定分辨率打开一个采集会话
    fn open(&mut self, resolution: Resolution) -> Result<Box<dyn CaptureSession>, CaptureError>;
}

/// 采集会话
pub trait CaptureSession {
    /// 采集一帧编码后的图像
    ///
    /// 调用方复用 `buf`，实现需要先清空再写入一整帧。
    fn capture(&mut self, buf: &mut Vec<u8>) -> Result<(), CaptureError>;
}

impl<T: CaptureDevice + ?Sized> CaptureDevice for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn open(&mut self, resolution: Resolution) -> Result<Box<dyn CaptureSession>, CaptureError> {
        (**self).open(resolution)
    }
}
