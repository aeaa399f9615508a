//! 处理模式定义
//!
//! 处理模式决定每帧使用哪一组检测器，只能由控制服务器的响应修改，
//! 修改后跨周期保持。

use crate::ProtocolError;
use std::fmt;
use std::str::FromStr;

/// 处理模式
///
/// 字符串形式与控制服务器 `state` 字段一致：`face` / `red` / `none`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ProcessingMode {
    /// 人脸（上半身）检测（默认）
    #[default]
    Face,

    /// 红色目标检测
    Red,

    /// 不做检测，仅上报停止指令
    #[cfg_attr(feature = "serde", serde(rename = "none"))]
    Idle,
}

impl ProcessingMode {
    /// 所有模式
    pub const ALL: [ProcessingMode; 3] =
        [ProcessingMode::Face, ProcessingMode::Red, ProcessingMode::Idle];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingMode::Face => "face",
            ProcessingMode::Red => "red",
            ProcessingMode::Idle => "none",
        }
    }

    /// 是否需要运行检测
    pub fn runs_detection(&self) -> bool {
        !matches!(self, ProcessingMode::Idle)
    }
}

impl fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingMode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "face" => Ok(ProcessingMode::Face),
            "red" => Ok(ProcessingMode::Red),
            "none" => Ok(ProcessingMode::Idle),
            other => Err(ProtocolError::UnknownMode(other.to_string())),
        }
    }
}
