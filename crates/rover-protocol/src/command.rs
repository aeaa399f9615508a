//! 导航指令定义
//!
//! 指令以字符串形式发送给控制服务器，每个周期最多一条转向指令 + 一条油门指令：
//!
//! | 指令 | 字符串形式 |
//! |------|-----------|
//! | 回正 | `turn-neutral` |
//! | 转向 | `turn-<angle>`（角度保留小数部分，如 `turn-0.0`） |
//! | 前进 | `throttle-forward-<amount>` |
//! | 后退 | `throttle-reverse` |
//! | 停止 | `throttle-stop` |
//!
//! 控制服务器按 `-` 切分指令，并期望带有 `manual` 前缀
//! （如 `manual-turn-neutral`），前缀由上报端通过 [`Command::to_wire`] 添加。

use crate::ProtocolError;
use std::fmt;
use std::str::FromStr;

/// 指令类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// 转向（舵机）
    Turn,
    /// 油门（电调）
    Throttle,
}

/// 导航指令
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// 转向回正
    TurnNeutral,
    /// 转向到指定角度（舵机角度，75 附近为正中）
    Turn(f64),
    /// 前进，数值越小越接近目标
    ThrottleForward(u32),
    /// 后退
    ThrottleReverse,
    /// 停止
    ThrottleStop,
}

impl Command {
    /// 指令类别
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::TurnNeutral | Command::Turn(_) => CommandKind::Turn,
            Command::ThrottleForward(_) | Command::ThrottleReverse | Command::ThrottleStop => {
                CommandKind::Throttle
            },
        }
    }

    /// 生成发送给控制服务器的字符串
    ///
    /// `prefix` 为空时与 `Display` 相同。
    pub fn to_wire(&self, prefix: &str) -> String {
        if prefix.is_empty() {
            self.to_string()
        } else {
            format!("{}-{}", prefix, self)
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::TurnNeutral => write!(f, "turn-neutral"),
            Command::Turn(angle) => write!(f, "turn-{}", format_decimal(*angle)),
            Command::ThrottleForward(amount) => write!(f, "throttle-forward-{}", amount),
            Command::ThrottleReverse => write!(f, "throttle-reverse"),
            Command::ThrottleStop => write!(f, "throttle-stop"),
        }
    }
}

impl FromStr for Command {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || ProtocolError::UnknownCommand(s.to_string());

        if let Some(rest) = s.strip_prefix("turn-") {
            if rest == "neutral" {
                return Ok(Command::TurnNeutral);
            }
            let angle: f64 = rest.parse().map_err(|_| unknown())?;
            if !angle.is_finite() {
                return Err(unknown());
            }
            return Ok(Command::Turn(angle));
        }

        match s.strip_prefix("throttle-") {
            Some("reverse") => Ok(Command::ThrottleReverse),
            Some("stop") => Ok(Command::ThrottleStop),
            Some(rest) => rest
                .strip_prefix("forward-")
                .and_then(|amount| amount.parse().ok())
                .map(Command::ThrottleForward)
                .ok_or_else(unknown),
            None => Err(unknown()),
        }
    }
}

/// 格式化浮点数，整数值也保留一位小数（`0.0`、`75.0`、`60.9375`）
///
/// 控制服务器按 `parseInt` 解析角度，两种写法都能接受；
/// 保留小数部分是为了让状态表与指令中的数值写法一致。
pub fn format_decimal(value: f64) -> String {
    let s = value.to_string();
    if !value.is_finite() || s.contains('.') {
        s
    } else {
        format!("{}.0", s)
    }
}
