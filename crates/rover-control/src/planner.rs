//! 指令规划：主目标检测框 → 导航指令 + 状态字段
//!
//! 纯函数，无副作用：相同输入总是得到相同输出。
//!
//! # 转向
//!
//! ```text
//! offset     = (x + w/2) - frame_width/2
//! offset_pct = offset / frame_width
//! |offset_pct| > 0.01  → turn-<offset_pct * 150 + 75>
//! 否则                 → turn-neutral
//! ```
//!
//! # 油门（按检测框宽度 w）
//!
//! | 宽度 | 指令 |
//! |------|------|
//! | 40 < w < 70 | `throttle-forward-<70 - w>` |
//! | w > 120 | `throttle-reverse` |
//! | 其余 | `throttle-stop` |

use rover_protocol::status::fields;
use rover_protocol::{BoundingBox, Command, RobotStatus, format_decimal};
use smallvec::{SmallVec, smallvec};

/// 每周期的指令列表（最多一条转向 + 一条油门，转向在前）
pub type Commands = SmallVec<[Command; 2]>;

/// 规划结果
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub commands: Commands,
    /// 规划器产生的状态字段（不含 `Timestamp` / `Has Camera`）
    pub status: RobotStatus,
}

/// 规划参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannerConfig {
    /// 偏移比例死区（严格大于才转向）
    pub dead_zone: f64,
    /// 偏移比例 → 舵机角度的增益
    pub turn_gain: f64,
    /// 舵机正中角度
    pub turn_center: f64,
    /// 前进区间下界（不含）
    pub forward_min_width: u32,
    /// 前进区间上界（不含），前进量 = 上界 - 宽度
    pub forward_max_width: u32,
    /// 宽度大于此值时后退
    pub reverse_width: u32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            dead_zone: 0.01,
            turn_gain: 150.0,
            turn_center: 75.0,
            forward_min_width: 40,
            forward_max_width: 70,
            reverse_width: 120,
        }
    }
}

/// 指令规划器
#[derive(Debug, Clone, Default)]
pub struct Planner {
    config: PlannerConfig,
}

impl Planner {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// 根据主目标生成指令与状态
    ///
    /// # 参数
    ///
    /// - `primary`: 主目标检测框，`None` 表示本帧没有目标
    /// - `frame_width`: 帧宽度（像素）
    pub fn plan(&self, primary: Option<&BoundingBox>, frame_width: u32) -> Plan {
        let mut status = RobotStatus::new();

        let Some(b) = primary else {
            status.insert(fields::GENERAL, "No face found");
            status.insert(fields::MOVEMENT, "None");
            return Plan {
                commands: smallvec![Command::ThrottleStop],
                status,
            };
        };

        status.insert(fields::GENERAL, "Face found");
        // 整数除法，溢出时饱和
        let center_x = b.x.saturating_add(b.width / 2);
        let center_y = b.y.saturating_add(b.height / 2);
        status.insert(fields::FACE_CENTER_X, format!("X: {}", center_x));
        status.insert(fields::FACE_CENTER_Y, format!("Y: {}", center_y));

        let offset = b.center_x() - frame_width as f64 / 2.0;
        status.insert(fields::FACE_OFF_CENTER, format_decimal(offset));

        let turn = self.turn_command(offset, frame_width);
        match turn {
            Command::Turn(angle) => {
                status.insert(fields::DIRECTION, format!("Turning to: {}", format_decimal(angle)))
            },
            _ => status.insert(fields::DIRECTION, "Neutral"),
        }

        let throttle = self.throttle_command(b.width);
        let movement = match throttle {
            Command::ThrottleForward(_) => "Forward",
            Command::ThrottleReverse => "Reverse",
            _ => "None",
        };
        status.insert(fields::MOVEMENT, movement);

        Plan {
            commands: smallvec![turn, throttle],
            status,
        }
    }

    fn turn_command(&self, offset: f64, frame_width: u32) -> Command {
        if frame_width == 0 {
            return Command::TurnNeutral;
        }
        let offset_pct = offset / frame_width as f64;
        if offset_pct.abs() > self.config.dead_zone {
            Command::Turn(offset_pct * self.config.turn_gain + self.config.turn_center)
        } else {
            Command::TurnNeutral
        }
    }

    fn throttle_command(&self, width: u32) -> Command {
        let c = &self.config;
        if width > c.forward_min_width && width < c.forward_max_width {
            Command::ThrottleForward(c.forward_max_width - width)
        } else if width > c.reverse_width {
            Command::ThrottleReverse
        } else {
            Command::ThrottleStop
        }
    }
}

/// 使用默认参数规划
pub fn plan(primary: Option<&BoundingBox>, frame_width: u32) -> Plan {
    Planner::default().plan(primary, frame_width)
}
