//! # 时间戳
//!
//! - `epoch_millis`: 上报请求中的 `timestamp` 字段（Unix 毫秒）
//! - `local_datetime_string`: 状态表中的 `Timestamp` 字段（本地时间）

use chrono::Local;
use std::time::{SystemTime, UNIX_EPOCH};

/// 本地时间格式（微秒精度）
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// 当前 Unix 时间（毫秒）
///
/// 系统时钟早于 1970 年时返回 0。
pub fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// 当前本地时间，如 `2024-05-01 13:45:12.345678`
pub fn local_datetime_string() -> String {
    Local::now().format(DATETIME_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_millis_monotonic_enough() {
        let a = epoch_millis();
        let b = epoch_millis();
        assert!(b >= a);
        // 2020-01-01 之后
        assert!(a > 1_577_836_800_000);
    }

    #[test]
    fn test_local_datetime_string_shape() {
        let s = local_datetime_string();
        // YYYY-MM-DD HH:MM:SS.ffffff
        assert_eq!(s.len(), 26);
        assert_eq!(&s[4..5], "-");
        assert_eq!(&s[10..11], " ");
        assert_eq!(&s[19..20], ".");
        assert!(chrono::NaiveDateTime::parse_from_str(&s, DATETIME_FORMAT).is_ok());
    }
}
