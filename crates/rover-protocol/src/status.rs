//! 状态表
//!
//! 每个处理周期从零开始重建的有序键值表，仅用于展示/遥测，核心逻辑不会解析它。
//! 序列化为 JSON 对象时保持插入顺序。

/// 常用字段名
pub mod fields {
    pub const TIMESTAMP: &str = "Timestamp";
    pub const HAS_CAMERA: &str = "Has Camera";
    pub const GENERAL: &str = "General";
    pub const FACE_CENTER_X: &str = "Face Center X";
    pub const FACE_CENTER_Y: &str = "Face Center Y";
    pub const FACE_OFF_CENTER: &str = "Face Off Center";
    pub const DIRECTION: &str = "Direction";
    pub const MOVEMENT: &str = "Movement";
}

/// 有序状态表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RobotStatus {
    entries: Vec<(String, String)>,
}

impl RobotStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入字段
    ///
    /// 字段已存在时原位覆盖（保持原顺序），否则追加到末尾。
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 按插入顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl Extend<(String, String)> for RobotStatus {
    fn extend<I: IntoIterator<Item = (String, String)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl IntoIterator for RobotStatus {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RobotStatus {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut status = RobotStatus::new();
        for (k, v) in iter {
            status.insert(k, v);
        }
        status
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for RobotStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}
