//! 动作结果

use serde::ser::{Serialize, SerializeTuple, Serializer};

/// `(success, detail)` 形式的动作结果
///
/// 序列化为二元 JSON 数组 `[success, detail]`。
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub success: bool,
    pub detail: T,
}

impl<T> Outcome<T> {
    pub fn ok(detail: T) -> Self {
        Self {
            success: true,
            detail,
        }
    }

    pub fn failed(detail: T) -> Self {
        Self {
            success: false,
            detail,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            success: self.success,
            detail: f(self.detail),
        }
    }
}

impl<T: Serialize> Serialize for Outcome<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&self.success)?;
        tuple.serialize_element(&self.detail)?;
        tuple.end()
    }
}
