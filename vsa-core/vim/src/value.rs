//! 远端数据值模型
//!
//! 远端对象是带类型名的字段集合，这里用一个封闭的变体集合表达，
//! 并保留 `Opaque` 作为未知形状的兜底。

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::types::ManagedObjectRef;

/// 远端数据值
#[derive(Debug, Clone, PartialEq)]
pub enum VimValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    DateTime(DateTime<Utc>),
    Binary(Vec<u8>),
    /// 托管对象引用
    ManagedRef(ManagedObjectRef),
    /// 数据对象
    DataObject(DataObject),
    Array(Vec<VimValue>),
    /// 无法识别的类型，仅保留类型名
    Opaque { type_name: String },
}

/// 数据对象
///
/// `fields` 为声明字段，`dynamic_type` / `dynamic_property` 为平台的扩展字段。
#[derive(Debug, Clone, PartialEq)]
pub struct DataObject {
    pub type_name: String,
    pub fields: Vec<(String, VimValue)>,
    pub dynamic_type: Option<String>,
    pub dynamic_property: Vec<VimValue>,
}

impl DataObject {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
            dynamic_type: None,
            dynamic_property: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: VimValue) -> Self {
        self.fields.push((name.into(), value));
        self
    }

    pub fn get(&self, name: &str) -> Option<&VimValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// 扩展字段是否非空
    pub fn has_dynamic_fields(&self) -> bool {
        self.dynamic_type.is_some() || !self.dynamic_property.is_empty()
    }
}

impl From<DataObject> for VimValue {
    fn from(obj: DataObject) -> Self {
        VimValue::DataObject(obj)
    }
}

impl From<ManagedObjectRef> for VimValue {
    fn from(moref: ManagedObjectRef) -> Self {
        VimValue::ManagedRef(moref)
    }
}

impl From<&str> for VimValue {
    fn from(s: &str) -> Self {
        VimValue::String(s.to_string())
    }
}

impl From<String> for VimValue {
    fn from(s: String) -> Self {
        VimValue::String(s)
    }
}

impl From<i64> for VimValue {
    fn from(n: i64) -> Self {
        VimValue::Int(n)
    }
}

impl From<bool> for VimValue {
    fn from(b: bool) -> Self {
        VimValue::Bool(b)
    }
}

impl From<DateTime<Utc>> for VimValue {
    fn from(dt: DateTime<Utc>) -> Self {
        VimValue::DateTime(dt)
    }
}

impl VimValue {
    /// 从 VI/JSON 文本值解析
    pub fn from_json(value: &Value) -> VimValue {
        match value {
            Value::Null => VimValue::Null,
            Value::Bool(b) => VimValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => VimValue::Int(i),
                None => n.as_f64().map(VimValue::Float).unwrap_or(VimValue::Null),
            },
            Value::String(s) => VimValue::String(s.clone()),
            Value::Array(items) => VimValue::Array(items.iter().map(VimValue::from_json).collect()),
            Value::Object(map) => Self::from_json_object(map),
        }
    }

    fn from_json_object(map: &Map<String, Value>) -> VimValue {
        let type_name = map.get("_typeName").and_then(Value::as_str);

        match type_name {
            Some("ManagedObjectReference") => {
                let moref_type = map.get("type").and_then(Value::as_str);
                let moref_value = map.get("value").and_then(Value::as_str);
                match (moref_type, moref_value) {
                    (Some(t), Some(v)) => VimValue::ManagedRef(ManagedObjectRef::new(t, v)),
                    _ => VimValue::Opaque {
                        type_name: "ManagedObjectReference".to_string(),
                    },
                }
            }
            Some(t) if map.contains_key("_value") => Self::from_wrapped(t, &map["_value"]),
            Some(t) => VimValue::DataObject(Self::data_object_from_map(t, map)),
            None => VimValue::DataObject(Self::data_object_from_map("DataObject", map)),
        }
    }

    /// 解析 `{"_typeName": t, "_value": v}` 形式的装箱值
    fn from_wrapped(type_name: &str, inner: &Value) -> VimValue {
        match type_name {
            "dateTime" => inner
                .as_str()
                .and_then(parse_datetime)
                .map(VimValue::DateTime)
                .unwrap_or_else(|| VimValue::from_json(inner)),
            "base64Binary" => inner
                .as_str()
                .and_then(|s| BASE64.decode(s).ok())
                .map(VimValue::Binary)
                .unwrap_or_else(|| VimValue::from_json(inner)),
            "ArrayOfDateTime" => VimValue::Array(
                inner
                    .as_array()
                    .map(|items| {
                        items
                            .iter()
                            .map(|item| Self::from_wrapped("dateTime", item))
                            .collect()
                    })
                    .unwrap_or_default(),
            ),
            _ => VimValue::from_json(inner),
        }
    }

    fn data_object_from_map(type_name: &str, map: &Map<String, Value>) -> DataObject {
        let fields = map
            .iter()
            .filter(|(key, _)| {
                !matches!(key.as_str(), "_typeName" | "dynamicType" | "dynamicProperty")
            })
            .map(|(key, value)| (key.clone(), VimValue::from_json(value)))
            .collect();

        let dynamic_type = map
            .get("dynamicType")
            .and_then(Value::as_str)
            .map(str::to_string);

        let dynamic_property = map
            .get("dynamicProperty")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(VimValue::from_json).collect())
            .unwrap_or_default();

        DataObject {
            type_name: type_name.to_string(),
            fields,
            dynamic_type,
            dynamic_property,
        }
    }

    /// 转换回 VI/JSON 线上格式，用于把远端读到的对象再作为参数提交
    pub fn to_wire(&self) -> Value {
        match self {
            VimValue::Null | VimValue::Opaque { .. } => Value::Null,
            VimValue::Bool(b) => Value::Bool(*b),
            VimValue::Int(i) => Value::from(*i),
            VimValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            VimValue::String(s) => Value::String(s.clone()),
            VimValue::DateTime(dt) => {
                Value::String(dt.to_rfc3339_opts(SecondsFormat::Micros, true))
            }
            VimValue::Binary(bytes) => Value::String(BASE64.encode(bytes)),
            VimValue::ManagedRef(moref) => moref.to_wire(),
            VimValue::Array(items) => Value::Array(items.iter().map(VimValue::to_wire).collect()),
            VimValue::DataObject(obj) => {
                let mut map = Map::new();
                map.insert("_typeName".to_string(), Value::String(obj.type_name.clone()));
                for (name, value) in &obj.fields {
                    map.insert(name.clone(), value.to_wire());
                }
                if let Some(dynamic_type) = &obj.dynamic_type {
                    map.insert("dynamicType".to_string(), Value::String(dynamic_type.clone()));
                }
                if !obj.dynamic_property.is_empty() {
                    map.insert(
                        "dynamicProperty".to_string(),
                        Value::Array(obj.dynamic_property.iter().map(VimValue::to_wire).collect()),
                    );
                }
                Value::Object(map)
            }
        }
    }

    /// 类型名
    pub fn type_name(&self) -> &str {
        match self {
            VimValue::Null => "null",
            VimValue::Bool(_) => "boolean",
            VimValue::Int(_) => "long",
            VimValue::Float(_) => "double",
            VimValue::String(_) => "string",
            VimValue::DateTime(_) => "dateTime",
            VimValue::Binary(_) => "base64Binary",
            VimValue::ManagedRef(_) => "ManagedObjectReference",
            VimValue::DataObject(obj) => &obj.type_name,
            VimValue::Array(_) => "Array",
            VimValue::Opaque { type_name } => type_name,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, VimValue::Null)
    }

    /// 读取数据对象字段
    pub fn get(&self, field: &str) -> Option<&VimValue> {
        match self {
            VimValue::DataObject(obj) => obj.get(field),
            _ => None,
        }
    }

    /// 按点分路径读取嵌套字段，例如 `info.state`
    pub fn path(&self, path: &str) -> Option<&VimValue> {
        path.split('.')
            .try_fold(self, |current, segment| current.get(segment))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            VimValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            VimValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            VimValue::Int(i) => Some(*i as f64),
            VimValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            VimValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// 数组元素；非数组返回空切片
    pub fn as_array(&self) -> &[VimValue] {
        match self {
            VimValue::Array(items) => items,
            _ => &[],
        }
    }

    pub fn as_moref(&self) -> Option<&ManagedObjectRef> {
        match self {
            VimValue::ManagedRef(moref) => Some(moref),
            _ => None,
        }
    }

    /// 时间值；字符串按 RFC 3339 解析
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            VimValue::DateTime(dt) => Some(*dt),
            VimValue::String(s) => parse_datetime(s),
            _ => None,
        }
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_managed_ref() {
        let value = VimValue::from_json(&json!({
            "_typeName": "ManagedObjectReference",
            "type": "HostSystem",
            "value": "host-12"
        }));
        assert_eq!(
            value.as_moref(),
            Some(&ManagedObjectRef::new("HostSystem", "host-12"))
        );
    }

    #[test]
    fn test_from_json_data_object_splits_dynamic_fields() {
        let value = VimValue::from_json(&json!({
            "_typeName": "AboutInfo",
            "name": "VMware vCenter Server",
            "version": "8.0.1",
            "dynamicType": null,
            "dynamicProperty": []
        }));

        match value {
            VimValue::DataObject(obj) => {
                assert_eq!(obj.type_name, "AboutInfo");
                assert_eq!(obj.fields.len(), 2);
                assert!(!obj.has_dynamic_fields());
                assert_eq!(obj.get("version"), Some(&VimValue::String("8.0.1".into())));
            }
            other => panic!("unexpected value: {:?}", other),
        }
    }

    #[test]
    fn test_from_json_wrapped_primitives() {
        let dt = VimValue::from_json(&json!({
            "_typeName": "dateTime",
            "_value": "2024-03-01T10:00:00Z"
        }));
        assert!(matches!(dt, VimValue::DateTime(_)));

        let bytes = VimValue::from_json(&json!({
            "_typeName": "base64Binary",
            "_value": "aGk="
        }));
        assert_eq!(bytes, VimValue::Binary(b"hi".to_vec()));

        let state = VimValue::from_json(&json!({"_typeName": "string", "_value": "running"}));
        assert_eq!(state.as_str(), Some("running"));
    }

    #[test]
    fn test_path_lookup() {
        let value = VimValue::from_json(&json!({
            "_typeName": "Task",
            "info": {"_typeName": "TaskInfo", "state": "success"}
        }));
        assert_eq!(value.path("info.state").and_then(VimValue::as_str), Some("success"));
        assert!(value.path("info.missing").is_none());
    }

    #[test]
    fn test_to_wire_keeps_type_name() {
        let obj = DataObject::new("ClusterVmGroup")
            .with_field("name", "web-vm".into())
            .with_field(
                "vm",
                VimValue::Array(vec![ManagedObjectRef::new("VirtualMachine", "vm-1").into()]),
            );
        let wire = VimValue::from(obj).to_wire();

        assert_eq!(wire["_typeName"], "ClusterVmGroup");
        assert_eq!(wire["name"], "web-vm");
        assert_eq!(wire["vm"][0]["value"], "vm-1");
        assert!(wire.get("dynamicProperty").is_none());
    }
}
