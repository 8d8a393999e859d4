//! 远端对象 JSON 序列化
//!
//! 序列化是全函数：遇到未知形状时退化为 `"__<TypeName>__"` 占位字符串，而不是报错。
//! 哪些数据对象可以展开为字段字典由调用方传入的 [`AllowList`] 决定。

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serializer;
use serde_json::{Map, Value};

use crate::value::{DataObject, VimValue};

/// 时间格式
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// 按 [`DATETIME_FORMAT`] 输出可选时间，用于 `#[serde(serialize_with)]`
pub fn serialize_datetime<S>(value: &Option<DateTime<Utc>>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(dt) => serializer.serialize_str(&dt.format(DATETIME_FORMAT).to_string()),
        None => serializer.serialize_none(),
    }
}

/// 默认最大嵌套深度，超出后以占位字符串截断
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// 可展开的数据对象类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowList {
    /// 所有数据对象都展开
    All,
    /// 仅展开列出的类型
    Types(BTreeSet<String>),
}

impl AllowList {
    pub fn types<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AllowList::Types(types.into_iter().map(Into::into).collect())
    }

    /// 空列表：所有数据对象都退化为占位字符串
    pub fn none() -> Self {
        AllowList::Types(BTreeSet::new())
    }

    pub fn allows(&self, type_name: &str) -> bool {
        match self {
            AllowList::All => true,
            AllowList::Types(types) => types.contains(type_name),
        }
    }

    /// 追加类型，`All` 保持不变
    pub fn with(mut self, type_name: impl Into<String>) -> Self {
        if let AllowList::Types(types) = &mut self {
            types.insert(type_name.into());
        }
        self
    }

    /// 各类摘要对象的通用列表
    pub fn summaries() -> Self {
        Self::types([
            "NetworkSummary",
            "DatastoreSummary",
            "ClusterComputeResourceSummary",
            "HostListSummary",
            "HostHardwareSummary",
            "HostConfigSummary",
            "AboutInfo",
            "VirtualMachineSummary",
            "VirtualMachineConfigSummary",
            "VirtualMachineStorageSummary",
            "VirtualMachineGuestSummary",
            "VirtualMachineRuntimeInfo",
            "VirtualMachineDeviceRuntimeInfo",
        ])
    }

    /// 集群摘要
    pub fn cluster_summary() -> Self {
        Self::types(["ClusterComputeResourceSummary", "ClusterUsageSummary"])
    }

    /// 主机摘要
    pub fn host_summary() -> Self {
        Self::types([
            "HostListSummary",
            "HostHardwareSummary",
            "HostConfigSummary",
            "HostListSummaryQuickStats",
            "AboutInfo",
        ])
    }

    pub fn datastore_summary() -> Self {
        Self::types(["DatastoreSummary"])
    }

    pub fn network_summary() -> Self {
        Self::types(["NetworkSummary"])
    }

    /// 虚拟机摘要
    pub fn vm_summary() -> Self {
        Self::types([
            "VirtualMachineSummary",
            "VirtualMachineConfigSummary",
            "VirtualMachineStorageSummary",
            "VirtualMachineGuestSummary",
            "VirtualMachineRuntimeInfo",
            "VirtualMachineDeviceRuntimeInfo",
        ])
    }
}

impl Default for AllowList {
    fn default() -> Self {
        Self::summaries()
    }
}

/// 远端值到 JSON 的序列化器
#[derive(Debug, Clone)]
pub struct VimJsonSerializer {
    allow: AllowList,
    max_depth: usize,
}

impl VimJsonSerializer {
    pub fn new(allow: AllowList) -> Self {
        Self {
            allow,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// 序列化任意远端值
    pub fn to_json(&self, value: &VimValue) -> Value {
        self.encode(value, 0)
    }

    fn encode(&self, value: &VimValue, depth: usize) -> Value {
        if depth > self.max_depth {
            return sentinel(value.type_name());
        }

        match value {
            VimValue::Null => Value::Null,
            VimValue::Bool(b) => Value::Bool(*b),
            VimValue::Int(i) => Value::from(*i),
            VimValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            VimValue::String(s) => Value::String(s.clone()),
            VimValue::DateTime(dt) => Value::String(dt.format(DATETIME_FORMAT).to_string()),
            VimValue::ManagedRef(moref) => Value::String(moref.id().to_string()),
            VimValue::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.encode(item, depth + 1))
                    .collect(),
            ),
            VimValue::DataObject(obj) if self.allow.allows(&obj.type_name) => {
                self.encode_data_object(obj, depth)
            }
            VimValue::DataObject(obj) => sentinel(&obj.type_name),
            VimValue::Binary(_) | VimValue::Opaque { .. } => sentinel(value.type_name()),
        }
    }

    fn encode_data_object(&self, obj: &DataObject, depth: usize) -> Value {
        let mut map = Map::new();
        for (name, field) in &obj.fields {
            map.insert(name.clone(), self.encode(field, depth + 1));
        }

        // 扩展字段为空时省略
        if obj.has_dynamic_fields() {
            map.insert(
                "dynamicType".to_string(),
                obj.dynamic_type
                    .clone()
                    .map(Value::String)
                    .unwrap_or(Value::Null),
            );
            map.insert(
                "dynamicProperty".to_string(),
                Value::Array(
                    obj.dynamic_property
                        .iter()
                        .map(|prop| self.encode(prop, depth + 1))
                        .collect(),
                ),
            );
        }

        Value::Object(map)
    }
}

impl Default for VimJsonSerializer {
    fn default() -> Self {
        Self::new(AllowList::default())
    }
}

/// 从字符串形式的引用中取出 MOID
///
/// `'vim.VirtualMachine:vm-42'` 与 `'type:vm-42'` 都得到 `vm-42`。
pub fn reference_id(raw: &str) -> String {
    let unquoted = raw.trim().trim_matches(|c| c == '\'' || c == '"');
    unquoted
        .rsplit(':')
        .next()
        .unwrap_or(unquoted)
        .to_string()
}

fn sentinel(type_name: &str) -> Value {
    Value::String(format!("__{}__", type_name))
}
