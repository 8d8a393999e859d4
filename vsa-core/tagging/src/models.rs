//! 标签相关数据模型

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{Result, TaggingError};

/// 分类基数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Cardinality {
    /// 每个对象在该分类下最多一个标签
    #[default]
    Single,
    Multiple,
}

impl Cardinality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cardinality::Single => "SINGLE",
            Cardinality::Multiple => "MULTIPLE",
        }
    }
}

impl FromStr for Cardinality {
    type Err = TaggingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "SINGLE" => Ok(Cardinality::Single),
            "MULTIPLE" => Ok(Cardinality::Multiple),
            _ => Err(TaggingError::Validation(format!(
                "不支持的分类基数: {} (可选 SINGLE, MULTIPLE)",
                s
            ))),
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 标签分类
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub cardinality: Cardinality,

    #[serde(default)]
    pub associable_types: Vec<String>,

    #[serde(default)]
    pub used_by: Vec<String>,
}

/// 标签
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub description: String,

    pub category_id: String,

    #[serde(default)]
    pub used_by: Vec<String>,
}

/// 分类创建参数
///
/// 未指定的字段使用默认值：描述为空、基数 SINGLE、可关联类型 `VirtualMachine`。
#[derive(Debug, Clone, Default)]
pub struct CategorySpec {
    pub name: String,
    pub description: Option<String>,
    pub cardinality: Option<Cardinality>,
    pub associable_types: Option<Vec<String>>,
}

impl CategorySpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = Some(cardinality);
        self
    }

    /// 空列表也会原样提交
    pub fn with_associable_types(mut self, types: Vec<String>) -> Self {
        self.associable_types = Some(types);
        self
    }

    /// 请求体 `{"create_spec": {...}}`
    pub fn to_payload(&self) -> Value {
        let description = self
            .description
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or("");
        let types = self
            .associable_types
            .clone()
            .unwrap_or_else(|| vec!["VirtualMachine".to_string()]);

        json!({
            "create_spec": {
                "name": self.name,
                "description": description,
                "cardinality": self.cardinality.unwrap_or_default(),
                "associable_types": types,
            }
        })
    }
}

/// 标签创建参数
#[derive(Debug, Clone)]
pub struct TagSpec {
    pub name: String,
    pub category_id: String,
    pub description: Option<String>,
}

impl TagSpec {
    pub fn new(name: impl Into<String>, category_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category_id: category_id.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn to_payload(&self) -> Value {
        json!({
            "create_spec": {
                "name": self.name,
                "description": self.description.as_deref().unwrap_or(""),
                "category_id": self.category_id,
            }
        })
    }
}

/// 关联目标对象
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId {
    pub id: String,

    #[serde(rename = "type")]
    pub type_name: String,
}

impl ObjectId {
    pub fn new(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_name: type_name.into(),
        }
    }
}

/// REST 清单对象类型
///
/// 每种类型对应 `/rest/vcenter/<endpoint>` 列表接口、结果中的 id 字段名，
/// 以及作为容器过滤条件时的 `filter.<name>.<n>` 参数名。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InventoryType {
    Cluster,
    Datacenter,
    Datastore,
    Network,
    Folder,
    Host,
    ResourcePool,
    VirtualMachine,
}

impl InventoryType {
    pub const ALL: [InventoryType; 8] = [
        InventoryType::Cluster,
        InventoryType::Datacenter,
        InventoryType::Datastore,
        InventoryType::Network,
        InventoryType::Folder,
        InventoryType::Host,
        InventoryType::ResourcePool,
        InventoryType::VirtualMachine,
    ];

    /// 托管对象类型名，用于关联请求中的 `object_id.type`
    pub fn type_name(&self) -> &'static str {
        match self {
            InventoryType::Cluster => "ClusterComputeResource",
            InventoryType::Datacenter => "Datacenter",
            InventoryType::Datastore => "Datastore",
            InventoryType::Network => "Network",
            InventoryType::Folder => "Folder",
            InventoryType::Host => "HostSystem",
            InventoryType::ResourcePool => "ResourcePool",
            InventoryType::VirtualMachine => "VirtualMachine",
        }
    }

    pub fn endpoint(&self) -> &'static str {
        match self {
            InventoryType::Cluster => "/rest/vcenter/cluster",
            InventoryType::Datacenter => "/rest/vcenter/datacenter",
            InventoryType::Datastore => "/rest/vcenter/datastore",
            InventoryType::Network => "/rest/vcenter/network",
            InventoryType::Folder => "/rest/vcenter/folder",
            InventoryType::Host => "/rest/vcenter/host",
            InventoryType::ResourcePool => "/rest/vcenter/resource-pool",
            InventoryType::VirtualMachine => "/rest/vcenter/vm",
        }
    }

    /// 列表结果中存放 id 的字段
    pub fn id_field(&self) -> &'static str {
        match self {
            InventoryType::Cluster => "cluster",
            InventoryType::Datacenter => "datacenter",
            InventoryType::Datastore => "datastore",
            InventoryType::Network => "network",
            InventoryType::Folder => "folder",
            InventoryType::Host => "host",
            InventoryType::ResourcePool => "resource_pool",
            InventoryType::VirtualMachine => "vm",
        }
    }

    pub fn filter_name(&self) -> &'static str {
        match self {
            InventoryType::Cluster => "clusters",
            InventoryType::Datacenter => "datacenters",
            InventoryType::Datastore => "datastores",
            InventoryType::Network => "networks",
            InventoryType::Folder => "folders",
            InventoryType::Host => "hosts",
            InventoryType::ResourcePool => "resource_pools",
            InventoryType::VirtualMachine => "vms",
        }
    }

    /// `filter.<name>.<n>` 查询参数，n 从 1 开始
    pub fn filter_params(&self, values: &[&str]) -> Vec<(String, String)> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (format!("filter.{}.{}", self.filter_name(), i + 1), v.to_string()))
            .collect()
    }
}

impl FromStr for InventoryType {
    type Err = TaggingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "clustercomputeresource" | "cluster" => Ok(InventoryType::Cluster),
            "datacenter" => Ok(InventoryType::Datacenter),
            "datastore" => Ok(InventoryType::Datastore),
            "network" | "distributedvirtualportgroup" => Ok(InventoryType::Network),
            "folder" => Ok(InventoryType::Folder),
            "hostsystem" | "host" => Ok(InventoryType::Host),
            "resourcepool" | "resource-pool" => Ok(InventoryType::ResourcePool),
            "virtualmachine" | "vm" => Ok(InventoryType::VirtualMachine),
            _ => Err(TaggingError::Validation(format!("不支持的对象类型: {}", s))),
        }
    }
}

impl fmt::Display for InventoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// REST 清单中的一个对象
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryObject {
    pub kind: InventoryType,
    pub id: String,
    pub name: String,
    pub raw: Value,
}

impl InventoryObject {
    pub fn from_value(kind: InventoryType, value: Value) -> Result<Self> {
        let id = value
            .get(kind.id_field())
            .and_then(Value::as_str)
            .ok_or_else(|| {
                TaggingError::ParseError(format!("{} 列表项缺少 {} 字段", kind, kind.id_field()))
            })?
            .to_string();
        let name = value
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Ok(Self {
            kind,
            id,
            name,
            raw: value,
        })
    }

    pub fn object_id(&self) -> ObjectId {
        ObjectId::new(self.kind.type_name(), self.id.clone())
    }
}

/// 批量关联动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAction {
    Attach,
    /// 先解除同分类下的已有标签再关联
    Replace,
    Detach,
}

impl BulkAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BulkAction::Attach => "attach",
            BulkAction::Replace => "replace",
            BulkAction::Detach => "detach",
        }
    }
}

impl FromStr for BulkAction {
    type Err = TaggingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "attach" | "add" => Ok(BulkAction::Attach),
            "replace" => Ok(BulkAction::Replace),
            "detach" | "remove" => Ok(BulkAction::Detach),
            _ => Err(TaggingError::Validation(format!("不支持的批量动作: {}", s))),
        }
    }
}

/// 批量关联请求
#[derive(Debug, Clone)]
pub struct BulkTagRequest {
    /// 容器对象类型，如集群
    pub query_type: InventoryType,
    pub query_name: String,

    /// 被关联的对象类型，如虚拟机
    pub bulk_type: InventoryType,

    pub category: String,
    pub tag: String,
    pub cardinality: Cardinality,
    pub action: BulkAction,
}

/// 单个对象的关联结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkResult {
    pub id: String,
    pub name: String,

    #[serde(rename = "type")]
    pub type_name: String,

    pub response: Option<Value>,
}

/// 查找结果，未找到时携带提示信息
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Lookup<T> {
    Found(T),
    Missing(String),
}
