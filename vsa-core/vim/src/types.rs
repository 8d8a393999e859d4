//! 基础类型: 托管对象引用、实体类型、任务状态

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, VimError};

/// 托管对象引用 (MOR)
///
/// 由类型名和 MOID 组成，始终从远端查询获得，本地只在按 id 解析时直接构造。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ManagedObjectRef {
    /// 类型名，例如 `VirtualMachine`
    #[serde(rename = "type")]
    pub type_name: String,

    /// MOID，例如 `vm-42`
    pub value: String,
}

impl ManagedObjectRef {
    pub fn new(type_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            value: value.into(),
        }
    }

    /// 按实体类型构造引用
    pub fn of(kind: EntityKind, value: impl Into<String>) -> Self {
        Self::new(kind.as_str(), value)
    }

    /// 解析字符串形式的引用
    ///
    /// 接受 `'vim.VirtualMachine:vm-42'`、`VirtualMachine:vm-42` 等写法，
    /// 去掉两侧引号后以最后一个冒号切分。
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim().trim_matches(|c| c == '\'' || c == '"');

        let (type_part, id) = trimmed
            .rsplit_once(':')
            .ok_or_else(|| VimError::ParseError(format!("无效的托管对象引用: {}", raw)))?;

        let type_name = type_part.strip_prefix("vim.").unwrap_or(type_part);

        if type_name.is_empty() || id.is_empty() {
            return Err(VimError::ParseError(format!("无效的托管对象引用: {}", raw)));
        }

        Ok(Self::new(type_name, id))
    }

    /// MOID
    pub fn id(&self) -> &str {
        &self.value
    }

    /// VI/JSON 线上格式
    pub fn to_wire(&self) -> serde_json::Value {
        serde_json::json!({
            "_typeName": "ManagedObjectReference",
            "type": self.type_name,
            "value": self.value,
        })
    }
}

impl fmt::Display for ManagedObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'vim.{}:{}'", self.type_name, self.value)
    }
}

/// 受管实体类型
///
/// 同形但不可互换，查询总是限定在某一类型内。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    ClusterComputeResource,
    HostSystem,
    Datastore,
    Network,
    VirtualMachine,
    Datacenter,
    ResourcePool,
    Folder,
    VirtualApp,
    DistributedVirtualSwitch,
    StoragePod,
}

impl EntityKind {
    pub const ALL: [EntityKind; 11] = [
        EntityKind::ClusterComputeResource,
        EntityKind::HostSystem,
        EntityKind::Datastore,
        EntityKind::Network,
        EntityKind::VirtualMachine,
        EntityKind::Datacenter,
        EntityKind::ResourcePool,
        EntityKind::Folder,
        EntityKind::VirtualApp,
        EntityKind::DistributedVirtualSwitch,
        EntityKind::StoragePod,
    ];

    /// 远端类型名
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClusterComputeResource => "ClusterComputeResource",
            Self::HostSystem => "HostSystem",
            Self::Datastore => "Datastore",
            Self::Network => "Network",
            Self::VirtualMachine => "VirtualMachine",
            Self::Datacenter => "Datacenter",
            Self::ResourcePool => "ResourcePool",
            Self::Folder => "Folder",
            Self::VirtualApp => "VirtualApp",
            Self::DistributedVirtualSwitch => "DistributedVirtualSwitch",
            Self::StoragePod => "StoragePod",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = VimError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.strip_prefix("vim.").unwrap_or(s);
        match name {
            "Cluster" => return Ok(Self::ClusterComputeResource),
            "Host" => return Ok(Self::HostSystem),
            "VmwareDistributedVirtualSwitch" => return Ok(Self::DistributedVirtualSwitch),
            _ => {}
        }

        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| VimError::Validation(format!("不支持的实体类型: {}", s)))
    }
}

/// 远端任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Queued,
    Running,
    Success,
    Error,
}

impl TaskState {
    /// 是否仍在进行中
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Queued | Self::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskState {
    type Err = VimError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "queued" => Ok(Self::Queued),
            "running" => Ok(Self::Running),
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            other => Err(VimError::ParseError(format!("未知任务状态: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quoted_reference() {
        let moref = ManagedObjectRef::parse("'vim.VirtualMachine:vm-42'").unwrap();
        assert_eq!(moref.type_name, "VirtualMachine");
        assert_eq!(moref.id(), "vm-42");
    }

    #[test]
    fn test_parse_keeps_last_segment() {
        let moref = ManagedObjectRef::parse("'type:vm-42'").unwrap();
        assert_eq!(moref.type_name, "type");
        assert_eq!(moref.id(), "vm-42");
    }

    #[test]
    fn test_parse_display_roundtrip() {
        let moref = ManagedObjectRef::of(EntityKind::Datastore, "datastore-11");
        assert_eq!(moref.to_string(), "'vim.Datastore:datastore-11'");
        assert_eq!(ManagedObjectRef::parse(&moref.to_string()).unwrap(), moref);
    }

    #[test]
    fn test_parse_invalid_reference() {
        assert!(ManagedObjectRef::parse("vm-42").is_err());
        assert!(ManagedObjectRef::parse("'VirtualMachine:'").is_err());
    }

    #[test]
    fn test_entity_kind_aliases() {
        assert_eq!("Host".parse::<EntityKind>().unwrap(), EntityKind::HostSystem);
        assert_eq!(
            "vim.ClusterComputeResource".parse::<EntityKind>().unwrap(),
            EntityKind::ClusterComputeResource
        );
        assert!(matches!(
            "Toaster".parse::<EntityKind>(),
            Err(VimError::Validation(_))
        ));
    }

    #[test]
    fn test_task_state() {
        assert!(TaskState::Queued.is_pending());
        assert!(TaskState::Running.is_pending());
        assert!(!TaskState::Success.is_pending());
        assert_eq!("error".parse::<TaskState>().unwrap(), TaskState::Error);
        assert!("paused".parse::<TaskState>().is_err());
    }
}
