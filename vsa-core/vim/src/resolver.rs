//! 实体解析
//!
//! 按 id 解析时直接构造引用，不遍历清单；按名称解析时在限定类型的容器视图上做精确匹配，
//! 重名时取远端返回的第一个。

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, warn};

use vsa_transport::Outcome;

use crate::endpoint::PropertyQuery;
use crate::error::{Result, VimError};
use crate::session::VimSession;
use crate::types::{EntityKind, ManagedObjectRef};

/// 等待实体出现时的重试间隔
pub const ENTITY_RETRY_DELAY: Duration = Duration::from_secs(2);

/// 支持名称到 MOID 批量查询的类型
pub const MOID_LOOKUP_KINDS: [EntityKind; 5] = [
    EntityKind::VirtualMachine,
    EntityKind::Network,
    EntityKind::Datastore,
    EntityKind::Datacenter,
    EntityKind::HostSystem,
];

/// 带名称的实体
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedEntity {
    pub id: String,
    pub name: String,
    #[serde(skip)]
    pub moref: ManagedObjectRef,
}

/// 实体解析 API
pub struct EntityResolver<'a> {
    session: &'a VimSession,
}

impl<'a> EntityResolver<'a> {
    pub(crate) fn new(session: &'a VimSession) -> Self {
        Self { session }
    }

    /// 按 id 或名称解析，两者都给出时以 id 为准
    pub async fn resolve(&self, kind: EntityKind, id: Option<&str>, name: Option<&str>) -> Result<ManagedObjectRef> {
        match (id.filter(|s| !s.is_empty()), name.filter(|s| !s.is_empty())) {
            (Some(id), _) => {
                debug!("按 id 解析 {}: {}", kind, id);
                Ok(ManagedObjectRef::of(kind, id))
            }
            (None, Some(name)) => self.find_by_name(kind, name).await,
            (None, None) => Err(VimError::Validation(format!("解析 {} 需要 id 或 name", kind))),
        }
    }

    /// 按名称精确匹配
    pub async fn find_by_name(&self, kind: EntityKind, name: &str) -> Result<ManagedObjectRef> {
        debug!("按名称解析 {}: {}", kind, name);

        let query = PropertyQuery::new(kind.as_str()).with_paths(["name"]);
        let objects = self.session.retrieve(&query).await?;

        let mut matches = objects.into_iter().filter(|o| o.name() == Some(name));
        let first = matches
            .next()
            .ok_or_else(|| VimError::NotFound(format!("{} {} 不存在", kind, name)))?;

        let extra = matches.count();
        if extra > 0 {
            warn!("{} 名称 {} 有 {} 个重名实体，使用第一个: {}", kind, name, extra + 1, first.obj.id());
        }

        Ok(first.obj)
    }

    /// 列出某一类型的全部实体
    pub async fn list(&self, kind: EntityKind) -> Result<Vec<NamedEntity>> {
        let query = PropertyQuery::new(kind.as_str()).with_paths(["name"]);
        let objects = self.session.retrieve(&query).await?;

        Ok(objects
            .into_iter()
            .map(|o| NamedEntity {
                id: o.obj.id().to_string(),
                name: o.name().unwrap_or_default().to_string(),
                moref: o.obj,
            })
            .collect())
    }

    /// 读取实体名称
    pub async fn name_of(&self, moref: &ManagedObjectRef) -> Result<String> {
        let value = self.session.read_property(moref, "name").await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| VimError::ParseError(format!("{} 没有 name 属性", moref)))
    }

    /// 等待刚创建的实体出现，每次失败后间隔 2 秒重试
    pub async fn wait_for_entity(&self, kind: EntityKind, name: &str, retries: u32) -> Result<ManagedObjectRef> {
        for attempt in 1..=retries {
            match self.find_by_name(kind, name).await {
                Ok(moref) => return Ok(moref),
                Err(e) => {
                    debug!("等待 {} {} (第 {}/{} 次): {}", kind, name, attempt, retries, e);
                    sleep(ENTITY_RETRY_DELAY).await;
                }
            }
        }

        Err(VimError::NotFound(format!("Could not find {} with name: {}", kind, name)))
    }

    /// 名称批量查询 MOID
    ///
    /// 不支持的类型返回 `(false, {})`；单个名称查询失败只记录日志并跳过。
    pub async fn resolve_moids(&self, kind: &str, names: &[String]) -> Result<Outcome<BTreeMap<String, String>>> {
        let kind = match kind.parse::<EntityKind>() {
            Ok(kind) if MOID_LOOKUP_KINDS.contains(&kind) => kind,
            _ => {
                warn!("不支持的 MOID 查询类型: {}", kind);
                return Ok(Outcome::failed(BTreeMap::new()));
            }
        };

        let mut results = BTreeMap::new();
        for name in names {
            match self.find_by_name(kind, name).await {
                Ok(moref) => {
                    results.insert(name.clone(), moref.value);
                }
                Err(e) => warn!("查询 {} {} 的 MOID 失败: {}", kind, name, e),
            }
        }

        Ok(Outcome::ok(results))
    }
}
