//! 实体查询命令

use anyhow::{Context, Result};
use serde_json::json;

use vsa_vim::properties::raw as raw_contents;
use vsa_vim::{AllowList, EntityKind, VimJsonSerializer, VimSession};

use super::common::{connect_vim, finish, print_json, print_outcome, GlobalOpts};

pub async fn handle(action: crate::EntityAction, opts: &GlobalOpts) -> Result<()> {
    match action {
        crate::EntityAction::Resolve { kind, id, name } => {
            let kind = parse_kind(&kind)?;
            let session = connect_vim(opts).await?;
            let result = resolve(&session, kind, id.as_deref(), name.as_deref()).await;
            finish(session, result).await
        }
        crate::EntityAction::Moid { kind, names } => {
            let session = connect_vim(opts).await?;
            let result = moid(&session, &kind, &names).await;
            finish(session, result).await
        }
        crate::EntityAction::List { kind } => {
            let kind = parse_kind(&kind)?;
            let session = connect_vim(opts).await?;
            let result = list(&session, kind).await;
            finish(session, result).await
        }
        crate::EntityAction::Summary { kind, id, name } => {
            let kind = parse_kind(&kind)?;
            let session = connect_vim(opts).await?;
            let result = summary(&session, kind, id.as_deref(), name.as_deref()).await;
            finish(session, result).await
        }
    }
}

/// 批量读取属性
pub async fn properties(
    opts: &GlobalOpts,
    type_name: &str,
    props: &[String],
    ids: &[String],
    raw: bool,
) -> Result<()> {
    let session = connect_vim(opts).await?;
    let result = collect_properties(&session, type_name, props, ids, raw).await;
    finish(session, result).await
}

fn parse_kind(kind: &str) -> Result<EntityKind> {
    kind.parse::<EntityKind>()
        .with_context(|| format!("无法识别的实体类型: {}", kind))
}

fn require_id_or_name(id: Option<&str>, name: Option<&str>) -> Result<()> {
    if id.is_none() && name.is_none() {
        anyhow::bail!("必须指定 --id 或 --name");
    }
    Ok(())
}

async fn resolve(session: &VimSession, kind: EntityKind, id: Option<&str>, name: Option<&str>) -> Result<()> {
    require_id_or_name(id, name)?;
    let moref = session.resolver().resolve(kind, id, name).await?;
    print_json(&json!({"type": moref.type_name, "id": moref.id()}))
}

async fn moid(session: &VimSession, kind: &str, names: &[String]) -> Result<()> {
    let outcome = session.resolver().resolve_moids(kind, names).await?;
    print_outcome(&outcome)
}

async fn list(session: &VimSession, kind: EntityKind) -> Result<()> {
    let entities = session.resolver().list(kind).await?;
    print_json(&entities)
}

async fn summary(session: &VimSession, kind: EntityKind, id: Option<&str>, name: Option<&str>) -> Result<()> {
    require_id_or_name(id, name)?;
    let moref = session.resolver().resolve(kind, id, name).await?;
    let summary = session
        .read_property(&moref, "summary")
        .await
        .with_context(|| format!("读取 {} 摘要失败", moref))?;

    let serializer = VimJsonSerializer::new(summary_allow_list(kind));
    print_json(&serializer.to_json(&summary))
}

async fn collect_properties(
    session: &VimSession,
    type_name: &str,
    props: &[String],
    ids: &[String],
    raw: bool,
) -> Result<()> {
    if raw {
        let objects = session.properties().collect(type_name, props, ids).await?;
        print_json(&raw_contents(&objects))
    } else {
        let outcome = session.properties().get(type_name, props, ids).await?;
        print_outcome(&outcome)
    }
}

/// 各类实体摘要展开的数据对象类型
fn summary_allow_list(kind: EntityKind) -> AllowList {
    match kind {
        EntityKind::ClusterComputeResource => AllowList::cluster_summary(),
        EntityKind::HostSystem => AllowList::host_summary(),
        EntityKind::Datastore => AllowList::datastore_summary(),
        EntityKind::Network => AllowList::network_summary(),
        EntityKind::VirtualMachine => AllowList::vm_summary(),
        _ => AllowList::summaries(),
    }
}
