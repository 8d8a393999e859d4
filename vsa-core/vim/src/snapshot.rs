//! 虚拟机快照：查询与按期清理

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use regex::Regex;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use vsa_transport::Outcome;

use crate::endpoint::PropertyQuery;
use crate::error::{Result, VimError};
use crate::session::VimSession;
use crate::tree::{collect_flat, collect_tree, Collected, TreeNode, TreeRecord, Verdict};
use crate::types::{EntityKind, ManagedObjectRef};
use crate::value::VimValue;

/// 快照磁盘文件名特征
pub const SNAPSHOT_DISK_PATTERN: &str = "0000[0-9][0-9]";

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// 快照树节点
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotNode {
    pub name: String,
    pub description: String,
    pub id: i64,
    pub created: Option<DateTime<Utc>>,
    pub state: String,
    pub snapshot: ManagedObjectRef,
    pub vm: ManagedObjectRef,
    pub children: Vec<SnapshotNode>,
}

impl SnapshotNode {
    /// 从 `VirtualMachineSnapshotTree` 解析
    pub fn from_value(value: &VimValue) -> Result<Self> {
        let moref = |field: &str| -> Result<ManagedObjectRef> {
            value
                .get(field)
                .and_then(VimValue::as_moref)
                .cloned()
                .ok_or_else(|| VimError::ParseError(format!("快照节点缺少字段: {}", field)))
        };
        let text = |field: &str| -> String {
            value
                .get(field)
                .and_then(VimValue::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let children = value
            .get("childSnapshotList")
            .map(VimValue::as_array)
            .unwrap_or_default()
            .iter()
            .map(SnapshotNode::from_value)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: text("name"),
            description: text("description"),
            id: value.get("id").and_then(VimValue::as_i64).unwrap_or_default(),
            created: value.get("createTime").and_then(VimValue::as_datetime),
            state: text("state"),
            snapshot: moref("snapshot")?,
            vm: moref("vm")?,
            children,
        })
    }

    /// 从 `VirtualMachineSnapshotInfo` 取根快照列表
    pub fn roots_from_info(info: &VimValue) -> Result<Vec<Self>> {
        info.get("rootSnapshotList")
            .map(VimValue::as_array)
            .unwrap_or_default()
            .iter()
            .map(SnapshotNode::from_value)
            .collect()
    }
}

impl TreeNode for SnapshotNode {
    fn children(&self) -> &[Self] {
        &self.children
    }
}

/// 快照记录
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotRecord {
    pub name: String,
    pub description: String,
    pub id: i64,
    #[serde(serialize_with = "crate::serialize::serialize_datetime")]
    pub created: Option<DateTime<Utc>>,
    pub vm_moid: String,
    pub snapshot_moid: String,
    pub state: String,
}

impl From<&SnapshotNode> for SnapshotRecord {
    fn from(node: &SnapshotNode) -> Self {
        Self {
            name: node.name.clone(),
            description: node.description.clone(),
            id: node.id,
            created: node.created,
            vm_moid: node.vm.id().to_string(),
            snapshot_moid: node.snapshot.id().to_string(),
            state: node.state.clone(),
        }
    }
}

/// 快照列表，平铺或嵌套
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SnapshotListing {
    Flat(Vec<SnapshotRecord>),
    Tree(Vec<TreeRecord<SnapshotRecord>>),
}

impl SnapshotListing {
    pub fn build(roots: &[SnapshotNode], flat: bool) -> Self {
        let mut select = |node: &SnapshotNode| Verdict::Select(SnapshotRecord::from(node));
        if flat {
            SnapshotListing::Flat(collect_flat(roots, &mut select).selected)
        } else {
            SnapshotListing::Tree(collect_tree(roots, &mut select))
        }
    }
}

/// 单台虚拟机的快照报告
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotReport {
    pub size_gb: f64,
    pub snapshots: SnapshotListing,
}

/// 快照查询结果；虚拟机没有快照时为提示信息
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SnapshotResult<T> {
    Found(T),
    Missing(String),
}

/// 清理报告，条目形如 `<vm>: <snapshot>`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PruneReport {
    pub deleted_snapshots: Vec<String>,
    pub ignored_snapshots: Vec<String>,
}

impl PruneReport {
    pub fn merge(&mut self, other: PruneReport) {
        self.deleted_snapshots.extend(other.deleted_snapshots);
        self.ignored_snapshots.extend(other.ignored_snapshots);
    }
}

/// 待删除的快照
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedRemoval {
    pub label: String,
    pub snapshot: ManagedObjectRef,
}

/// 清理计划，按先序排列
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrunePlan {
    pub remove: Vec<PlannedRemoval>,
    pub ignored: Vec<String>,
}

/// 快照清理规则
///
/// 名称命中任一忽略正则的快照被忽略；否则创建时间加上保留天数早于当前时间的快照被删除。
/// 无论节点本身是否命中，都会继续检查它的子快照。
#[derive(Debug, Clone)]
pub struct SnapshotPruner {
    max_age: ChronoDuration,
    patterns: Vec<Regex>,
    now: DateTime<Utc>,
}

impl SnapshotPruner {
    pub fn new<S: AsRef<str>>(max_age_days: i64, ignore_patterns: &[S]) -> Result<Self> {
        let patterns = ignore_patterns
            .iter()
            .map(|p| {
                Regex::new(p.as_ref())
                    .map_err(|e| VimError::Validation(format!("无效的忽略正则 {}: {}", p.as_ref(), e)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            max_age: ChronoDuration::days(max_age_days),
            patterns,
            now: Utc::now(),
        })
    }

    /// 固定判定时刻
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn is_ignored(&self, name: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(name))
    }

    /// 没有创建时间的快照不会过期
    pub fn is_expired(&self, created: Option<DateTime<Utc>>) -> bool {
        created
            .map(|created| created + self.max_age < self.now)
            .unwrap_or(false)
    }

    fn verdict(&self, vm_name: &str, node: &SnapshotNode) -> Verdict<PlannedRemoval> {
        let label = format!("{}: {}", vm_name, node.name);
        let removal = PlannedRemoval {
            label,
            snapshot: node.snapshot.clone(),
        };

        if self.is_ignored(&node.name) {
            Verdict::Ignore(removal)
        } else if self.is_expired(node.created) {
            Verdict::Select(removal)
        } else {
            Verdict::Skip
        }
    }

    /// 生成清理计划
    pub fn plan(&self, vm_name: &str, roots: &[SnapshotNode]) -> PrunePlan {
        let Collected { selected, ignored } =
            collect_flat(roots, &mut |node: &SnapshotNode| self.verdict(vm_name, node));

        PrunePlan {
            remove: selected,
            ignored: ignored.into_iter().map(|r| r.label).collect(),
        }
    }
}

/// 统计快照占用空间 (GB，保留两位小数)
///
/// `layout` 为 `VirtualMachineFileLayoutEx`，类型为 `snapshotData` 或文件名带快照序号的文件计入，
/// 每个文件只计一次。
pub fn snapshot_size_gb(layout: &VimValue) -> Result<f64> {
    let disk_pattern = Regex::new(SNAPSHOT_DISK_PATTERN)
        .map_err(|e| VimError::Validation(e.to_string()))?;

    let total: i64 = layout
        .get("file")
        .map(VimValue::as_array)
        .unwrap_or_default()
        .iter()
        .filter(|file| {
            let is_snapshot_data = file.get("type").and_then(VimValue::as_str) == Some("snapshotData");
            let is_snapshot_disk = file
                .get("name")
                .and_then(VimValue::as_str)
                .map(|name| disk_pattern.is_match(name))
                .unwrap_or(false);
            is_snapshot_data || is_snapshot_disk
        })
        .filter_map(|file| file.get("size").and_then(VimValue::as_i64))
        .sum();

    let size_gb = total as f64 / BYTES_PER_GB;
    Ok((size_gb * 100.0).round() / 100.0)
}

/// 快照 API
pub struct SnapshotApi<'a> {
    session: &'a VimSession,
}

impl<'a> SnapshotApi<'a> {
    pub(crate) fn new(session: &'a VimSession) -> Self {
        Self { session }
    }

    async fn vm_properties(&self, vm: &ManagedObjectRef, paths: &[&str]) -> Result<(String, VimValue, VimValue)> {
        let query = PropertyQuery::new(EntityKind::VirtualMachine.as_str())
            .with_paths(paths.iter().copied())
            .with_ids(vec![vm.id().to_string()]);

        let object = self
            .session
            .retrieve(&query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| VimError::NotFound(format!("虚拟机 {} 不存在", vm.id())))?;

        let name = object.name().unwrap_or(vm.id()).to_string();
        let snapshot = object.get("snapshot").cloned().unwrap_or(VimValue::Null);
        let layout = object.get("layoutEx").cloned().unwrap_or(VimValue::Null);
        Ok((name, snapshot, layout))
    }

    /// 查询虚拟机快照与占用空间
    pub async fn describe(&self, vm: &ManagedObjectRef, flat: bool) -> Result<Outcome<SnapshotResult<SnapshotReport>>> {
        let (name, snapshot, layout) = self
            .vm_properties(vm, &["name", "snapshot", "layoutEx"])
            .await?;

        if snapshot.is_null() {
            return Ok(Outcome::failed(SnapshotResult::Missing(format!(
                "No snapshots found for VM: {}",
                name
            ))));
        }

        let roots = SnapshotNode::roots_from_info(&snapshot)?;
        debug!("虚拟机 {} 有 {} 个根快照", name, roots.len());

        Ok(Outcome::ok(SnapshotResult::Found(SnapshotReport {
            size_gb: snapshot_size_gb(&layout)?,
            snapshots: SnapshotListing::build(&roots, flat),
        })))
    }

    /// 按计划删除，删除任务提交后不等待完成
    async fn execute(&self, plan: PrunePlan) -> Result<PruneReport> {
        let mut report = PruneReport {
            deleted_snapshots: Vec::with_capacity(plan.remove.len()),
            ignored_snapshots: plan.ignored,
        };

        for removal in plan.remove {
            info!("删除快照: {} ({})", removal.label, removal.snapshot.id());
            self.session
                .invoke(
                    &removal.snapshot,
                    "RemoveSnapshot_Task",
                    json!({"removeChildren": false, "consolidate": true}),
                )
                .await?;
            report.deleted_snapshots.push(removal.label);
        }

        Ok(report)
    }

    /// 清理单台虚拟机的过期快照
    pub async fn prune(&self, vm: &ManagedObjectRef, pruner: &SnapshotPruner) -> Result<Outcome<SnapshotResult<PruneReport>>> {
        let (name, snapshot, _) = self.vm_properties(vm, &["name", "snapshot"]).await?;

        if snapshot.is_null() {
            return Ok(Outcome::failed(SnapshotResult::Missing(format!(
                "No snapshots found for VM: {}",
                name
            ))));
        }

        let roots = SnapshotNode::roots_from_info(&snapshot)?;
        let report = self.execute(pruner.plan(&name, &roots)).await?;
        Ok(Outcome::ok(SnapshotResult::Found(report)))
    }

    /// 清理所有虚拟机的过期快照
    pub async fn prune_all(&self, pruner: &SnapshotPruner) -> Result<PruneReport> {
        let query = PropertyQuery::new(EntityKind::VirtualMachine.as_str()).with_paths(["name", "snapshot"]);
        let vms = self.session.retrieve(&query).await?;

        let mut report = PruneReport::default();
        for vm in vms {
            let name = vm.name().unwrap_or(vm.obj.id()).to_string();
            let snapshot = match vm.get("snapshot") {
                Some(snapshot) if !snapshot.is_null() => snapshot,
                _ => {
                    debug!("虚拟机 {} 没有快照", name);
                    continue;
                }
            };

            let roots = SnapshotNode::roots_from_info(snapshot)?;
            report.merge(self.execute(pruner.plan(&name, &roots)).await?);
        }

        info!(
            "快照清理完成: 删除 {} 个, 忽略 {} 个",
            report.deleted_snapshots.len(),
            report.ignored_snapshots.len()
        );
        Ok(report)
    }
}
