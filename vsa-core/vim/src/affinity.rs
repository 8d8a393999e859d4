//! 集群 VM-主机亲和性规则

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use vsa_transport::Outcome;

use crate::error::{Result, VimError};
use crate::session::VimSession;
use crate::types::{EntityKind, ManagedObjectRef};
use crate::value::VimValue;

/// 集群组类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterGroupKind {
    Vm,
    Host,
    Other,
}

/// 集群组
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterGroup {
    pub name: String,
    pub kind: ClusterGroupKind,
    pub members: Vec<ManagedObjectRef>,
    /// 原始 `ClusterGroupInfo`，删除时原样提交
    pub raw: VimValue,
}

impl ClusterGroup {
    pub fn from_value(value: &VimValue) -> Self {
        let (kind, member_field) = match value.type_name() {
            "ClusterVmGroup" => (ClusterGroupKind::Vm, "vm"),
            "ClusterHostGroup" => (ClusterGroupKind::Host, "host"),
            _ => (ClusterGroupKind::Other, ""),
        };

        let members = value
            .get(member_field)
            .map(VimValue::as_array)
            .unwrap_or_default()
            .iter()
            .filter_map(VimValue::as_moref)
            .cloned()
            .collect();

        Self {
            name: value.get("name").and_then(VimValue::as_str).unwrap_or_default().to_string(),
            kind,
            members,
            raw: value.clone(),
        }
    }
}

/// VM-主机规则
#[derive(Debug, Clone, PartialEq)]
pub struct AffinityRule {
    pub key: i64,
    pub name: String,
    pub vm_group_name: String,
    pub host_group_name: String,
    pub raw: VimValue,
}

impl AffinityRule {
    pub fn from_value(value: &VimValue) -> Self {
        let text = |field: &str| {
            value
                .get(field)
                .and_then(VimValue::as_str)
                .unwrap_or_default()
                .to_string()
        };

        Self {
            key: value.get("key").and_then(VimValue::as_i64).unwrap_or_default(),
            name: text("name"),
            vm_group_name: text("vmGroupName"),
            host_group_name: text("affineHostGroupName"),
            raw: value.clone(),
        }
    }
}

/// 创建规则的参数
#[derive(Debug, Clone)]
pub struct AffinityRuleRequest {
    pub rule_name: String,
    pub cluster_name: String,
    pub vm_names: Vec<String>,
    /// 为空时使用各虚拟机当前所在主机
    pub host_names: Vec<String>,
    /// 等待虚拟机出现的重试次数
    pub vm_wait_retry: u32,
}

/// 创建结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AffinityCreated {
    pub host_names: Vec<String>,
}

pub fn vm_group_name(rule_name: &str) -> String {
    format!("{}-vm", rule_name)
}

pub fn host_group_name(rule_name: &str) -> String {
    format!("{}-host", rule_name)
}

fn wire_list(refs: &[ManagedObjectRef]) -> Vec<Value> {
    refs.iter().map(ManagedObjectRef::to_wire).collect()
}

/// 新增规则及其两个组的集群配置
pub fn creation_spec(rule_name: &str, vms: &[ManagedObjectRef], hosts: &[ManagedObjectRef]) -> Value {
    let vm_group = vm_group_name(rule_name);
    let host_group = host_group_name(rule_name);

    json!({
        "_typeName": "ClusterConfigSpecEx",
        "groupSpec": [
            {
                "_typeName": "ClusterGroupSpec",
                "operation": "add",
                "info": {"_typeName": "ClusterVmGroup", "name": vm_group, "vm": wire_list(vms)},
            },
            {
                "_typeName": "ClusterGroupSpec",
                "operation": "add",
                "info": {"_typeName": "ClusterHostGroup", "name": host_group, "host": wire_list(hosts)},
            },
        ],
        "rulesSpec": [{
            "_typeName": "ClusterRuleSpec",
            "operation": "add",
            "info": {
                "_typeName": "ClusterVmHostRuleInfo",
                "name": rule_name,
                "enabled": true,
                "mandatory": true,
                "vmGroupName": vm_group,
                "affineHostGroupName": host_group,
            },
        }],
    })
}

/// 删除规则及其两个组的集群配置，组以名称、规则以 key 作为删除键
pub fn removal_spec(rule: &AffinityRule, vm_group: &ClusterGroup, host_group: &ClusterGroup) -> Value {
    json!({
        "_typeName": "ClusterConfigSpecEx",
        "groupSpec": [
            {
                "_typeName": "ClusterGroupSpec",
                "operation": "remove",
                "removeKey": vm_group.name,
                "info": vm_group.raw.to_wire(),
            },
            {
                "_typeName": "ClusterGroupSpec",
                "operation": "remove",
                "removeKey": host_group.name,
                "info": host_group.raw.to_wire(),
            },
        ],
        "rulesSpec": [{
            "_typeName": "ClusterRuleSpec",
            "operation": "remove",
            "removeKey": rule.key,
            "info": rule.raw.to_wire(),
        }],
    })
}

/// 在组列表中找出规则关联的 VM 组和主机组
pub fn find_groups(
    groups: &[ClusterGroup],
    vm_group_name: &str,
    host_group_name: &str,
) -> Result<(ClusterGroup, ClusterGroup)> {
    let pick = |name: &str| groups.iter().find(|g| g.name == name).cloned();

    let vm_group = pick(vm_group_name)
        .ok_or_else(|| VimError::NotFound(format!("Could not find VM Group with the name: {}", vm_group_name)))?;

    let host_group = pick(host_group_name)
        .ok_or_else(|| VimError::NotFound(format!("Could not find Host Group with the name: {}", host_group_name)))?;

    Ok((vm_group, host_group))
}

/// 亲和性规则 API
pub struct AffinityApi<'a> {
    session: &'a VimSession,
}

impl<'a> AffinityApi<'a> {
    pub(crate) fn new(session: &'a VimSession) -> Self {
        Self { session }
    }

    /// 读取集群的组与规则
    pub async fn configuration(&self, cluster: &ManagedObjectRef) -> Result<(Vec<ClusterGroup>, Vec<AffinityRule>)> {
        let config = self.session.read_property(cluster, "configurationEx").await?;

        let groups = config
            .get("group")
            .map(VimValue::as_array)
            .unwrap_or_default()
            .iter()
            .map(ClusterGroup::from_value)
            .collect();

        let rules = config
            .get("rule")
            .map(VimValue::as_array)
            .unwrap_or_default()
            .iter()
            .map(AffinityRule::from_value)
            .collect();

        Ok((groups, rules))
    }

    async fn reconfigure(&self, cluster: &ManagedObjectRef, spec: Value) -> Result<bool> {
        let task = self
            .session
            .invoke(
                cluster,
                "ReconfigureComputeResource_Task",
                json!({"spec": spec, "modify": true}),
            )
            .await?;

        let task = task
            .as_moref()
            .cloned()
            .ok_or_else(|| VimError::ParseError("ReconfigureComputeResource_Task 未返回任务".to_string()))?;

        self.session.task(task).wait().await
    }

    /// 创建规则
    pub async fn create(&self, request: &AffinityRuleRequest) -> Result<Outcome<AffinityCreated>> {
        let resolver = self.session.resolver();

        let mut vms = Vec::with_capacity(request.vm_names.len());
        for vm_name in &request.vm_names {
            vms.push(
                resolver
                    .wait_for_entity(EntityKind::VirtualMachine, vm_name, request.vm_wait_retry)
                    .await?,
            );
        }

        let mut hosts = Vec::new();
        if request.host_names.is_empty() {
            for vm in &vms {
                let runtime = self.session.read_property(vm, "runtime").await?;
                let host = runtime
                    .get("host")
                    .and_then(VimValue::as_moref)
                    .cloned()
                    .ok_or_else(|| VimError::NotFound(format!("虚拟机 {} 没有所在主机", vm.id())))?;
                hosts.push(host);
            }
        } else {
            for host_name in &request.host_names {
                hosts.push(resolver.find_by_name(EntityKind::HostSystem, host_name).await?);
            }
        }

        let cluster = resolver
            .find_by_name(EntityKind::ClusterComputeResource, &request.cluster_name)
            .await?;

        info!(
            "创建亲和性规则 {} (集群 {}, {} 台虚拟机, {} 台主机)",
            request.rule_name,
            request.cluster_name,
            vms.len(),
            hosts.len()
        );

        let spec = creation_spec(&request.rule_name, &vms, &hosts);
        let task_ok = self.reconfigure(&cluster, spec).await?;

        let mut host_names = Vec::with_capacity(hosts.len());
        for host in &hosts {
            host_names.push(resolver.name_of(host).await?);
        }

        Ok(Outcome {
            success: task_ok,
            detail: AffinityCreated { host_names },
        })
    }

    /// 删除规则及其两个组
    pub async fn delete(&self, rule_name: &str, cluster_name: &str) -> Result<bool> {
        let cluster = self
            .session
            .resolver()
            .find_by_name(EntityKind::ClusterComputeResource, cluster_name)
            .await?;

        let (groups, rules) = self.configuration(&cluster).await?;

        let rule = rules
            .iter()
            .find(|r| r.name == rule_name)
            .ok_or_else(|| VimError::NotFound(format!("Could not find Affinity Rule with the name: {}", rule_name)))?;

        let (vm_group, host_group) = find_groups(&groups, &rule.vm_group_name, &rule.host_group_name)?;
        debug!(
            "删除亲和性规则 {} (key={}), 组 {} / {}",
            rule.name, rule.key, vm_group.name, host_group.name
        );

        let spec = removal_spec(rule, &vm_group, &host_group);
        self.reconfigure(&cluster, spec).await
    }
}
