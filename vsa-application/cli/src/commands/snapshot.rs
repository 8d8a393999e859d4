//! 快照管理命令

use anyhow::{Context, Result};
use colored::Colorize;

use vsa_transport::Outcome;
use vsa_vim::{EntityKind, ManagedObjectRef, SnapshotPruner, VimSession};

use super::common::{connect_vim, finish, print_json, print_outcome, GlobalOpts};

pub async fn handle(action: crate::SnapshotAction, opts: &GlobalOpts) -> Result<()> {
    match action {
        crate::SnapshotAction::List { vm_id, vm_name, flat } => {
            if vm_id.is_none() && vm_name.is_none() {
                anyhow::bail!("必须指定 --vm-id 或 --vm-name");
            }
            let session = connect_vim(opts).await?;
            let result = list(&session, vm_id.as_deref(), vm_name.as_deref(), flat).await;
            finish(session, result).await
        }
        crate::SnapshotAction::Prune {
            vm_id,
            vm_name,
            max_age_days,
            ignore,
        } => {
            let pruner = SnapshotPruner::new(max_age_days, ignore.as_slice()).context("快照忽略规则无效")?;
            let session = connect_vim(opts).await?;
            let result = prune(&session, vm_id.as_deref(), vm_name.as_deref(), &pruner).await;
            finish(session, result).await
        }
    }
}

async fn find_vm(session: &VimSession, id: Option<&str>, name: Option<&str>) -> Result<ManagedObjectRef> {
    let vm = session
        .resolver()
        .resolve(EntityKind::VirtualMachine, id, name)
        .await
        .context("找不到虚拟机")?;
    Ok(vm)
}

async fn list(session: &VimSession, id: Option<&str>, name: Option<&str>, flat: bool) -> Result<()> {
    let vm = find_vm(session, id, name).await?;
    let outcome = session.snapshots().describe(&vm, flat).await?;
    print_outcome(&outcome)
}

async fn prune(session: &VimSession, id: Option<&str>, name: Option<&str>, pruner: &SnapshotPruner) -> Result<()> {
    if id.is_none() && name.is_none() {
        println!("{}", "未指定虚拟机，检查所有虚拟机的快照".yellow());
        let report = session.snapshots().prune_all(pruner).await?;
        return print_outcome(&Outcome::ok(report));
    }

    let vm = find_vm(session, id, name).await?;
    let outcome = session.snapshots().prune(&vm, pruner).await?;
    if outcome.success {
        print_outcome(&outcome)
    } else {
        print_json(&outcome)
    }
}
