//! 亲和性规则命令

use anyhow::Result;
use colored::Colorize;

use vsa_vim::{AffinityRuleRequest, VimSession};

use super::common::{connect_vim, finish, print_json, print_outcome, GlobalOpts};

pub async fn handle(action: crate::AffinityAction, opts: &GlobalOpts) -> Result<()> {
    match action {
        crate::AffinityAction::Create {
            rule_name,
            cluster,
            vms,
            hosts,
            retries,
        } => {
            let request = AffinityRuleRequest {
                rule_name,
                cluster_name: cluster,
                vm_names: vms,
                host_names: hosts,
                vm_wait_retry: retries,
            };
            let session = connect_vim(opts).await?;
            let result = create(&session, &request).await;
            finish(session, result).await
        }
        crate::AffinityAction::Delete { rule_name, cluster } => {
            let session = connect_vim(opts).await?;
            let result = delete(&session, &rule_name, &cluster).await;
            finish(session, result).await
        }
    }
}

async fn create(session: &VimSession, request: &AffinityRuleRequest) -> Result<()> {
    println!(
        "创建亲和性规则 {} (集群 {})",
        request.rule_name.cyan().bold(),
        request.cluster_name.yellow()
    );
    let outcome = session.affinity().create(request).await?;
    print_outcome(&outcome)
}

async fn delete(session: &VimSession, rule_name: &str, cluster: &str) -> Result<()> {
    let done = session.affinity().delete(rule_name, cluster).await?;
    print_json(&done)?;

    if done {
        eprintln!("{} 规则 {} 已删除", "✓".green().bold(), rule_name.cyan());
    } else {
        eprintln!("{} 集群重配置任务失败", "✗".red().bold());
    }
    Ok(())
}
