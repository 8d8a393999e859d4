//! 任务命令

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use vsa_vim::{ManagedObjectRef, TaskHistoryWatcher, TaskWaiter, VimError, VimSession};

use super::common::{connect_vim, create_manager, finish, print_json, GlobalOpts};

pub async fn handle(action: crate::TaskAction, opts: &GlobalOpts) -> Result<()> {
    match action {
        crate::TaskAction::Watch { tasknum, interval } => watch(opts, tasknum, interval).await,
        crate::TaskAction::Wait { task_id, timeout } => {
            let session = connect_vim(opts).await?;
            let result = wait(&session, &task_id, timeout).await;
            finish(session, result).await
        }
    }
}

/// 轮询新排队的任务，Ctrl-C 退出
async fn watch(opts: &GlobalOpts, tasknum: Option<u32>, interval: Option<u64>) -> Result<()> {
    let manager = create_manager(opts)?;
    let settings = &manager.config().sensors.taskinfo;

    let batch = tasknum.unwrap_or(settings.tasknum);
    let interval = interval
        .map(Duration::from_secs)
        .unwrap_or_else(|| settings.poll_interval());
    let profile = opts.profile().or(settings.vsphere.as_deref());

    let session = VimSession::connect(&manager, profile)
        .await
        .context("vSphere 登录失败")?;
    let result = poll_tasks(&session, batch, interval).await;
    finish(session, result).await
}

async fn poll_tasks(session: &VimSession, batch: u32, interval: Duration) -> Result<()> {
    let watcher = TaskHistoryWatcher::create(session, batch, Utc::now()).await?;
    info!("开始监视任务, 间隔 {:?}, 每次 {} 条", interval, batch);
    eprintln!("{} 监视新任务中，按 Ctrl-C 退出", "●".green());

    let result = loop {
        match watcher.read_next().await {
            Ok(events) => {
                for event in events {
                    println!("{}", serde_json::to_string(&event)?);
                }
            }
            Err(e) => break Err(e),
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("收到中断信号，停止监视");
                break Ok(());
            }
            _ = tokio::time::sleep(interval) => {}
        }
    };

    if let Err(e) = watcher.destroy().await {
        warn!("销毁任务采集器失败: {}", e);
    }
    result.map_err(Into::into)
}

/// 等待任务结束，Ctrl-C 取消等待
async fn wait(session: &VimSession, task_id: &str, timeout: Option<u64>) -> Result<()> {
    let task = session.task(ManagedObjectRef::new("Task", task_id));

    let token = CancellationToken::new();
    let mut waiter = TaskWaiter::new().with_cancellation(token.clone());
    if let Some(secs) = timeout {
        waiter = waiter.with_timeout(Duration::from_secs(secs));
    }

    let cancel = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    let result = waiter.wait(&task).await;
    cancel.abort();

    match result {
        Ok(success) => {
            print_json(&success)?;
            if success {
                eprintln!("{} 任务 {} 成功", "✓".green().bold(), task_id.cyan());
            } else {
                eprintln!("{} 任务 {} 失败", "✗".red().bold(), task_id.cyan());
            }
            Ok(())
        }
        Err(VimError::Cancelled(_)) => {
            eprintln!("{} 已停止等待任务 {}", "!".yellow().bold(), task_id);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
