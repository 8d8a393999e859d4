//! 远端任务轮询

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Result, VimError};
use crate::session::VimSession;
use crate::types::{ManagedObjectRef, TaskState};
use crate::value::VimValue;

/// 默认轮询间隔
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// 可轮询状态的任务
#[async_trait]
pub trait TaskHandle: Send + Sync {
    /// 当前状态
    async fn state(&self) -> Result<TaskState>;

    /// 日志中使用的描述
    fn describe(&self) -> String {
        "task".to_string()
    }
}

/// 远端任务
pub struct RemoteTask<'a> {
    session: &'a VimSession,
    task: ManagedObjectRef,
}

impl<'a> RemoteTask<'a> {
    pub(crate) fn new(session: &'a VimSession, task: ManagedObjectRef) -> Self {
        Self { session, task }
    }

    pub fn moref(&self) -> &ManagedObjectRef {
        &self.task
    }

    /// `TaskInfo` 数据对象
    pub async fn info(&self) -> Result<VimValue> {
        self.session.read_property(&self.task, "info").await
    }

    /// 等待任务结束
    pub async fn wait(&self) -> Result<bool> {
        TaskWaiter::default().wait(self).await
    }
}

#[async_trait]
impl TaskHandle for RemoteTask<'_> {
    async fn state(&self) -> Result<TaskState> {
        let info = self.info().await?;
        info.get("state")
            .and_then(VimValue::as_str)
            .ok_or_else(|| VimError::ParseError(format!("任务 {} 缺少 state 字段", self.task)))?
            .parse()
    }

    fn describe(&self) -> String {
        self.task.id().to_string()
    }
}

/// 任务等待器
///
/// 以固定间隔轮询直到任务进入终态，成功返回 `true`，其余终态返回 `false`。
/// 默认没有超时也不可取消；设置超时或取消令牌后，触发时分别返回
/// [`VimError::Timeout`] 与 [`VimError::Cancelled`]。
#[derive(Debug, Clone)]
pub struct TaskWaiter {
    interval: Duration,
    timeout: Option<Duration>,
    cancel: Option<CancellationToken>,
}

impl Default for TaskWaiter {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
            cancel: None,
        }
    }
}

impl TaskWaiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// 等待任务进入终态
    pub async fn wait<T: TaskHandle + ?Sized>(&self, task: &T) -> Result<bool> {
        let started = Instant::now();
        let mut polls: u32 = 0;

        loop {
            let state = task.state().await?;
            polls += 1;
            debug!("任务 {} 状态: {} (第 {} 次轮询)", task.describe(), state, polls);

            if !state.is_pending() {
                return Ok(state == TaskState::Success);
            }

            if let Some(timeout) = self.timeout {
                if started.elapsed() >= timeout {
                    return Err(VimError::Timeout(format!(
                        "任务 {} 在 {:?} 内未结束",
                        task.describe(),
                        timeout
                    )));
                }
            }

            match &self.cancel {
                Some(token) => {
                    tokio::select! {
                        _ = token.cancelled() => {
                            return Err(VimError::Cancelled(format!("任务 {} 的等待被取消", task.describe())));
                        }
                        _ = sleep(self.interval) => {}
                    }
                }
                None => sleep(self.interval).await,
            }
        }
    }
}

/// 以默认参数等待任务
pub async fn wait_for_task<T: TaskHandle + ?Sized>(task: &T) -> Result<bool> {
    TaskWaiter::default().wait(task).await
}
