//! 任务历史采集

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::{Result, VimError};
use crate::session::VimSession;
use crate::types::ManagedObjectRef;
use crate::value::VimValue;

/// 事件中的时间格式
pub const EVENT_TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// 默认每次读取的任务数
pub const DEFAULT_TASKNUM: u32 = 3;

/// 任务事件
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskInfoEvent {
    pub task_id: String,
    pub operation_name: String,
    pub queue_time: Option<String>,
    pub start_time: Option<String>,
    pub complete_time: Option<String>,
}

impl TaskInfoEvent {
    /// 从 `TaskInfo` 解析
    pub fn from_info(info: &VimValue) -> Result<Self> {
        let task_id = info
            .get("key")
            .and_then(VimValue::as_str)
            .ok_or_else(|| VimError::ParseError("TaskInfo 缺少 key".to_string()))?
            .to_string();

        let time = |field: &str| {
            info.get(field)
                .and_then(VimValue::as_datetime)
                .map(|dt| dt.format(EVENT_TIME_FORMAT).to_string())
        };

        Ok(Self {
            task_id,
            operation_name: info
                .get("descriptionId")
                .and_then(VimValue::as_str)
                .unwrap_or_default()
                .to_string(),
            queue_time: time("queueTime"),
            start_time: time("startTime"),
            complete_time: time("completeTime"),
        })
    }
}

/// 任务过滤条件：排队时间不早于 `begin`
pub fn task_filter_spec(begin: DateTime<Utc>) -> Value {
    json!({
        "_typeName": "TaskFilterSpec",
        "time": {
            "_typeName": "TaskFilterSpecByTime",
            "timeType": "queuedTime",
            "beginTime": begin.to_rfc3339_opts(SecondsFormat::Secs, true),
        },
    })
}

/// 任务历史监视器
pub struct TaskHistoryWatcher<'a> {
    session: &'a VimSession,
    collector: ManagedObjectRef,
    batch: u32,
}

impl<'a> TaskHistoryWatcher<'a> {
    /// 创建任务采集器
    pub async fn create(session: &'a VimSession, batch: u32, begin: DateTime<Utc>) -> Result<Self> {
        let task_manager = session
            .content()
            .task_manager
            .clone()
            .ok_or_else(|| VimError::NotFound("服务端没有 TaskManager".to_string()))?;

        let collector = session
            .invoke(
                &task_manager,
                "CreateCollectorForTasks",
                json!({"filter": task_filter_spec(begin)}),
            )
            .await?
            .as_moref()
            .cloned()
            .ok_or_else(|| VimError::ParseError("CreateCollectorForTasks 未返回采集器".to_string()))?;

        info!("任务采集器已创建: {} (每次读取 {} 个)", collector.id(), batch);

        Ok(Self {
            session,
            collector,
            batch: batch.max(1),
        })
    }

    pub fn collector(&self) -> &ManagedObjectRef {
        &self.collector
    }

    /// 读取下一批任务
    pub async fn read_next(&self) -> Result<Vec<TaskInfoEvent>> {
        let infos = self
            .session
            .invoke(&self.collector, "ReadNextTasks", json!({"maxCount": self.batch}))
            .await?;

        let events = infos
            .as_array()
            .iter()
            .map(TaskInfoEvent::from_info)
            .collect::<Result<Vec<_>>>()?;

        for event in &events {
            debug!("发现任务: {} {}", event.task_id, event.operation_name);
        }
        Ok(events)
    }

    /// 销毁采集器
    pub async fn destroy(self) -> Result<()> {
        self.session
            .invoke(&self.collector, "DestroyCollector", Value::Null)
            .await?;
        info!("任务采集器已销毁: {}", self.collector.id());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_event_from_info() {
        let info = VimValue::from_json(&json!({
            "_typeName": "TaskInfo",
            "key": "task-101",
            "descriptionId": "VirtualMachine.powerOn",
            "queueTime": "2024-03-01T10:00:00Z",
            "startTime": "2024-03-01T10:00:01Z",
            "state": "running"
        }));

        let event = TaskInfoEvent::from_info(&info).unwrap();
        assert_eq!(event.task_id, "task-101");
        assert_eq!(event.operation_name, "VirtualMachine.powerOn");
        assert_eq!(event.queue_time.as_deref(), Some("2024/03/01 10:00:00"));
        assert_eq!(event.start_time.as_deref(), Some("2024/03/01 10:00:01"));
        assert!(event.complete_time.is_none());
    }

    #[test]
    fn test_filter_spec() {
        let begin = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let spec = task_filter_spec(begin);
        assert_eq!(spec["time"]["timeType"], "queuedTime");
        assert_eq!(spec["time"]["beginTime"], "2024-03-01T10:00:00Z");
    }
}
