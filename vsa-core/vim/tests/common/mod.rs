//! 测试用内存端点

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use vsa_vim::*;

/// 记录的方法调用
#[derive(Debug, Clone)]
pub struct Call {
    pub target: ManagedObjectRef,
    pub method: String,
    pub args: Value,
}

/// 内存中的 vCenter 清单
#[derive(Default)]
pub struct FakeEndpoint {
    objects: Mutex<Vec<ObjectContent>>,
    calls: Mutex<Vec<Call>>,
    responses: Mutex<HashMap<String, VecDeque<VimValue>>>,
    task_states: Mutex<HashMap<String, VecDeque<TaskState>>>,
    hidden: Mutex<HashMap<String, usize>>,
    retrievals: AtomicUsize,
    task_counter: AtomicUsize,
    logins: Mutex<Vec<String>>,
    list_views: Mutex<HashMap<String, Vec<ManagedObjectRef>>>,
    view_counter: AtomicUsize,
}

pub fn service_content() -> ServiceContent {
    ServiceContent {
        root_folder: ManagedObjectRef::new("Folder", "group-d1"),
        property_collector: ManagedObjectRef::new("PropertyCollector", "propertyCollector"),
        view_manager: ManagedObjectRef::new("ViewManager", "ViewManager"),
        session_manager: ManagedObjectRef::new("SessionManager", "SessionManager"),
        task_manager: Some(ManagedObjectRef::new("TaskManager", "TaskManager")),
        about: DataObject::new("AboutInfo")
            .with_field("fullName", VimValue::String("Fake vCenter 8.0".to_string()))
            .into(),
    }
}

/// 按队列取值，最后一个值保持不变
fn next_of<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

impl FakeEndpoint {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 基于本端点创建已认证会话
    pub fn session(self: &Arc<Self>) -> VimSession {
        VimSession::with_endpoint(self.clone(), service_content(), "test")
    }

    pub fn add(&self, object: ObjectContent) {
        self.objects.lock().unwrap().push(object);
    }

    pub fn add_entity(&self, kind: EntityKind, id: &str, name: &str) -> ManagedObjectRef {
        let moref = ManagedObjectRef::of(kind, id);
        self.add(ObjectContent::new(moref.clone()).with_prop("name", VimValue::String(name.to_string())));
        moref
    }

    pub fn set_prop(&self, moref: &ManagedObjectRef, name: &str, value: VimValue) {
        let mut objects = self.objects.lock().unwrap();
        if let Some(object) = objects.iter_mut().find(|o| &o.obj == moref) {
            object.props.retain(|(prop, _)| prop != name);
            object.props.push((name.to_string(), value));
        }
    }

    /// 前 `retrievals` 次采集中不出现该名称的实体
    pub fn hide_for(&self, name: &str, retrievals: usize) {
        self.hidden.lock().unwrap().insert(name.to_string(), retrievals);
    }

    pub fn respond(&self, method: &str, value: VimValue) {
        self.responses
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(value);
    }

    pub fn script_task(&self, task_id: &str, states: &[TaskState]) {
        self.task_states
            .lock()
            .unwrap()
            .insert(task_id.to_string(), states.iter().copied().collect());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == method)
            .collect()
    }

    pub fn retrievals(&self) -> usize {
        self.retrievals.load(Ordering::SeqCst)
    }

    pub fn logins(&self) -> Vec<String> {
        self.logins.lock().unwrap().clone()
    }

    /// 尚未销毁的列表视图数
    pub fn open_views(&self) -> usize {
        self.list_views.lock().unwrap().len()
    }

    /// 列表视图方法，只接受已存在的对象
    fn list_view_call(&self, target: &ManagedObjectRef, method: &str, args: &Value) -> Option<VimValue> {
        match method {
            "CreateListView" => {
                let n = self.view_counter.fetch_add(1, Ordering::SeqCst) + 1;
                let view = ManagedObjectRef::new("ListView", format!("session[fake]list-{}", n));
                self.list_views.lock().unwrap().insert(view.value.clone(), Vec::new());
                Some(view.into())
            }
            "ModifyListView" => {
                let objects = self.objects.lock().unwrap();
                let mut views = self.list_views.lock().unwrap();
                let members = views.get_mut(target.id())?;
                let mut unresolved = Vec::new();

                for item in args["add"].as_array().into_iter().flatten() {
                    let value = VimValue::from_json(item);
                    let Some(moref) = value.as_moref().cloned() else {
                        continue;
                    };
                    if objects.iter().any(|o| o.obj == moref) {
                        members.push(moref);
                    } else {
                        unresolved.push(moref.into());
                    }
                }
                Some(VimValue::Array(unresolved))
            }
            "DestroyView" => {
                self.list_views.lock().unwrap().remove(target.id());
                Some(VimValue::Null)
            }
            _ => None,
        }
    }
}

#[async_trait]
impl VimEndpoint for FakeEndpoint {
    async fn service_content(&self) -> vsa_vim::Result<ServiceContent> {
        Ok(service_content())
    }

    async fn login(&self, _session_manager: &ManagedObjectRef, user: &str, passwd: &str) -> vsa_vim::Result<()> {
        if passwd != "secret" {
            return Err(VimError::AuthError("InvalidLogin".to_string()));
        }
        self.logins.lock().unwrap().push(user.to_string());
        Ok(())
    }

    async fn logout(&self, _session_manager: &ManagedObjectRef) -> vsa_vim::Result<()> {
        Ok(())
    }

    async fn invoke(&self, target: &ManagedObjectRef, method: &str, args: Value) -> vsa_vim::Result<VimValue> {
        self.calls.lock().unwrap().push(Call {
            target: target.clone(),
            method: method.to_string(),
            args: args.clone(),
        });

        if let Some(value) = self
            .responses
            .lock()
            .unwrap()
            .get_mut(method)
            .and_then(next_of)
        {
            return Ok(value);
        }

        if let Some(value) = self.list_view_call(target, method, &args) {
            return Ok(value);
        }

        if method.ends_with("_Task") {
            let n = self.task_counter.fetch_add(1, Ordering::SeqCst) + 1;
            return Ok(ManagedObjectRef::new("Task", format!("task-{}", n)).into());
        }

        Ok(VimValue::Null)
    }

    async fn read_property(&self, target: &ManagedObjectRef, property: &str) -> vsa_vim::Result<VimValue> {
        if target.type_name == "Task" && property == "info" {
            let state = self
                .task_states
                .lock()
                .unwrap()
                .get_mut(target.id())
                .and_then(next_of)
                .unwrap_or(TaskState::Success);

            return Ok(DataObject::new("TaskInfo")
                .with_field("key", VimValue::String(target.id().to_string()))
                .with_field("state", VimValue::String(state.as_str().to_string()))
                .into());
        }

        let objects = self.objects.lock().unwrap();
        let object = objects
            .iter()
            .find(|o| &o.obj == target)
            .ok_or_else(|| VimError::NotFound(format!("{} 不存在", target)))?;

        Ok(object.get(property).cloned().unwrap_or(VimValue::Null))
    }

    async fn retrieve(&self, _content: &ServiceContent, query: &PropertyQuery) -> vsa_vim::Result<Vec<ObjectContent>> {
        let round = self.retrievals.fetch_add(1, Ordering::SeqCst) + 1;
        let hidden = self.hidden.lock().unwrap().clone();
        let objects = self.objects.lock().unwrap();

        // 显式对象引用中有一个不存在，整个采集失败
        if let Some(ids) = &query.ids {
            if let Some(missing) = ids
                .iter()
                .find(|id| !objects.iter().any(|o| o.obj.type_name == query.type_name && o.obj.id() == id.as_str()))
            {
                return Err(VimError::NotFound(format!(
                    "ManagedObjectNotFound: '{}:{}'",
                    query.type_name, missing
                )));
            }
        }

        let listed = match &query.view {
            Some(view) => Some(
                self.list_views
                    .lock()
                    .unwrap()
                    .get(view.id())
                    .cloned()
                    .ok_or_else(|| VimError::NotFound(format!("ManagedObjectNotFound: {}", view)))?,
            ),
            None => None,
        };

        Ok(objects
            .iter()
            .filter(|o| o.obj.type_name == query.type_name)
            .filter(|o| match &query.ids {
                Some(ids) => ids.iter().any(|id| id == o.obj.id()),
                None => true,
            })
            .filter(|o| match &listed {
                Some(members) => members.contains(&o.obj),
                None => true,
            })
            .filter(|o| match o.name().and_then(|n| hidden.get(n)) {
                Some(until) => round > *until,
                None => true,
            })
            .map(|o| {
                let props = o
                    .props
                    .iter()
                    .filter(|(name, _)| query.all || query.path_set.iter().any(|p| p == name))
                    .cloned()
                    .collect();
                ObjectContent {
                    obj: o.obj.clone(),
                    props,
                }
            })
            .collect())
    }
}
