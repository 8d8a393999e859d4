//! 测试用内存 vCenter REST 服务

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use vsa_tagging::*;

const CATEGORY: &str = "/rest/com/vmware/cis/tagging/category";
const TAG: &str = "/rest/com/vmware/cis/tagging/tag";
const ASSOCIATION: &str = "/rest/com/vmware/cis/tagging/tag-association";

/// 记录的请求
#[derive(Debug, Clone)]
pub struct Request {
    pub method: &'static str,
    pub endpoint: String,
    pub params: Vec<(String, String)>,
    pub payload: Option<Value>,
}

struct InventoryEntry {
    kind: InventoryType,
    item: Value,
    /// (filter 名, 容器 id)
    parents: Vec<(String, String)>,
}

#[derive(Default)]
struct State {
    categories: Vec<Category>,
    tags: Vec<Tag>,
    attachments: Vec<(String, ObjectId)>,
    inventory: Vec<InventoryEntry>,
    requests: Vec<Request>,
    next_id: usize,
    fail_attach_for: Option<String>,
}

#[derive(Default)]
pub struct FakeVcenter {
    state: Mutex<State>,
}

impl FakeVcenter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn client(self: &Arc<Self>) -> TaggingClient {
        TaggingClient::new(self.clone())
    }

    pub fn add_category(&self, name: &str, cardinality: Cardinality) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("urn:vmomi:InventoryServiceCategory:c{}:GLOBAL", state.next_id);
        state.categories.push(Category {
            id: id.clone(),
            name: name.to_string(),
            description: String::new(),
            cardinality,
            associable_types: vec![],
            used_by: vec![],
        });
        id
    }

    pub fn add_tag(&self, name: &str, category_id: &str) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("urn:vmomi:InventoryServiceTag:t{}:GLOBAL", state.next_id);
        state.tags.push(Tag {
            id: id.clone(),
            name: name.to_string(),
            description: String::new(),
            category_id: category_id.to_string(),
            used_by: vec![],
        });
        id
    }

    pub fn attach(&self, tag_id: &str, object: ObjectId) {
        self.state
            .lock()
            .unwrap()
            .attachments
            .push((tag_id.to_string(), object));
    }

    /// 添加清单对象，`parents` 为 (容器类型, 容器 id)
    pub fn add_object(&self, kind: InventoryType, id: &str, name: &str, parents: &[(InventoryType, &str)]) {
        let mut item = json!({"name": name});
        item[kind.id_field()] = json!(id);

        self.state.lock().unwrap().inventory.push(InventoryEntry {
            kind,
            item,
            parents: parents
                .iter()
                .map(|(k, id)| (k.filter_name().to_string(), id.to_string()))
                .collect(),
        });
    }

    /// 对该对象的关联请求返回 500
    pub fn fail_attach_for(&self, object_id: &str) {
        self.state.lock().unwrap().fail_attach_for = Some(object_id.to_string());
    }

    pub fn requests(&self) -> Vec<Request> {
        self.state.lock().unwrap().requests.clone()
    }

    /// 指定 `~action` 的 POST 请求
    pub fn actions(&self, action: &str) -> Vec<Request> {
        let suffix = format!("?~action={}", action);
        self.requests()
            .into_iter()
            .filter(|r| r.method == "POST" && r.endpoint.ends_with(&suffix))
            .collect()
    }

    /// 创建资源的 POST 请求
    pub fn creates(&self, path: &str) -> Vec<Request> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == "POST" && r.endpoint == path)
            .collect()
    }

    pub fn categories(&self) -> Vec<Category> {
        self.state.lock().unwrap().categories.clone()
    }

    pub fn tags(&self) -> Vec<Tag> {
        self.state.lock().unwrap().tags.clone()
    }

    pub fn attached(&self, object: &ObjectId) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .attachments
            .iter()
            .filter(|(_, o)| o == object)
            .map(|(t, _)| t.clone())
            .collect()
    }

    fn record(&self, method: &'static str, endpoint: &str, params: &[(String, String)], payload: Option<Value>) {
        self.state.lock().unwrap().requests.push(Request {
            method,
            endpoint: endpoint.to_string(),
            params: params.to_vec(),
            payload,
        });
    }
}

fn wrap(value: Value) -> Value {
    json!({ "value": value })
}

fn not_found(endpoint: &str) -> TaggingError {
    TaggingError::NotFound(format!("{} not found", endpoint))
}

/// 拆分 `<path>/id:<id>?~action=<action>`
fn split(endpoint: &str) -> (&str, Option<&str>, Option<&str>) {
    let (path, action) = match endpoint.split_once("?~action=") {
        Some((path, action)) => (path, Some(action)),
        None => (endpoint, None),
    };
    match path.split_once("/id:") {
        Some((base, id)) => (base, Some(id), action),
        None => (path, None, action),
    }
}

fn object_of(payload: &Option<Value>) -> ObjectId {
    serde_json::from_value(payload.as_ref().unwrap()["object_id"].clone()).unwrap()
}

#[async_trait]
impl RestTransport for FakeVcenter {
    async fn get(&self, endpoint: &str, params: &[(String, String)]) -> vsa_tagging::Result<Value> {
        self.record("GET", endpoint, params, None);
        let state = self.state.lock().unwrap();

        if let Some(kind) = InventoryType::ALL.iter().find(|k| k.endpoint() == endpoint) {
            let items: Vec<Value> = state
                .inventory
                .iter()
                .filter(|e| e.kind == *kind)
                .filter(|e| {
                    params.iter().all(|(key, value)| {
                        let filter = key.split('.').nth(1).unwrap_or_default();
                        if filter == "names" {
                            e.item["name"].as_str() == Some(value.as_str())
                        } else {
                            e.parents.iter().any(|(f, id)| f == filter && id == value)
                        }
                    })
                })
                .map(|e| e.item.clone())
                .collect();
            return Ok(wrap(json!(items)));
        }

        match split(endpoint) {
            (CATEGORY, None, None) => {
                let ids: Vec<_> = state.categories.iter().map(|c| c.id.clone()).collect();
                Ok(wrap(json!(ids)))
            }
            (CATEGORY, Some(id), None) => state
                .categories
                .iter()
                .find(|c| c.id == id)
                .map(|c| wrap(serde_json::to_value(c).unwrap()))
                .ok_or_else(|| not_found(endpoint)),
            (TAG, None, None) => {
                let ids: Vec<_> = state.tags.iter().map(|t| t.id.clone()).collect();
                Ok(wrap(json!(ids)))
            }
            (TAG, Some(id), None) => state
                .tags
                .iter()
                .find(|t| t.id == id)
                .map(|t| wrap(serde_json::to_value(t).unwrap()))
                .ok_or_else(|| not_found(endpoint)),
            _ => Err(not_found(endpoint)),
        }
    }

    async fn post(&self, endpoint: &str, payload: Option<Value>) -> vsa_tagging::Result<Option<Value>> {
        self.record("POST", endpoint, &[], payload.clone());

        match split(endpoint) {
            (CATEGORY, None, None) => {
                let spec = &payload.as_ref().unwrap()["create_spec"];
                let id = self.add_category(
                    spec["name"].as_str().unwrap(),
                    serde_json::from_value(spec["cardinality"].clone()).unwrap(),
                );
                Ok(Some(wrap(json!(id))))
            }
            (TAG, None, None) => {
                let spec = &payload.as_ref().unwrap()["create_spec"];
                let id = self.add_tag(
                    spec["name"].as_str().unwrap(),
                    spec["category_id"].as_str().unwrap(),
                );
                Ok(Some(wrap(json!(id))))
            }
            (TAG, Some(category_id), Some("list-tags-for-category")) => {
                let state = self.state.lock().unwrap();
                let ids: Vec<_> = state
                    .tags
                    .iter()
                    .filter(|t| t.category_id == category_id)
                    .map(|t| t.id.clone())
                    .collect();
                Ok(Some(wrap(json!(ids))))
            }
            (ASSOCIATION, Some(tag_id), Some("attach")) => {
                let object = object_of(&payload);
                let mut state = self.state.lock().unwrap();
                if state.fail_attach_for.as_deref() == Some(object.id.as_str()) {
                    return Err(TaggingError::ApiError(500, "attach failed".to_string()));
                }
                if !state.attachments.iter().any(|(t, o)| t == tag_id && *o == object) {
                    state.attachments.push((tag_id.to_string(), object));
                }
                Ok(None)
            }
            (ASSOCIATION, Some(tag_id), Some("detach")) => {
                let object = object_of(&payload);
                self.state
                    .lock()
                    .unwrap()
                    .attachments
                    .retain(|(t, o)| !(t == tag_id && *o == object));
                Ok(None)
            }
            (ASSOCIATION, None, Some("attach-multiple-tags-to-object")) => {
                let object = object_of(&payload);
                let tag_ids: Vec<String> =
                    serde_json::from_value(payload.as_ref().unwrap()["tag_ids"].clone()).unwrap();
                for tag_id in tag_ids {
                    self.attach(&tag_id, object.clone());
                }
                Ok(Some(wrap(json!([]))))
            }
            (ASSOCIATION, None, Some("list-attached-tags")) => {
                let object = object_of(&payload);
                Ok(Some(wrap(json!(self.attached(&object)))))
            }
            (ASSOCIATION, Some(tag_id), Some("list-attached-objects")) => {
                let state = self.state.lock().unwrap();
                let objects: Vec<_> = state
                    .attachments
                    .iter()
                    .filter(|(t, _)| t == tag_id)
                    .map(|(_, o)| o.clone())
                    .collect();
                Ok(Some(wrap(serde_json::to_value(objects).unwrap())))
            }
            _ => Err(not_found(endpoint)),
        }
    }

    async fn delete(&self, endpoint: &str) -> vsa_tagging::Result<Option<Value>> {
        self.record("DELETE", endpoint, &[], None);
        let mut state = self.state.lock().unwrap();

        match split(endpoint) {
            (CATEGORY, Some(id), None) => {
                state.categories.retain(|c| c.id != id);
                Ok(None)
            }
            (TAG, Some(id), None) => {
                state.tags.retain(|t| t.id != id);
                Ok(None)
            }
            _ if endpoint == SESSION_PATH => Ok(None),
            _ => Err(not_found(endpoint)),
        }
    }
}
