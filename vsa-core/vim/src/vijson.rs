//! VI/JSON 端点实现
//!
//! 基础地址 `https://<host>:<port>/sdk/vim25/<release>`，托管对象方法映射为
//! `POST /<type>/<moid>/<method>`，属性读取映射为 `GET /<type>/<moid>/<property>`。

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Method, Response, StatusCode};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use vsa_transport::{ConnectionManager, ResolvedProfile};

use crate::endpoint::{ObjectContent, PropertyQuery, ServiceContent, VimEndpoint};
use crate::error::{Result, VimError};
use crate::types::ManagedObjectRef;
use crate::value::VimValue;

/// 会话头
pub const SESSION_HEADER: &str = "vmware-api-session-id";

const SERVICE_CONTENT_PATH: &str = "/ServiceInstance/ServiceInstance/content";

/// VI/JSON 客户端
pub struct ViJsonClient {
    /// API 基础 URL
    base_url: String,

    /// HTTP 客户端
    http_client: Client,

    /// 会话 id
    session_id: Arc<RwLock<Option<String>>>,
}

impl ViJsonClient {
    pub fn new(base_url: &str, http_client: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
            session_id: Arc::new(RwLock::new(None)),
        }
    }

    /// 按连接配置创建客户端（未登录）
    pub fn from_profile(manager: &ConnectionManager, profile: &ResolvedProfile) -> Result<Self> {
        let http_client = manager.http_client(profile)?;
        Ok(Self::new(&profile.vim_base_url(), http_client))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn object_path(target: &ManagedObjectRef, member: &str) -> String {
        format!("/{}/{}/{}", target.type_name, target.value, member)
    }

    /// 发送请求，空响应体返回 `None`
    async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Option<Value>> {
        let url = format!("{}{}", self.base_url, path);
        debug!("VI/JSON 请求: {} {}", method, url);

        let mut request = self.http_client.request(method.clone(), &url);

        if let Some(session_id) = self.session_id.read().await.as_ref() {
            request = request.header(SESSION_HEADER, session_id);
        }

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let response = Self::check_status(response).await?;

        let text = response
            .text()
            .await
            .map_err(|e| VimError::ParseError(format!("读取响应失败: {}", e)))?;

        if text.trim().is_empty() {
            debug!("VI/JSON 空响应: {} {}", method, url);
            return Ok(None);
        }

        let value = serde_json::from_str(&text)?;
        Ok(Some(value))
    }

    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let code = status.as_u16();
        let body = response.text().await.unwrap_or_default();
        warn!("VI/JSON 请求失败: [{}] {}", code, body);

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(VimError::AuthError(format!("会话无效或权限不足: {}", body)))
            }
            StatusCode::NOT_FOUND => Err(VimError::NotFound(body)),
            _ if body.contains("ManagedObjectNotFound") => Err(VimError::NotFound(body)),
            _ => Err(VimError::ApiError(code, body)),
        }
    }

    /// 调用并把结果解析为远端值
    async fn call(&self, target: &ManagedObjectRef, method: &str, args: Option<&Value>) -> Result<VimValue> {
        let path = Self::object_path(target, method);
        let value = self.request(Method::POST, &path, args).await?;
        Ok(value.as_ref().map(VimValue::from_json).unwrap_or(VimValue::Null))
    }

    async fn retrieve_with_specs(&self, collector: &ManagedObjectRef, spec: Value) -> Result<Vec<ObjectContent>> {
        let mut objects = Vec::new();

        let mut result = self
            .call(
                collector,
                "RetrievePropertiesEx",
                Some(&json!({
                    "specSet": [spec],
                    "options": {"_typeName": "RetrieveOptions"},
                })),
            )
            .await?;

        loop {
            objects.extend(result.get("objects").map(parse_objects).unwrap_or_default());

            let token = match result.get("token").and_then(VimValue::as_str) {
                Some(token) => token.to_string(),
                None => break,
            };

            debug!("继续采集属性, token={}", token);
            result = self
                .call(
                    collector,
                    "ContinueRetrievePropertiesEx",
                    Some(&json!({"token": token})),
                )
                .await?;
        }

        Ok(objects)
    }
}

#[async_trait]
impl VimEndpoint for ViJsonClient {
    async fn service_content(&self) -> Result<ServiceContent> {
        let value = self
            .request(Method::GET, SERVICE_CONTENT_PATH, None)
            .await?
            .ok_or_else(|| VimError::ParseError("ServiceContent 响应为空".to_string()))?;

        ServiceContent::from_value(&VimValue::from_json(&value))
    }

    async fn login(&self, session_manager: &ManagedObjectRef, user: &str, passwd: &str) -> Result<()> {
        info!("VI/JSON 登录: {}@{}", user, self.base_url);

        let url = format!("{}{}", self.base_url, Self::object_path(session_manager, "Login"));
        let response = self
            .http_client
            .post(&url)
            .json(&json!({"userName": user, "password": passwd}))
            .send()
            .await?;

        let response = Self::check_status(response).await.map_err(|e| match e {
            VimError::ApiError(_, body) if body.contains("InvalidLogin") => {
                VimError::AuthError(format!("登录失败: {}", body))
            }
            other => other,
        })?;

        let session_id = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| VimError::AuthError("响应中没有会话 id".to_string()))?;

        *self.session_id.write().await = Some(session_id);

        info!("VI/JSON 登录成功");
        Ok(())
    }

    async fn logout(&self, session_manager: &ManagedObjectRef) -> Result<()> {
        info!("VI/JSON 登出");
        let path = Self::object_path(session_manager, "Logout");
        let result = self.request(Method::POST, &path, None).await;
        *self.session_id.write().await = None;
        result.map(|_| ())
    }

    async fn invoke(&self, target: &ManagedObjectRef, method: &str, args: Value) -> Result<VimValue> {
        let body = if args.is_null() { None } else { Some(&args) };
        self.call(target, method, body).await
    }

    async fn read_property(&self, target: &ManagedObjectRef, property: &str) -> Result<VimValue> {
        let path = Self::object_path(target, property);
        let value = self.request(Method::GET, &path, None).await?;
        Ok(value.as_ref().map(VimValue::from_json).unwrap_or(VimValue::Null))
    }

    async fn retrieve(&self, content: &ServiceContent, query: &PropertyQuery) -> Result<Vec<ObjectContent>> {
        let prop_set = json!([{
            "_typeName": "PropertySpec",
            "type": query.type_name,
            "all": query.all,
            "pathSet": query.path_set,
        }]);

        // 指定 id 时直接构造对象引用，不遍历清单
        if let Some(ids) = &query.ids {
            let object_set: Vec<Value> = ids
                .iter()
                .map(|id| {
                    json!({
                        "_typeName": "ObjectSpec",
                        "obj": ManagedObjectRef::new(query.type_name.as_str(), id.as_str()).to_wire(),
                        "skip": false,
                    })
                })
                .collect();

            let spec = json!({
                "_typeName": "PropertyFilterSpec",
                "objectSet": object_set,
                "propSet": prop_set,
            });
            return self.retrieve_with_specs(&content.property_collector, spec).await;
        }

        if let Some(view) = &query.view {
            let spec = view_filter_spec(view, prop_set);
            return self.retrieve_with_specs(&content.property_collector, spec).await;
        }

        let view = self
            .call(
                &content.view_manager,
                "CreateContainerView",
                Some(&json!({
                    "container": content.root_folder.to_wire(),
                    "type": [query.type_name],
                    "recursive": true,
                })),
            )
            .await?
            .as_moref()
            .cloned()
            .ok_or_else(|| VimError::ParseError("CreateContainerView 未返回视图引用".to_string()))?;

        let spec = view_filter_spec(&view, prop_set);
        let result = self.retrieve_with_specs(&content.property_collector, spec).await;

        if let Err(e) = self.call(&view, "DestroyView", None).await {
            warn!("销毁容器视图失败: {} ({})", view, e);
        }

        result
    }
}

/// 从视图出发遍历其 `view` 属性的过滤规格
fn view_filter_spec(view: &ManagedObjectRef, prop_set: Value) -> Value {
    json!({
        "_typeName": "PropertyFilterSpec",
        "objectSet": [{
            "_typeName": "ObjectSpec",
            "obj": view.to_wire(),
            "skip": true,
            "selectSet": [{
                "_typeName": "TraversalSpec",
                "name": "traverseEntities",
                "type": view.type_name,
                "path": "view",
                "skip": false,
            }],
        }],
        "propSet": prop_set,
    })
}

/// 解析 `ObjectContent[]`
fn parse_objects(value: &VimValue) -> Vec<ObjectContent> {
    value
        .as_array()
        .iter()
        .filter_map(|item| {
            let obj = item.get("obj").and_then(VimValue::as_moref)?.clone();
            let props = item
                .get("propSet")
                .map(VimValue::as_array)
                .unwrap_or_default()
                .iter()
                .filter_map(|prop| {
                    let name = prop.get("name").and_then(VimValue::as_str)?;
                    let val = prop.get("val").cloned().unwrap_or(VimValue::Null);
                    Some((name.to_string(), val))
                })
                .collect();
            Some(ObjectContent { obj, props })
        })
        .collect()
}
