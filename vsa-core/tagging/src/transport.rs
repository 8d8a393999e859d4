//! REST 传输层
//!
//! `RestTransport` 是标签 API 与 HTTP 之间的接缝。`RestClient` 用 reqwest 实现它，
//! 会话通过 `vmware-api-session-id` 头和 cookie 两种方式保持。

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Method, Response, StatusCode};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use vsa_transport::{ConnectionManager, ResolvedProfile};

use crate::error::{Result, TaggingError};

/// 会话登录端点
pub const SESSION_PATH: &str = "/rest/com/vmware/cis/session";

/// 会话头
pub const SESSION_HEADER: &str = "vmware-api-session-id";

const HEADER_AUTHN: &str = "vmware-use-header-authn";

/// REST 调用接口
///
/// `post` / `delete` 在响应体为空时返回 `None`。
#[async_trait]
pub trait RestTransport: Send + Sync {
    async fn get(&self, endpoint: &str, params: &[(String, String)]) -> Result<Value>;

    async fn post(&self, endpoint: &str, payload: Option<Value>) -> Result<Option<Value>>;

    async fn delete(&self, endpoint: &str) -> Result<Option<Value>>;

    /// 注销会话
    async fn logout(&self) -> Result<()> {
        self.delete(SESSION_PATH).await.map(|_| ())
    }
}

/// reqwest 实现的 REST 客户端
pub struct RestClient {
    /// API 基础 URL
    base_url: String,

    /// HTTP 客户端
    http_client: Client,

    /// 会话 id
    session_id: Arc<RwLock<Option<String>>>,
}

impl RestClient {
    pub fn new(base_url: &str, http_client: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
            session_id: Arc::new(RwLock::new(None)),
        }
    }

    /// 按命名连接创建客户端并登录
    pub async fn connect(manager: &ConnectionManager, profile: &ResolvedProfile) -> Result<Self> {
        let http_client = manager.http_client(profile)?;
        let client = Self::new(&profile.rest_base_url(), http_client);
        client.login(&profile.user, &profile.passwd).await?;
        Ok(client)
    }

    pub fn make_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// 认证登录
    ///
    /// 部分版本登录成功后返回空响应体，此时会话只保存在 cookie 中。
    pub async fn login(&self, user: &str, passwd: &str) -> Result<()> {
        info!("REST 登录: {}@{}", user, self.base_url);

        let response = self
            .http_client
            .post(self.make_url(SESSION_PATH))
            .header(HEADER_AUTHN, "true")
            .basic_auth(user, Some(passwd))
            .send()
            .await?;

        let response = Self::check_status(response).await.map_err(|e| match e {
            TaggingError::ApiError(code, body) if code == 401 => TaggingError::AuthError(body),
            other => other,
        })?;

        let session_id = match Self::parse_response(response).await? {
            Some(value) => value
                .get("value")
                .and_then(Value::as_str)
                .map(str::to_string),
            None => None,
        };

        if session_id.is_none() {
            debug!("登录响应中没有会话 id，依赖 cookie 保持会话");
        }
        *self.session_id.write().await = session_id;

        info!("REST 登录成功");
        Ok(())
    }

    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        params: &[(String, String)],
        payload: Option<Value>,
    ) -> Result<Option<Value>> {
        let url = self.make_url(endpoint);
        debug!("REST 请求: {} {}", method, url);

        let mut request = self.http_client.request(method, &url);

        if let Some(session_id) = self.session_id.read().await.as_ref() {
            request = request.header(SESSION_HEADER, session_id);
        }

        if !params.is_empty() {
            request = request.query(params);
        }

        if let Some(payload) = payload {
            request = request.json(&payload);
        }

        let response = Self::check_status(request.send().await?).await?;
        Self::parse_response(response).await
    }

    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let code = status.as_u16();
        let body = response.text().await.unwrap_or_default();
        warn!("REST 请求失败: [{}] {}", code, body);

        match status {
            StatusCode::FORBIDDEN => Err(TaggingError::AuthError(format!("权限不足: {}", body))),
            StatusCode::NOT_FOUND => Err(TaggingError::NotFound(body)),
            _ => Err(TaggingError::ApiError(code, body)),
        }
    }

    async fn parse_response(response: Response) -> Result<Option<Value>> {
        let text = response
            .text()
            .await
            .map_err(|e| TaggingError::ParseError(format!("读取响应失败: {}", e)))?;

        if text.trim().is_empty() {
            return Ok(None);
        }

        Ok(Some(serde_json::from_str(&text)?))
    }
}

#[async_trait]
impl RestTransport for RestClient {
    async fn get(&self, endpoint: &str, params: &[(String, String)]) -> Result<Value> {
        self.request(Method::GET, endpoint, params, None)
            .await?
            .ok_or_else(|| TaggingError::ParseError(format!("GET {} 响应为空", endpoint)))
    }

    async fn post(&self, endpoint: &str, payload: Option<Value>) -> Result<Option<Value>> {
        self.request(Method::POST, endpoint, &[], payload).await
    }

    async fn delete(&self, endpoint: &str) -> Result<Option<Value>> {
        self.request(Method::DELETE, endpoint, &[], None).await
    }

    async fn logout(&self) -> Result<()> {
        info!("REST 登出: {}", self.base_url);
        let result = self.delete(SESSION_PATH).await;
        *self.session_id.write().await = None;
        result.map(|_| ())
    }
}

/// 取出响应中的 `value` 字段
pub(crate) fn value_of(response: Option<Value>, endpoint: &str) -> Result<Value> {
    match response {
        Some(Value::Object(mut map)) => map
            .remove("value")
            .ok_or_else(|| TaggingError::ParseError(format!("{} 响应缺少 value 字段", endpoint))),
        _ => Err(TaggingError::ParseError(format!("{} 响应格式错误", endpoint))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_make_url() {
        let client = RestClient::new("https://vc.local/", Client::new());
        assert_eq!(
            client.make_url(SESSION_PATH),
            "https://vc.local/rest/com/vmware/cis/session"
        );
    }

    #[test]
    fn test_value_of() {
        let value = value_of(Some(json!({"value": ["a", "b"]})), "/x").unwrap();
        assert_eq!(value, json!(["a", "b"]));

        assert!(matches!(
            value_of(Some(json!({"other": 1})), "/x"),
            Err(TaggingError::ParseError(_))
        ));
        assert!(matches!(value_of(None, "/x"), Err(TaggingError::ParseError(_))));
    }
}
