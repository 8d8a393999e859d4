//! 连接管理器

use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{ResolvedProfile, Result, TransportError, VsphereConfig};

/// 连接管理器
///
/// 持有已校验的配置，负责 profile 解析与 HTTP 客户端构建。
/// 具体的会话（VI/JSON 或 REST）由上层 crate 基于此建立。
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    config: Arc<VsphereConfig>,
}

impl ConnectionManager {
    /// 创建连接管理器
    pub fn new(config: VsphereConfig) -> Result<Self> {
        config.validate()?;

        if !config.verify_tls() {
            warn!("已关闭 TLS 证书校验 (ssl_verify = false)，由本配置创建的所有客户端都不会校验证书");
        }

        Ok(Self {
            config: Arc::new(config),
        })
    }

    /// 获取配置
    pub fn config(&self) -> &VsphereConfig {
        &self.config
    }

    /// 解析命名连接
    pub fn profile(&self, name: Option<&str>) -> Result<ResolvedProfile> {
        self.config.profile(name)
    }

    /// 为指定连接构建 HTTP 客户端
    ///
    /// 客户端启用 cookie 存储，REST 会话的 cookie 由此透明保存。
    pub fn http_client(&self, profile: &ResolvedProfile) -> Result<Client> {
        debug!(
            "构建 HTTP 客户端: {} (verify_tls = {})",
            profile.name, profile.verify_tls
        );

        let mut builder = Client::builder()
            .cookie_store(true)
            .danger_accept_invalid_certs(!profile.verify_tls);

        if let Some(timeout) = self.config.http.connect_timeout() {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = self.config.http.request_timeout() {
            builder = builder.timeout(timeout);
        }

        builder
            .build()
            .map_err(|e| TransportError::HttpClientError(e.to_string()))
    }
}
