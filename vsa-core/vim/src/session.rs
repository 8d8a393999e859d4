//! VIM 会话

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use vsa_transport::{ConnectionManager, ResolvedProfile};

use crate::affinity::AffinityApi;
use crate::endpoint::{ObjectContent, PropertyQuery, ServiceContent, VimEndpoint};
use crate::error::Result;
use crate::properties::PropertiesApi;
use crate::resolver::EntityResolver;
use crate::snapshot::SnapshotApi;
use crate::task::RemoteTask;
use crate::types::ManagedObjectRef;
use crate::value::VimValue;
use crate::vijson::ViJsonClient;

/// 已认证的 VIM 会话
///
/// 由创建它的动作独占，用完后调用 [`VimSession::disconnect`]；
/// 未显式断开的会话交由平台自身的过期机制回收。
pub struct VimSession {
    endpoint: Arc<dyn VimEndpoint>,
    content: ServiceContent,
    profile_name: String,
}

impl VimSession {
    /// 按命名连接建立会话，`None` 或空字符串使用默认连接
    pub async fn connect(manager: &ConnectionManager, profile_name: Option<&str>) -> Result<Self> {
        let profile = manager.profile(profile_name)?;
        let client = ViJsonClient::from_profile(manager, &profile)?;
        Self::login(Arc::new(client), &profile).await
    }

    /// 在给定端点上读取服务内容并登录
    pub async fn login(endpoint: Arc<dyn VimEndpoint>, profile: &ResolvedProfile) -> Result<Self> {
        info!("建立 VIM 会话: {} ({}:{})", profile.name, profile.host, profile.port);

        let content = endpoint.service_content().await?;
        endpoint
            .login(&content.session_manager, &profile.user, &profile.passwd)
            .await?;

        if let Some(full_name) = content.full_name() {
            info!("已连接: {}", full_name);
        }

        Ok(Self {
            endpoint,
            content,
            profile_name: profile.name.clone(),
        })
    }

    /// 包装一个已认证的端点
    pub fn with_endpoint(endpoint: Arc<dyn VimEndpoint>, content: ServiceContent, profile_name: impl Into<String>) -> Self {
        Self {
            endpoint,
            content,
            profile_name: profile_name.into(),
        }
    }

    pub fn endpoint(&self) -> &dyn VimEndpoint {
        self.endpoint.as_ref()
    }

    /// 服务根内容
    pub fn content(&self) -> &ServiceContent {
        &self.content
    }

    pub fn root_folder(&self) -> &ManagedObjectRef {
        &self.content.root_folder
    }

    pub fn profile_name(&self) -> &str {
        &self.profile_name
    }

    /// 注销会话，失败只记录警告
    pub async fn disconnect(self) {
        if let Err(e) = self.endpoint.logout(&self.content.session_manager).await {
            warn!("注销 VIM 会话失败: {} ({})", self.profile_name, e);
        } else {
            info!("VIM 会话已注销: {}", self.profile_name);
        }
    }

    pub async fn invoke(&self, target: &ManagedObjectRef, method: &str, args: Value) -> Result<VimValue> {
        self.endpoint.invoke(target, method, args).await
    }

    pub async fn read_property(&self, target: &ManagedObjectRef, property: &str) -> Result<VimValue> {
        self.endpoint.read_property(target, property).await
    }

    pub async fn retrieve(&self, query: &PropertyQuery) -> Result<Vec<ObjectContent>> {
        self.endpoint.retrieve(&self.content, query).await
    }

    /// 实体解析 API
    pub fn resolver(&self) -> EntityResolver<'_> {
        EntityResolver::new(self)
    }

    /// 快照 API
    pub fn snapshots(&self) -> SnapshotApi<'_> {
        SnapshotApi::new(self)
    }

    /// 亲和性规则 API
    pub fn affinity(&self) -> AffinityApi<'_> {
        AffinityApi::new(self)
    }

    /// 属性采集 API
    pub fn properties(&self) -> PropertiesApi<'_> {
        PropertiesApi::new(self)
    }

    /// 远端任务句柄
    pub fn task(&self, task: ManagedObjectRef) -> RemoteTask<'_> {
        RemoteTask::new(self, task)
    }
}
