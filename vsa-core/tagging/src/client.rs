//! 标签客户端

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use vsa_transport::ConnectionManager;

use crate::api::{AssociationApi, BulkApi, CategoryApi, InventoryApi, LookupApi, TagApi};
use crate::error::Result;
use crate::transport::{value_of, RestClient, RestTransport};

/// 标签 REST 客户端
///
/// 登录后的传输层由调用方显式持有并传入各个 API，不挂在其他会话对象上。
#[derive(Clone)]
pub struct TaggingClient {
    transport: Arc<dyn RestTransport>,
}

impl TaggingClient {
    pub fn new(transport: Arc<dyn RestTransport>) -> Self {
        Self { transport }
    }

    /// 按命名连接登录 REST 接口
    pub async fn connect(manager: &ConnectionManager, profile: Option<&str>) -> Result<Self> {
        let profile = manager.profile(profile)?;
        info!("连接标签服务: {} ({})", profile.name, profile.host);

        let client = RestClient::connect(manager, &profile).await?;
        Ok(Self::new(Arc::new(client)))
    }

    pub fn transport(&self) -> &dyn RestTransport {
        self.transport.as_ref()
    }

    /// 注销 REST 会话
    pub async fn logout(&self) -> Result<()> {
        if let Err(e) = self.transport.logout().await {
            warn!("REST 登出失败: {}", e);
            return Err(e);
        }
        Ok(())
    }

    /// 获取分类 API
    pub fn category(&self) -> CategoryApi<'_> {
        CategoryApi::new(self)
    }

    /// 获取标签 API
    pub fn tag(&self) -> TagApi<'_> {
        TagApi::new(self)
    }

    /// 获取标签关联 API
    pub fn association(&self) -> AssociationApi<'_> {
        AssociationApi::new(self)
    }

    /// 获取清单查询 API
    pub fn inventory(&self) -> InventoryApi<'_> {
        InventoryApi::new(self)
    }

    /// 获取批量关联 API
    pub fn bulk(&self) -> BulkApi<'_> {
        BulkApi::new(self)
    }

    /// 获取标签值查询 API
    pub fn lookup(&self) -> LookupApi<'_> {
        LookupApi::new(self)
    }

    pub(crate) async fn get_value(&self, endpoint: &str, params: &[(String, String)]) -> Result<Value> {
        let response = self.transport.get(endpoint, params).await?;
        value_of(Some(response), endpoint)
    }

    pub(crate) async fn post_value(&self, endpoint: &str, payload: Option<Value>) -> Result<Value> {
        let response = self.transport.post(endpoint, payload).await?;
        value_of(response, endpoint)
    }

    pub(crate) async fn post(&self, endpoint: &str, payload: Option<Value>) -> Result<Option<Value>> {
        self.transport.post(endpoint, payload).await
    }

    pub(crate) async fn delete(&self, endpoint: &str) -> Result<Option<Value>> {
        self.transport.delete(endpoint).await
    }
}
