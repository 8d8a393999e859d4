//! 清单查询 API
//!
//! 通过 `/rest/vcenter/*` 列表接口按名称或容器查找对象。与 VIM 侧的实体解析
//! 不同，按名称查找时结果必须唯一。

use tracing::debug;

use crate::client::TaggingClient;
use crate::error::{Result, TaggingError};
use crate::models::{InventoryObject, InventoryType};

/// 清单查询 API
pub struct InventoryApi<'a> {
    client: &'a TaggingClient,
}

impl<'a> InventoryApi<'a> {
    pub(crate) fn new(client: &'a TaggingClient) -> Self {
        Self { client }
    }

    /// 按过滤参数列出对象
    pub async fn find(&self, kind: InventoryType, params: &[(String, String)]) -> Result<Vec<InventoryObject>> {
        debug!("查询清单: {} {:?}", kind.endpoint(), params);
        let value = self.client.get_value(kind.endpoint(), params).await?;

        let items: Vec<serde_json::Value> = serde_json::from_value(value)?;
        items
            .into_iter()
            .map(|item| InventoryObject::from_value(kind, item))
            .collect()
    }

    /// 按名称查找唯一对象
    ///
    /// 没有结果返回 `NotFound`，多于一个返回 `Ambiguous`。
    pub async fn find_by_name(&self, kind: InventoryType, name: &str) -> Result<InventoryObject> {
        let params = vec![("filter.names.1".to_string(), name.to_string())];
        let mut objects = self.find(kind, &params).await?;

        match objects.len() {
            0 => Err(TaggingError::NotFound(format!(
                "No {} found with name: {}",
                kind, name
            ))),
            1 => Ok(objects.remove(0)),
            n => Err(TaggingError::Ambiguous(format!(
                "{} objects of type {} found with name: {}",
                n, kind, name
            ))),
        }
    }

    /// 列出容器对象下的某类对象，例如集群中的所有虚拟机
    pub async fn find_within(
        &self,
        kind: InventoryType,
        container: &InventoryObject,
    ) -> Result<Vec<InventoryObject>> {
        let params = container.kind.filter_params(&[container.id.as_str()]);
        self.find(kind, &params).await
    }
}
