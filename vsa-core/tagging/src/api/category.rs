//! 分类管理 API

use serde_json::Value;
use tracing::{debug, info};

use crate::client::TaggingClient;
use crate::error::Result;
use crate::models::{Category, CategorySpec};

const CATEGORY_PATH: &str = "/rest/com/vmware/cis/tagging/category";

/// 分类管理 API
pub struct CategoryApi<'a> {
    client: &'a TaggingClient,
}

impl<'a> CategoryApi<'a> {
    pub(crate) fn new(client: &'a TaggingClient) -> Self {
        Self { client }
    }

    /// 所有分类 id
    pub async fn list(&self) -> Result<Vec<String>> {
        debug!("获取分类列表");
        let value = self.client.get_value(CATEGORY_PATH, &[]).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn get(&self, category_id: &str) -> Result<Category> {
        let value = self
            .client
            .get_value(&format!("{}/id:{}", CATEGORY_PATH, category_id), &[])
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn delete(&self, category_id: &str) -> Result<Option<Value>> {
        info!("删除分类: {}", category_id);
        self.client
            .delete(&format!("{}/id:{}", CATEGORY_PATH, category_id))
            .await
    }

    /// 按名称查找分类，没有匹配时返回 `None`
    ///
    /// 逐个读取分类详情，第一个名称完全相同的分类胜出。
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Category>> {
        let ids = self.list().await?;
        for id in ids {
            let category = self.get(&id).await?;
            if category.name == name {
                return Ok(Some(category));
            }
        }
        Ok(None)
    }

    /// 创建分类，返回新分类的 id
    pub async fn create(&self, spec: &CategorySpec) -> Result<String> {
        info!("创建分类: {}", spec.name);
        let value = self
            .client
            .post_value(CATEGORY_PATH, Some(spec.to_payload()))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// 按名称查找，不存在则创建后重新读取
    ///
    /// 远端没有原子的 upsert，并发调用可能创建同名分类。
    pub async fn get_or_create(&self, spec: &CategorySpec) -> Result<Category> {
        if let Some(category) = self.find_by_name(&spec.name).await? {
            debug!("分类已存在: {} ({})", category.name, category.id);
            return Ok(category);
        }

        let id = self.create(spec).await?;
        self.get(&id).await
    }
}
