//! 标签管理 API

use serde_json::Value;
use tracing::{debug, info};

use crate::client::TaggingClient;
use crate::error::Result;
use crate::models::{Tag, TagSpec};

const TAG_PATH: &str = "/rest/com/vmware/cis/tagging/tag";

/// 标签管理 API
pub struct TagApi<'a> {
    client: &'a TaggingClient,
}

impl<'a> TagApi<'a> {
    pub(crate) fn new(client: &'a TaggingClient) -> Self {
        Self { client }
    }

    /// 标签 id 列表
    ///
    /// 指定分类时只返回该分类下的标签。
    pub async fn list(&self, category_id: Option<&str>) -> Result<Vec<String>> {
        let value = match category_id.filter(|id| !id.is_empty()) {
            Some(category_id) => {
                debug!("获取分类 {} 下的标签", category_id);
                self.client
                    .post_value(
                        &format!("{}/id:{}?~action=list-tags-for-category", TAG_PATH, category_id),
                        None,
                    )
                    .await?
            }
            None => {
                debug!("获取所有标签");
                self.client.get_value(TAG_PATH, &[]).await?
            }
        };
        Ok(serde_json::from_value(value)?)
    }

    pub async fn get(&self, tag_id: &str) -> Result<Tag> {
        let value = self
            .client
            .get_value(&format!("{}/id:{}", TAG_PATH, tag_id), &[])
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn delete(&self, tag_id: &str) -> Result<Option<Value>> {
        info!("删除标签: {}", tag_id);
        self.client.delete(&format!("{}/id:{}", TAG_PATH, tag_id)).await
    }

    /// 按名称查找标签，没有匹配时返回 `None`
    ///
    /// 未指定分类时在所有分类中查找，返回第一个同名标签。
    pub async fn find_by_name(&self, name: &str, category_id: Option<&str>) -> Result<Option<Tag>> {
        let ids = self.list(category_id).await?;
        for id in ids {
            let tag = self.get(&id).await?;
            if tag.name == name {
                return Ok(Some(tag));
            }
        }
        Ok(None)
    }

    /// 创建标签，返回新标签的 id
    ///
    /// 分类必须已存在。
    pub async fn create(&self, spec: &TagSpec) -> Result<String> {
        info!("创建标签: {} (分类 {})", spec.name, spec.category_id);
        let value = self.client.post_value(TAG_PATH, Some(spec.to_payload())).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// 在分类内按名称查找，不存在则创建后重新读取
    ///
    /// 与分类一样，并发调用可能产生同名标签。
    pub async fn get_or_create(&self, spec: &TagSpec) -> Result<Tag> {
        if let Some(tag) = self.find_by_name(&spec.name, Some(&spec.category_id)).await? {
            debug!("标签已存在: {} ({})", tag.name, tag.id);
            return Ok(tag);
        }

        let id = self.create(spec).await?;
        self.get(&id).await
    }
}
