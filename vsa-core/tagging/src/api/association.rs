//! 标签关联 API
//!
//! 关联操作本身的幂等性由远端保证，这里不做额外检查。

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::client::TaggingClient;
use crate::error::Result;
use crate::models::{ObjectId, Tag};

const ASSOCIATION_PATH: &str = "/rest/com/vmware/cis/tagging/tag-association";

/// 标签关联 API
pub struct AssociationApi<'a> {
    client: &'a TaggingClient,
}

impl<'a> AssociationApi<'a> {
    pub(crate) fn new(client: &'a TaggingClient) -> Self {
        Self { client }
    }

    /// `~action=` 风格的关联端点
    pub fn endpoint(action: &str, tag_id: Option<&str>) -> String {
        match tag_id {
            Some(tag_id) => format!("{}/id:{}?~action={}", ASSOCIATION_PATH, tag_id, action),
            None => format!("{}?~action={}", ASSOCIATION_PATH, action),
        }
    }

    pub async fn attach(&self, tag_id: &str, object: &ObjectId) -> Result<Option<Value>> {
        info!("关联标签: {} -> {}:{}", tag_id, object.type_name, object.id);
        self.client
            .post(
                &Self::endpoint("attach", Some(tag_id)),
                Some(json!({"object_id": object})),
            )
            .await
    }

    pub async fn attach_multiple(&self, tag_ids: &[String], object: &ObjectId) -> Result<Option<Value>> {
        info!("批量关联标签: {:?} -> {}:{}", tag_ids, object.type_name, object.id);
        self.client
            .post(
                &Self::endpoint("attach-multiple-tags-to-object", None),
                Some(json!({"tag_ids": tag_ids, "object_id": object})),
            )
            .await
    }

    pub async fn detach(&self, tag_id: &str, object: &ObjectId) -> Result<Option<Value>> {
        info!("解除标签: {} -> {}:{}", tag_id, object.type_name, object.id);
        self.client
            .post(
                &Self::endpoint("detach", Some(tag_id)),
                Some(json!({"object_id": object})),
            )
            .await
    }

    /// 对象上已关联的标签 id
    pub async fn list_attached_tags(&self, object: &ObjectId) -> Result<Vec<String>> {
        debug!("获取对象标签: {}:{}", object.type_name, object.id);
        let value = self
            .client
            .post_value(
                &Self::endpoint("list-attached-tags", None),
                Some(json!({"object_id": object})),
            )
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// 关联了该标签的对象
    pub async fn list_attached_objects(&self, tag_id: &str) -> Result<Vec<ObjectId>> {
        debug!("获取标签关联对象: {}", tag_id);
        let value = self
            .client
            .post_value(&Self::endpoint("list-attached-objects", Some(tag_id)), None)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// 解除对象上属于该分类的所有标签，返回被解除的标签
    pub async fn detach_category(&self, category_id: &str, object: &ObjectId) -> Result<Vec<Tag>> {
        let mut detached = Vec::new();

        for tag_id in self.list_attached_tags(object).await? {
            let tag = self.client.tag().get(&tag_id).await?;
            if tag.category_id == category_id {
                self.detach(&tag_id, object).await?;
                detached.push(tag);
            }
        }

        Ok(detached)
    }

    /// 替换对象在该标签分类下的标签
    ///
    /// 先解除同分类的全部标签再关联，两步之间失败会让对象在该分类下没有标签。
    pub async fn replace(&self, tag_id: &str, object: &ObjectId) -> Result<Option<Value>> {
        let tag = self.client.tag().get(tag_id).await?;
        let detached = self.detach_category(&tag.category_id, object).await?;
        debug!("替换前解除了 {} 个标签", detached.len());

        self.attach(tag_id, object).await
    }
}
