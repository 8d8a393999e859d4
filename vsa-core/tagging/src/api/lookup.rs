//! 标签值查询 API

use std::collections::BTreeMap;

use tracing::debug;

use vsa_transport::Outcome;

use crate::client::TaggingClient;
use crate::error::{Result, TaggingError};
use crate::models::{Category, Lookup, ObjectId};

/// 标签值查询 API
pub struct LookupApi<'a> {
    client: &'a TaggingClient,
}

impl<'a> LookupApi<'a> {
    pub(crate) fn new(client: &'a TaggingClient) -> Self {
        Self { client }
    }

    /// 对象在指定分类下的标签名
    async fn values_in_category(&self, category: &Category, object: &ObjectId) -> Result<Vec<String>> {
        let attached = self.client.association().list_attached_tags(object).await?;
        let in_category = self.client.tag().list(Some(&category.id)).await?;

        let mut names = Vec::new();
        for tag_id in in_category.iter().filter(|id| attached.contains(id)) {
            names.push(self.client.tag().get(tag_id).await?.name);
        }

        debug!(
            "对象 {} 在分类 {} 下有 {} 个标签",
            object.id,
            category.name,
            names.len()
        );
        Ok(names)
    }

    /// 单个对象在分类下的标签值
    ///
    /// 分类不存在或对象没有该分类的标签时返回 `(false, message)`。
    pub async fn tag_values(&self, category_name: &str, object: &ObjectId) -> Result<Outcome<Lookup<Vec<String>>>> {
        let category = match self.client.category().find_by_name(category_name).await? {
            Some(category) => category,
            None => {
                return Ok(Outcome::failed(Lookup::Missing(format!(
                    "Category: '{}' not found!",
                    category_name
                ))))
            }
        };

        let names = self.values_in_category(&category, object).await?;
        if names.is_empty() {
            return Ok(Outcome::failed(Lookup::Missing(format!(
                "No tags found on object: '{}' with category: '{}'!",
                object.id, category_name
            ))));
        }

        Ok(Outcome::ok(Lookup::Found(names)))
    }

    /// 多个对象在分类下的标签值
    ///
    /// 任一对象没有该分类的标签时整体失败。
    pub async fn tag_values_for_objects(
        &self,
        category_name: &str,
        type_name: &str,
        object_ids: &[String],
    ) -> Result<BTreeMap<String, Vec<String>>> {
        let category = self
            .client
            .category()
            .find_by_name(category_name)
            .await?
            .ok_or_else(|| TaggingError::NotFound(format!("Category: '{}' not found!", category_name)))?;

        let mut result = BTreeMap::new();
        for id in object_ids {
            let object = ObjectId::new(type_name, id.clone());
            let names = self.values_in_category(&category, &object).await?;
            if names.is_empty() {
                return Err(TaggingError::NotFound(format!(
                    "No tags found on object: '{}' with category: '{}'!",
                    id, category.name
                )));
            }
            result.insert(id.clone(), names);
        }

        Ok(result)
    }

    /// 对象上的所有标签，按分类名分组
    pub async fn tags_by_category(&self, object: &ObjectId) -> Result<BTreeMap<String, Vec<String>>> {
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for tag_id in self.client.association().list_attached_tags(object).await? {
            let tag = self.client.tag().get(&tag_id).await?;
            let category = self.client.category().get(&tag.category_id).await?;
            grouped.entry(category.name).or_default().push(tag.name);
        }

        Ok(grouped)
    }

    /// 多个对象的标签分组
    pub async fn tags_for_objects(
        &self,
        type_name: &str,
        object_ids: &[String],
    ) -> Result<BTreeMap<String, BTreeMap<String, Vec<String>>>> {
        let mut result = BTreeMap::new();
        for id in object_ids {
            let object = ObjectId::new(type_name, id.clone());
            result.insert(id.clone(), self.tags_by_category(&object).await?);
        }
        Ok(result)
    }

    /// 按分类名和标签名查找标签 id
    pub async fn tag_id(&self, category_name: &str, tag_name: &str) -> Result<String> {
        let category = self
            .client
            .category()
            .find_by_name(category_name)
            .await?
            .ok_or_else(|| TaggingError::NotFound(format!("Category: '{}' not found!", category_name)))?;

        let tag = self
            .client
            .tag()
            .find_by_name(tag_name, Some(&category.id))
            .await?
            .ok_or_else(|| {
                TaggingError::NotFound(format!(
                    "Tag doesn't exist: category={} tag={}",
                    category_name, tag_name
                ))
            })?;

        Ok(tag.id)
    }
}
