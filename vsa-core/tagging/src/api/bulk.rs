//! 批量关联 API
//!
//! 组合分类/标签的幂等创建与清单查询，对一组对象逐个执行关联动作。

use serde_json::Value;
use tracing::{info, warn};

use vsa_transport::Outcome;

use crate::client::TaggingClient;
use crate::error::Result;
use crate::models::{
    BulkAction, BulkResult, BulkTagRequest, CategorySpec, Lookup, ObjectId, Tag, TagSpec,
};

/// 批量关联 API
pub struct BulkApi<'a> {
    client: &'a TaggingClient,
}

impl<'a> BulkApi<'a> {
    pub(crate) fn new(client: &'a TaggingClient) -> Self {
        Self { client }
    }

    /// 确保分类与标签存在，返回标签
    pub async fn ensure_tag(&self, category: &CategorySpec, tag_name: &str, tag_description: Option<&str>) -> Result<Tag> {
        let category = self.client.category().get_or_create(category).await?;

        let mut spec = TagSpec::new(tag_name, category.id);
        if let Some(description) = tag_description {
            spec = spec.with_description(description);
        }
        self.client.tag().get_or_create(&spec).await
    }

    /// 创建（如需要）分类与标签后关联到对象
    ///
    /// `replace` 为真时先解除同分类下的已有标签，SINGLE 基数的分类换值需要这样做。
    pub async fn attach_or_create(
        &self,
        category: &CategorySpec,
        tag_name: &str,
        tag_description: Option<&str>,
        object: &ObjectId,
        replace: bool,
    ) -> Result<Option<Value>> {
        let tag = self.ensure_tag(category, tag_name, tag_description).await?;

        if replace {
            self.client.association().replace(&tag.id, object).await
        } else {
            self.client.association().attach(&tag.id, object).await
        }
    }

    /// 对容器下的每个对象执行关联动作
    ///
    /// 每个对象是一次独立的调用，中途失败时已完成的对象不会回滚。
    pub async fn tag_bulk(&self, request: &BulkTagRequest) -> Result<Vec<BulkResult>> {
        let inventory = self.client.inventory();
        let container = inventory
            .find_by_name(request.query_type, &request.query_name)
            .await?;

        let category = CategorySpec::new(&request.category)
            .with_cardinality(request.cardinality)
            .with_associable_types(vec![request.bulk_type.type_name().to_string()]);
        let tag = self.ensure_tag(&category, &request.tag, None).await?;

        let objects = inventory.find_within(request.bulk_type, &container).await?;
        info!(
            "批量{}标签 {}:{} -> {} 个 {} (容器 {})",
            request.action.as_str(),
            request.category,
            request.tag,
            objects.len(),
            request.bulk_type,
            container.id
        );

        let association = self.client.association();
        let mut results = Vec::with_capacity(objects.len());

        for object in objects {
            let object_id = object.object_id();
            let response = match request.action {
                BulkAction::Attach => association.attach(&tag.id, &object_id).await,
                BulkAction::Replace => association.replace(&tag.id, &object_id).await,
                BulkAction::Detach => association.detach(&tag.id, &object_id).await,
            };

            let response = response.map_err(|e| {
                warn!("对象 {} ({}) 关联失败: {}", object.name, object.id, e);
                e
            })?;

            results.push(BulkResult {
                id: object.id,
                name: object.name,
                type_name: object_id.type_name,
                response,
            });
        }

        Ok(results)
    }

    /// 批量解除标签，分类或标签不存在时不做任何修改
    pub async fn detach_bulk(&self, request: &BulkTagRequest) -> Result<Outcome<Lookup<Vec<BulkResult>>>> {
        let category = match self.client.category().find_by_name(&request.category).await? {
            Some(category) => category,
            None => {
                return Ok(Outcome::failed(Lookup::Missing(format!(
                    "Category doesn't exist: category={}",
                    request.category
                ))))
            }
        };

        if self
            .client
            .tag()
            .find_by_name(&request.tag, Some(&category.id))
            .await?
            .is_none()
        {
            return Ok(Outcome::failed(Lookup::Missing(format!(
                "Tag doesn't exist: category={} tag={}",
                request.category, request.tag
            ))));
        }

        let request = BulkTagRequest {
            action: BulkAction::Detach,
            ..request.clone()
        };
        let results = self.tag_bulk(&request).await?;
        Ok(Outcome::ok(Lookup::Found(results)))
    }
}
