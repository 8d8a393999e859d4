//! 属性采集

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use vsa_transport::Outcome;

use crate::endpoint::{ObjectContent, PropertyQuery};
use crate::error::{Result, VimError};
use crate::serialize::{AllowList, VimJsonSerializer};
use crate::session::VimSession;
use crate::types::ManagedObjectRef;
use crate::value::VimValue;

/// 按对象 id 组织的属性字典
pub type PropertyMap = BTreeMap<String, Map<String, Value>>;

/// 属性采集 API
pub struct PropertiesApi<'a> {
    session: &'a VimSession,
}

impl<'a> PropertiesApi<'a> {
    pub(crate) fn new(session: &'a VimSession) -> Self {
        Self { session }
    }

    /// 采集任意类型的属性
    ///
    /// `properties` 为空时采集全部属性，`ids` 为空时遍历整个清单。
    /// 指定 `ids` 时通过列表视图采集，不存在的 id 被忽略而不是让整个查询失败。
    pub async fn collect(&self, type_name: &str, properties: &[String], ids: &[String]) -> Result<Vec<ObjectContent>> {
        validate_type_name(type_name)?;

        let query = PropertyQuery::new(type_name)
            .with_all(properties.is_empty())
            .with_paths(properties.iter().cloned());

        let objects = if ids.is_empty() {
            self.session.retrieve(&query).await?
        } else {
            self.collect_listed(query, ids).await?
        };

        debug!("采集 {} 属性: {} 个对象", type_name, objects.len());
        Ok(objects)
    }

    async fn collect_listed(&self, query: PropertyQuery, ids: &[String]) -> Result<Vec<ObjectContent>> {
        let view = self
            .session
            .invoke(&self.session.content().view_manager, "CreateListView", json!({}))
            .await?
            .as_moref()
            .cloned()
            .ok_or_else(|| VimError::ParseError("CreateListView 未返回视图引用".to_string()))?;

        let result = self.retrieve_listed(&view, query, ids).await;

        if let Err(e) = self.session.invoke(&view, "DestroyView", Value::Null).await {
            warn!("销毁列表视图失败: {} ({})", view, e);
        }

        result
    }

    async fn retrieve_listed(
        &self,
        view: &ManagedObjectRef,
        query: PropertyQuery,
        ids: &[String],
    ) -> Result<Vec<ObjectContent>> {
        let add: Vec<Value> = ids
            .iter()
            .map(|id| ManagedObjectRef::new(query.type_name.as_str(), id.as_str()).to_wire())
            .collect();

        // 返回无法解析的引用
        let unresolved = self
            .session
            .invoke(view, "ModifyListView", json!({ "add": add }))
            .await?;
        for moref in unresolved.as_array().iter().filter_map(VimValue::as_moref) {
            debug!("对象不存在, 已跳过: {}", moref);
        }

        self.session.retrieve(&query.in_view(view.clone())).await
    }

    /// 采集并转换为 JSON，`success` 表示请求的 id 是否全部找到
    pub async fn get(&self, type_name: &str, properties: &[String], ids: &[String]) -> Result<Outcome<PropertyMap>> {
        let objects = self.collect(type_name, properties, ids).await?;
        Ok(transform(ids, &objects))
    }
}

fn validate_type_name(type_name: &str) -> Result<()> {
    let valid = !type_name.is_empty()
        && type_name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(VimError::Validation(format!("无效的类型名: {}", type_name)))
    }
}

/// 转换采集结果
pub fn transform(ids: &[String], objects: &[ObjectContent]) -> Outcome<PropertyMap> {
    let serializer = VimJsonSerializer::new(AllowList::All);

    let result: PropertyMap = objects
        .iter()
        .map(|object| {
            let props = object
                .props
                .iter()
                .map(|(name, value)| (name.clone(), serializer.to_json(value)))
                .collect();
            (object.obj.id().to_string(), props)
        })
        .collect();

    let mut wanted = ids.to_vec();
    wanted.sort();
    let found: Vec<String> = result.keys().cloned().collect();

    Outcome {
        success: ids.is_empty() || found == wanted,
        detail: result,
    }
}

/// 采集结果的原始线上格式
pub fn raw(objects: &[ObjectContent]) -> Value {
    Value::Array(
        objects
            .iter()
            .map(|object| {
                json!({
                    "obj": object.obj.to_wire(),
                    "propSet": object
                        .props
                        .iter()
                        .map(|(name, value)| json!({"name": name, "val": value.to_wire()}))
                        .collect::<Vec<_>>(),
                })
            })
            .collect(),
    )
}
