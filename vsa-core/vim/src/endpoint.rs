//! 远端管理端点抽象
//!
//! 会话、解析器、任务轮询等上层逻辑只依赖 [`VimEndpoint`]，
//! 生产环境由 [`crate::ViJsonClient`] 实现，测试使用内存实现。

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Result, VimError};
use crate::types::ManagedObjectRef;
use crate::value::VimValue;

/// 服务根内容
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceContent {
    pub root_folder: ManagedObjectRef,
    pub property_collector: ManagedObjectRef,
    pub view_manager: ManagedObjectRef,
    pub session_manager: ManagedObjectRef,
    pub task_manager: Option<ManagedObjectRef>,
    /// `AboutInfo` 数据对象
    pub about: VimValue,
}

impl ServiceContent {
    /// 从 `ServiceContent` 数据对象解析
    pub fn from_value(value: &VimValue) -> Result<Self> {
        let required = |field: &str| -> Result<ManagedObjectRef> {
            value
                .get(field)
                .and_then(VimValue::as_moref)
                .cloned()
                .ok_or_else(|| VimError::ParseError(format!("ServiceContent 缺少字段: {}", field)))
        };

        Ok(Self {
            root_folder: required("rootFolder")?,
            property_collector: required("propertyCollector")?,
            view_manager: required("viewManager")?,
            session_manager: required("sessionManager")?,
            task_manager: value.get("taskManager").and_then(VimValue::as_moref).cloned(),
            about: value.get("about").cloned().unwrap_or(VimValue::Null),
        })
    }

    /// 平台名称与版本，例如 `VMware vCenter Server 8.0.1`
    pub fn full_name(&self) -> Option<&str> {
        self.about.get("fullName").and_then(VimValue::as_str)
    }
}

/// 属性采集查询
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyQuery {
    /// 对象类型名
    pub type_name: String,

    /// 属性路径；为空且 `all` 为 false 时只返回对象引用
    pub path_set: Vec<String>,

    /// 采集全部属性
    pub all: bool,

    /// 指定对象 id，直接构造对象引用；任一 id 不存在时远端整体报错
    pub ids: Option<Vec<String>>,

    /// 遍历调用方已创建的视图 (`ListView` / `ContainerView`)，视图由调用方销毁
    pub view: Option<ManagedObjectRef>,
}

impl PropertyQuery {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            path_set: Vec::new(),
            all: false,
            ids: None,
            view: None,
        }
    }

    pub fn with_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.path_set = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_all(mut self, all: bool) -> Self {
        self.all = all;
        self
    }

    pub fn with_ids(mut self, ids: Vec<String>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn in_view(mut self, view: ManagedObjectRef) -> Self {
        self.view = Some(view);
        self
    }
}

/// 对象与其属性集合
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectContent {
    pub obj: ManagedObjectRef,
    pub props: Vec<(String, VimValue)>,
}

impl ObjectContent {
    pub fn new(obj: ManagedObjectRef) -> Self {
        Self {
            obj,
            props: Vec::new(),
        }
    }

    pub fn with_prop(mut self, name: impl Into<String>, value: VimValue) -> Self {
        self.props.push((name.into(), value));
        self
    }

    pub fn get(&self, name: &str) -> Option<&VimValue> {
        self.props
            .iter()
            .find(|(prop, _)| prop == name)
            .map(|(_, value)| value)
    }

    /// `name` 属性
    pub fn name(&self) -> Option<&str> {
        self.get("name").and_then(VimValue::as_str)
    }
}

/// 远端管理端点
#[async_trait]
pub trait VimEndpoint: Send + Sync {
    /// 读取服务根内容（无需认证）
    async fn service_content(&self) -> Result<ServiceContent>;

    /// 登录，成功后端点自行保存会话凭据
    async fn login(&self, session_manager: &ManagedObjectRef, user: &str, passwd: &str) -> Result<()>;

    /// 注销
    async fn logout(&self, session_manager: &ManagedObjectRef) -> Result<()>;

    /// 调用托管对象方法
    async fn invoke(&self, target: &ManagedObjectRef, method: &str, args: Value) -> Result<VimValue>;

    /// 读取托管对象的单个属性
    async fn read_property(&self, target: &ManagedObjectRef, property: &str) -> Result<VimValue>;

    /// 批量属性采集
    async fn retrieve(&self, content: &ServiceContent, query: &PropertyQuery) -> Result<Vec<ObjectContent>>;
}
