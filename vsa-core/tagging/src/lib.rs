//! vSphere 标签 REST 客户端
//!
//! 基于 `/rest/com/vmware/cis/tagging` 接口的分类、标签与关联操作，以及在其上
//! 构建的幂等创建和按容器批量关联。
//!
//! # 功能
//!
//! - **分类/标签** (`CategoryApi` / `TagApi`): 列表、读取、删除、按名称查找、查找或创建
//! - **关联** (`AssociationApi`): 关联、解除、替换、按分类解除
//! - **清单查询** (`InventoryApi`): `/rest/vcenter/*` 按名称唯一查找与按容器过滤
//! - **批量关联** (`BulkApi`): 对容器下的所有对象执行 attach / replace / detach
//! - **标签值查询** (`LookupApi`): 对象在某个分类下的标签值
//!
//! # 示例
//!
//! ```ignore
//! use vsa_tagging::{BulkAction, BulkTagRequest, Cardinality, InventoryType, TaggingClient};
//!
//! let client = TaggingClient::connect(&manager, Some("lab")).await?;
//! let results = client
//!     .bulk()
//!     .tag_bulk(&BulkTagRequest {
//!         query_type: InventoryType::Cluster,
//!         query_name: "cls1".to_string(),
//!         bulk_type: InventoryType::VirtualMachine,
//!         category: "env".to_string(),
//!         tag: "prod".to_string(),
//!         cardinality: Cardinality::Single,
//!         action: BulkAction::Attach,
//!     })
//!     .await?;
//! client.logout().await?;
//! ```

pub mod api;
pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use client::TaggingClient;
pub use error::{Result, TaggingError};
pub use models::{
    BulkAction, BulkResult, BulkTagRequest, Cardinality, Category, CategorySpec, InventoryObject,
    InventoryType, Lookup, ObjectId, Tag, TagSpec,
};
pub use transport::{RestClient, RestTransport, SESSION_HEADER, SESSION_PATH};

// 导出 API
pub use api::{AssociationApi, BulkApi, CategoryApi, InventoryApi, LookupApi, TagApi};
