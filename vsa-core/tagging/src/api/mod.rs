//! 标签 REST API 模块
//!
//! - 分类管理 (CategoryApi)
//! - 标签管理 (TagApi)
//! - 标签关联 (AssociationApi)
//! - 清单查询 (InventoryApi)
//! - 批量关联 (BulkApi)
//! - 标签值查询 (LookupApi)

pub mod association;
pub mod bulk;
pub mod category;
pub mod inventory;
pub mod lookup;
pub mod tag;

pub use association::AssociationApi;
pub use bulk::BulkApi;
pub use category::CategoryApi;
pub use inventory::InventoryApi;
pub use lookup::LookupApi;
pub use tag::TagApi;

