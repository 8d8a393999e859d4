//! vSphere VIM 核心模块
//!
//! 所有动作共用的会话、实体解析、任务轮询与对象序列化，以及在其上构建的
//! 快照、亲和性规则、属性采集与任务历史操作。
//!
//! # 功能
//!
//! - **会话** (`VimSession`): 按命名连接登录，持有服务根内容
//! - **实体解析** (`EntityResolver`): 按 id 或名称找到唯一实体，名称到 MOID 批量查询
//! - **任务轮询** (`TaskWaiter`): 等待远端任务进入终态
//! - **对象序列化** (`VimJsonSerializer`): 远端对象转 JSON，按调用方的 allow-list 展开
//! - **树遍历** (`collect_flat` / `collect_tree`): 快照树与集群组的先序遍历
//! - **快照管理** (`SnapshotApi`): 快照列表与过期清理
//! - **亲和性规则** (`AffinityApi`): VM-主机规则的创建与删除
//! - **属性采集** (`PropertiesApi`): 任意类型的属性批量读取
//! - **任务历史** (`TaskHistoryWatcher`): 读取新排队的任务
//!
//! # 示例
//!
//! ```ignore
//! use vsa_transport::{ConnectionManager, VsphereConfig};
//! use vsa_vim::{EntityKind, VimSession};
//!
//! let manager = ConnectionManager::new(VsphereConfig::load(&path)?)?;
//! let session = VimSession::connect(&manager, Some("lab")).await?;
//!
//! let vm = session
//!     .resolver()
//!     .resolve(EntityKind::VirtualMachine, None, Some("web01"))
//!     .await?;
//!
//! let report = session.snapshots().describe(&vm, true).await?;
//! session.disconnect().await;
//! ```

pub mod affinity;
pub mod endpoint;
pub mod error;
pub mod properties;
pub mod resolver;
pub mod serialize;
pub mod session;
pub mod snapshot;
pub mod task;
pub mod task_collector;
pub mod tree;
pub mod types;
pub mod value;
pub mod vijson;

pub use endpoint::{ObjectContent, PropertyQuery, ServiceContent, VimEndpoint};
pub use error::{Result, VimError};
pub use serialize::{reference_id, AllowList, VimJsonSerializer};
pub use session::VimSession;
pub use task::{wait_for_task, RemoteTask, TaskHandle, TaskWaiter};
pub use tree::{collect_flat, collect_tree, Collected, TreeNode, TreeRecord, Verdict};
pub use types::{EntityKind, ManagedObjectRef, TaskState};
pub use value::{DataObject, VimValue};
pub use vijson::ViJsonClient;

// 导出 API
pub use affinity::{AffinityApi, AffinityCreated, AffinityRule, AffinityRuleRequest, ClusterGroup};
pub use properties::{PropertiesApi, PropertyMap};
pub use resolver::{EntityResolver, NamedEntity};
pub use snapshot::{
    PruneReport, SnapshotApi, SnapshotListing, SnapshotNode, SnapshotPruner, SnapshotRecord,
    SnapshotReport, SnapshotResult,
};
pub use task_collector::{TaskHistoryWatcher, TaskInfoEvent};
