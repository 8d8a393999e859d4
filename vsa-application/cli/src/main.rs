//! VSA CLI 应用

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, Level};

mod commands;

use commands::common::GlobalOpts;

#[derive(Parser)]
#[command(name = "vsa")]
#[command(about = "vSphere Automation - vSphere 自动化动作集", long_about = None)]
#[command(version)]
struct Cli {
    /// 日志级别
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// 配置文件路径 (默认 ~/.config/vsa/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// 连接名称 (默认使用配置中的 default_profile)
    #[arg(long, global = true)]
    vsphere: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 连接配置
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// 实体查询
    Entity {
        #[command(subcommand)]
        action: EntityAction,
    },

    /// 批量读取对象属性
    Properties {
        /// 对象类型，如 VirtualMachine
        type_name: String,
        /// 属性路径，不指定时读取全部属性
        #[arg(long = "property", short = 'p')]
        properties: Vec<String>,
        /// 对象 id，不指定时读取该类型的全部对象
        #[arg(long = "id")]
        ids: Vec<String>,
        /// 输出未经转换的对象内容
        #[arg(long)]
        raw: bool,
    },

    /// 虚拟机快照
    Snapshot {
        #[command(subcommand)]
        action: SnapshotAction,
    },

    /// 集群亲和性规则
    Affinity {
        #[command(subcommand)]
        action: AffinityAction,
    },

    /// 远端任务
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// 标签与分类
    Tag {
        #[command(subcommand)]
        action: TagAction,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// 列出连接
    List,
}

#[derive(Subcommand)]
enum EntityAction {
    /// 按 id 或名称解析实体
    Resolve {
        /// 实体类型，如 VirtualMachine / Host / Cluster
        kind: String,
        /// 实体 MOID
        #[arg(long)]
        id: Option<String>,
        /// 实体名称
        #[arg(long)]
        name: Option<String>,
    },
    /// 名称批量转换为 MOID
    Moid {
        /// 实体类型
        kind: String,
        /// 实体名称
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// 列出某类实体
    List {
        /// 实体类型
        kind: String,
    },
    /// 读取实体摘要
    Summary {
        /// 实体类型
        kind: String,
        /// 实体 MOID
        #[arg(long)]
        id: Option<String>,
        /// 实体名称
        #[arg(long)]
        name: Option<String>,
    },
}

#[derive(Subcommand)]
enum SnapshotAction {
    /// 列出虚拟机快照
    List {
        /// 虚拟机 MOID
        #[arg(long)]
        vm_id: Option<String>,
        /// 虚拟机名称
        #[arg(long)]
        vm_name: Option<String>,
        /// 平铺输出，不保留父子层级
        #[arg(long)]
        flat: bool,
    },
    /// 删除过期快照
    Prune {
        /// 虚拟机 MOID，与 --vm-name 都不指定时处理所有虚拟机
        #[arg(long)]
        vm_id: Option<String>,
        /// 虚拟机名称
        #[arg(long)]
        vm_name: Option<String>,
        /// 最大保留天数
        #[arg(long)]
        max_age_days: i64,
        /// 忽略名称匹配该正则的快照，可重复
        #[arg(long = "ignore")]
        ignore: Vec<String>,
    },
}

#[derive(Subcommand)]
enum AffinityAction {
    /// 创建 VM-主机亲和性规则
    Create {
        /// 规则名称
        rule_name: String,
        /// 集群名称
        #[arg(long)]
        cluster: String,
        /// 虚拟机名称，可重复
        #[arg(long = "vm", required = true)]
        vms: Vec<String>,
        /// 主机名称，不指定时使用虚拟机当前所在主机
        #[arg(long = "host")]
        hosts: Vec<String>,
        /// 等待虚拟机出现的重试次数
        #[arg(long, default_value = "10")]
        retries: u32,
    },
    /// 删除亲和性规则
    Delete {
        /// 规则名称
        rule_name: String,
        /// 集群名称
        #[arg(long)]
        cluster: String,
    },
}

#[derive(Subcommand)]
enum TaskAction {
    /// 持续输出新排队的任务
    Watch {
        /// 每次读取的任务数 (默认取配置 sensors.taskinfo.tasknum)
        #[arg(long)]
        tasknum: Option<u32>,
        /// 轮询间隔秒数 (默认取配置 sensors.taskinfo.poll_interval)
        #[arg(long)]
        interval: Option<u64>,
    },
    /// 等待任务结束
    Wait {
        /// 任务 MOID，如 task-123
        task_id: String,
        /// 超时秒数，不指定时一直等待
        #[arg(long)]
        timeout: Option<u64>,
    },
}

#[derive(Subcommand)]
enum TagAction {
    /// 列出分类
    CategoryList,
    /// 创建分类 (已存在时直接返回)
    CategoryCreate {
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// SINGLE 或 MULTIPLE
        #[arg(long, default_value = "SINGLE")]
        cardinality: String,
        /// 可关联的对象类型，可重复
        #[arg(long = "type")]
        types: Vec<String>,
    },
    /// 删除分类
    CategoryDelete { name: String },
    /// 列出标签
    List {
        /// 只列出该分类下的标签
        #[arg(long)]
        category: Option<String>,
    },
    /// 创建标签 (已存在时直接返回)
    Create {
        name: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// 删除标签
    Delete {
        name: String,
        #[arg(long)]
        category: String,
    },
    /// 关联标签到对象，分类和标签不存在时创建
    Attach {
        #[arg(long)]
        category: String,
        #[arg(long)]
        tag: String,
        #[arg(long)]
        object_type: String,
        #[arg(long)]
        object_id: String,
        /// 先解除同分类下的已有标签
        #[arg(long)]
        replace: bool,
        #[arg(long)]
        category_description: Option<String>,
        #[arg(long)]
        cardinality: Option<String>,
        #[arg(long = "type")]
        types: Vec<String>,
        #[arg(long)]
        tag_description: Option<String>,
    },
    /// 按 id 关联多个标签
    AttachMultiple {
        #[arg(long)]
        object_type: String,
        #[arg(long)]
        object_id: String,
        #[arg(required = true)]
        tag_ids: Vec<String>,
    },
    /// 列出对象上的标签，按分类分组
    OnObject {
        #[arg(long)]
        object_type: String,
        #[arg(required = true)]
        object_ids: Vec<String>,
    },
    /// 列出关联了某标签的对象
    Objects {
        #[arg(long)]
        category: String,
        #[arg(long)]
        tag: String,
    },
    /// 对象在某分类下的标签值
    Value {
        #[arg(long)]
        category: String,
        #[arg(long)]
        object_type: String,
        #[arg(required = true)]
        object_ids: Vec<String>,
    },
    /// 查询标签 id
    Id {
        #[arg(long)]
        category: String,
        #[arg(long)]
        tag: String,
    },
    /// 对容器下的所有对象关联标签
    AttachBulk {
        /// 容器类型，如 ClusterComputeResource
        #[arg(long)]
        query_type: String,
        /// 容器名称
        #[arg(long)]
        query_name: String,
        /// 被关联的对象类型
        #[arg(long, default_value = "VirtualMachine")]
        bulk_type: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        category_description: Option<String>,
        #[arg(long, default_value = "SINGLE")]
        cardinality: String,
        #[arg(long = "type")]
        types: Vec<String>,
        #[arg(long)]
        tag: String,
        #[arg(long)]
        tag_description: Option<String>,
        /// 先解除同分类下的已有标签
        #[arg(long)]
        replace: bool,
    },
    /// 对容器下的所有对象解除标签
    DetachBulk {
        #[arg(long)]
        query_type: String,
        #[arg(long)]
        query_name: String,
        #[arg(long, default_value = "VirtualMachine")]
        bulk_type: String,
        #[arg(long)]
        category: String,
        #[arg(long, default_value = "SINGLE")]
        cardinality: String,
        #[arg(long)]
        tag: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    info!("VSA CLI 启动");

    let opts = GlobalOpts {
        config: cli.config,
        vsphere: cli.vsphere,
    };

    // 处理命令
    match cli.command {
        Commands::Profile { action } => commands::profile::handle(action, &opts).await?,
        Commands::Entity { action } => commands::entity::handle(action, &opts).await?,
        Commands::Properties {
            type_name,
            properties,
            ids,
            raw,
        } => commands::entity::properties(&opts, &type_name, &properties, &ids, raw).await?,
        Commands::Snapshot { action } => commands::snapshot::handle(action, &opts).await?,
        Commands::Affinity { action } => commands::affinity::handle(action, &opts).await?,
        Commands::Task { action } => commands::task::handle(action, &opts).await?,
        Commands::Tag { action } => commands::tag::handle(action, &opts).await?,
    }

    Ok(())
}
