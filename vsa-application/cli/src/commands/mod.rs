//! CLI 命令处理模块

pub mod affinity;
pub mod common; // 公共工具函数
pub mod entity;
pub mod profile;
pub mod snapshot;
pub mod tag;
pub mod task;
