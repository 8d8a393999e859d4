//! vSphere 传输层
//!
//! 负责连接配置的解析、命名连接（profile）的查找，以及 SOAP(VI/JSON) 与 REST
//! 两侧会话共用的 HTTP 客户端构建。

pub mod config;
pub mod manager;
pub mod outcome;

pub use config::{
    ConnectionProfile, HttpSettings, ResolvedProfile, SensorSettings, TaskInfoSensorSettings,
    VsphereConfig, CONNECTION_ITEMS, DEFAULT_PROFILE, DEFAULT_VIM_RELEASE,
};
pub use manager::ConnectionManager;
pub use outcome::Outcome;

use thiserror::Error;

/// 传输层错误
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("配置错误: {0}")]
    ConfigError(String),

    #[error("连接配置 {0} 不存在")]
    ProfileNotFound(String),

    #[error("vsphere 配置缺少字段: vsphere:{profile}:{field}")]
    MissingField { profile: String, field: &'static str },

    #[error("配置解析失败: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP 客户端构建失败: {0}")]
    HttpClientError(String),
}

pub type Result<T> = std::result::Result<T, TransportError>;
