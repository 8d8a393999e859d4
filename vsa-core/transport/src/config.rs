//! 连接配置
//!
//! **数据存储方式**: TOML 文件 (~/.config/vsa/config.toml)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{Result, TransportError};

/// 未指定连接名时使用的 profile
pub const DEFAULT_PROFILE: &str = "default";

/// 每个 profile 必须具备的字段
pub const CONNECTION_ITEMS: [&str; 4] = ["host", "port", "user", "passwd"];

/// VI/JSON API 默认版本
pub const DEFAULT_VIM_RELEASE: &str = "8.0.1.0";

/// vSphere 连接配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VsphereConfig {
    /// 命名连接
    #[serde(default)]
    pub vsphere: Option<BTreeMap<String, ConnectionProfile>>,

    /// 是否校验 TLS 证书，未设置时视为校验
    #[serde(default)]
    pub ssl_verify: Option<bool>,

    /// 默认连接名
    #[serde(default = "default_profile_name")]
    pub default_profile: String,

    /// HTTP 客户端设置
    #[serde(default)]
    pub http: HttpSettings,

    /// 传感器设置
    #[serde(default)]
    pub sensors: SensorSettings,
}

fn default_profile_name() -> String {
    DEFAULT_PROFILE.to_string()
}

/// 单个命名连接
///
/// 字段在解析阶段全部可缺省，缺失检查推迟到 [`VsphereConfig::profile`]。
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ConnectionProfile {
    pub host: Option<String>,

    pub port: Option<u16>,

    #[serde(alias = "username")]
    pub user: Option<String>,

    #[serde(alias = "password")]
    pub passwd: Option<String>,

    /// VI/JSON API 版本
    #[serde(default)]
    pub vim_release: Option<String>,
}

impl fmt::Debug for ConnectionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionProfile")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("passwd", &self.passwd.as_ref().map(|_| "***"))
            .field("vim_release", &self.vim_release)
            .finish()
    }
}

/// HTTP 客户端设置
///
/// 默认不设置客户端超时，沿用底层传输的默认行为。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpSettings {
    /// 连接超时（秒）
    #[serde(default)]
    pub connect_timeout: Option<u64>,

    /// 请求超时（秒）
    #[serde(default)]
    pub request_timeout: Option<u64>,
}

impl HttpSettings {
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout.map(Duration::from_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout.map(Duration::from_secs)
    }
}

/// 传感器设置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SensorSettings {
    #[serde(default)]
    pub taskinfo: TaskInfoSensorSettings,
}

/// 任务历史传感器设置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskInfoSensorSettings {
    /// 每次轮询读取的任务数
    #[serde(default = "default_tasknum")]
    pub tasknum: u32,

    /// 轮询间隔（秒）
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,

    /// 使用的连接名
    #[serde(default)]
    pub vsphere: Option<String>,
}

impl Default for TaskInfoSensorSettings {
    fn default() -> Self {
        Self {
            tasknum: default_tasknum(),
            poll_interval: default_poll_interval(),
            vsphere: None,
        }
    }
}

impl TaskInfoSensorSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }
}

fn default_tasknum() -> u32 {
    3
}

fn default_poll_interval() -> u64 {
    5
}

/// 解析完成、字段齐全的连接
#[derive(Clone)]
pub struct ResolvedProfile {
    /// profile 名称
    pub name: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub passwd: String,
    /// VI/JSON API 版本
    pub vim_release: String,
    /// 是否校验 TLS 证书
    pub verify_tls: bool,
}

impl fmt::Debug for ResolvedProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedProfile")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("passwd", &"***")
            .field("vim_release", &self.vim_release)
            .field("verify_tls", &self.verify_tls)
            .finish()
    }
}

impl ResolvedProfile {
    /// REST 接口基础 URL
    pub fn rest_base_url(&self) -> String {
        format!("https://{}", self.host)
    }

    /// VI/JSON 接口基础 URL
    pub fn vim_base_url(&self) -> String {
        format!(
            "https://{}:{}/sdk/vim25/{}",
            self.host, self.port, self.vim_release
        )
    }
}

impl VsphereConfig {
    /// 获取默认配置文件路径
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| TransportError::ConfigError("无法获取用户主目录".to_string()))?;
        Ok(home.join(".config").join("vsa").join("config.toml"))
    }

    /// 从 TOML 文本解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// 从文件加载配置
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(TransportError::ConfigError(format!(
                "未找到连接配置文件: {}",
                path.display()
            )));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 校验 vsphere 配置段
    pub fn validate(&self) -> Result<()> {
        match &self.vsphere {
            None => Err(TransportError::ConfigError(
                "No connection configuration details found".to_string(),
            )),
            Some(profiles) if profiles.is_empty() => Err(TransportError::ConfigError(
                "'vsphere' config defined but empty.".to_string(),
            )),
            Some(_) => Ok(()),
        }
    }

    /// 是否校验 TLS 证书
    ///
    /// 只有显式配置 `ssl_verify = false` 才关闭校验。
    pub fn verify_tls(&self) -> bool {
        self.ssl_verify != Some(false)
    }

    /// 列出所有 profile 名称
    pub fn profile_names(&self) -> Vec<&str> {
        self.vsphere
            .as_ref()
            .map(|profiles| profiles.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// 按名称解析 profile
    ///
    /// 名称为空时使用 `default_profile`。
    pub fn profile(&self, name: Option<&str>) -> Result<ResolvedProfile> {
        self.validate()?;

        let name = match name {
            Some(n) if !n.is_empty() => n,
            _ => self.default_profile.as_str(),
        };

        let profile = self
            .vsphere
            .as_ref()
            .and_then(|profiles| profiles.get(name))
            .ok_or_else(|| TransportError::ProfileNotFound(name.to_string()))?;

        let missing = |field: &'static str| TransportError::MissingField {
            profile: name.to_string(),
            field,
        };

        let host = profile.host.clone().ok_or_else(|| missing("host"))?;
        let port = profile.port.ok_or_else(|| missing("port"))?;
        let user = profile.user.clone().ok_or_else(|| missing("user"))?;
        let passwd = profile.passwd.clone().ok_or_else(|| missing("passwd"))?;

        Ok(ResolvedProfile {
            name: name.to_string(),
            host,
            port,
            user,
            passwd,
            vim_release: profile
                .vim_release
                .clone()
                .unwrap_or_else(|| DEFAULT_VIM_RELEASE.to_string()),
            verify_tls: self.verify_tls(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_profile_urls() {
        let config = VsphereConfig::from_toml_str(
            r#"
            [vsphere.default]
            host = "vc.local"
            port = 8443
            user = "admin"
            passwd = "secret"
            "#,
        )
        .unwrap();

        let profile = config.profile(None).unwrap();
        assert_eq!(profile.rest_base_url(), "https://vc.local");
        assert_eq!(
            profile.vim_base_url(),
            "https://vc.local:8443/sdk/vim25/8.0.1.0"
        );
    }

    #[test]
    fn test_debug_hides_password() {
        let profile = ConnectionProfile {
            passwd: Some("hunter2".to_string()),
            ..Default::default()
        };
        let debug = format!("{:?}", profile);
        assert!(!debug.contains("hunter2"));
    }
}
