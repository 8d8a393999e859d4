//! 公共工具函数模块
//!
//! 提供各命令模块共享的功能，包括：
//! - 配置加载与连接管理器创建
//! - VIM 会话与标签客户端登录
//! - 结果输出

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use tracing::debug;

use vsa_tagging::TaggingClient;
use vsa_transport::{ConnectionManager, Outcome, VsphereConfig};
use vsa_vim::VimSession;

/// 所有命令共用的全局参数
pub struct GlobalOpts {
    pub config: Option<PathBuf>,
    pub vsphere: Option<String>,
}

impl GlobalOpts {
    pub fn profile(&self) -> Option<&str> {
        self.vsphere.as_deref()
    }
}

/// 读取配置文件
pub fn load_config(opts: &GlobalOpts) -> Result<VsphereConfig> {
    let path = match &opts.config {
        Some(path) => path.clone(),
        None => VsphereConfig::default_path().context("无法确定默认配置路径")?,
    };
    debug!("加载配置: {}", path.display());

    VsphereConfig::load(&path).with_context(|| format!("加载配置失败: {}", path.display()))
}

/// 创建连接管理器
pub fn create_manager(opts: &GlobalOpts) -> Result<ConnectionManager> {
    let config = load_config(opts)?;
    ConnectionManager::new(config).context("vsphere 配置无效")
}

/// 登录 VIM 会话
pub async fn connect_vim(opts: &GlobalOpts) -> Result<VimSession> {
    let manager = create_manager(opts)?;
    VimSession::connect(&manager, opts.profile())
        .await
        .context("vSphere 登录失败")
}

/// 登录标签 REST 接口
pub async fn connect_tagging(opts: &GlobalOpts) -> Result<TaggingClient> {
    let manager = create_manager(opts)?;
    TaggingClient::connect(&manager, opts.profile())
        .await
        .context("REST 登录失败")
}

/// 以格式化 JSON 输出
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// 输出 `(success, detail)` 结果，失败时在 stderr 给出提示
pub fn print_outcome<T: Serialize>(outcome: &Outcome<T>) -> Result<()> {
    print_json(outcome)?;
    if outcome.success {
        eprintln!("{} 完成", "✓".green().bold());
    } else {
        eprintln!("{} 未完成", "✗".red().bold());
    }
    Ok(())
}

/// 登出会话并返回命令结果
pub async fn finish(session: VimSession, result: Result<()>) -> Result<()> {
    session.disconnect().await;
    result
}

/// 注销 REST 会话并返回命令结果
pub async fn finish_rest(client: TaggingClient, result: Result<()>) -> Result<()> {
    // 登出失败已在客户端记录，不覆盖命令结果
    client.logout().await.ok();
    result
}
