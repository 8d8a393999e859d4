//! 连接配置命令

use anyhow::Result;
use colored::Colorize;

use super::common::{load_config, GlobalOpts};

pub async fn handle(action: crate::ProfileAction, opts: &GlobalOpts) -> Result<()> {
    match action {
        crate::ProfileAction::List => list_profiles(opts),
    }
}

fn list_profiles(opts: &GlobalOpts) -> Result<()> {
    let config = load_config(opts)?;
    let names = config.profile_names();

    if names.is_empty() {
        println!("{}", "没有配置任何 vsphere 连接".yellow());
        return Ok(());
    }

    println!("{}\n", "vsphere 连接列表:".bold());

    for name in names {
        let marker = if name == config.default_profile {
            " (默认)".green().to_string()
        } else {
            String::new()
        };

        match config.profile(Some(name)) {
            Ok(profile) => println!(
                "  {} {}{}  {}@{}:{}",
                "●".green(),
                name.cyan().bold(),
                marker,
                profile.user,
                profile.host.yellow(),
                profile.port
            ),
            Err(e) => println!("  {} {}{}  {}", "●".red(), name.cyan().bold(), marker, e.to_string().red()),
        }
    }

    if !config.verify_tls() {
        println!("\n{} 已关闭 TLS 证书校验 (ssl_verify = false)", "!".yellow().bold());
    }

    Ok(())
}
