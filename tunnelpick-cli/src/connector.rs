use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::process::Command;
use tracing::info;
use tunnelpick_core::Transport;

/// 连接器配置
///
/// 调用方显式传入全部参数，连接器自身不做任何平台或环境探测。
pub struct ConnectOptions {
    pub vpn_path: String,
    pub config_dir: PathBuf,
    pub transport: Transport,
    pub dry_run: bool,
}

/// 选中服务器对应的.ovpn配置文件路径
pub fn ovpn_config_path(server: &str, options: &ConnectOptions) -> PathBuf {
    options.config_dir.join(format!(
        "{}.{}.ovpn",
        server,
        options.transport.ovpn_suffix()
    ))
}

/// 用外部VPN客户端连接到选中的服务器
pub async fn connect(server: &str, options: &ConnectOptions) -> Result<()> {
    let config_path = ovpn_config_path(server, options);

    if options.dry_run {
        println!("{} --config {}", options.vpn_path, config_path.display());
        return Ok(());
    }

    info!("Connecting to {} using {}", server, config_path.display());
    let status = Command::new(&options.vpn_path)
        .arg("--config")
        .arg(&config_path)
        .status()
        .await
        .with_context(|| format!("failed to launch VPN client '{}'", options.vpn_path))?;

    if !status.success() {
        anyhow::bail!(
            "VPN client exited with status {} while connecting to {}",
            status,
            server
        );
    }

    Ok(())
}
