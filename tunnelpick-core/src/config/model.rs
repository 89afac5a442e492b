use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// 服务器选择指标
    #[serde(default)]
    pub metric: SelectionMetric,
    /// openvpn可执行文件路径
    #[serde(default = "default_vpn_path")]
    pub vpn_path: String,
    /// .ovpn配置文件目录，用于候选服务器发现
    #[serde(default)]
    pub config_dir: Option<PathBuf>,
    /// 限制候选服务器的名称模式（锚定在开头）
    #[serde(default)]
    pub filter: Option<String>,
    /// 连接使用的传输方式
    #[serde(default)]
    pub transport: Transport,
    #[serde(default)]
    pub probe: ProbeSettings,
    #[serde(default)]
    pub load_api: LoadApiSettings,
}

/// 延迟探测配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProbeSettings {
    /// 每台主机的探测次数
    #[serde(default = "default_probe_tries")]
    pub tries: u32,
    /// 单次探测的超时时间
    #[serde(default = "default_probe_timeout")]
    pub timeout_seconds: u64,
}

/// 负载目录服务配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoadApiSettings {
    #[serde(default = "default_load_api_url")]
    pub url: String,
    #[serde(default = "default_load_api_timeout")]
    pub timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            metric: SelectionMetric::default(),
            vpn_path: default_vpn_path(),
            config_dir: None,
            filter: None,
            transport: Transport::default(),
            probe: ProbeSettings::default(),
            load_api: LoadApiSettings::default(),
        }
    }
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            tries: default_probe_tries(),
            timeout_seconds: default_probe_timeout(),
        }
    }
}

impl Default for LoadApiSettings {
    fn default() -> Self {
        Self {
            url: default_load_api_url(),
            timeout_seconds: default_load_api_timeout(),
        }
    }
}

/// 选择指标
///
/// 每次运行选定一个，在该次运行期间固定不变。
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMetric {
    /// 仅按平均往返延迟选择
    #[default]
    Latency,
    /// 仅按远端上报的负载百分比选择
    Load,
    /// 按延迟排名与负载排名之和选择
    LatencyThenLoad,
}

/// 连接传输方式，决定.ovpn文件名后缀
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    Udp,
    #[default]
    Tcp,
}

impl Transport {
    /// 对应的.ovpn文件名协议段
    pub fn ovpn_suffix(&self) -> &'static str {
        match self {
            Transport::Udp => "udp1194",
            Transport::Tcp => "tcp443",
        }
    }
}

// Default value functions
fn default_vpn_path() -> String {
    "openvpn".to_string()
}

fn default_probe_tries() -> u32 {
    3
}

fn default_probe_timeout() -> u64 {
    2
}

fn default_load_api_url() -> String {
    "https://api.nordvpn.com/server".to_string()
}

fn default_load_api_timeout() -> u64 {
    10
}

impl Config {
    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        if self.vpn_path.is_empty() {
            anyhow::bail!("vpn_path is empty");
        }

        if self.probe.tries == 0 {
            anyhow::bail!("probe.tries cannot be 0");
        }

        if self.probe.tries > 20 {
            anyhow::bail!(
                "probe.tries too large: {} (maximum 20)",
                self.probe.tries
            );
        }

        if self.probe.timeout_seconds == 0 {
            anyhow::bail!("probe.timeout_seconds cannot be 0");
        }

        if self.load_api.url.is_empty() {
            anyhow::bail!("load_api.url is empty");
        }

        if !self.load_api.url.starts_with("http://") && !self.load_api.url.starts_with("https://") {
            anyhow::bail!(
                "load_api.url has invalid format: '{}'. Must start with http:// or https://",
                self.load_api.url
            );
        }

        if self.load_api.timeout_seconds == 0 {
            anyhow::bail!("load_api.timeout_seconds cannot be 0");
        }

        // 过滤模式必须能编译，启动时就失败而不是探测时
        if let Some(pattern) = &self.filter {
            crate::filter::compile_filter(pattern)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.metric, SelectionMetric::Latency);
        assert_eq!(config.transport, Transport::Tcp);
        assert_eq!(config.probe.tries, 3);
    }

    #[test]
    fn test_zero_tries_rejected() {
        let config = Config {
            probe: ProbeSettings {
                tries: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_load_api_url_rejected() {
        let config = Config {
            load_api: LoadApiSettings {
                url: "ftp://example.com".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_filter_pattern_rejected() {
        let config = Config {
            filter: Some("us[1".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_transport_suffixes() {
        assert_eq!(Transport::Tcp.ovpn_suffix(), "tcp443");
        assert_eq!(Transport::Udp.ovpn_suffix(), "udp1194");
    }

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
metric = "latency_then_load"
vpn_path = "/usr/sbin/openvpn"
config_dir = "/etc/openvpn/client"
filter = "us[0-9]+"
transport = "udp"

[probe]
tries = 5
timeout_seconds = 3

[load_api]
url = "https://catalog.example.com/servers"
timeout_seconds = 15
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.metric, SelectionMetric::LatencyThenLoad);
        assert_eq!(config.transport, Transport::Udp);
        assert_eq!(config.probe.tries, 5);
        assert_eq!(config.load_api.timeout_seconds, 15);
    }
}
