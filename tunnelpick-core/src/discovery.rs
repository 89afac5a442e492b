use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

/// 候选服务器集合
///
/// BTreeSet保证去重和确定性的迭代顺序，选择时的并列打破依赖后者。
pub type CandidateSet = BTreeSet<String>;

// 文件名形如 <serverid>.<protocoltag>.ovpn，例如 us1.example.com.tcp443.ovpn
#[allow(clippy::unwrap_used)]
static OVPN_FILENAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<dns>.+)\.(?P<protocol>[A-Za-z]+\d+)\.ovpn$").unwrap()
});

/// 从.ovpn文件名中解析服务器标识
///
/// 不符合 `<serverid>.<protocoltag>.ovpn` 约定的文件名返回None。
pub fn parse_candidate_filename(filename: &str) -> Option<&str> {
    OVPN_FILENAME
        .captures(filename)
        .and_then(|caps| caps.name("dns"))
        .map(|m| m.as_str())
}

/// 扫描目录，从.ovpn配置文件名中收集候选服务器集合
///
/// 同一服务器的多个传输变体（tcp443/udp1194）只贡献一个候选。
pub fn discover_candidates(dir: &Path) -> Result<CandidateSet> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read config file directory {}", dir.display()))?;

    let mut candidates = CandidateSet::new();
    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", dir.display()))?;
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            debug!("Skipping non-UTF8 file name in {}", dir.display());
            continue;
        };
        match parse_candidate_filename(name) {
            Some(server) => {
                candidates.insert(server.to_string());
            }
            None => {
                debug!("Skipping file without server name pattern: {}", name);
            }
        }
    }

    debug!(
        "Discovered {} candidate servers in {}",
        candidates.len(),
        dir.display()
    );
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_candidate_filename() {
        assert_eq!(
            parse_candidate_filename("us1.example.com.tcp443.ovpn"),
            Some("us1.example.com")
        );
        assert_eq!(
            parse_candidate_filename("de-frankfurt2.example.com.udp1194.ovpn"),
            Some("de-frankfurt2.example.com")
        );
    }

    #[test]
    fn test_parse_rejects_other_files() {
        assert_eq!(parse_candidate_filename("README.md"), None);
        assert_eq!(parse_candidate_filename("us1.example.com.ovpn"), None);
        assert_eq!(parse_candidate_filename("notes.tcp443.txt"), None);
        // 协议段必须是字母加数字
        assert_eq!(parse_candidate_filename("us1.example.com.backup.ovpn"), None);
    }

    #[test]
    fn test_discover_deduplicates_transports() {
        let dir = std::env::temp_dir().join(format!(
            "tunnelpick-discovery-test-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        for name in [
            "us1.example.com.tcp443.ovpn",
            "us1.example.com.udp1194.ovpn",
            "de1.example.com.tcp443.ovpn",
            "ignore-me.txt",
        ] {
            std::fs::write(dir.join(name), b"").unwrap();
        }

        let candidates = discover_candidates(&dir).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        let expected: CandidateSet = ["de1.example.com", "us1.example.com"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(candidates, expected);
    }

    #[test]
    fn test_missing_directory_is_error() {
        let err = discover_candidates(Path::new("/nonexistent/tunnelpick-test")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/tunnelpick-test"));
    }
}
