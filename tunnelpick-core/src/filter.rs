use anyhow::{Context, Result};
use regex::Regex;

/// 编译服务器名称过滤模式
///
/// 模式锚定在名称开头：`us` 匹配 `us1.example.com`，不匹配 `de-us.example.com`。
pub fn compile_filter(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{pattern})"))
        .with_context(|| format!("invalid filter pattern '{pattern}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_is_anchored_at_start() {
        let re = compile_filter("us[0-9]+").unwrap();
        assert!(re.is_match("us1.example.com"));
        assert!(re.is_match("us42.example.com"));
        assert!(!re.is_match("de1.example.com"));
        // 中间出现的匹配不算
        assert!(!re.is_match("backup-us1.example.com"));
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        assert!(compile_filter("us[1").is_err());
    }
}
