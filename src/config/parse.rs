//! Project config parsing
//!
//! Line format:
//! - `KEY = value`
//! - `KEY[arch] = value` (only applies on the named architecture)
//! - `# comment` and blank lines are ignored
//!
//! Keys are case-insensitive. An architecture-specific line wins over the
//! plain key no matter which comes first.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;

use crate::core::error::ConfigError;

/// Regex for `KEY = value` and `KEY[arch] = value`
pub static LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s*(?:\[\s*([A-Za-z0-9_\-]+)\s*\])?\s*=\s*(.*?)\s*$")
        .expect("Invalid LINE_RE regex")
});

/// Key/value settings after architecture selection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    values: BTreeMap<String, String>,
}

impl Settings {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Settings whose key starts with `prefix`, with the prefix stripped
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.values.iter().filter_map(move |(key, value)| {
            key.strip_prefix(prefix)
                .filter(|rest| !rest.is_empty())
                .map(|rest| (rest, value.as_str()))
        })
    }
}

/// Parse config text for the given architecture
pub fn parse(text: &str, path: &Path, arch: &str) -> Result<Settings, ConfigError> {
    let mut plain = BTreeMap::new();
    let mut specific = BTreeMap::new();

    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let caps = LINE_RE.captures(line).ok_or_else(|| ConfigError::Syntax {
            path: path.to_path_buf(),
            line: idx + 1,
            text: line.to_string(),
        })?;

        let key = caps[1].to_ascii_uppercase();
        let value = unquote(&caps[3]).to_string();

        match caps.get(2) {
            Some(target) if target.as_str().eq_ignore_ascii_case(arch) => {
                specific.insert(key, value);
            }
            Some(_) => {}
            None => {
                plain.insert(key, value);
            }
        }
    }

    plain.extend(specific);
    Ok(Settings { values: plain })
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(text: &str, arch: &str) -> Settings {
        parse(text, Path::new(".pinrun"), arch).unwrap()
    }

    #[test]
    fn test_plain_keys() {
        let settings = parse_ok("URL = https://x/tool.zip\nchecksum=abc\n", "x86_64");
        assert_eq!(settings.get("URL"), Some("https://x/tool.zip"));
        assert_eq!(settings.get("CHECKSUM"), Some("abc"));
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let settings = parse_ok("# pinned tool\n\n   \nEXECUTABLE = bin/tool\n", "x86_64");
        assert_eq!(settings.get("EXECUTABLE"), Some("bin/tool"));
    }

    #[test]
    fn test_arch_override_wins_regardless_of_order() {
        let text = "URL[aarch64] = https://x/arm.zip\nURL = https://x/intel.zip\n";
        assert_eq!(parse_ok(text, "aarch64").get("URL"), Some("https://x/arm.zip"));
        assert_eq!(parse_ok(text, "x86_64").get("URL"), Some("https://x/intel.zip"));
    }

    #[test]
    fn test_other_arch_only() {
        let settings = parse_ok("URL[aarch64] = https://x/arm.zip\n", "x86_64");
        assert_eq!(settings.get("URL"), None);
    }

    #[test]
    fn test_quoted_value() {
        let settings = parse_ok("EXECUTABLE = \"bin/my tool\"\n", "x86_64");
        assert_eq!(settings.get("EXECUTABLE"), Some("bin/my tool"));
    }

    #[test]
    fn test_value_may_contain_equals() {
        let settings = parse_ok("URL = https://x/get?a=1&b=2\n", "x86_64");
        assert_eq!(settings.get("URL"), Some("https://x/get?a=1&b=2"));
    }

    #[test]
    fn test_syntax_error_reports_line() {
        let err = parse("URL = a\nnot a setting\n", Path::new(".pinrun"), "x86_64").unwrap_err();
        match err {
            ConfigError::Syntax { line, text, .. } => {
                assert_eq!(line, 2);
                assert_eq!(text, "not a setting");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_with_prefix() {
        let settings = parse_ok("ENV_FOO = 1\nENV_BAR = two\nENV_ = skipped\nURL = u\n", "x86_64");
        let env: Vec<_> = settings.with_prefix("ENV_").collect();
        assert_eq!(env, vec![("BAR", "two"), ("FOO", "1")]);
    }
}
