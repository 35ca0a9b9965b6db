// src/utils.rs

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Read an env var as an override, `None` if unset or empty.
pub fn env_override(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Resolve a configurable value: env var if set, otherwise the default.
pub fn resolve_env(key: &str, default: &str) -> String {
    env_override(key).unwrap_or_else(|| default.to_string())
}

pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).with_context(|| format!("Failed to create {:?}", path))?;
    }
    Ok(())
}

/// Embed a Rust string as a JS string literal (quoted and escaped).
pub fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_string_escapes_quotes_and_backslashes() {
        assert_eq!(js_string("plain"), r#""plain""#);
        assert_eq!(js_string(r#"a"b"#), r#""a\"b""#);
        assert_eq!(js_string("вул. Зоологічна"), "\"вул. Зоологічна\"");
    }

    #[test]
    fn resolve_env_falls_back_to_default() {
        assert_eq!(resolve_env("VOLTA_TEST_UNSET_VAR", "fallback"), "fallback");
    }
}
