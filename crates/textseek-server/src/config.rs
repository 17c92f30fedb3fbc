use std::net::SocketAddr;
use std::path::PathBuf;
use textseek_core::{DEFAULT_PAGE_SIZE, DEFAULT_SUGGEST_LIMIT, MAX_PAGE_SIZE, MAX_SUGGEST_LIMIT};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: cannot parse `{value}`")]
    Parse { var: &'static str, value: String },
    #[error("{var}: {value} is outside 1..={max}")]
    OutOfRange {
        var: &'static str,
        value: usize,
        max: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// JSON-lines documents loaded into the in-memory store at startup.
    pub data_file: Option<PathBuf>,
    pub default_limit: usize,
    pub suggest_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            data_file: None,
            default_limit: DEFAULT_PAGE_SIZE,
            suggest_limit: DEFAULT_SUGGEST_LIMIT,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        if let Some(v) = get("TEXTSEEK_ADDR") {
            cfg.addr = parse("TEXTSEEK_ADDR", &v)?;
        }
        cfg.data_file = get("TEXTSEEK_DATA_FILE")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);
        if let Some(v) = get("TEXTSEEK_DEFAULT_LIMIT") {
            cfg.default_limit = bounded("TEXTSEEK_DEFAULT_LIMIT", &v, MAX_PAGE_SIZE)?;
        }
        if let Some(v) = get("TEXTSEEK_SUGGEST_LIMIT") {
            cfg.suggest_limit = bounded("TEXTSEEK_SUGGEST_LIMIT", &v, MAX_SUGGEST_LIMIT)?;
        }
        Ok(cfg)
    }
}

fn parse<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Parse {
        var,
        value: value.to_string(),
    })
}

fn bounded(var: &'static str, value: &str, max: usize) -> Result<usize, ConfigError> {
    let n: usize = parse(var, value)?;
    if (1..=max).contains(&n) {
        Ok(n)
    } else {
        Err(ConfigError::OutOfRange { var, value: n, max })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults() {
        let cfg = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, ServerConfig::default());
        assert_eq!(cfg.default_limit, 10);
        assert_eq!(cfg.suggest_limit, 5);
    }

    #[test]
    fn overrides() {
        let cfg = ServerConfig::from_lookup(lookup(&[
            ("TEXTSEEK_ADDR", "127.0.0.1:9000"),
            ("TEXTSEEK_DATA_FILE", "/tmp/docs.jsonl"),
            ("TEXTSEEK_DEFAULT_LIMIT", "25"),
            ("TEXTSEEK_SUGGEST_LIMIT", "20"),
        ]))
        .unwrap();
        assert_eq!(cfg.addr.port(), 9000);
        assert_eq!(cfg.data_file, Some(PathBuf::from("/tmp/docs.jsonl")));
        assert_eq!(cfg.default_limit, 25);
        assert_eq!(cfg.suggest_limit, 20);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            ServerConfig::from_lookup(lookup(&[("TEXTSEEK_ADDR", "nowhere")])),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            ServerConfig::from_lookup(lookup(&[("TEXTSEEK_DEFAULT_LIMIT", "101")])),
            Err(ConfigError::OutOfRange { .. })
        ));
        assert!(matches!(
            ServerConfig::from_lookup(lookup(&[("TEXTSEEK_SUGGEST_LIMIT", "0")])),
            Err(ConfigError::OutOfRange { .. })
        ));
    }
}
