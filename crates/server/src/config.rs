use anyhow::Context;
use serde::{Deserialize, Serialize};
use shardhaven_protocol::paths;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

pub const DEFAULT_PORT: u16 = 39444;

/// Server settings, read from a YAML file. Every field is optional there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    /// Prefix every API route is mounted under.
    pub base_path: String,
    /// Hex SHA-256 of the staff session token; `None` disables the check.
    pub staff_token_sha256: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_PORT),
            db_path: default_db_path(),
            base_path: paths::DEFAULT_BASE.to_string(),
            staff_token_sha256: None,
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config: {}", path.display()))?;
        Self::from_yaml(&raw).with_context(|| format!("parse config: {}", path.display()))
    }

    pub fn from_yaml(raw: &str) -> anyhow::Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut cfg: Self = serde_yaml::from_str(raw)?;
        cfg.base_path = normalize_base_path(&cfg.base_path);
        if let Some(hash) = cfg.staff_token_sha256.as_mut() {
            *hash = hash.trim().to_ascii_lowercase();
        }
        Ok(cfg)
    }
}

pub fn default_db_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".shardhaven")
        .join("shardhaven.db")
}

/// `"api/x/"` -> `"/api/x"`; empty or `/` mounts at the root.
pub fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}
