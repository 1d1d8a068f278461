//! Node configuration sourced from environment variables.

use crate::error::{Error, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use waitlist_core::ServiceConfig;

/// Configuration for a waitlist node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Data directory for storage
    pub data_dir: PathBuf,

    /// HTTP API listen address
    pub api_addr: SocketAddr,

    /// Admin socket path (for waitlist-admin CLI)
    pub admin_socket: PathBuf,

    /// Public site used to build referral links
    pub site_url: String,

    /// Allocation and referral tunables
    pub service: ServiceConfig,
}

impl NodeConfig {
    /// Create config from environment variables with sensible defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from any key lookup; missing keys take defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let data_dir = PathBuf::from(
            lookup("WAITLIST_DATA_DIR").unwrap_or_else(|| "./waitlist-data".to_string()),
        );

        let api_addr = parse_var(&lookup, "WAITLIST_API_ADDR", "0.0.0.0:8080")?;

        let admin_socket = lookup("WAITLIST_ADMIN_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("admin.sock"));

        let site_url = lookup("WAITLIST_SITE_URL")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();

        let defaults = ServiceConfig::default();
        let service = ServiceConfig {
            max_code_attempts: parse_var(
                &lookup,
                "WAITLIST_CODE_RETRIES",
                &defaults.max_code_attempts.to_string(),
            )?,
            referral_boost: parse_var(
                &lookup,
                "WAITLIST_REFERRAL_BOOST",
                &defaults.referral_boost.to_string(),
            )?,
            ..defaults
        };

        Ok(Self {
            data_dir,
            api_addr,
            admin_socket,
            site_url,
            service,
        })
    }

    /// Directory holding the RocksDB files.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("db")
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(key).unwrap_or_else(|| default.to_string());
    raw.trim()
        .parse()
        .map_err(|e| Error::InvalidConfig(format!("{}={:?}: {}", key, raw, e)))
}
