//! Runtime configuration for object-cache-tier.
//!
//! Configuration is loaded from a JSON file or constructed programmatically.
//! Every field has a default, so a partial file is enough.

use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::cache::tenant::{TenantId, DEFAULT_TENANT};

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "object-cache-tier", about = "Generation-versioned multi-tenant object cache server")]
pub struct Cli {
    /// Path to configuration file (JSON).
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// HTTP listen address (overrides the config file).
    #[arg(long)]
    pub listen: Option<String>,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,

    /// Key namespace and tenant settings.
    pub cache: CacheConfig,

    /// Shared store settings.
    pub store: StoreConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address (e.g. "127.0.0.1:8080").
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Key namespace and tenant settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Salt prefixed to every key. Separates deployments sharing one store.
    pub salt: String,

    /// Installation path, hashed into the key fingerprint.
    pub install_path: String,

    /// Whether tenant switching is honored.
    pub multi_tenant: bool,

    /// Initial tenant (forced to 1 when not multi-tenant).
    pub tenant_id: TenantId,

    /// Groups shared by all tenants.
    pub global_groups: Vec<String>,

    /// Groups always served from the process-local tier.
    pub non_persistent_groups: Vec<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            salt: "oc".to_string(),
            install_path: std::env::current_dir()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| ".".to_string()),
            multi_tenant: false,
            tenant_id: DEFAULT_TENANT,
            global_groups: Vec::new(),
            non_persistent_groups: Vec::new(),
        }
    }
}

/// Shared store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Use the shared store. When false every group is process-local.
    pub enabled: bool,

    /// Encoded values larger than this many bytes are zstd-compressed (0 = never).
    pub compress_threshold: usize,

    /// zstd compression level (1-22).
    pub zstd_level: i32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            compress_threshold: 1024,
            zstd_level: 3,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults for missing fields.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if path.exists() {
            let data = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&data)?;
            Ok(config)
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }
}
