//! Store configuration
//!
//! Plain configuration structs with environment-variable constructors.
//! Backend selection is explicit: `BackendConfig::from_env` reads
//! `KV_BACKEND` ("sqlite" or "redis") and fills in the matching variant's
//! settings, with defaults suitable for local development. The library never
//! reads the environment on its own; callers decide when to use `from_env`.

use crate::common::{VaultKvError, VaultKvResult};
use std::env;
use std::path::PathBuf;

const DEFAULT_CATALOG_PATH: &str = "kv_store.db";
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_REDIS_URL: &str = "redis://localhost:6379/0";
const DEFAULT_NAMESPACE: &str = "kv";
const DEFAULT_ANALYZER_DB: &str = "pattern_analysis.db";
const DEFAULT_ANALYZER_NAMESPACE: &str = "kv:pa";

/// Which storage backend to run, with its backend-specific settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    Filesystem {
        /// SQLite catalog database path
        catalog_path: PathBuf,
        /// Directory holding the payload files
        data_dir: PathBuf,
    },
    Redis {
        /// Connection URL
        url: String,
        /// Prefix for data/meta entries
        namespace: String,
    },
}

impl BackendConfig {
    /// Resolves the backend from `KV_BACKEND` ("sqlite", the default, or
    /// "redis") and its variant-specific variables
    pub fn from_env() -> VaultKvResult<Self> {
        let backend = env::var("KV_BACKEND").unwrap_or_else(|_| "sqlite".to_string());
        match backend.as_str() {
            "sqlite" => Ok(BackendConfig::Filesystem {
                catalog_path: PathBuf::from(var_or("KV_CATALOG_PATH", DEFAULT_CATALOG_PATH)),
                data_dir: PathBuf::from(var_or("KV_DATA_DIR", DEFAULT_DATA_DIR)),
            }),
            "redis" => Ok(BackendConfig::Redis {
                url: var_or("REDIS_URL", DEFAULT_REDIS_URL),
                namespace: var_or("REDIS_NAMESPACE", DEFAULT_NAMESPACE),
            }),
            other => Err(VaultKvError::Config(format!(
                "unknown backend {:?}, expected \"sqlite\" or \"redis\"",
                other
            ))),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Filesystem {
            catalog_path: PathBuf::from(DEFAULT_CATALOG_PATH),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

/// Where the pattern analyzer keeps its data, matching the backend kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyzerConfig {
    Sqlite {
        db_path: PathBuf,
    },
    Redis {
        url: String,
        /// Kept distinct from the store namespace so analyzer keys never
        /// collide with data/meta entries
        namespace: String,
    },
}

impl AnalyzerConfig {
    /// Picks the analyzer variant matching a backend configuration
    pub fn from_env(backend: &BackendConfig) -> Self {
        match backend {
            BackendConfig::Filesystem { .. } => AnalyzerConfig::Sqlite {
                db_path: PathBuf::from(var_or("KV_ANALYZER_PATH", DEFAULT_ANALYZER_DB)),
            },
            BackendConfig::Redis { url, .. } => AnalyzerConfig::Redis {
                url: url.clone(),
                namespace: var_or("KV_ANALYZER_NAMESPACE", DEFAULT_ANALYZER_NAMESPACE),
            },
        }
    }
}

/// Encryption passphrase from `KV_STORE_PASSWORD`, with a development-only
/// fallback
pub fn passphrase_from_env() -> String {
    var_or("KV_STORE_PASSWORD", "default_password_change_me")
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_backend_is_filesystem() {
        let config = BackendConfig::default();
        assert_eq!(
            config,
            BackendConfig::Filesystem {
                catalog_path: PathBuf::from("kv_store.db"),
                data_dir: PathBuf::from("data"),
            }
        );
    }

    #[test]
    fn test_analyzer_variant_follows_backend() {
        let backend = BackendConfig::Redis {
            url: "redis://example:6379/1".to_string(),
            namespace: "kv".to_string(),
        };
        match AnalyzerConfig::from_env(&backend) {
            AnalyzerConfig::Redis { url, namespace } => {
                assert_eq!(url, "redis://example:6379/1");
                assert_eq!(namespace, "kv:pa");
            }
            other => panic!("expected redis analyzer, got {:?}", other),
        }
    }
}
