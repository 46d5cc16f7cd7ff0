use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Bind address + port shared by every HTTP-serving crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    pub port: u16,
    /// Path to this service's SQLite database file.
    #[serde(default)]
    pub database_path: Option<String>,
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

/// Request deadline applied to every outbound call, per spec.md §5.
pub const DEFAULT_REQUEST_DEADLINE_SECS: u64 = 30;

/// Load a service's TOML config file, merged with environment overrides
/// under `<env_prefix>_`, following `SkynetConfig::load`'s layering:
/// explicit path, then the conventional `./<name>.toml`, then env.
pub fn load<T>(env_prefix: &str, config_path: Option<&str>, default_file: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    let path = config_path.map(String::from).unwrap_or_else(|| default_file.to_string());

    Figment::new()
        .merge(Toml::file(&path))
        .merge(Env::prefixed(&format!("{env_prefix}_")).split("__"))
        .extract()
        .map_err(|e| AppError::Internal(format!("config load failed: {e}")))
}

/// Resolve the on-disk path for a service's data directory, creating it if
/// needed. Mirrors the teacher's `default_db_path` convention of deriving
/// a sensible default from `$HOME` when no explicit path is configured.
pub fn data_dir(service: &str) -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{home}/.lumen/{service}")
}
