//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries the
//! server, storage and keep-alive sections. Every section defaults sensibly
//! so a completely empty `{}` file is valid. A handful of environment
//! variables (`PORT`, `UPLOAD_DIR`, `SELF_URL`) override the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub keepalive: KeepaliveConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides using `lookup` to resolve variable names.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(port) = lookup("PORT") {
            match port.trim().parse() {
                Ok(port) => self.server.port = port,
                Err(e) => tracing::warn!("Ignoring invalid PORT {port:?}: {e}"),
            }
        }

        if let Some(dir) = lookup("UPLOAD_DIR").filter(|d| !d.is_empty()) {
            self.storage.upload_dir = PathBuf::from(dir);
        }

        if let Some(url) = lookup("SELF_URL").filter(|u| !u.is_empty()) {
            self.keepalive.url = Some(url);
        }
    }

    /// URL the keep-alive task pings: the configured one, or the local server.
    pub fn keepalive_url(&self) -> String {
        self.keepalive
            .url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", self.server.port))
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if self.server.max_upload_bytes == 0 {
            warnings.push("server.max_upload_bytes is 0; every upload will be rejected".into());
        }

        if let Some(ref url) = self.server.public_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                warnings.push(format!(
                    "server.public_url '{url}' does not start with http:// or https://"
                ));
            }
        }

        if self.storage.max_id_attempts == 0 {
            warnings.push(
                "storage.max_id_attempts is 0; every upload will fail with storage exhausted"
                    .into(),
            );
        }

        if self.keepalive.enabled && self.keepalive.interval_secs == 0 {
            warnings.push("keepalive.interval_secs is 0; keep-alive is disabled".into());
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory of static assets served for unmatched paths.
    pub static_dir: Option<PathBuf>,
    /// Base URL used for returned image links instead of the request host.
    pub public_url: Option<String>,
    /// Maximum accepted request body size for uploads.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            static_dir: Some(PathBuf::from("public")),
            public_url: None,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Upload store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    /// Identifier draws per upload before giving up on collisions.
    pub max_id_attempts: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: std::env::temp_dir().join("uploads"),
            max_id_attempts: 8,
        }
    }
}

/// Self-ping settings that keep free-tier hosts from idling the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeepaliveConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    pub url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 300,
            url: None,
            timeout_secs: 30,
        }
    }
}
