//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the review service.
//! Nothing in request handling reads process-wide environment variables; [`ServerConfig`] is
//! built from a lookup function so tests can supply values without touching the environment.

use crate::constants::{
    DEFAULT_ADDR, DEFAULT_DATA_DIR, DEFAULT_MAX_FILE_SIZE, DEFAULT_MAX_TOTAL_SIZE,
    DEFAULT_PUBLIC_URL, DEFAULT_SIGNED_URL_TTL_SECS,
};
use crate::{ReviewError, ReviewResult};
use bannershare_files::{StorageConfig, MAX_TTL_SECS, MIN_SECRET_LEN};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const ENV_ADDR: &str = "BANNERSHARE_ADDR";
pub const ENV_PUBLIC_URL: &str = "BANNERSHARE_PUBLIC_URL";
pub const ENV_STORAGE: &str = "BANNERSHARE_STORAGE";
pub const ENV_DATA_DIR: &str = "BANNERSHARE_DATA_DIR";
pub const ENV_MAX_FILE_SIZE: &str = "BANNERSHARE_MAX_FILE_SIZE";
pub const ENV_MAX_TOTAL_SIZE: &str = "BANNERSHARE_MAX_TOTAL_SIZE";
pub const ENV_SIGNED_URL_TTL_SECS: &str = "BANNERSHARE_SIGNED_URL_TTL_SECS";
pub const ENV_SIGNING_SECRET: &str = "BANNERSHARE_SIGNING_SECRET";

/// Size limits enforced on every upload, in bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadLimits {
    max_file_size: u64,
    max_total_size: u64,
}

impl UploadLimits {
    /// Both limits must be non-zero and the per-file limit may not exceed the total.
    pub fn new(max_file_size: u64, max_total_size: u64) -> ReviewResult<Self> {
        if max_file_size == 0 || max_total_size == 0 {
            return Err(ReviewError::Config("upload limits must be non-zero".into()));
        }
        if max_file_size > max_total_size {
            return Err(ReviewError::Config(
                "per-file limit cannot exceed the total limit".into(),
            ));
        }
        Ok(Self {
            max_file_size,
            max_total_size,
        })
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    pub fn max_total_size(&self) -> u64 {
        self.max_total_size
    }
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_total_size: DEFAULT_MAX_TOTAL_SIZE,
        }
    }
}

/// Formats a byte count the way progress and limit messages show it: `B`, `KB` or `MB`.
pub fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let kb = bytes as f64 / KIB;
    if kb < KIB {
        return format!("{kb:.1} KB");
    }
    format!("{:.1} MB", kb / KIB)
}

/// Server configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    addr: String,
    public_url: String,
    storage: StorageConfig,
    limits: UploadLimits,
    signed_url_ttl_secs: u64,
    signing_secret: Option<Vec<u8>>,
}

impl ServerConfig {
    pub fn new(
        addr: String,
        public_url: String,
        storage: StorageConfig,
        limits: UploadLimits,
        signed_url_ttl_secs: u64,
        signing_secret: Option<Vec<u8>>,
    ) -> ReviewResult<Self> {
        if addr.trim().is_empty() {
            return Err(ReviewError::Config("listen address cannot be empty".into()));
        }
        let parsed = url::Url::parse(&public_url)
            .map_err(|e| ReviewError::Config(format!("public URL is invalid: {e}")))?;
        if parsed.cannot_be_a_base() {
            return Err(ReviewError::Config("public URL must be hierarchical".into()));
        }
        if signed_url_ttl_secs == 0 {
            return Err(ReviewError::Config("signed URL lifetime must be positive".into()));
        }
        if signed_url_ttl_secs > MAX_TTL_SECS {
            return Err(ReviewError::Config(format!(
                "signed URL lifetime must be at most {MAX_TTL_SECS} seconds"
            )));
        }
        if let Some(secret) = &signing_secret {
            if secret.len() < MIN_SECRET_LEN {
                return Err(ReviewError::Config(format!(
                    "signing secret must be at least {MIN_SECRET_LEN} bytes"
                )));
            }
        }

        Ok(Self {
            addr,
            public_url: public_url.trim_end_matches('/').to_string(),
            storage,
            limits,
            signed_url_ttl_secs,
            signing_secret,
        })
    }

    /// Builds the configuration from named values, typically `std::env::var`.
    ///
    /// Unset or blank values take their defaults. A missing signing secret is left as `None`
    /// and the server generates one per process.
    pub fn from_lookup<F>(lookup: F) -> ReviewResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let addr = value(ENV_ADDR).unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let public_url = value(ENV_PUBLIC_URL).unwrap_or_else(|| DEFAULT_PUBLIC_URL.to_string());
        let storage = storage_from_env_values(value(ENV_STORAGE), value(ENV_DATA_DIR))?;
        let limits = UploadLimits::new(
            u64_from_env_value(ENV_MAX_FILE_SIZE, value(ENV_MAX_FILE_SIZE), DEFAULT_MAX_FILE_SIZE)?,
            u64_from_env_value(
                ENV_MAX_TOTAL_SIZE,
                value(ENV_MAX_TOTAL_SIZE),
                DEFAULT_MAX_TOTAL_SIZE,
            )?,
        )?;
        let ttl = u64_from_env_value(
            ENV_SIGNED_URL_TTL_SECS,
            value(ENV_SIGNED_URL_TTL_SECS),
            DEFAULT_SIGNED_URL_TTL_SECS,
        )?;
        let secret = value(ENV_SIGNING_SECRET)
            .map(|hex_secret| {
                hex::decode(&hex_secret).map_err(|_| {
                    ReviewError::Config(format!("{ENV_SIGNING_SECRET} must be hex encoded"))
                })
            })
            .transpose()?;

        Self::new(addr, public_url, storage, limits, ttl, secret)
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Base URL without a trailing slash.
    pub fn public_url(&self) -> &str {
        &self.public_url
    }

    pub fn storage(&self) -> &StorageConfig {
        &self.storage
    }

    pub fn limits(&self) -> UploadLimits {
        self.limits
    }

    pub fn signed_url_ttl_secs(&self) -> u64 {
        self.signed_url_ttl_secs
    }

    pub fn signing_secret(&self) -> Option<&[u8]> {
        self.signing_secret.as_deref()
    }
}

/// Parse a byte count or duration, falling back to `default` when unset.
pub fn u64_from_env_value(name: &str, value: Option<String>, default: u64) -> ReviewResult<u64> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|_| ReviewError::Config(format!("{name} must be a whole number, got '{raw}'"))),
    }
}

/// Parse the storage backend selection.
pub fn storage_from_env_values(
    backend: Option<String>,
    data_dir: Option<String>,
) -> ReviewResult<StorageConfig> {
    match backend.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None | Some("filesystem") => Ok(StorageConfig::Filesystem {
            path: PathBuf::from(data_dir.unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())),
        }),
        Some("memory") => Ok(StorageConfig::Memory),
        Some(other) => Err(ReviewError::Config(format!(
            "{ENV_STORAGE} must be 'filesystem' or 'memory', got '{other}'"
        ))),
    }
}
