use anyhow::{Context, Result};
use common::{Profile, UnknownPlayerPolicy};
use std::net::IpAddr;
use std::path::PathBuf;

pub const ENV_ADDR: &str = "REPLAY_ANALYZER_ADDR";
pub const ENV_PROFILE: &str = "REPLAY_ANALYZER_PROFILE";
pub const ENV_UNKNOWN_PLAYER: &str = "REPLAY_ANALYZER_UNKNOWN_PLAYER";
pub const ENV_STAGING_DIR: &str = "REPLAY_ANALYZER_STAGING_DIR";
pub const ENV_MAX_UPLOAD_BYTES: &str = "REPLAY_ANALYZER_MAX_UPLOAD_BYTES";
pub const ENV_TRUSTED_PROXIES: &str = "REPLAY_ANALYZER_TRUSTED_PROXIES";

const DEFAULT_ADDR: &str = "0.0.0.0:9090";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Server configuration, resolved once at startup and passed into the
/// HTTP server.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to listen on
    pub addr: String,
    /// Profile used when a request does not ask for one
    pub profile: Profile,
    pub unknown_player: UnknownPlayerPolicy,
    /// Directory uploads are staged in while being parsed
    pub staging_dir: PathBuf,
    /// Request body limit for uploads
    pub max_upload_bytes: usize,
    /// Peers allowed to report the client address via forwarding headers.
    /// Empty means forwarding headers are never trusted.
    pub trusted_proxies: Vec<IpAddr>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            profile: Profile::default(),
            unknown_player: UnknownPlayerPolicy::default(),
            staging_dir: std::env::temp_dir(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            trusted_proxies: Vec::new(),
        }
    }
}

impl Config {
    /// Reads the configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup, falling back to
    /// defaults for unset or blank keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Config::default();

        if let Some(addr) = get(ENV_ADDR) {
            config.addr = addr.trim().to_string();
        }

        if let Some(profile) = get(ENV_PROFILE) {
            config.profile = profile
                .parse::<Profile>()
                .with_context(|| format!("Invalid {}", ENV_PROFILE))?;
        }

        if let Some(policy) = get(ENV_UNKNOWN_PLAYER) {
            config.unknown_player = policy
                .parse::<UnknownPlayerPolicy>()
                .with_context(|| format!("Invalid {}", ENV_UNKNOWN_PLAYER))?;
        }

        if let Some(dir) = get(ENV_STAGING_DIR) {
            config.staging_dir = PathBuf::from(dir.trim());
        }

        if let Some(limit) = get(ENV_MAX_UPLOAD_BYTES) {
            config.max_upload_bytes = limit.trim().parse::<usize>().with_context(|| {
                format!("{} must be a byte count, got '{}'", ENV_MAX_UPLOAD_BYTES, limit)
            })?;
        }

        if let Some(proxies) = get(ENV_TRUSTED_PROXIES) {
            config.trusted_proxies = proxies
                .split(',')
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse::<IpAddr>()
                        .with_context(|| format!("Invalid IP '{}' in {}", s, ENV_TRUSTED_PROXIES))
                })
                .collect::<Result<Vec<_>>>()?;
        }

        Ok(config)
    }
}
