use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per operation (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_secs: 0.25,
            max_delay_secs: 30,
        }
    }
}

/// Connection settings for the aria2 RPC daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub host: String,
    pub port: u16,
    /// Shared secret (`--rpc-secret`); empty means no token is sent.
    pub secret: String,
    /// Timeout for a single RPC round-trip.
    pub rpc_timeout_secs: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6800,
            secret: String::new(),
            rpc_timeout_secs: 10,
        }
    }
}

impl DaemonConfig {
    /// JSON-RPC endpoint URL. A bare host gets an `http://` scheme.
    pub fn endpoint(&self) -> String {
        let host = self.host.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            format!("{}:{}/jsonrpc", host, self.port)
        } else {
            format!("http://{}:{}/jsonrpc", host, self.port)
        }
    }
}

/// Telegram Bot API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub api_base: String,
    /// Timeout for a single media upload.
    pub upload_timeout_secs: u64,
    /// `getUpdates` long-poll timeout.
    pub long_poll_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base: "https://api.telegram.org".to_string(),
            upload_timeout_secs: 300,
            long_poll_secs: 30,
        }
    }
}

/// Per-operation timeouts for direct HTTP fetches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    /// Abort a transfer that stays below 1 KiB/s for this long.
    pub idle_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            idle_timeout_secs: 60,
        }
    }
}

/// Global configuration loaded from `~/.config/leech/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeechConfig {
    /// Root directory; each job works in its own `job-<id>` subdirectory.
    pub download_dir: PathBuf,
    /// Largest artifact (and direct download) accepted, in bytes.
    pub max_artifact_size: u64,
    /// Ceiling on non-terminal jobs across all owners.
    pub max_concurrent_jobs: usize,
    /// Ceiling on non-terminal jobs per owner.
    pub max_jobs_per_owner: usize,
    /// Interval between daemon status polls for one job.
    pub poll_interval_ms: u64,
    /// Minimum gap between two progress edits of the same status message.
    pub progress_edit_interval_ms: u64,
    /// Cadence at which the direct transport emits byte-count samples.
    pub progress_sample_interval_ms: u64,
    /// Upload buffer size for media transfers.
    pub upload_chunk_size: usize,
    /// Users allowed to talk to the bot; empty allows everyone.
    #[serde(default)]
    pub authorized_users: Vec<i64>,
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub http: HttpConfig,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for LeechConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("./downloads"),
            max_artifact_size: 2 * 1024 * 1024 * 1024,
            max_concurrent_jobs: 8,
            max_jobs_per_owner: 2,
            poll_interval_ms: 2000,
            progress_edit_interval_ms: 5000,
            progress_sample_interval_ms: 500,
            upload_chunk_size: 512 * 1024,
            authorized_users: Vec::new(),
            daemon: DaemonConfig::default(),
            telegram: TelegramConfig::default(),
            http: HttpConfig::default(),
            retry: None,
        }
    }
}

impl LeechConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn progress_edit_interval(&self) -> Duration {
        Duration::from_millis(self.progress_edit_interval_ms)
    }

    pub fn progress_sample_interval(&self) -> Duration {
        Duration::from_millis(self.progress_sample_interval_ms)
    }

    pub fn retry_config(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }

    /// True if `user` may use the bot (empty list allows everyone).
    pub fn is_authorized(&self, user: i64) -> bool {
        self.authorized_users.is_empty() || self.authorized_users.contains(&user)
    }

    /// Apply the environment variables the bot was historically deployed with.
    /// `lookup` is `std::env::var(..).ok()` in production; tests pass a map.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("BOT_TOKEN") {
            self.telegram.bot_token = token.trim().to_string();
        }
        if let Some(users) = lookup("AUTHORIZED_USERS") {
            self.authorized_users = users
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .filter_map(|s| match s.parse::<i64>() {
                    Ok(id) => Some(id),
                    Err(_) => {
                        tracing::warn!(value = s, "ignoring malformed AUTHORIZED_USERS entry");
                        None
                    }
                })
                .collect();
        }
        if let Some(dir) = lookup("DOWNLOAD_DIR") {
            self.download_dir = PathBuf::from(dir);
        }
        if let Some(v) = parse_env(&lookup, "MAX_DOWNLOAD_SIZE") {
            self.max_artifact_size = v;
        }
        if let Some(host) = lookup("ARIA2_HOST") {
            self.daemon.host = host;
        }
        if let Some(v) = parse_env(&lookup, "ARIA2_PORT") {
            self.daemon.port = v;
        }
        if let Some(secret) = lookup("ARIA2_SECRET") {
            self.daemon.secret = secret;
        }
        if let Some(v) = parse_env(&lookup, "CHUNK_SIZE") {
            self.upload_chunk_size = v;
        }
    }

    /// Reject limits that would make every job fail.
    pub fn validate_limits(&self) -> Result<()> {
        if self.max_artifact_size == 0 {
            bail!("max_artifact_size must be greater than zero");
        }
        if self.max_concurrent_jobs == 0 || self.max_jobs_per_owner == 0 {
            bail!("job concurrency limits must be greater than zero");
        }
        if self.upload_chunk_size == 0 {
            bail!("upload_chunk_size must be greater than zero");
        }
        Ok(())
    }

    /// Full validation for commands that talk to the bot API.
    pub fn validate_for_bot(&self) -> Result<()> {
        self.validate_limits()?;
        if self.telegram.bot_token.is_empty() {
            bail!("telegram.bot_token (or BOT_TOKEN) is required");
        }
        Ok(())
    }
}

fn parse_env<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable environment override");
            None
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("leech")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<LeechConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = LeechConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load configuration from an explicit file.
pub fn load_from_path(path: &Path) -> Result<LeechConfig> {
    let data = fs::read_to_string(path)?;
    let cfg: LeechConfig = toml::from_str(&data)?;
    Ok(cfg)
}
