use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::api::job::JobSettings;
use crate::quota::DEFAULT_QUOTA_LIMIT;

/// Client configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the summarization service
    /// Default: https://egnoocminsoc.site
    pub api_base_url: String,

    /// Delay between two status polls
    /// Default: 1000ms
    pub poll_interval: Duration,

    /// Status polls before a job is reported as timed out
    /// Default: 600
    pub max_poll_attempts: u32,

    /// Tick of the upload progress estimate
    /// Default: 300ms
    pub upload_tick: Duration,

    /// Submissions allowed before the client is blocked
    /// Default: 3
    pub quota_limit: u64,

    /// JSON file holding the usage counter
    pub usage_file: PathBuf,

    /// Largest accepted PDF, in bytes
    /// Default: 10MB (10 * 1024 * 1024)
    pub max_upload_size: usize,

    /// Directory for rolling log files
    pub log_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Optional environment variables:
    /// - SUMMARIZE_API_URL: service base URL
    /// - POLL_INTERVAL_MS: delay between polls (default: 1000)
    /// - MAX_POLL_ATTEMPTS: poll budget (default: 600)
    /// - UPLOAD_TICK_MS: upload estimate tick (default: 300)
    /// - QUOTA_LIMIT: submissions allowed (default: 3)
    /// - USAGE_FILE: usage counter file (default: data/usage.json)
    /// - MAX_UPLOAD_SIZE: maximum PDF size in bytes (default: 10485760 = 10MB)
    /// - LOG_DIR: log directory (default: logs)
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a configuration from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let api_base_url = lookup("SUMMARIZE_API_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| "https://egnoocminsoc.site".to_string());

        let poll_interval_ms: u64 = parse_var(&lookup, "POLL_INTERVAL_MS", 1000)?;
        let max_poll_attempts: u32 = parse_var(&lookup, "MAX_POLL_ATTEMPTS", 600)?;
        let upload_tick_ms: u64 = parse_var(&lookup, "UPLOAD_TICK_MS", 300)?;
        let quota_limit = parse_var(&lookup, "QUOTA_LIMIT", DEFAULT_QUOTA_LIMIT)?;
        let max_upload_size = parse_var(&lookup, "MAX_UPLOAD_SIZE", 10 * 1024 * 1024)?;

        if max_poll_attempts == 0 {
            return Err("MAX_POLL_ATTEMPTS must be at least 1".to_string());
        }
        if upload_tick_ms == 0 {
            return Err("UPLOAD_TICK_MS must be at least 1".to_string());
        }

        let usage_file = lookup("USAGE_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data/usage.json"));
        let log_dir = lookup("LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("logs"));

        Ok(Config {
            api_base_url,
            poll_interval: Duration::from_millis(poll_interval_ms),
            max_poll_attempts,
            upload_tick: Duration::from_millis(upload_tick_ms),
            quota_limit,
            usage_file,
            max_upload_size,
            log_dir,
        })
    }

    pub fn job_settings(&self) -> JobSettings {
        JobSettings {
            poll_interval: self.poll_interval,
            max_poll_attempts: self.max_poll_attempts,
            upload_tick: self.upload_tick,
            max_upload_size: self.max_upload_size,
        }
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, String> {
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| format!("{} must be a non-negative integer, got {:?}", name, raw)),
        None => Ok(default),
    }
}
