//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

use clipper_models::ClientFingerprint;
use tracing::warn;
use url::Url;

use crate::error::{ClientError, ClientResult};

/// Clip client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server base URL
    pub base_url: String,
    /// Bounded wait for the submission response
    pub submit_timeout: Duration,
    /// Delay before returning to idle after a completed job
    pub complete_delay: Duration,
    /// How long an error stays on screen
    pub error_delay: Duration,
    /// How long a rate-limit error stays on screen
    pub rate_limit_delay: Duration,
    /// Delay before returning to idle after a cancellation
    pub cancel_delay: Duration,
    /// Where finished clips are written
    pub download_dir: PathBuf,
    /// Identity sent as `X-Client-FP`
    pub fingerprint: ClientFingerprint,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            submit_timeout: Duration::from_secs(30),
            complete_delay: Duration::from_millis(3000),
            error_delay: Duration::from_millis(10_000),
            rate_limit_delay: Duration::from_millis(30_000),
            cancel_delay: Duration::from_millis(1000),
            download_dir: PathBuf::from("."),
            fingerprint: ClientFingerprint::generate(),
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let fingerprint = match std::env::var("CLIPPER_FINGERPRINT") {
            Ok(value) => ClientFingerprint::parse(&value).unwrap_or_else(|| {
                warn!("CLIPPER_FINGERPRINT is not 64 hex characters, generating one");
                ClientFingerprint::generate()
            }),
            Err(_) => ClientFingerprint::generate(),
        };

        Self {
            base_url: std::env::var("CLIPPER_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            submit_timeout: Duration::from_secs(
                std::env::var("CLIPPER_SUBMIT_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            complete_delay: millis_from_env("CLIPPER_COMPLETE_DELAY_MS", 3000),
            error_delay: millis_from_env("CLIPPER_ERROR_DELAY_MS", 10_000),
            rate_limit_delay: millis_from_env("CLIPPER_RATE_LIMIT_DELAY_MS", 30_000),
            cancel_delay: millis_from_env("CLIPPER_CANCEL_DELAY_MS", 1000),
            download_dir: std::env::var("CLIPPER_DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
            fingerprint,
        }
    }

    /// Check that the base URL is usable.
    pub fn validate(&self) -> ClientResult<()> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::Config(format!("Invalid base URL '{}': {}", self.base_url, e)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::Config(format!(
                "Unsupported base URL scheme: {}",
                url.scheme()
            )));
        }

        Ok(())
    }

    /// Base URL without a trailing slash.
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

fn millis_from_env(name: &str, default: u64) -> Duration {
    Duration::from_millis(
        std::env::var(name)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(default),
    )
}
