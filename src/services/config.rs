//! Webhook endpoint configuration.
//!
//! The client is intentionally usable with nothing configured: an unset
//! endpoint routes sends into demo mode instead of surfacing an error.

use std::time::Duration;

use super::retry::RetryConfig;

/// Sentinel meaning "no endpoint configured yet".
pub const PLACEHOLDER_URL: &str = "YOUR_WEBHOOK_URL";

const DEFAULT_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Assistant webhook endpoint URL.
    pub url: String,
    /// Per-request timeout for single-shot sends.
    pub timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: PLACEHOLDER_URL.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            retry: RetryConfig::default(),
        }
    }
}

impl WebhookConfig {
    /// True when the endpoint points at something real: not the placeholder
    /// sentinel, and an HTTP(S) URL.
    pub fn is_configured(&self) -> bool {
        self.url != PLACEHOLDER_URL && self.url.starts_with("http")
    }
}

/// Load webhook configuration from `.env`/environment.
///
/// Reads:
/// - `CHAT_WEBHOOK_URL` (fallback: `N8N_WEBHOOK_URL`)
/// - `CHAT_TIMEOUT_MS`
/// - `CHAT_MAX_ATTEMPTS`, `CHAT_RETRY_BASE_DELAY_MS`, `CHAT_RETRY_MAX_DELAY_MS`
pub fn load_webhook_config() -> WebhookConfig {
    let _ = dotenvy::dotenv();

    let url = std::env::var("CHAT_WEBHOOK_URL")
        .or_else(|_| std::env::var("N8N_WEBHOOK_URL"))
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| PLACEHOLDER_URL.to_string());

    let timeout_ms = std::env::var("CHAT_TIMEOUT_MS")
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_TIMEOUT_MS)
        .clamp(1_000, 300_000);

    WebhookConfig {
        url,
        timeout: Duration::from_millis(timeout_ms),
        retry: RetryConfig::from_env(),
    }
}
