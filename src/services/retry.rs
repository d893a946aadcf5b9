use std::time::Duration;

const DEFAULT_MAX_ATTEMPTS: usize = 3;
const DEFAULT_BASE_DELAY_MS: u64 = 1_000;
const DEFAULT_MAX_DELAY_MS: u64 = 8_000;

#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
        }
    }
}

impl RetryConfig {
    pub fn from_env() -> Self {
        let max_attempts = env_usize("CHAT_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS).clamp(1, 10);
        let base_delay =
            Duration::from_millis(env_u64("CHAT_RETRY_BASE_DELAY_MS", DEFAULT_BASE_DELAY_MS).clamp(0, 60_000));
        let max_delay =
            Duration::from_millis(env_u64("CHAT_RETRY_MAX_DELAY_MS", DEFAULT_MAX_DELAY_MS).clamp(0, 300_000));

        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    pub fn backoff(&self, attempt: usize) -> Duration {
        // attempt is 1-based (attempt=1 => base_delay)
        if attempt <= 1 {
            return self.base_delay.min(self.max_delay);
        }

        let exp_shift = (attempt - 1).min(30) as u32;
        let base_ms = self.base_delay.as_millis() as u64;
        let raw_ms = base_ms.saturating_mul(1u64 << exp_shift);
        Duration::from_millis(raw_ms).min(self.max_delay)
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let retry = RetryConfig::default();
        assert_eq!(retry.max_attempts, 3);
        assert_eq!(retry.base_delay, Duration::from_millis(1_000));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let retry = RetryConfig::default();
        assert_eq!(retry.backoff(1), Duration::from_millis(1_000));
        assert_eq!(retry.backoff(2), Duration::from_millis(2_000));
        assert_eq!(retry.backoff(3), Duration::from_millis(4_000));
        assert_eq!(retry.backoff(4), Duration::from_millis(8_000));
        assert_eq!(retry.backoff(10), Duration::from_millis(8_000));
    }

    #[test]
    fn test_backoff_respects_small_cap() {
        let retry = RetryConfig {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(300),
        };
        assert_eq!(retry.backoff(1), Duration::from_millis(300));
        assert_eq!(retry.backoff(4), Duration::from_millis(300));
    }
}
