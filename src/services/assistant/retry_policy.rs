use super::error::AssistantError;

/// Whether a failed attempt is worth repeating.
///
/// Transient transport failures and throttling statuses are; client-side
/// misconfiguration and malformed bodies never are.
pub(super) fn should_retry(err: &AssistantError) -> bool {
    match err {
        AssistantError::Timeout { .. } | AssistantError::Network { .. } => true,
        AssistantError::Status { status, .. } => {
            matches!(*status, 408 | 429) || (500..=599).contains(status)
        }
        AssistantError::Unconfigured { .. } | AssistantError::InvalidResponse { .. } => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_failures_retry() {
        assert!(should_retry(&AssistantError::timeout("deadline")));
        assert!(should_retry(&AssistantError::network("connection reset")));
    }

    #[test]
    fn test_status_classes() {
        assert!(should_retry(&AssistantError::status(500, "HTTP 500")));
        assert!(should_retry(&AssistantError::status(429, "HTTP 429")));
        assert!(should_retry(&AssistantError::status(408, "HTTP 408")));
        assert!(!should_retry(&AssistantError::status(404, "HTTP 404")));
        assert!(!should_retry(&AssistantError::status(400, "HTTP 400")));
    }

    #[test]
    fn test_terminal_failures_do_not_retry() {
        assert!(!should_retry(&AssistantError::unconfigured("no endpoint")));
        assert!(!should_retry(&AssistantError::invalid_response("bad json")));
    }
}
