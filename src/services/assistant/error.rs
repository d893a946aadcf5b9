use serde::{Deserialize, Serialize};

/// Failures talking to the assistant webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AssistantError {
    Unconfigured { message: String },
    Timeout { message: String },
    Status { status: u16, message: String },
    Network { message: String },
    InvalidResponse { message: String },
}

impl AssistantError {
    pub fn unconfigured(message: impl Into<String>) -> Self {
        Self::Unconfigured {
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Unconfigured { message }
            | Self::Timeout { message }
            | Self::Status { message, .. }
            | Self::Network { message }
            | Self::InvalidResponse { message } => message,
        }
    }
}

impl From<reqwest::Error> for AssistantError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::timeout(err.to_string());
        }
        if let Some(status) = err.status() {
            return Self::status(status.as_u16(), err.to_string());
        }
        if err.is_decode() {
            return Self::invalid_response(err.to_string());
        }
        Self::network(err.to_string())
    }
}

impl std::fmt::Display for AssistantError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unconfigured { message } => write!(f, "Unconfigured: {}", message),
            Self::Timeout { message } => write!(f, "Timeout: {}", message),
            Self::Status { status, message } => write!(f, "Status {}: {}", status, message),
            Self::Network { message } => write!(f, "Network: {}", message),
            Self::InvalidResponse { message } => write!(f, "InvalidResponse: {}", message),
        }
    }
}

impl std::error::Error for AssistantError {}
