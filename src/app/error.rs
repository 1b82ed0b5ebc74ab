use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Network(String),

    #[error("request failed with status {status}: {detail}")]
    Status {
        status: u16,
        detail: String,
        body: String,
    },

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl TransportError {
    pub fn from_status(status: u16, reason: Option<&str>, body: String) -> Self {
        let detail = detail_from_body(&body)
            .or_else(|| reason.map(ToString::to_string))
            .unwrap_or_else(|| format!("HTTP {status}"));
        TransportError::Status {
            status,
            detail,
            body,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn body(&self) -> Option<&str> {
        match self {
            TransportError::Status { body, .. } => Some(body),
            _ => None,
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            TransportError::Network(detail) | TransportError::Decode(detail) => detail,
            TransportError::Status { detail, .. } => detail,
        }
    }
}

fn detail_from_body(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::Object(map)) => match map.get("detail") {
            Some(serde_json::Value::String(detail)) => Some(detail.clone()),
            Some(other) => Some(other.to_string()),
            None => Some(trimmed.to_string()),
        },
        _ => Some(trimmed.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("select an item before submitting")]
    MissingSelection,

    #[error("choose a label to submit")]
    MissingLabel,

    #[error("confidence must be a number between 0 and 1, got {0:?}")]
    InvalidConfidence(String),

    #[error("count must be a non-negative integer, got {0:?}")]
    InvalidCount(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
