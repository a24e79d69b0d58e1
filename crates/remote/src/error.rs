use quickadd_core::{ExtractError, ExtractErrorKind};
use thiserror::Error;

/// Failures of the remote extraction call. None of them carry partial data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("no API key configured for AI parsing")]
    MissingCredentials,

    #[error("invalid service configuration: {0}")]
    Config(String),

    #[error("AI request timed out after {0} ms")]
    Timeout(u128),

    #[error("AI request failed: {0}")]
    Network(String),

    #[error("AI service returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("AI response was malformed: {0}")]
    Malformed(String),
}

impl RemoteError {
    pub fn kind(&self) -> ExtractErrorKind {
        match self {
            RemoteError::Malformed(_) => ExtractErrorKind::Malformed,
            _ => ExtractErrorKind::Unavailable,
        }
    }
}

impl From<RemoteError> for ExtractError {
    fn from(err: RemoteError) -> Self {
        ExtractError {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_bodies_are_distinguished_from_outages() {
        assert_eq!(
            RemoteError::Malformed("no choices".into()).kind(),
            ExtractErrorKind::Malformed
        );
        for err in [
            RemoteError::MissingCredentials,
            RemoteError::Timeout(100),
            RemoteError::Network("refused".into()),
            RemoteError::Status {
                status: 401,
                message: "bad key".into(),
            },
        ] {
            assert_eq!(err.kind(), ExtractErrorKind::Unavailable);
        }
    }

    #[test]
    fn converts_into_extract_error_with_description() {
        let err: ExtractError = RemoteError::Status {
            status: 503,
            message: "overloaded".into(),
        }
        .into();
        assert_eq!(err.kind, ExtractErrorKind::Unavailable);
        assert_eq!(err.message, "AI service returned HTTP 503: overloaded");
    }
}
