use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("Unknown priority '{0}': expected P1|P2|P3|P4")]
    UnknownPriority(String),
}

/// Rejections raised while turning raw input into a [`crate::model::Task`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("Task text cannot be empty")]
    EmptyText,
}

/// Failure reported by a [`crate::extract::TaskExtractor`].
///
/// Only remote extractors produce these; the local extractor is total.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ExtractError {
    pub kind: ExtractErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractErrorKind {
    /// Network failure, timeout, rejected or missing credentials.
    Unavailable,
    /// The service answered but the payload did not validate.
    Malformed,
}

impl ExtractError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: ExtractErrorKind::Unavailable,
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            kind: ExtractErrorKind::Malformed,
            message: message.into(),
        }
    }
}
