use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::error::ExtractError;
use crate::model::{ParseSource, ParsedTask};
use crate::parser::LocalExtractor;

/// A strategy that turns raw text into a [`ParsedTask`].
///
/// The orchestrator holds a primary and a fallback implementation; a returned
/// `Err` is the signal to fall back, never a reason to retry.
#[async_trait]
pub trait TaskExtractor: Send + Sync {
    fn source(&self) -> ParseSource;

    async fn extract(&self, text: &str, now: NaiveDateTime) -> Result<ParsedTask, ExtractError>;
}

#[async_trait]
impl TaskExtractor for LocalExtractor {
    fn source(&self) -> ParseSource {
        ParseSource::Local
    }

    async fn extract(&self, text: &str, now: NaiveDateTime) -> Result<ParsedTask, ExtractError> {
        Ok(self.parse(text, now))
    }
}
