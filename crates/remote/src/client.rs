//! HTTP client for OpenAI-compatible chat-completions services.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use quickadd_core::{ExtractError, ParseOptions, ParseSource, ParsedTask, RemoteSettings, TaskExtractor};
use reqwest::{Client, Url};
use secrecy::ExposeSecret;
use tracing::{debug, warn};

use crate::error::RemoteError;
use crate::mapping::{build_request, map_response, ChatResponse};

const MAX_ERROR_BODY: usize = 200;

/// Extracts tasks by asking a language model. One attempt per call, bounded
/// by the configured timeout.
pub struct RemoteExtractor {
    client: Client,
    endpoint: Url,
    settings: RemoteSettings,
    options: ParseOptions,
}

impl RemoteExtractor {
    pub fn new(settings: RemoteSettings, options: ParseOptions) -> Result<Self, RemoteError> {
        let endpoint = completions_url(&settings.base_url)?;
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|err| RemoteError::Config(format!("HTTP client: {err}")))?;

        Ok(Self {
            client,
            endpoint,
            settings,
            options,
        })
    }

    pub async fn parse_task(&self, text: &str, now: NaiveDateTime) -> Result<ParsedTask, RemoteError> {
        let api_key = self
            .settings
            .api_key
            .as_ref()
            .ok_or(RemoteError::MissingCredentials)?;

        let request = build_request(&self.settings.model, text, now);
        debug!(model = self.settings.model.as_str(), endpoint = %self.endpoint, "requesting AI extraction");

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|err| self.transport_error(err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "AI extraction rejected");
            return Err(RemoteError::Status {
                status: status.as_u16(),
                message: truncate(body.trim(), MAX_ERROR_BODY),
            });
        }

        let body: ChatResponse = response.json().await.map_err(|err| {
            if err.is_timeout() {
                self.timeout_error()
            } else {
                RemoteError::Malformed(format!("unreadable body: {err}"))
            }
        })?;

        map_response(body, self.options.default_time)
    }

    fn transport_error(&self, err: reqwest::Error) -> RemoteError {
        if err.is_timeout() {
            self.timeout_error()
        } else {
            RemoteError::Network(err.to_string())
        }
    }

    fn timeout_error(&self) -> RemoteError {
        RemoteError::Timeout(self.settings.timeout.as_millis())
    }
}

#[async_trait]
impl TaskExtractor for RemoteExtractor {
    fn source(&self) -> ParseSource {
        ParseSource::Ai
    }

    async fn extract(&self, text: &str, now: NaiveDateTime) -> Result<ParsedTask, ExtractError> {
        self.parse_task(text, now).await.map_err(ExtractError::from)
    }
}

fn completions_url(base: &str) -> Result<Url, RemoteError> {
    let mut base = base.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    Url::parse(&base)
        .and_then(|url| url.join("chat/completions"))
        .map_err(|err| RemoteError::Config(format!("invalid base URL '{base}': {err}")))
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_string();
    }
    let mut cut: String = value.chars().take(max).collect();
    cut.push_str("...");
    cut
}
