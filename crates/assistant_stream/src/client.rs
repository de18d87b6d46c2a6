use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use config::{BackendConfig, StreamingConfig};
use core_types::{AssembledMessage, ConversationRequest, ConversationStream, StreamOutcome};
use futures::StreamExt;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderValue};
use tokio::time::{Instant, sleep, sleep_until, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::debounce::Debouncer;
use crate::error::StreamError;
use crate::framing::{LineFramer, content_from_line};

#[derive(Debug, Clone)]
pub struct ConversationClient {
    http: reqwest::Client,
    endpoint: String,
    authorization: Option<HeaderValue>,
    max_retries: u32,
    backoff_base: Duration,
    debounce_window: Duration,
    request_timeout: Duration,
}

impl ConversationClient {
    pub fn new(backend: &BackendConfig, streaming: &StreamingConfig) -> Self {
        Self::with_endpoint(backend.conversation_url(), streaming)
    }

    pub fn with_endpoint(endpoint: impl Into<String>, streaming: &StreamingConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            authorization: None,
            max_retries: streaming.max_retries,
            backoff_base: streaming.backoff_base(),
            debounce_window: streaming.debounce_window(),
            request_timeout: streaming.request_timeout(),
        }
    }

    /// Attaches `Authorization: Bearer <token>` to every request. Blank
    /// tokens are ignored.
    pub fn with_bearer_token(mut self, token: Option<&str>) -> Result<Self, StreamError> {
        self.authorization = match token.map(str::trim).filter(|t| !t.is_empty()) {
            Some(token) => Some(
                HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|_| StreamError::InvalidToken)?,
            ),
            None => None,
        };
        Ok(self)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sends one message and streams the reply.
    ///
    /// `message` is sealed on every exit path. Once `cancel` fires, no
    /// further `on_delta` calls are made and `Ok(StreamOutcome::Aborted)`
    /// is returned.
    pub async fn stream<F>(
        &self,
        request: &ConversationRequest,
        message: &mut AssembledMessage,
        cancel: &CancellationToken,
        on_delta: F,
    ) -> Result<StreamOutcome, StreamError>
    where
        F: FnMut(&str),
    {
        let result = self.stream_inner(request, message, cancel, on_delta).await;
        message.seal();
        result
    }

    async fn stream_inner<F>(
        &self,
        request: &ConversationRequest,
        message: &mut AssembledMessage,
        cancel: &CancellationToken,
        mut on_delta: F,
    ) -> Result<StreamOutcome, StreamError>
    where
        F: FnMut(&str),
    {
        if request.chat_id.trim().is_empty() {
            return Err(StreamError::MissingChatId);
        }
        if request.content.trim().is_empty() {
            return Err(StreamError::MissingMessage);
        }

        let Some(response) = self.open(request, cancel).await? else {
            debug!(chat_id = %request.chat_id, "conversation aborted before response");
            return Ok(StreamOutcome::Aborted);
        };

        let mut body = response.bytes_stream();
        let mut framer = LineFramer::new();
        let mut debouncer = Debouncer::new(self.debounce_window);
        let mut deliver = |text: &str, message: &mut AssembledMessage| {
            message.append(text);
            on_delta(text);
        };

        loop {
            let deadline = debouncer.deadline();
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debouncer.discard();
                    debug!(chat_id = %request.chat_id, "conversation stream aborted");
                    return Ok(StreamOutcome::Aborted);
                }
                _ = wait_until(deadline) => {
                    if let Some(text) = debouncer.fire(Instant::now()) {
                        deliver(&text, message);
                    }
                }
                next = body.next() => match next {
                    Some(Ok(bytes)) => {
                        for line in framer.push(&bytes) {
                            if cancel.is_cancelled() {
                                break;
                            }
                            if let Some(content) = content_from_line(&line)
                                && let Some(text) = debouncer.push(&content, Instant::now())
                            {
                                deliver(&text, message);
                            }
                        }
                    }
                    Some(Err(err)) => {
                        warn!(chat_id = %request.chat_id, "conversation stream interrupted: {err}");
                        // Held text is kept in the message but not delivered.
                        if let Some(text) = debouncer.finish() {
                            message.append(&text);
                        }
                        return Err(StreamError::Body(err));
                    }
                    None => break,
                },
            }
        }

        if cancel.is_cancelled() {
            debouncer.discard();
            return Ok(StreamOutcome::Aborted);
        }
        if let Some(content) = framer.finish().as_deref().and_then(content_from_line) {
            debouncer.push(&content, Instant::now());
        }
        if let Some(text) = debouncer.finish() {
            deliver(&text, message);
        }
        debug!(
            chat_id = %request.chat_id,
            chars = message.as_str().len(),
            "conversation stream completed"
        );
        Ok(StreamOutcome::Completed)
    }

    /// Opens the response, retrying server errors and transport failures
    /// with exponential backoff. `None` means the caller cancelled.
    async fn open(
        &self,
        request: &ConversationRequest,
        cancel: &CancellationToken,
    ) -> Result<Option<reqwest::Response>, StreamError> {
        let mut attempt = 0u32;
        loop {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(None),
                result = self.send_once(request) => result,
            };

            match result {
                Ok(response) => return Ok(Some(response)),
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    let delay = self
                        .backoff_base
                        .saturating_mul(2u32.saturating_pow(attempt));
                    attempt += 1;
                    warn!(
                        chat_id = %request.chat_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "retrying conversation request: {err}"
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Ok(None),
                        _ = sleep(delay) => {}
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn send_once(
        &self,
        request: &ConversationRequest,
    ) -> Result<reqwest::Response, StreamError> {
        let mut builder = self
            .http
            .post(&self.endpoint)
            .header(ACCEPT, "application/x-ndjson, text/event-stream")
            .json(request);
        if let Some(value) = &self.authorization {
            builder = builder.header(AUTHORIZATION, value.clone());
        }

        let response = timeout(self.request_timeout, builder.send())
            .await
            .map_err(|_| StreamError::Timeout(self.request_timeout))?
            .map_err(StreamError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StreamError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[async_trait]
impl ConversationStream for ConversationClient {
    async fn stream_reply(
        &self,
        request: &ConversationRequest,
        message: &mut AssembledMessage,
        cancel: &CancellationToken,
        on_delta: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<StreamOutcome> {
        Ok(self.stream(request, message, cancel, on_delta).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ConversationClient {
        ConversationClient::with_endpoint("http://127.0.0.1:9/unused", &StreamingConfig::default())
    }

    #[tokio::test]
    async fn rejects_blank_chat_id_before_network() {
        let mut message = AssembledMessage::new();
        let err = client()
            .stream(
                &ConversationRequest::new("  ", "hello"),
                &mut message,
                &CancellationToken::new(),
                |_| {},
            )
            .await
            .expect_err("must fail");
        assert!(matches!(err, StreamError::MissingChatId));
        assert!(message.is_sealed());
    }

    #[tokio::test]
    async fn rejects_blank_message_before_network() {
        let mut message = AssembledMessage::new();
        let err = client()
            .stream(
                &ConversationRequest::new("chat-1", ""),
                &mut message,
                &CancellationToken::new(),
                |_| {},
            )
            .await
            .expect_err("must fail");
        assert!(matches!(err, StreamError::MissingMessage));
    }

    #[test]
    fn rejects_header_unsafe_token() {
        let err = client()
            .with_bearer_token(Some("abc\ndef"))
            .expect_err("must fail");
        assert!(matches!(err, StreamError::InvalidToken));
    }

    #[test]
    fn blank_token_means_no_header() {
        let client = client().with_bearer_token(Some("   ")).expect("client");
        assert!(client.authorization.is_none());
    }
}
