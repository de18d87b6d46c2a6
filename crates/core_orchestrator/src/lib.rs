use std::sync::Arc;

use anyhow::Result;
use core_types::{
    AssembledMessage, ConversationRequest, ConversationStream, ConversationTurn,
    TranscriptStore, TurnStatus,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Shown in place of the reply when a turn fails.
pub const ASSISTANT_APOLOGY: &str =
    "Sorry, something went wrong while generating a response. Please try again.";

#[derive(Debug, Clone)]
pub struct TurnResult {
    pub status: TurnStatus,
    /// Text for the assistant bubble: the reply, or the apology on error.
    pub display_text: String,
    pub message: AssembledMessage,
    /// Developer-facing failure detail. Never shown to end users.
    pub error: Option<String>,
}

pub struct TurnRunner {
    stream: Arc<dyn ConversationStream>,
    transcript: Option<Arc<dyn TranscriptStore>>,
}

impl TurnRunner {
    pub fn new(
        stream: Arc<dyn ConversationStream>,
        transcript: Option<Arc<dyn TranscriptStore>>,
    ) -> Self {
        Self { stream, transcript }
    }

    /// Runs one user → assistant exchange.
    ///
    /// A blank chat id or message is rejected as `Err` before anything is
    /// recorded. Stream failures do not fail the turn: they are logged and
    /// turned into an `Errored` result carrying the apology text. Otherwise
    /// only transcript persistence errors are returned as `Err`.
    pub async fn run_turn(
        &self,
        request: ConversationRequest,
        cancel: &CancellationToken,
        on_delta: &mut (dyn FnMut(&str) + Send),
    ) -> Result<TurnResult> {
        request.validate()?;
        self.record(&ConversationTurn::user(
            request.chat_id.clone(),
            request.content.clone(),
        ))
        .await?;

        let mut message = AssembledMessage::new();
        let outcome = self
            .stream
            .stream_reply(&request, &mut message, cancel, on_delta)
            .await;
        message.seal();

        let result = match outcome {
            Ok(outcome) => {
                let status = TurnStatus::from(outcome);
                info!(chat_id = %request.chat_id, ?status, "assistant turn finished");
                TurnResult {
                    status,
                    display_text: message.as_str().to_string(),
                    message,
                    error: None,
                }
            }
            Err(err) => {
                warn!(chat_id = %request.chat_id, "assistant turn failed: {err:#}");
                TurnResult {
                    status: TurnStatus::Errored,
                    display_text: ASSISTANT_APOLOGY.to_string(),
                    message,
                    error: Some(format!("{err:#}")),
                }
            }
        };

        self.record(&ConversationTurn::assistant(
            request.chat_id,
            result.message.as_str(),
            result.status,
        ))
        .await?;
        Ok(result)
    }

    async fn record(&self, turn: &ConversationTurn) -> Result<()> {
        match &self.transcript {
            Some(store) => store.append_turn(turn).await,
            None => Ok(()),
        }
    }
}
