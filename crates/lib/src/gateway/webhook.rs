//! POST /message — Twilio WhatsApp webhook.
//!
//! complete → store (best effort) → reply. A store failure is logged and swallowed so the
//! sender still gets an answer; completion and delivery failures fail the request.

use crate::channels::{sender_from_address, ChannelError};
use crate::gateway::server::GatewayState;
use crate::llm::LlmError;
use crate::prompt::build_prompt;
use crate::store::NewConversation;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Form,
};
use serde::Deserialize;

/// Fields of the Twilio webhook form we use; the rest of the payload is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundForm {
    #[serde(rename = "Body")]
    pub body: String,
    /// `whatsapp:+15551234567`.
    #[serde(rename = "From", default)]
    pub from: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// Media-only messages arrive with `Body=`; there is nothing to answer.
    #[error("inbound payload has an empty Body field")]
    EmptyBody,
    #[error("inbound payload has no From field")]
    MissingSender,
    #[error(transparent)]
    Completion(#[from] LlmError),
    #[error(transparent)]
    Delivery(#[from] ChannelError),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        match self {
            WebhookError::EmptyBody => {
                log::debug!("webhook: rejected: {}", self);
                StatusCode::UNPROCESSABLE_ENTITY.into_response()
            }
            other => {
                log::warn!("webhook: request failed: {}", other);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

pub(crate) async fn message_webhook(
    State(state): State<GatewayState>,
    Form(form): Form<InboundForm>,
) -> Result<(), WebhookError> {
    if form.body.is_empty() {
        return Err(WebhookError::EmptyBody);
    }
    let from = form.from.as_deref().ok_or(WebhookError::MissingSender)?;
    let sender = sender_from_address(from).to_string();
    log::info!("sending the completion response to this number: {}", sender);

    let response = state.completion.complete(build_prompt(&form.body)).await?;
    log::info!("{}", response);

    let conversation = NewConversation {
        sender,
        message: form.body,
        response,
    };
    match state.store.insert(&conversation).await {
        Ok(row) => log::info!("conversation #{} stored in database", row.id),
        Err(e) => log::error!("error storing conversation in database: {}", e),
    }

    state
        .messenger
        .send_message(&conversation.sender, &conversation.response)
        .await?;
    Ok(())
}
