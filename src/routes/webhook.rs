use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use crate::app_state::AppState;
use crate::models::job::Requester;
use crate::models::telegram::Update;
use crate::services::messages;

/// POST /{token} — Telegram update webhook.
///
/// Always answers 200 for the right token, even for updates it cannot use, so
/// the platform does not keep redelivering them.
pub async fn telegram_webhook(
    State(state): State<AppState>,
    Path(token): Path<String>,
    body: Bytes,
) -> StatusCode {
    if token != *state.bot_token {
        return StatusCode::NOT_FOUND;
    }

    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring unparsable update");
            return StatusCode::OK;
        }
    };

    let Some(message) = update.message else {
        tracing::debug!(update_id = update.update_id, "Ignoring non-message update");
        return StatusCode::OK;
    };
    let Some(text) = message.text.as_deref() else {
        return StatusCode::OK;
    };

    let requester = Requester {
        chat_id: message.chat.id,
        reply_to: Some(message.message_id),
    };

    if let Some(command) = parse_command(text) {
        handle_command(&state, command, requester);
        return StatusCode::OK;
    }

    state.dispatcher.submit(text, requester);
    StatusCode::OK
}

/// Command name without the leading slash or a `@botname` suffix.
fn parse_command(text: &str) -> Option<&str> {
    let word = text.trim_start().strip_prefix('/')?.split_whitespace().next()?;
    Some(word.split('@').next().unwrap_or(word))
}

fn handle_command(state: &AppState, command: &str, requester: Requester) {
    if !matches!(command, "start" | "help") {
        tracing::debug!(command, "Ignoring unknown command");
        return;
    }

    let sink = state.sink.clone();
    tokio::spawn(async move {
        if let Err(e) = sink.notify_text(&requester, messages::USAGE).await {
            tracing::warn!(chat_id = requester.chat_id, error = %e, "Failed to send usage");
        }
    });
}
