// ABOUTME: HTTP request handler for the natural-language query endpoint
// ABOUTME: Question in, templated answer plus follow-up suggestions out

use axum::{extract::State, response::Response, Json};
use serde::{Deserialize, Serialize};
use tracing::debug;

use labstock_chat::{ChatAnswer, IntentKind};

use crate::auth::AuthUser;
use crate::response::{ok, ApiError, ApiResult};
use crate::state::DbState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub suggestions: Vec<String>,
    pub intent: IntentKind,
}

pub async fn ask(
    State(db): State<DbState>,
    user: AuthUser,
    Json(request): Json<ChatRequest>,
) -> ApiResult<Response> {
    let question = request.question.trim();
    if question.is_empty() {
        return Err(ApiError::bad_request("Question must not be empty"));
    }

    debug!("Chat question from {}: {}", user.id, question);

    let (ChatAnswer { reply, suggestions }, intent) = db.chat.answer(question).await?;

    Ok(ok(ChatResponse {
        reply,
        suggestions,
        intent: intent.kind,
    }))
}
