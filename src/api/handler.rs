use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::Method,
    Json,
};
use tracing::{error, info, warn};

use super::error::ErrorServer;
use super::state::ApiState;
use super::types::{ChatRequest, ChatResponse};
use crate::utils::completion::Completer;

/// `POST /api/chat`: forwards `input` as a single user message and returns
/// the generated text.
pub async fn chat<C>(
    State(state): State<Arc<ApiState<C>>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ErrorServer>
where
    C: Completer + Send + Sync + 'static,
{
    let Json(request) = payload.map_err(|e| {
        warn!("Rejected chat request body: {}", e);
        ErrorServer::processing()
    })?;

    info!("Forwarding prompt ({} chars)", request.input.len());

    match state.completer().complete(&request.input).await {
        Ok(content) => Ok(Json(ChatResponse { content })),
        Err(e) => {
            error!("Error: {}", e);
            Err(ErrorServer::processing())
        }
    }
}

/// Answers every method on `/api/chat` other than POST.
pub async fn method_not_allowed(method: Method) -> ErrorServer {
    warn!("Method {} not allowed on chat endpoint", method);
    ErrorServer::method_not_allowed()
}
