use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{routing::post, Router};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;

use super::handler::{chat, method_not_allowed};
use super::state::ApiState;
use crate::utils::completion::Completer;

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub const DEFAULT_PUBLIC_DIR: &str = "public";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub public_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            public_dir: PathBuf::from(DEFAULT_PUBLIC_DIR),
        }
    }
}

/// `/api/chat` plus static files (the PDF worker script) from `public_dir`.
pub fn router<C>(state: Arc<ApiState<C>>, public_dir: &Path) -> Router
where
    C: Completer + Send + Sync + 'static,
{
    Router::new()
        .route(
            "/api/chat",
            post(chat::<C>).fallback(method_not_allowed),
        )
        .fallback_service(ServeDir::new(public_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub struct ApiServer<C> {
    config: ServerConfig,
    state: Arc<ApiState<C>>,
}

impl<C> ApiServer<C>
where
    C: Completer + Send + Sync + 'static,
{
    pub fn new(config: ServerConfig, completer: C) -> Self {
        Self {
            config,
            state: Arc::new(ApiState::from(completer)),
        }
    }

    pub async fn start(self) -> Result<()> {
        let app = router(self.state, &self.config.public_dir);

        let listener = tokio::net::TcpListener::bind(&self.config.bind)
            .await
            .with_context(|| format!("failed to bind {}", self.config.bind))?;

        info!(
            "Completion proxy listening on http://{} (static files from {})",
            listener.local_addr()?,
            self.config.public_dir.display()
        );

        axum::serve(listener, app).await.context("server error")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::{METHOD_NOT_ALLOWED_MESSAGE, PROCESSING_ERROR_MESSAGE};
    use crate::utils::completion::CompletionError;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tower::ServiceExt;

    #[derive(Default)]
    struct RecordingCompleter {
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
        fail: bool,
    }

    impl Completer for RecordingCompleter {
        async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            if self.fail {
                Err(CompletionError::Api("upstream secret detail 401".to_string()))
            } else {
                Ok(format!("echo: {}", prompt))
            }
        }
    }

    fn app(completer: RecordingCompleter) -> (Router, Arc<ApiState<RecordingCompleter>>) {
        let state = Arc::new(ApiState::from(completer));
        let router = router(state.clone(), Path::new("does-not-exist"));
        (router, state)
    }

    fn post_json(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn post_returns_generated_content() {
        let (router, state) = app(RecordingCompleter::default());

        let response = router
            .oneshot(post_json(json!({"input": "Question: why? \n\n Context: because"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"content": "echo: Question: why? \n\n Context: because"})
        );
        assert_eq!(
            state.completer().prompts.lock().unwrap().as_slice(),
            ["Question: why? \n\n Context: because"]
        );
    }

    #[tokio::test]
    async fn get_is_rejected_without_calling_upstream() {
        let (router, state) = app(RecordingCompleter::default());

        let response = router
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/api/chat")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            body_json(response).await,
            json!({"message": METHOD_NOT_ALLOWED_MESSAGE})
        );
        assert_eq!(state.completer().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn upstream_failure_is_generic_500() {
        let (router, state) = app(RecordingCompleter {
            fail: true,
            ..Default::default()
        });

        let response = router
            .oneshot(post_json(json!({"input": "hello"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body, json!({"message": PROCESSING_ERROR_MESSAGE}));
        assert!(!body.to_string().contains("secret"));
        assert_eq!(state.completer().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn malformed_body_is_generic_500() {
        let (router, state) = app(RecordingCompleter::default());

        let response = router
            .oneshot(post_json(json!({"prompt": "wrong field"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({"message": PROCESSING_ERROR_MESSAGE})
        );
        assert_eq!(state.completer().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn serves_worker_script_from_public_dir() {
        let dir = std::env::temp_dir().join(format!("pdf-chat-public-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("pdf.worker.min.js"), "self.onmessage = null;").unwrap();

        let state = Arc::new(ApiState::from(RecordingCompleter::default()));
        let response = router(state, &dir)
            .oneshot(
                Request::builder()
                    .uri("/pdf.worker.min.js")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"self.onmessage = null;");

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
