//! HTTP surface of the relay: chat, streamed chat, and introspection routes.

mod handlers;

use std::future::Future;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::relay::RelayClient;

pub use handlers::{relay_error, relay_events, status_for, ApiError, ApiResult};

const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(15);

/// State shared by every request. Immutable after startup.
#[derive(Clone)]
pub struct ServerState {
    pub relay: RelayClient,
    pub keep_alive: Duration,
}

impl ServerState {
    pub fn new(relay: RelayClient) -> Self {
        Self {
            relay,
            keep_alive: DEFAULT_KEEP_ALIVE,
        }
    }

    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }
}

/// Routes, all nested under `/api`.
pub fn router(state: ServerState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/chat", post(handlers::handle_chat))
        .route(
            "/chat-stream",
            post(handlers::handle_chat_stream).get(handlers::handle_stream_keepalive),
        )
        .route(
            "/system-prompt",
            get(handlers::get_system_prompt).post(handlers::update_system_prompt),
        )
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api", api)
        .layer(cors)
        .with_state(state)
}

/// Serves the relay on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: ServerState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        log::info!("relay listening on http://{addr}/api");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
