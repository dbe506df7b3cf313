//! Router construction and the HTTP listener.

use super::handlers;
use crate::chat::Assistant;
use crate::db::Database;
use crate::sessions::SessionManager;
use crate::store::TaskStore;
use axum::Router;
use axum::routing::{get, post, put};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// State shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub store: Arc<TaskStore>,
    pub sessions: Arc<SessionManager>,
    pub assistant: Arc<Assistant>,
}

impl AppState {
    pub fn new(store: Arc<TaskStore>, assistant: Arc<Assistant>, session_ttl: Duration) -> Self {
        Self {
            db: Arc::clone(store.db()),
            store,
            sessions: Arc::new(SessionManager::new(session_ttl)),
            assistant,
        }
    }
}

/// Build the router with all routes.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(handlers::health))
        // Accounts
        .route("/api/users", post(handlers::create_user))
        .route(
            "/api/sessions",
            post(handlers::login).delete(handlers::logout),
        )
        // Tasks
        .route(
            "/api/tasks",
            get(handlers::list_tasks).post(handlers::add_task),
        )
        .route(
            "/api/tasks/{task_id}",
            get(handlers::get_task)
                .patch(handlers::update_task_details)
                .delete(handlers::delete_task),
        )
        .route("/api/tasks/{task_id}/status", put(handlers::update_task_status))
        // Views
        .route("/api/calendar", get(handlers::calendar))
        .route("/api/stats", get(handlers::stats))
        // Assistant
        .route(
            "/api/chat",
            get(handlers::chat_history)
                .post(handlers::chat_turn)
                .delete(handlers::chat_clear),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API until ctrl-c.
pub async fn start_server(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    info!("TaskFlow API listening on http://{}", bound_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            info!("TaskFlow API shutting down");
        })
        .await?;

    Ok(())
}
