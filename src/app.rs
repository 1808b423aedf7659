use crate::error::ShowError;
use crate::events::{EventSink, HttpEventSink};
use crate::models::AddShowRequest;
use crate::shows;
use crate::store::{MongoStore, ShowStore};
use crate::tmdb::{TmdbApi, TmdbClient};
use anyhow::Result;
use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::TypedHeader;
use constant_time_eq::constant_time_eq;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use std::{env, net::SocketAddr, sync::Arc};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

const MAX_BODY_BYTES: usize = 1024 * 1024; // 1MB safety cap

#[derive(Clone)]
pub struct AppState {
    pub tmdb: Arc<dyn TmdbApi>,
    pub store: Arc<dyn ShowStore>,
    pub events: Arc<dyn EventSink>,
    pub admin_key: String,
}

pub async fn run_server() -> Result<()> {
    let tmdb: Arc<dyn TmdbApi> = Arc::new(TmdbClient::from_env()?);
    let store: Arc<dyn ShowStore> = Arc::new(MongoStore::from_env().await?);
    let events: Arc<dyn EventSink> = Arc::new(HttpEventSink::from_env()?);
    let admin_key = env::var("ADMIN_API_KEY")
        .ok()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow::anyhow!("ADMIN_API_KEY must be set"))?;

    let state = AppState {
        tmdb,
        store,
        events,
        admin_key,
    };

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/now-playing", get(now_playing))
        .route(
            "/add",
            post(add_show).layer(middleware::from_fn_with_state(state.clone(), require_admin)),
        )
        .route("/all", get(all_shows))
        .route("/health", get(health))
        .route("/:movie_id", get(movie_calendar))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn now_playing(State(state): State<AppState>) -> Json<Value> {
    match shows::now_playing(&state).await {
        Ok(movies) => Json(json!({ "success": true, "movies": movies })),
        Err(e) => failure("fetching now-playing movies", e),
    }
}

async fn add_show(State(state): State<AppState>, Json(req): Json<AddShowRequest>) -> Json<Value> {
    match shows::add_show(&state, req).await {
        Ok(()) => Json(json!({ "success": true, "message": "Show added successfully." })),
        Err(e) => failure("adding show", e),
    }
}

async fn all_shows(State(state): State<AppState>) -> Json<Value> {
    match shows::upcoming_movies(&state).await {
        // The frontend binds to `shows` even though these are unique movies.
        Ok(movies) => Json(json!({ "success": true, "shows": movies })),
        Err(e) => failure("fetching upcoming shows", e),
    }
}

async fn movie_calendar(
    State(state): State<AppState>,
    Path(movie_id): Path<String>,
) -> Json<Value> {
    match shows::movie_calendar(&state, &movie_id).await {
        Ok((movie, date_time)) => {
            Json(json!({ "success": true, "movie": movie, "dateTime": date_time }))
        }
        Err(e) => failure("fetching movie calendar", e),
    }
}

// Failures keep HTTP 200; the envelope carries the outcome.
fn failure(action: &str, e: ShowError) -> Json<Value> {
    error!("Error {}: {:#}", action, e);
    Json(json!({ "success": false, "message": e.to_string(), "kind": e.kind() }))
}

async fn require_admin(
    State(state): State<AppState>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    request: Request,
    next: Next,
) -> Response {
    let authorized = auth
        .as_ref()
        .map(|TypedHeader(Authorization(bearer))| {
            constant_time_eq(bearer.token().as_bytes(), state.admin_key.as_bytes())
        })
        .unwrap_or(false);
    if !authorized {
        warn!("Rejecting admin route without valid credentials");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "message": "not authorized" })),
        )
            .into_response();
    }
    next.run(request).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        term.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
