pub mod auth;
pub mod matchmaking;
pub mod players;

use std::sync::Arc;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tracing::error;

use crate::applier::ResultDispatcher;
use crate::error::MatchPoolError;
use crate::rating::TrueSkill;
use crate::store::MatchStore;
use crate::telemetry;

pub use auth::{ApiKey, AuthConfig};

/// Shared state behind every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MatchStore>,
    pub dispatcher: ResultDispatcher,
    pub rating_env: TrueSkill,
    pub auth: AuthConfig,
}

/// The full wire surface of the façade.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/metrics", get(metrics))
        .route("/players/register", post(players::register))
        .route("/players/player/:player_id", get(players::get_player))
        .route("/players/leaderboard", get(players::leaderboard))
        .route("/matchmaking/queue", post(matchmaking::enqueue))
        .route(
            "/matchmaking/queue/:player_id",
            get(matchmaking::queue_status).delete(matchmaking::dequeue),
        )
        .route("/matchmaking/match/:match_id", get(matchmaking::get_match))
        .route("/matchmaking/matches/latest", get(matchmaking::latest_matches))
        .route(
            "/matchmaking/match/:match_id/result",
            post(matchmaking::report_result),
        )
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Prometheus text exposition. Queue depth is sampled on scrape.
async fn metrics(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Result<Response, ApiError> {
    let depths: Vec<_> = state
        .store
        .queue_depths()
        .await?
        .iter()
        .map(|d| (d.region, d.depth))
        .collect();
    telemetry::core_metrics().set_queue_depths(&depths);

    let body = telemetry::encode_text()?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}

/// Error surface of the façade: an HTTP status plus a JSON `detail` body.
/// Store internals never leak to clients.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            detail: detail.into(),
        }
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            detail: detail.into(),
        }
    }
}

impl From<MatchPoolError> for ApiError {
    fn from(err: MatchPoolError) -> Self {
        match err {
            MatchPoolError::PlayerNotFound(_) => Self::not_found("player not registered"),
            MatchPoolError::MatchNotFound(_) => Self::not_found("match not found"),
            MatchPoolError::Auth(detail) => Self::unauthorized(detail),
            MatchPoolError::UnknownRegion(region) => Self {
                status: StatusCode::BAD_REQUEST,
                detail: format!("unknown region {region}"),
            },
            err => {
                error!(%err, "request failed");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    detail: "internal error".to_string(),
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}
