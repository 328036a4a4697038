use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use super::auth::ApiKey;
use super::{ApiError, AppState};
use crate::model::{
    DequeueOutcome, EnqueueReceipt, MatchRecord, QueueStatus, ReportReceipt, Team,
};

#[derive(Debug, Deserialize)]
pub struct EnqueueIn {
    pub player_id: String,
    #[serde(default)]
    pub constraints: Option<Value>,
}

pub async fn enqueue(
    State(state): State<AppState>,
    _key: ApiKey,
    Json(body): Json<EnqueueIn>,
) -> Result<Json<EnqueueReceipt>, ApiError> {
    let receipt = state.store.enqueue(&body.player_id, body.constraints).await?;
    Ok(Json(receipt))
}

pub async fn dequeue(
    State(state): State<AppState>,
    _key: ApiKey,
    Path(player_id): Path<String>,
) -> Result<Json<DequeueOutcome>, ApiError> {
    Ok(Json(state.store.dequeue(&player_id).await?))
}

pub async fn queue_status(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
) -> Result<Json<QueueStatus>, ApiError> {
    Ok(Json(state.store.queue_status(&player_id).await?))
}

/// Lenient id parsing: a malformed match id refers to no match, which is a
/// 404 rather than a syntax error.
fn parse_match_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found("match not found"))
}

pub async fn get_match(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
) -> Result<Json<MatchRecord>, ApiError> {
    let match_id = parse_match_id(&match_id)?;
    let record = state
        .store
        .get_match(match_id)
        .await?
        .ok_or_else(|| ApiError::not_found("match not found"))?;
    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
pub struct LatestQuery {
    pub limit: Option<i64>,
}

pub async fn latest_matches(
    State(state): State<AppState>,
    Query(query): Query<LatestQuery>,
) -> Result<Json<Vec<MatchRecord>>, ApiError> {
    let limit = query.limit.unwrap_or(5).clamp(1, 50);
    Ok(Json(state.store.latest_matches(limit).await?))
}

#[derive(Debug, Deserialize)]
pub struct ResultIn {
    pub winner_team: Team,
}

/// Record the report intent, then hand the heavy lifting to the applier task.
pub async fn report_result(
    State(state): State<AppState>,
    _key: ApiKey,
    Path(match_id): Path<String>,
    Json(body): Json<ResultIn>,
) -> Result<Json<ReportReceipt>, ApiError> {
    let match_id = parse_match_id(&match_id)?;
    let receipt = state.store.record_report(match_id, body.winner_team).await?;
    state.dispatcher.dispatch(match_id, body.winner_team);
    Ok(Json(receipt))
}
