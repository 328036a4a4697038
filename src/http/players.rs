use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::auth::create_access_token;
use super::{ApiError, AppState};
use crate::error::MatchPoolError;
use crate::model::{LeaderboardRow, Player};
use crate::region::Region;

/// Namespace for idempotent registration ids: the same idempotency key always
/// derives the same player id, so client retries cannot double-register.
const REGISTRATION_NAMESPACE: Uuid = Uuid::from_u128(0x11111111_1111_1111_1111_111111111111);

#[derive(Debug, Deserialize)]
pub struct RegisterIn {
    pub username: String,
    #[serde(default)]
    pub region: Option<Region>,
}

#[derive(Debug, Serialize)]
pub struct RegisterOut {
    pub player_id: String,
    pub access_token: String,
    pub token_type: &'static str,
}

pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<RegisterIn>,
) -> Result<Json<RegisterOut>, ApiError> {
    let player_id = match headers
        .get("x-idempotency-key")
        .and_then(|value| value.to_str().ok())
    {
        Some(key) => Uuid::new_v5(&REGISTRATION_NAMESPACE, key.as_bytes()).to_string(),
        None => Uuid::new_v4().to_string(),
    };

    let rating = state.rating_env.default_rating();
    let player = Player {
        player_id: player_id.clone(),
        username: body.username,
        region: body.region.unwrap_or(Region::EUW),
        mu: rating.mu,
        sigma: rating.sigma,
        last_active: Utc::now(),
    };
    state.store.create_player(&player).await?;

    let access_token = create_access_token(&state.auth, &player_id)?;
    Ok(Json(RegisterOut {
        player_id,
        access_token,
        token_type: "bearer",
    }))
}

#[derive(Debug, Serialize)]
pub struct PlayerProfile {
    pub player_id: String,
    pub username: String,
    pub region: Region,
    pub mu: f64,
    pub sigma: f64,
    pub conservative_rating: f64,
    pub last_active: DateTime<Utc>,
}

pub async fn get_player(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
) -> Result<Json<PlayerProfile>, ApiError> {
    let player = state
        .store
        .get_player(&player_id)
        .await?
        .ok_or(MatchPoolError::PlayerNotFound(player_id))?;

    Ok(Json(PlayerProfile {
        conservative_rating: player.conservative_rating(),
        player_id: player.player_id,
        username: player.username,
        region: player.region,
        mu: player.mu,
        sigma: player.sigma,
        last_active: player.last_active,
    }))
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    #[serde(flatten)]
    pub row: LeaderboardRow,
}

pub async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let rows = state.store.leaderboard(limit).await?;

    let entries = rows
        .into_iter()
        .enumerate()
        .map(|(idx, row)| LeaderboardEntry { rank: idx + 1, row })
        .collect();
    Ok(Json(entries))
}
