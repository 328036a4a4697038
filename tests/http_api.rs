//! Router tests for the HTTP façade
//!
//! Drive the axum router directly with `tower::ServiceExt::oneshot` over the
//! in-memory store: auth, error mapping, and the full register → enqueue →
//! tick → report flow.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use matchpool::prelude::*;

const API_KEY: &str = "dev";

fn test_state() -> (AppState, Arc<dyn MatchStore>) {
    let store: Arc<dyn MatchStore> = Arc::new(MemoryStore::new());
    let dispatcher = ResultDispatcher::start(ResultApplier::new(store.clone()));
    let state = AppState {
        store: store.clone(),
        dispatcher,
        rating_env: TrueSkill::default(),
        auth: AuthConfig {
            api_key: API_KEY.to_string(),
            jwt_secret: "test-secret".to_string(),
            access_ttl_min: 120,
        },
    };
    (state, store)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, api_key: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }
    builder
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn delete(uri: &str, api_key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("DELETE").uri(uri);
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn register(app: &axum::Router, username: &str, idempotency_key: Option<&str>) -> Value {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/players/register")
        .header("content-type", "application/json");
    if let Some(key) = idempotency_key {
        builder = builder.header("x-idempotency-key", key);
    }
    let request = builder
        .body(Body::from(
            serde_json::to_vec(&json!({ "username": username, "region": "EUW" })).unwrap(),
        ))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

#[tokio::test]
async fn healthz_reports_ok() {
    let (state, _) = test_state();
    let app = router(state);

    let response = app.oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn mutating_endpoints_require_the_api_key() {
    let (state, _) = test_state();
    let app = router(state);

    let response = app
        .clone()
        .oneshot(post_json(
            "/matchmaking/queue",
            None,
            json!({ "player_id": "p1" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["detail"], "invalid api key");

    let response = app
        .clone()
        .oneshot(post_json(
            "/matchmaking/queue",
            Some("wrong"),
            json!({ "player_id": "p1" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(delete("/matchmaking/queue/p1", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn enqueue_of_unregistered_player_is_404() {
    let (state, _) = test_state();
    let app = router(state);

    let response = app
        .oneshot(post_json(
            "/matchmaking/queue",
            Some(API_KEY),
            json!({ "player_id": "ghost" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["detail"], "player not registered");
}

#[tokio::test]
async fn registration_is_idempotent_under_the_same_key() {
    let (state, _) = test_state();
    let app = router(state);

    let first = register(&app, "Akame", Some("retry-key")).await;
    let second = register(&app, "Akame", Some("retry-key")).await;
    assert_eq!(first["player_id"], second["player_id"]);
    assert_eq!(first["token_type"], "bearer");
    assert!(first["access_token"].as_str().unwrap().len() > 20);

    let third = register(&app, "Akame", Some("another-key")).await;
    assert_ne!(first["player_id"], third["player_id"]);
}

#[tokio::test]
async fn queue_round_trip_over_http() {
    let (state, _) = test_state();
    let app = router(state);

    let registered = register(&app, "Akame", None).await;
    let pid = registered["player_id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(post_json(
            "/matchmaking/queue",
            Some(API_KEY),
            json!({ "player_id": pid }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let receipt = body_json(response).await;
    assert_eq!(receipt["status"], "enqueued");
    assert_eq!(receipt["region"], "EUW");

    let response = app
        .clone()
        .oneshot(get(&format!("/matchmaking/queue/{pid}")))
        .await
        .unwrap();
    let status = body_json(response).await;
    assert_eq!(status["enqueued"], true);
    assert_eq!(status["region"], "EUW");

    let response = app
        .clone()
        .oneshot(delete(&format!("/matchmaking/queue/{pid}"), Some(API_KEY)))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["status"], "dequeued");

    let response = app
        .oneshot(get(&format!("/matchmaking/queue/{pid}")))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["enqueued"], false);
}

#[tokio::test]
async fn unknown_match_lookups_are_404() {
    let (state, _) = test_state();
    let app = router(state);

    // Not even a well-formed id: still "no such match".
    let response = app
        .clone()
        .oneshot(get("/matchmaking/match/unknown-id"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(get(&format!("/matchmaking/match/{}", Uuid::new_v4())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(post_json(
            &format!("/matchmaking/match/{}/result", Uuid::new_v4()),
            Some(API_KEY),
            json!({ "winner_team": "teamA" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["detail"], "match not found");
}

#[tokio::test]
async fn full_match_flow_over_http() {
    let (state, store) = test_state();
    let app = router(state);

    let mut player_ids = Vec::new();
    for i in 0..4 {
        let registered = register(&app, &format!("user{i}"), None).await;
        player_ids.push(registered["player_id"].as_str().unwrap().to_string());
    }
    for pid in &player_ids {
        let response = app
            .clone()
            .oneshot(post_json(
                "/matchmaking/queue",
                Some(API_KEY),
                json!({ "player_id": pid }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    // One matcher tick over the shared store.
    let runner = MatcherRunner::new(
        store.clone(),
        vec![Region::EUW],
        0.1,
        Duration::from_millis(200),
    );
    assert_eq!(runner.run_tick().await.matches_created, 1);

    let response = app
        .clone()
        .oneshot(get("/matchmaking/matches/latest"))
        .await
        .unwrap();
    let latest = body_json(response).await;
    let latest = latest.as_array().unwrap();
    assert_eq!(latest.len(), 1);
    let match_id = latest[0]["match_id"].as_str().unwrap().to_string();
    assert_eq!(latest[0]["status"], "pending");
    assert_eq!(latest[0]["players"]["teamA"].as_array().unwrap().len(), 2);

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/matchmaking/match/{match_id}/result"),
            Some(API_KEY),
            json!({ "winner_team": "teamA" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let receipt = body_json(response).await;
    assert_eq!(receipt["status"], "queued");
    assert_eq!(receipt["winner_team"], "teamA");

    // The dispatcher applies in the background; applying directly here is
    // equivalent and deterministic, since application is idempotent.
    let match_id = Uuid::parse_str(&match_id).unwrap();
    store
        .apply_result(match_id, Team::A, &TrueSkill::default())
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(get(&format!("/matchmaking/match/{match_id}")))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["status"], "finished");

    // Duplicate report: still 200, no further effect.
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/matchmaking/match/{match_id}/result"),
            Some(API_KEY),
            json!({ "winner_team": "teamA" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Winners climbed the leaderboard above the losers.
    let response = app
        .clone()
        .oneshot(get("/players/leaderboard?limit=10"))
        .await
        .unwrap();
    let board = body_json(response).await;
    let board = board.as_array().unwrap();
    assert_eq!(board.len(), 4);
    assert_eq!(board[0]["rank"], 1);
    assert!(
        board[0]["conservative_rating"].as_f64().unwrap()
            >= board[3]["conservative_rating"].as_f64().unwrap()
    );

    // Player profile reflects the applied update.
    let response = app
        .oneshot(get(&format!("/players/player/{}", player_ids[0])))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let profile = body_json(response).await;
    assert!(profile["conservative_rating"].as_f64().is_some());
}

#[tokio::test]
async fn metrics_expose_queue_depth() {
    let (state, _) = test_state();
    let app = router(state);

    let registered = register(&app, "Akame", None).await;
    let pid = registered["player_id"].as_str().unwrap().to_string();
    app.clone()
        .oneshot(post_json(
            "/matchmaking/queue",
            Some(API_KEY),
            json!({ "player_id": pid }),
        ))
        .await
        .unwrap();

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("matchpool_queue_depth"));
}

#[tokio::test]
async fn missing_player_profile_is_404() {
    let (state, _) = test_state();
    let app = router(state);

    let response = app.oneshot(get("/players/player/ghost")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
