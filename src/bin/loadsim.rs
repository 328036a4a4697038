//! Load-simulation client: drives the whole matchmaking loop through the
//! public HTTP surface. Registers a fleet of players, keeps them enqueued,
//! and reports random winners until everyone has played their share.

use std::collections::{HashMap, HashSet};
use std::env;
use std::time::{Duration, Instant};

use rand::seq::SliceRandom;
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

use matchpool::{MatchRecord, Region, Team};

#[derive(Debug, Deserialize)]
struct RegisterResp {
    player_id: String,
    access_token: String,
}

struct Sim {
    client: Client,
    api_url: String,
    api_key: String,
}

impl Sim {
    async fn register(&self, username: &str, region: Region) -> reqwest::Result<RegisterResp> {
        self.client
            .post(format!("{}/players/register", self.api_url))
            .header("x-idempotency-key", Uuid::new_v4().to_string())
            .json(&serde_json::json!({ "username": username, "region": region }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    async fn enqueue(&self, player_id: &str, token: &str) {
        let sent = self
            .client
            .post(format!("{}/matchmaking/queue", self.api_url))
            .header("x-api-key", &self.api_key)
            .bearer_auth(token)
            .json(&serde_json::json!({ "player_id": player_id }))
            .send()
            .await;
        if let Err(err) = sent {
            warn!(%err, player_id, "enqueue failed");
        }
    }

    async fn latest_matches(&self) -> reqwest::Result<Vec<MatchRecord>> {
        self.client
            .get(format!("{}/matchmaking/matches/latest?limit=50", self.api_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    async fn report(&self, match_id: Uuid, winner: Team) {
        let sent = self
            .client
            .post(format!(
                "{}/matchmaking/match/{}/result",
                self.api_url, match_id
            ))
            .header("x-api-key", &self.api_key)
            .json(&serde_json::json!({ "winner_team": winner }))
            .send()
            .await;
        if let Err(err) = sent {
            warn!(%err, %match_id, "result report failed");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let n_players: usize = env::var("LOADSIM_PLAYERS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(64);
    let games_per_player: u32 = env::var("LOADSIM_GAMES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3);

    let sim = Sim {
        client: Client::builder().timeout(Duration::from_secs(5)).build()?,
        api_url: env::var("API_URL").unwrap_or_else(|_| "http://localhost:8080".to_string()),
        api_key: env::var("API_KEY").unwrap_or_else(|_| "dev".to_string()),
    };

    // Register the fleet, spread across every region.
    let mut tokens: HashMap<String, String> = HashMap::new();
    let mut games: HashMap<String, u32> = HashMap::new();
    for i in 0..n_players {
        let region = {
            let mut rng = rand::thread_rng();
            *Region::ALL.choose(&mut rng).expect("regions are non-empty")
        };
        let username = format!("user{i}_{region}");
        match sim.register(&username, region).await {
            Ok(resp) => {
                games.insert(resp.player_id.clone(), 0);
                tokens.insert(resp.player_id, resp.access_token);
            }
            Err(err) => warn!(%err, %username, "registration failed"),
        }
    }
    info!(registered = tokens.len(), "fleet ready");

    for (player_id, token) in &tokens {
        sim.enqueue(player_id, token).await;
    }

    let total_needed = tokens.len() as u64 * games_per_player as u64;
    let mut completed: u64 = 0;
    let mut seen: HashSet<Uuid> = HashSet::new();
    let mut last_sweep = Instant::now();
    let mut last_print = Instant::now();

    while completed < total_needed {
        match sim.latest_matches().await {
            Ok(matches) => {
                for record in matches {
                    if !seen.insert(record.match_id) {
                        continue;
                    }
                    let winner = {
                        let mut rng = rand::thread_rng();
                        *[Team::A, Team::B].choose(&mut rng).expect("two teams")
                    };
                    sim.report(record.match_id, winner).await;

                    for player_id in record.roster.player_ids() {
                        let Some(count) = games.get_mut(&player_id) else {
                            continue;
                        };
                        if *count < games_per_player {
                            *count += 1;
                            completed += 1;
                            if *count < games_per_player {
                                sim.enqueue(&player_id, &tokens[&player_id]).await;
                            }
                        }
                    }
                }
            }
            Err(err) => warn!(%err, "polling latest matches failed"),
        }

        // Players can fall out of rotation (lost reports, restarts); sweep
        // them back into the queue now and then.
        if last_sweep.elapsed() >= Duration::from_secs(10) {
            for (player_id, count) in &games {
                if *count < games_per_player {
                    sim.enqueue(player_id, &tokens[player_id]).await;
                }
            }
            last_sweep = Instant::now();
        }

        if last_print.elapsed() >= Duration::from_secs(1) {
            let done_players = games.values().filter(|&&c| c >= games_per_player).count();
            info!(
                games = completed,
                total = total_needed,
                players_done = done_players,
                matches_seen = seen.len(),
                "progress"
            );
            last_print = Instant::now();
        }

        tokio::time::sleep(Duration::from_millis(300)).await;
    }

    info!("simulation finished");
    Ok(())
}
