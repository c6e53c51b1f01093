//! Replay playback driver - headless entry point
//!
//! Fetches a match's metadata from the backing store, opens a playback
//! session, and plays the match through at the configured speed, logging
//! the playback position as it goes. Rendering clients link the library
//! directly; this binary exists to exercise a replay end to end.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use replay_engine::config::Config;
use replay_engine::replay::ReplaySession;
use replay_engine::store::{RoundFetcher, RoundStore, StoreClient};
use replay_engine::util::time::Timer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    info!("Starting replay playback driver");
    info!("Backing store: {}", config.store_url);

    let client = StoreClient::new(&config);
    let fetcher = Arc::new(RoundStore::new(client));

    let meta = fetcher.fetch_match(config.match_id).await?;
    info!(
        match_id = %meta.match_id,
        map = %meta.map_name,
        rounds = meta.rounds.len(),
        tick_rate = meta.ticks_per_second,
        "Fetched match metadata"
    );

    let initial_tick = meta.min_tick();
    let mut session = ReplaySession::new(fetcher, meta);
    session.start(initial_tick).await;
    session.set_speed(config.playback_speed);
    session.play();

    run_playback(&mut session).await;

    info!("Driver shutdown complete");
    Ok(())
}

/// Drive the session with a ~60fps frame loop until the match ends or a
/// shutdown signal arrives.
async fn run_playback(session: &mut ReplaySession) {
    let mut frames = tokio::time::interval(Duration::from_millis(16));
    frames.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut frame_timer = Timer::new();
    let mut report_timer = Timer::new();

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = frames.tick() => {
                let delta_ms = frame_timer.elapsed_ms() as f64;
                frame_timer.reset();

                let tick = session.advance(delta_ms);

                if report_timer.elapsed_ms() >= 1000 {
                    report_timer.reset();
                    let players = session.all_entity_states(tick);
                    let thrown = session.thrown_object_states(tick);
                    info!(
                        tick,
                        players = players.len(),
                        thrown_objects = thrown.len(),
                        "Playback position"
                    );
                }

                // The clock auto-pauses at the end of the match
                if !session.is_playing() {
                    info!(tick, "Playback finished");
                    break;
                }
            }
            _ = &mut shutdown => {
                info!("Received shutdown signal, closing session");
                break;
            }
        }
    }
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
