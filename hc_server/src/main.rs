//! Multi-table Texas Hold'em realtime server.
//!
//! Wires the engine together: config from env/CLI, the room registry,
//! the hub coordinator task, the chip store, and the axum router with
//! the websocket upgrade endpoint.

mod api;
mod config;
mod logging;
mod service;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Error;
use pico_args::Arguments;
use sqlx::postgres::PgPoolOptions;

use holdem_core::auth::SessionGate;
use holdem_core::db::ChipStore;
use holdem_core::net::Hub;
use holdem_core::room::{Blinds, RoomOptions, RoomRegistry, Visibility};

use config::ServerConfig;
use service::GameService;

const HELP: &str = "\
Run a multi-table Texas Hold'em realtime server

USAGE:
  hc_server [OPTIONS]

OPTIONS:
  --bind    IP:PORT   Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url  URL       Database connection string  [default: env DATABASE_URL]

FLAGS:
  -h, --help          Print help information

ENVIRONMENT:
  SERVER_BIND         Bind address (e.g. 0.0.0.0:8080)
  WS_SIGNING_SECRET   Signing secret for realtime bearer tokens
  DATABASE_URL        User record store connection string
  CACHE_URL           Cache/KV connection string
  ADMIN_SECRET        Admin token secret
  NUM_ROOMS           Rooms opened at startup
  TURN_CLOCK_SECS     Per-turn action deadline in seconds
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // .env never overrides real environment variables.
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        return Ok(());
    }
    let bind_override = pargs.opt_value_from_str("--bind")?;
    let database_url_override = pargs.opt_value_from_str("--db-url")?;

    logging::init();

    let config = ServerConfig::from_env(bind_override, database_url_override)?;
    config.validate()?;
    tracing::info!("configuration loaded and validated");

    // The chip store is a collaborator; a missing database downgrades to
    // table-only chips rather than refusing to serve.
    let store = match PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            tracing::info!("user record store connected");
            Some(ChipStore::new(Arc::new(pool)))
        }
        Err(error) => {
            tracing::warn!(%error, "user record store unavailable; chips stay table-local");
            None
        }
    };

    let rooms = Arc::new(RoomRegistry::new());
    for i in 0..config.num_rooms {
        let (room_id, _) = rooms
            .create(RoomOptions {
                name: format!("Table {}", i + 1),
                blinds: Blinds {
                    small: config.room_defaults.small_blind,
                    big: config.room_defaults.big_blind,
                },
                min_buyin: config.room_defaults.min_buyin,
                max_seats: config.room_defaults.max_seats,
                visibility: Visibility::Public,
            })
            .await;
        tracing::info!(
            room_id,
            blinds = %format!("{}/{}", config.room_defaults.small_blind, config.room_defaults.big_blind),
            "table opened"
        );
    }

    let (hub, hub_handle) = Hub::new(rooms.clone());
    tokio::spawn(hub.run());

    let service = GameService::new(
        rooms.clone(),
        hub_handle.clone(),
        store,
        Duration::from_secs(config.turn_clock_secs),
    );

    let state = api::AppState {
        gate: Arc::new(SessionGate::new(&config.ws_signing_secret)),
        hub: hub_handle,
        rooms,
        service,
    };
    let app = api::create_router(state);

    tracing::info!("listening on {}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to install shutdown handler");
    }
}
