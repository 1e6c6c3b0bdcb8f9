use axum::{
  extract::{State, WebSocketUpgrade},
  http::Method,
  response::IntoResponse,
  routing::get,
  Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

mod config;
mod game;
mod protocol;
mod shared;
mod transport;

use config::ServerConfig;
use game::room::Room;
use game::world::{World, WorldSettings};

#[derive(Clone)]
struct AppState {
  room: Arc<Room>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
  ok: bool,
  sessions: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  let config = ServerConfig::from_env();
  let tuning = match config.load_tuning() {
    Ok(tuning) => tuning,
    Err(error) => {
      tracing::warn!(%error, "falling back to built-in tuning table");
      game::tuning::Tuning::default()
    }
  };

  let world = World::new(tuning, WorldSettings::from_config(&config));
  let room = Arc::new(Room::new(world));
  room.spawn_loop();

  let state = Arc::new(AppState { room });

  let cors = CorsLayer::new()
    .allow_origin(Any)
    .allow_methods([Method::GET])
    .allow_headers(Any);

  let app: Router = Router::new()
    .route("/api/health", get(health))
    .route("/api/arena", get(ws_handler))
    .layer(cors)
    .with_state(state);

  let address = format!("0.0.0.0:{}", config.port);
  tracing::info!(
    tick_rate = config.tick_rate,
    bots = config.bot_count,
    "listening on {address}"
  );

  let listener = tokio::net::TcpListener::bind(&address).await?;
  axum::serve(listener, app).await?;

  Ok(())
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthResponse {
    ok: true,
    sessions: state.room.session_count(),
  })
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let room = state.room.clone();
  ws.on_upgrade(move |socket| transport::ws_session::handle_socket(socket, room))
}
