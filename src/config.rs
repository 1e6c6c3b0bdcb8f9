use crate::game::constants::{BOT_COUNT, DEFAULT_TICK_RATE, VIEW_RADIUS};
use crate::game::tuning::Tuning;
use std::env;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read tuning table {path}: {source}")]
  Read {
    path: String,
    #[source]
    source: std::io::Error,
  },
  #[error("malformed tuning table: {0}")]
  Parse(#[from] serde_json::Error),
  #[error("invalid tuning table: {0}")]
  Invalid(String),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
  pub port: u16,
  pub tick_rate: u32,
  pub bot_count: usize,
  pub view_radius: f64,
  pub tuning_path: Option<PathBuf>,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      port: 8787,
      tick_rate: DEFAULT_TICK_RATE,
      bot_count: BOT_COUNT,
      view_radius: VIEW_RADIUS,
      tuning_path: None,
    }
  }
}

impl ServerConfig {
  pub fn from_env() -> Self {
    let mut config = Self::default();

    if let Ok(value) = env::var("PORT") {
      match value.parse::<u16>() {
        Ok(port) if port > 0 => config.port = port,
        _ => tracing::warn!(value, "invalid PORT, using default"),
      }
    }

    if let Ok(value) = env::var("ARENA_TICK_RATE") {
      match value.parse::<u32>() {
        Ok(rate) if (10..=240).contains(&rate) => config.tick_rate = rate,
        _ => tracing::warn!(value, "ARENA_TICK_RATE must be 10-240, using default"),
      }
    }

    if let Ok(value) = env::var("ARENA_BOT_COUNT") {
      match value.parse::<usize>() {
        Ok(count) if count <= 200 => config.bot_count = count,
        _ => tracing::warn!(value, "ARENA_BOT_COUNT must be 0-200, using default"),
      }
    }

    if let Ok(value) = env::var("ARENA_VIEW_RADIUS") {
      match value.parse::<f64>() {
        Ok(radius) if radius.is_finite() && radius > 0.0 => config.view_radius = radius,
        _ => tracing::warn!(value, "invalid ARENA_VIEW_RADIUS, using default"),
      }
    }

    config.tuning_path = env::var("ARENA_TUNING_PATH")
      .ok()
      .map(|value| value.trim().to_string())
      .filter(|value| !value.is_empty())
      .map(PathBuf::from);

    config
  }

  /// Loads the tuning table named by the config, or the built-in one.
  pub fn load_tuning(&self) -> Result<Tuning, ConfigError> {
    match &self.tuning_path {
      Some(path) => Tuning::load(path),
      None => Ok(Tuning::default()),
    }
  }
}
