use super::world::{World, WorldEvent};
use crate::protocol::{self, ClientMessage, ServerMessage};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex as StdMutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

#[derive(Debug)]
enum Inbound {
  Connect(String),
  Message(String, ClientMessage),
  Disconnect(String),
}

/// Owns the world behind a lock. Connections only ever queue commands; the loop
/// applies them at the start of the next step, then steps and fans out snapshots.
pub struct Room {
  world: Mutex<World>,
  sessions: DashMap<String, UnboundedSender<String>>,
  inbox: StdMutex<Vec<Inbound>>,
  running: AtomicBool,
  tick_rate: u32,
  arena_radius: f64,
}

impl Room {
  pub fn new(world: World) -> Self {
    Self {
      tick_rate: world.tick_rate.max(1),
      arena_radius: world.arena_radius,
      world: Mutex::new(world),
      sessions: DashMap::new(),
      inbox: StdMutex::new(Vec::new()),
      running: AtomicBool::new(false),
    }
  }

  fn queue(&self, inbound: Inbound) {
    self
      .inbox
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push(inbound);
  }

  pub fn add_session(&self, sender: UnboundedSender<String>) -> String {
    let session_id = Uuid::new_v4().to_string();
    let welcome = ServerMessage::Welcome {
      session_id: session_id.clone(),
      arena_radius: self.arena_radius,
    };
    if let Some(text) = welcome.encode() {
      let _ = sender.send(text);
    }
    self.sessions.insert(session_id.clone(), sender);
    self.queue(Inbound::Connect(session_id.clone()));
    tracing::debug!(session_id, "session connected");
    session_id
  }

  pub fn handle_text_message(&self, session_id: &str, text: &str) {
    let Some(message) = protocol::decode_client_message(text) else {
      tracing::trace!(session_id, "dropping malformed message");
      return;
    };
    self.queue(Inbound::Message(session_id.to_string(), message));
  }

  pub fn remove_session(&self, session_id: &str) {
    self.sessions.remove(session_id);
    self.queue(Inbound::Disconnect(session_id.to_string()));
  }

  pub fn session_count(&self) -> usize {
    self.sessions.len()
  }

  pub fn spawn_loop(self: &std::sync::Arc<Self>) {
    if self
      .running
      .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
      .is_err()
    {
      return;
    }

    let room = std::sync::Arc::clone(self);
    tokio::spawn(async move {
      let period = Duration::from_micros(1_000_000 / room.tick_rate as u64);
      let mut interval = tokio::time::interval(period);
      interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
      tracing::info!(tick_rate = room.tick_rate, "simulation loop started");
      loop {
        interval.tick().await;
        room.step().await;
      }
    });
  }

  fn apply(world: &mut World, inbound: Inbound) {
    match inbound {
      Inbound::Connect(session_id) => world.connect(&session_id),
      Inbound::Disconnect(session_id) => world.disconnect(&session_id),
      Inbound::Message(session_id, message) => match message {
        ClientMessage::Join { name, class, skin } => {
          let class = class.as_deref().and_then(protocol::parse_class);
          if let Some(worm_id) = world.join(&session_id, name.as_deref(), class, skin.as_deref()) {
            tracing::info!(session_id, worm_id, "player joined");
          }
        }
        ClientMessage::Input { angle, boost } => world.set_input(&session_id, angle, boost),
        ClientMessage::Skill { action, target } => world.skill_action(&session_id, action, target),
        ClientMessage::Mutation { id } => world.choose_mutation(&session_id, &id),
        ClientMessage::Respawn => {
          world.respawn(&session_id);
        }
      },
    }
  }

  fn send(&self, session_id: &str, message: &ServerMessage) {
    let Some(sender) = self.sessions.get(session_id) else { return };
    if let Some(text) = message.encode() {
      let _ = sender.send(text);
    }
  }

  pub async fn step(&self) {
    let mut world = self.world.lock().await;
    let inbound = std::mem::take(&mut *self.inbox.lock().unwrap_or_else(PoisonError::into_inner));
    for message in inbound {
      Self::apply(&mut world, message);
    }

    world.step();

    for event in world.drain_events() {
      match event {
        WorldEvent::Death {
          session_id,
          cause,
          score,
        } => {
          tracing::debug!(session_id, cause = cause.as_str(), score, "notifying death");
          self.send(
            &session_id,
            &ServerMessage::Death {
              reason: cause.as_str().to_string(),
              score,
            },
          );
        }
        WorldEvent::Offer { session_id, offer } => self.send(
          &session_id,
          &ServerMessage::Offer {
            tier: offer.tier,
            options: offer.options,
          },
        ),
      }
    }

    let leaderboard = world.leaderboard();
    let session_ids: Vec<String> = self.sessions.iter().map(|entry| entry.key().clone()).collect();
    for session_id in session_ids {
      let Some(snapshot) = world.snapshot_for(&session_id, &leaderboard) else { continue };
      self.send(&session_id, &ServerMessage::State(snapshot));
    }
  }
}
