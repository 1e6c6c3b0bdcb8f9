use crate::game::skills::{SkillAction, SkillId};
use crate::game::types::{EntityId, FoodKind, Point, WormClass};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
  Join {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    class: Option<String>,
    #[serde(default)]
    skin: Option<String>,
  },
  Input {
    #[serde(default)]
    angle: Option<f64>,
    #[serde(default)]
    boost: bool,
  },
  Skill {
    action: SkillAction,
    #[serde(default)]
    target: Option<Point>,
  },
  Mutation {
    id: String,
  },
  Respawn,
}

/// Malformed or unknown messages decode to `None` and are dropped by the caller.
pub fn decode_client_message(text: &str) -> Option<ClientMessage> {
  serde_json::from_str(text).ok()
}

/// Unknown class names are treated as "no preference".
pub fn parse_class(value: &str) -> Option<WormClass> {
  serde_json::from_value(serde_json::Value::String(value.trim().to_ascii_lowercase())).ok()
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
  #[serde(rename_all = "camelCase")]
  Welcome { session_id: String, arena_radius: f64 },
  State(StateSnapshot),
  Offer { tier: u8, options: Vec<String> },
  Death { reason: String, score: i64 },
}

impl ServerMessage {
  pub fn encode(&self) -> Option<String> {
    match serde_json::to_string(self) {
      Ok(text) => Some(text),
      Err(error) => {
        tracing::warn!(%error, "failed to encode server message");
        None
      }
    }
  }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
  pub tick: u64,
  pub now: i64,
  pub arena_radius: f64,
  pub you: Option<EntityId>,
  pub worms: BTreeMap<EntityId, WormView>,
  pub food: Vec<FoodView>,
  pub gas_clouds: Vec<ZoneView>,
  pub ice_zones: Vec<ZoneView>,
  pub black_holes: Vec<ZoneView>,
  pub decoys: Vec<DecoyView>,
  pub leaderboard: Vec<LeaderboardEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WormView {
  pub id: EntityId,
  pub name: String,
  pub color: String,
  pub class: WormClass,
  pub skin: String,
  pub boost: bool,
  pub status: StatusFlags,
  pub stage: u8,
  pub skill: SkillView,
  pub mutations: Vec<String>,
  pub armor: u32,
  pub segments: Vec<[i32; 2]>,
  pub score: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusFlags {
  pub invulnerable: bool,
  pub stealth: bool,
  pub phase: bool,
  pub slow: bool,
  pub turn_locked: bool,
  pub charge: bool,
  pub thorns: bool,
  pub electric: bool,
  pub rewinding: bool,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillView {
  pub id: Option<SkillId>,
  pub cooldown_remaining: i64,
  pub active: bool,
  pub held: bool,
  pub energy: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct FoodView {
  pub id: EntityId,
  pub x: i32,
  pub y: i32,
  pub value: i64,
  pub kind: FoodKind,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneView {
  pub id: EntityId,
  pub owner: EntityId,
  pub x: i32,
  pub y: i32,
  pub radius: f64,
  pub expires_at: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecoyView {
  pub id: EntityId,
  pub owner: EntityId,
  pub segments: Vec<[i32; 2]>,
  pub expires_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
  pub id: EntityId,
  pub name: String,
  pub score: i64,
}

pub fn quantize(point: Point) -> [i32; 2] {
  [point.x.round() as i32, point.y.round() as i32]
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn decodes_tagged_client_messages() {
    let join =
      decode_client_message(r#"{"type":"join","name":"ann","class":"wisp","skin":"wisp_echo"}"#);
    assert_eq!(
      join,
      Some(ClientMessage::Join {
        name: Some("ann".to_string()),
        class: Some("wisp".to_string()),
        skin: Some("wisp_echo".to_string()),
      })
    );

    let skill =
      decode_client_message(r#"{"type":"skill","action":"start","target":{"x":1.0,"y":2.0}}"#);
    assert_eq!(
      skill,
      Some(ClientMessage::Skill {
        action: SkillAction::Start,
        target: Some(Point { x: 1.0, y: 2.0 }),
      })
    );

    assert_eq!(
      decode_client_message(r#"{"type":"input","angle":1.5}"#),
      Some(ClientMessage::Input {
        angle: Some(1.5),
        boost: false,
      })
    );
    assert_eq!(decode_client_message(r#"{"type":"respawn"}"#), Some(ClientMessage::Respawn));
  }

  #[test]
  fn drops_malformed_messages() {
    assert_eq!(decode_client_message("not json"), None);
    assert_eq!(decode_client_message(r#"{"type":"skill","action":"spin"}"#), None);
    assert_eq!(decode_client_message(r#"{"type":"teleport"}"#), None);
  }

  #[test]
  fn class_names_parse_leniently() {
    assert_eq!(parse_class(" Reaper "), Some(WormClass::Reaper));
    assert_eq!(parse_class("paladin"), None);
  }

  #[test]
  fn server_messages_are_type_tagged() {
    let text = ServerMessage::Death {
      reason: "wall".to_string(),
      score: 12,
    }
    .encode()
    .expect("encodes");
    let value: serde_json::Value = serde_json::from_str(&text).expect("valid json");
    assert_eq!(value["type"], "death");
    assert_eq!(value["reason"], "wall");

    let text = ServerMessage::Welcome {
      session_id: "abc".to_string(),
      arena_radius: 3000.0,
    }
    .encode()
    .expect("encodes");
    let value: serde_json::Value = serde_json::from_str(&text).expect("valid json");
    assert_eq!(value["sessionId"], "abc");
  }
}
