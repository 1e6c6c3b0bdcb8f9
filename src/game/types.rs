use super::bots::BotBrain;
use super::constants::{
  BODY_RADIUS_RATIO, HEAD_RADIUS_BASE, HEAD_RADIUS_MAX, HEAD_RADIUS_PER_SEGMENT, MAX_SEGMENTS,
  MIN_SEGMENTS, SCORE_PER_SEGMENT,
};
use super::skills::SkillId;
use super::trail::Trail;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub type EntityId = u64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
  pub x: f64,
  pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WormClass {
  Bulwark,
  Striker,
  Wisp,
  Reaper,
  Arcanist,
}

impl WormClass {
  pub const ALL: [WormClass; 5] = [
    WormClass::Bulwark,
    WormClass::Striker,
    WormClass::Wisp,
    WormClass::Reaper,
    WormClass::Arcanist,
  ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathCause {
  HeadToHead,
  BodyCollision,
  Thorns,
  Wall,
  BlackHole,
  Disconnect,
  Fault,
}

impl DeathCause {
  pub fn as_str(self) -> &'static str {
    match self {
      DeathCause::HeadToHead => "head-to-head",
      DeathCause::BodyCollision => "body-collision",
      DeathCause::Thorns => "thorns",
      DeathCause::Wall => "wall",
      DeathCause::BlackHole => "black-hole",
      DeathCause::Disconnect => "disconnect",
      DeathCause::Fault => "fault",
    }
  }
}

/// Absolute "active until" timestamps. A window is active iff `now < until`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusTimers {
  pub invulnerable_until: i64,
  pub stealth_until: i64,
  pub phase_until: i64,
  pub slow_until: i64,
  pub turn_locked_until: i64,
  pub charge_until: i64,
  pub thorns_until: i64,
  pub electric_until: i64,
}

pub fn active(until: i64, now: i64) -> bool {
  now < until
}

#[derive(Debug, Clone, Default)]
pub struct SkillSlot {
  pub ready_at: i64,
  pub active_until: i64,
  pub held: bool,
  pub hold_started_at: i64,
  pub hold_start_remaining: i64,
  /// Set when a mutation permanently overwrote the class/skin skill.
  pub granted: Option<SkillId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingOffer {
  pub tier: u8,
  pub options: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Progress {
  pub offer_index: usize,
  pub pending: Option<PendingOffer>,
}

#[derive(Debug, Clone, Copy)]
pub struct RewindSample {
  pub at: i64,
  pub head: Point,
  pub angle: f64,
  pub score: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct RewindTransition {
  pub from: Point,
  pub target: RewindSample,
  pub started_at: i64,
  pub ends_at: i64,
}

#[derive(Debug, Clone, Default)]
pub struct RewindState {
  pub samples: VecDeque<RewindSample>,
  pub last_sample_at: Option<i64>,
  pub transition: Option<RewindTransition>,
}

#[derive(Debug, Clone)]
pub enum Controller {
  Human { session_id: String },
  Bot(BotBrain),
}

#[derive(Debug, Clone)]
pub struct Worm {
  pub id: EntityId,
  pub name: String,
  pub color: String,
  pub class: WormClass,
  pub skin: String,
  pub controller: Controller,
  pub body: Vec<Point>,
  pub trail: Trail,
  pub angle: f64,
  pub target_angle: f64,
  pub boost: bool,
  pub boost_blend: f64,
  pub score: i64,
  pub score_fraction: f64,
  pub spawned_at: i64,
  pub timers: StatusTimers,
  pub skill: SkillSlot,
  pub mutations: Vec<String>,
  pub armor_stacks: u32,
  pub progress: Progress,
  pub rewind: RewindState,
  pub last_boost_drop_at: i64,
}

impl Worm {
  pub fn head(&self) -> Point {
    self.body.first().copied().unwrap_or_default()
  }

  pub fn segment_count(&self) -> usize {
    self.body.len()
  }

  /// Segment count the body should carry for the current score.
  pub fn target_segments(&self) -> usize {
    target_segments_for_score(self.score)
  }

  pub fn mass(&self) -> f64 {
    self.body.len().max(MIN_SEGMENTS) as f64
  }

  pub fn head_radius(&self) -> f64 {
    head_radius_for(self.body.len())
  }

  pub fn body_radius(&self) -> f64 {
    self.head_radius() * BODY_RADIUS_RATIO
  }

  pub fn is_bot(&self) -> bool {
    matches!(self.controller, Controller::Bot(_))
  }

  pub fn session_id(&self) -> Option<&str> {
    match &self.controller {
      Controller::Human { session_id } => Some(session_id.as_str()),
      Controller::Bot(_) => None,
    }
  }

  pub fn in_spawn_grace(&self, now: i64, grace_ms: i64) -> bool {
    now < self.spawned_at + grace_ms
  }

  pub fn is_rewinding(&self) -> bool {
    self.rewind.transition.is_some()
  }

  pub fn mutation_stacks(&self, id: &str) -> u32 {
    self.mutations.iter().filter(|owned| owned.as_str() == id).count() as u32
  }

  /// Moves the whole worm rigidly, body and recorded path together.
  pub fn translate(&mut self, dx: f64, dy: f64) {
    for point in &mut self.body {
      point.x += dx;
      point.y += dy;
    }
    self.trail.translate(dx, dy);
  }

  /// Adds (or removes) score through the fractional accumulator, never dropping below zero.
  pub fn add_score(&mut self, amount: f64) {
    if !amount.is_finite() {
      return;
    }
    self.score_fraction += amount;
    let whole = self.score_fraction.floor();
    self.score += whole as i64;
    self.score_fraction -= whole;
    if self.score < 0 {
      self.score = 0;
      self.score_fraction = 0.0;
    }
  }
}

pub fn target_segments_for_score(score: i64) -> usize {
  let extra = (score.max(0) as f64 / SCORE_PER_SEGMENT).floor() as usize;
  MIN_SEGMENTS.saturating_add(extra).min(MAX_SEGMENTS)
}

pub fn head_radius_for(segments: usize) -> f64 {
  let extra = segments.saturating_sub(MIN_SEGMENTS) as f64;
  (HEAD_RADIUS_BASE + extra * HEAD_RADIUS_PER_SEGMENT).min(HEAD_RADIUS_MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FoodKind {
  Normal,
  BoostDrop,
  Corpse,
  Bait,
}

#[derive(Debug, Clone, Copy)]
pub struct Food {
  pub id: EntityId,
  pub position: Point,
  pub radius: f64,
  pub value: i64,
  pub kind: FoodKind,
}

/// Circular timed hazard: gas cloud, ice zone or black hole depending on the owning collection.
#[derive(Debug, Clone, Copy)]
pub struct Zone {
  pub id: EntityId,
  pub owner: EntityId,
  pub position: Point,
  pub radius: f64,
  pub strength: f64,
  pub expires_at: i64,
}

#[derive(Debug, Clone)]
pub struct Decoy {
  pub id: EntityId,
  pub owner: EntityId,
  pub body: Vec<Point>,
  pub radius: f64,
  pub expires_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurstDirection {
  Away,
  Toward,
}

/// Knockback queued by a skill cast and consumed by the next collision pass.
#[derive(Debug, Clone, Copy)]
pub struct Burst {
  pub owner: EntityId,
  pub center: Point,
  pub radius: f64,
  pub strength: f64,
  pub direction: BurstDirection,
}

#[derive(Debug, Clone, Copy)]
pub struct BodySample {
  pub worm: EntityId,
  pub index: usize,
  pub position: Point,
}

impl PartialEq for BodySample {
  fn eq(&self, other: &Self) -> bool {
    self.worm == other.worm && self.index == other.index
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn score_floor_never_goes_negative() {
    let mut worm = crate::game::world::tests::make_worm(1, 5);
    worm.score = 2;
    worm.add_score(-10.5);
    assert_eq!(worm.score, 0);
    assert_eq!(worm.score_fraction, 0.0);
    assert_eq!(worm.target_segments(), MIN_SEGMENTS);
  }

  #[test]
  fn fractional_score_accumulates() {
    let mut worm = crate::game::world::tests::make_worm(1, 5);
    worm.score = 10;
    worm.add_score(0.4);
    worm.add_score(0.4);
    assert_eq!(worm.score, 10);
    worm.add_score(0.4);
    assert_eq!(worm.score, 11);
    assert!((worm.score_fraction - 0.2).abs() < 1e-9);
  }

  #[test]
  fn target_segments_clamped() {
    assert_eq!(target_segments_for_score(0), MIN_SEGMENTS);
    assert_eq!(target_segments_for_score(i64::MAX / 2), MAX_SEGMENTS);
  }
}
