//! The shared arena: every worm, pellet and hazard, plus the fixed-step pipeline
//! that advances them and the commands sessions feed in between steps.

mod spawn;
mod visibility;

use super::bots::{self, Dice};
use super::collision::{self, KillSet};
use super::constants::{
    ARENA_RADIUS, BOOST_DROP_INTERVAL_MS, BOOST_DROP_VALUE, BOOST_SCORE_DRAIN_PER_SEC, BOT_COUNT,
    BOT_RESPAWN_MS, DECOY_SLOW_MS, DEFAULT_TICK_RATE, FOOD_RADIUS, FOOD_REPLENISH_PER_TICK,
    FOOD_TARGET_COUNT, GAS_SCORE_DRAIN_PER_SEC, ICE_SLOW_LINGER_MS, REJOIN_GRACE_MS,
    SPATIAL_CELL_SIZE, SPAWN_GRACE_MS, VIEW_RADIUS, ZONE_CELL_SIZE,
};
use super::input::parse_angle;
use super::locomotion::step_worm;
use super::math::{direction, distance, distance_sq};
use super::progression::{self, Perks};
use super::skills::{self, SkillAction};
use super::spatial::SpatialIndex;
use super::tuning::Tuning;
use super::types::{
    active, BodySample, Burst, Controller, DeathCause, Decoy, EntityId, Food, FoodKind,
    PendingOffer, Point, Worm, WormClass, Zone,
};
use crate::config::ServerConfig;
use crate::shared::names::sanitize_player_name;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

const MAGNET_PULL_PER_SEC: f64 = 260.0;

#[derive(Debug, Clone)]
pub struct WorldSettings {
    pub tick_rate: u32,
    pub bot_count: usize,
    pub view_radius: f64,
    pub food_target: usize,
    pub seed: Option<u64>,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            tick_rate: DEFAULT_TICK_RATE,
            bot_count: BOT_COUNT,
            view_radius: VIEW_RADIUS,
            food_target: FOOD_TARGET_COUNT,
            seed: None,
        }
    }
}

impl WorldSettings {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            tick_rate: config.tick_rate.max(1),
            bot_count: config.bot_count,
            view_radius: config.view_radius,
            ..Self::default()
        }
    }
}

/// Things the step produced that belong to one connection.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    Death {
        session_id: String,
        cause: DeathCause,
        score: i64,
    },
    Offer {
        session_id: String,
        offer: PendingOffer,
    },
}

#[derive(Debug, Clone, Default)]
pub struct SessionSlot {
    pub worm: Option<EntityId>,
    pub joined: bool,
    pub name: String,
    pub class: Option<WormClass>,
    pub skin: Option<String>,
    pub last_position: Point,
}

pub struct World {
    pub tuning: Tuning,
    pub schedule: Vec<i64>,
    pub tick_rate: u32,
    pub tick: u64,
    pub now: i64,
    pub arena_radius: f64,
    pub view_radius: f64,
    pub bot_target: usize,
    pub food_target: usize,
    pub worms: HashMap<EntityId, Worm>,
    pub food: HashMap<EntityId, Food>,
    pub gas_clouds: HashMap<EntityId, Zone>,
    pub ice_zones: HashMap<EntityId, Zone>,
    pub black_holes: HashMap<EntityId, Zone>,
    pub decoys: HashMap<EntityId, Decoy>,
    pub bursts: Vec<Burst>,
    pub sessions: HashMap<String, SessionSlot>,
    pub food_index: SpatialIndex<EntityId>,
    pub body_index: SpatialIndex<BodySample>,
    pub head_index: SpatialIndex<EntityId>,
    pub gas_index: SpatialIndex<EntityId>,
    pub ice_index: SpatialIndex<EntityId>,
    pub pending_bot_respawns: Vec<i64>,
    events: Vec<WorldEvent>,
    rng: StdRng,
    next_id: EntityId,
    next_bot_index: u64,
}

impl World {
    pub fn new(tuning: Tuning, settings: WorldSettings) -> Self {
        let schedule = progression::build_schedule(&tuning.tiers);
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            tuning,
            schedule,
            tick_rate: settings.tick_rate.max(1),
            tick: 0,
            now: 0,
            arena_radius: ARENA_RADIUS,
            view_radius: settings.view_radius,
            bot_target: settings.bot_count,
            food_target: settings.food_target,
            worms: HashMap::new(),
            food: HashMap::new(),
            gas_clouds: HashMap::new(),
            ice_zones: HashMap::new(),
            black_holes: HashMap::new(),
            decoys: HashMap::new(),
            bursts: Vec::new(),
            sessions: HashMap::new(),
            food_index: SpatialIndex::new(SPATIAL_CELL_SIZE),
            body_index: SpatialIndex::new(SPATIAL_CELL_SIZE),
            head_index: SpatialIndex::new(SPATIAL_CELL_SIZE),
            gas_index: SpatialIndex::new(ZONE_CELL_SIZE),
            ice_index: SpatialIndex::new(ZONE_CELL_SIZE),
            pending_bot_respawns: Vec::new(),
            events: Vec::new(),
            rng,
            next_id: 1,
            next_bot_index: 1,
        }
    }

    pub fn dt(&self) -> f64 {
        1.0 / self.tick_rate as f64
    }

    pub fn allocate_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.events)
    }

    fn session_worm_id(&self, session_id: &str) -> Option<EntityId> {
        let id = self.sessions.get(session_id)?.worm?;
        self.worms.contains_key(&id).then_some(id)
    }

    pub fn connect(&mut self, session_id: &str) {
        self.sessions
            .entry(session_id.to_string())
            .or_default();
    }

    pub fn disconnect(&mut self, session_id: &str) {
        let Some(slot) = self.sessions.remove(session_id) else { return };
        tracing::debug!(session_id, "session disconnected");
        let Some(worm_id) = slot.worm else { return };
        let mut kills = KillSet::new();
        kills.mark(worm_id, DeathCause::Disconnect, None);
        self.apply_kills(&kills);
    }

    pub fn join(
        &mut self,
        session_id: &str,
        name: Option<&str>,
        class: Option<WormClass>,
        skin: Option<&str>,
    ) -> Option<EntityId> {
        let name = sanitize_player_name(name.unwrap_or_default(), "Player");
        let now = self.now;
        let slot = self.sessions.get_mut(session_id)?;
        slot.joined = true;
        slot.name = name;
        slot.class = class;
        slot.skin = skin.map(str::to_string);

        if let Some(worm_id) = self.session_worm_id(session_id) {
            let fresh = self.worms.get(&worm_id).map(|worm| {
                worm.score == 0
                    && worm.progress.offer_index == 0
                    && now - worm.spawned_at <= REJOIN_GRACE_MS
            });
            if fresh != Some(true) {
                return Some(worm_id);
            }
            self.remove_worm(worm_id);
        }
        self.spawn_for_session(session_id)
    }

    /// Ignored while the session still has a live worm.
    pub fn respawn(&mut self, session_id: &str) -> Option<EntityId> {
        let slot = self.sessions.get(session_id)?;
        if !slot.joined || self.session_worm_id(session_id).is_some() {
            return None;
        }
        self.spawn_for_session(session_id)
    }

    pub fn set_input(&mut self, session_id: &str, angle: Option<f64>, boost: bool) {
        let Some(worm_id) = self.session_worm_id(session_id) else { return };
        let Some(worm) = self.worms.get_mut(&worm_id) else { return };
        if let Some(angle) = angle.and_then(parse_angle) {
            worm.target_angle = angle;
        }
        worm.boost = boost;
    }

    pub fn skill_action(&mut self, session_id: &str, action: SkillAction, target: Option<Point>) {
        let Some(worm_id) = self.session_worm_id(session_id) else { return };
        skills::handle_action(self, worm_id, action, target);
    }

    pub fn choose_mutation(&mut self, session_id: &str, mutation: &str) {
        let Some(worm_id) = self.session_worm_id(session_id) else { return };
        let now = self.now;
        let Some(worm) = self.worms.get_mut(&worm_id) else { return };
        if progression::apply_choice(worm, mutation, &self.tuning, now) {
            tracing::debug!(worm_id, mutation, "mutation applied");
        }
    }

    pub fn step(&mut self) {
        self.tick += 1;
        self.now = (self.tick as i64 * 1000) / self.tick_rate as i64;

        self.rebuild_food_index();
        self.run_bots();

        let mut kills = KillSet::new();
        self.advance_locomotion(&mut kills);
        skills::advance_rewinds(self);
        skills::record_rewind_samples(self);
        self.feed(&kills);
        self.apply_zones();
        self.apply_decoys();
        skills::advance_holds(self);
        collision::resolve(self, &mut kills);
        self.apply_kills(&kills);

        self.prune_expired();
        self.replenish_food();
        self.maintain_bots();
        self.remember_positions();
    }

    fn rebuild_food_index(&mut self) {
        self.food_index.clear();
        for food in self.food.values() {
            self.food_index.insert_at(food.id, food.position);
        }
    }

    fn sorted_worm_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.worms.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn run_bots(&mut self) {
        let mut decisions = Vec::new();
        for id in self.sorted_worm_ids() {
            let Some(worm) = self.worms.get(&id) else { continue };
            let Controller::Bot(brain) = worm.controller else { continue };
            let dice = Dice {
                roll: self.rng.gen::<f64>(),
                jitter: self.rng.gen_range(-1.0..1.0),
            };
            decisions.push((id, bots::decide(self, worm, brain, dice)));
        }

        for (id, decision) in decisions {
            let Some(worm) = self.worms.get_mut(&id) else { continue };
            worm.target_angle = decision.target_angle;
            worm.boost = decision.boost;
            worm.controller = Controller::Bot(decision.brain);
            if let Some(target) = decision.cast {
                skills::handle_action(self, id, SkillAction::Tap, Some(target));
            }
        }
    }

    fn advance_locomotion(&mut self, kills: &mut KillSet) {
        let now = self.now;
        let dt = self.dt();
        let arena_radius = self.arena_radius;
        let mut drops = Vec::new();

        for id in self.sorted_worm_ids() {
            let Some(worm) = self.worms.get_mut(&id) else { continue };
            if worm.is_rewinding() {
                continue;
            }
            let perks = Perks::for_worm(worm, &self.tuning);
            let outcome = step_worm(worm, &perks, arena_radius, now, dt);
            if outcome.fault {
                tracing::warn!(worm_id = id, "non-finite head position, removing worm");
                kills.mark(id, DeathCause::Fault, None);
                continue;
            }
            if outcome.hit_wall {
                kills.mark(id, DeathCause::Wall, None);
                continue;
            }
            if outcome.boosting {
                worm.add_score(-BOOST_SCORE_DRAIN_PER_SEC * perks.boost_drain_mult * dt);
                if now - worm.last_boost_drop_at >= BOOST_DROP_INTERVAL_MS {
                    worm.last_boost_drop_at = now;
                    if let Some(tail) = worm.body.last() {
                        drops.push(*tail);
                    }
                }
            }
        }

        for position in drops {
            self.spawn_food(position, BOOST_DROP_VALUE, FoodKind::BoostDrop);
        }
    }

    /// Magnet pulls, eating and milestone checks, in id order. Worms already
    /// marked dead this tick are skipped.
    fn feed(&mut self, kills: &KillSet) {
        let dt = self.dt();
        for id in self.sorted_worm_ids() {
            if kills.contains(id) {
                continue;
            }
            let Some(worm) = self.worms.get(&id) else { continue };
            let perks = Perks::for_worm(worm, &self.tuning);
            let head = worm.head();
            let head_radius = worm.head_radius();

            if perks.magnet_radius > 0.0 {
                self.pull_food(head, perks.magnet_radius, MAGNET_PULL_PER_SEC * dt);
            }

            let reach = head_radius + FOOD_RADIUS * 2.0;
            let ring = self.food_index.ring_for(reach);
            let eaten: Vec<EntityId> = self
                .food_index
                .query_point(head, ring)
                .filter_map(|food_id| self.food.get(food_id))
                .filter(|food| distance(food.position, head) < head_radius + food.radius)
                .map(|food| food.id)
                .collect();

            let mut gained = 0.0;
            for food_id in eaten {
                let Some(food) = self.food.remove(&food_id) else { continue };
                self.food_index.remove(food_id, food.position.x, food.position.y);
                gained += food.value as f64 * perks.food_value_mult;
            }

            let Some(worm) = self.worms.get_mut(&id) else { continue };
            if gained > 0.0 {
                worm.add_score(gained);
            }
            let offer =
                progression::check_milestone(worm, &self.schedule, &self.tuning, &mut self.rng);
            let Some(offer) = offer else { continue };
            tracing::debug!(worm_id = id, tier = offer.tier, "mutation offer");
            match worm.session_id().map(str::to_string) {
                Some(session_id) => self.events.push(WorldEvent::Offer { session_id, offer }),
                None => {
                    if let Some(choice) = progression::pick_random(&offer, &mut self.rng) {
                        progression::apply_choice(worm, &choice, &self.tuning, self.now);
                    }
                }
            }
        }
    }

    fn pull_food(&mut self, head: Point, radius: f64, step: f64) {
        let ring = self.food_index.ring_for(radius);
        let nearby: Vec<EntityId> = self.food_index.query_point(head, ring).copied().collect();
        for food_id in nearby {
            let Some(food) = self.food.get_mut(&food_id) else { continue };
            let d = distance(food.position, head);
            if d >= radius || d < 1e-9 {
                continue;
            }
            let toward = direction(food.position, head, 0.0);
            let moved = step.min(d);
            let from = food.position;
            food.position = Point {
                x: from.x + toward.x * moved,
                y: from.y + toward.y * moved,
            };
            self.food_index.relocate(food_id, from, food.position);
        }
    }

    fn rebuild_zone_indices(&mut self) {
        self.gas_index.clear();
        for zone in self.gas_clouds.values() {
            self.gas_index.insert_at(zone.id, zone.position);
        }
        self.ice_index.clear();
        for zone in self.ice_zones.values() {
            self.ice_index.insert_at(zone.id, zone.position);
        }
    }

    /// Gas drains score and ice slows, for any head inside a zone it does not own.
    fn apply_zones(&mut self) {
        self.rebuild_zone_indices();
        let now = self.now;
        let dt = self.dt();
        let gas_ring = self
            .gas_index
            .ring_for(self.gas_clouds.values().map(|zone| zone.radius).fold(0.0, f64::max));
        let ice_ring = self
            .ice_index
            .ring_for(self.ice_zones.values().map(|zone| zone.radius).fold(0.0, f64::max));

        for worm in self.worms.values_mut() {
            if active(worm.timers.phase_until, now) || worm.in_spawn_grace(now, SPAWN_GRACE_MS) {
                continue;
            }
            let head = worm.head();
            let inside = |zone: &Zone| {
                zone.owner != worm.id
                    && distance_sq(zone.position, head) < zone.radius * zone.radius
            };

            let gassed = self
                .gas_index
                .query_point(head, gas_ring)
                .filter_map(|id| self.gas_clouds.get(id))
                .any(inside);
            let iced = self
                .ice_index
                .query_point(head, ice_ring)
                .filter_map(|id| self.ice_zones.get(id))
                .any(inside);

            if gassed {
                worm.add_score(-GAS_SCORE_DRAIN_PER_SEC * dt);
            }
            if iced {
                worm.timers.slow_until = worm.timers.slow_until.max(now + ICE_SLOW_LINGER_MS);
            }
        }
    }

    /// A foreign head touching a decoy pops it and is briefly slowed. Phased heads
    /// and heads in spawn grace pass through.
    fn apply_decoys(&mut self) {
        let now = self.now;
        let mut popped = Vec::new();
        for decoy in self.decoys.values() {
            let hit = self
                .worms
                .values()
                .filter(|worm| worm.id != decoy.owner)
                .filter(|worm| {
                    !active(worm.timers.phase_until, now)
                        && !worm.in_spawn_grace(now, SPAWN_GRACE_MS)
                })
                .filter(|worm| {
                    let reach = worm.head_radius() + decoy.radius;
                    decoy.body.iter().any(|point| distance(*point, worm.head()) < reach)
                })
                .min_by_key(|worm| worm.id);
            if let Some(worm) = hit {
                popped.push((decoy.id, worm.id));
            }
        }
        for (decoy_id, worm_id) in popped {
            self.decoys.remove(&decoy_id);
            if let Some(worm) = self.worms.get_mut(&worm_id) {
                worm.timers.slow_until = worm.timers.slow_until.max(now + DECOY_SLOW_MS);
            }
        }
    }

    fn apply_kills(&mut self, kills: &KillSet) {
        for (id, kill) in kills.iter() {
            let Some(worm) = self.worms.remove(&id) else { continue };
            let reward = kill
                .killer
                .filter(|killer| !kills.contains(*killer))
                .and_then(|killer| self.worms.get(&killer))
                .and_then(|killer| self.tuning.class(killer.class))
                .map(|def| def.reward_on_kill)
                .unwrap_or(false);
            self.scatter_corpse(&worm.body, reward);
            self.remove_owned(id);
            tracing::debug!(
                worm_id = id,
                cause = kill.cause.as_str(),
                score = worm.score,
                killer = ?kill.killer,
                "worm died"
            );

            match &worm.controller {
                Controller::Human { session_id } => {
                    if let Some(slot) = self.sessions.get_mut(session_id) {
                        slot.worm = None;
                        slot.last_position = worm.head();
                    }
                    if kill.cause != DeathCause::Disconnect {
                        self.events.push(WorldEvent::Death {
                            session_id: session_id.clone(),
                            cause: kill.cause,
                            score: worm.score,
                        });
                    }
                }
                Controller::Bot(_) => self.pending_bot_respawns.push(self.now + BOT_RESPAWN_MS),
            }
        }
    }

    /// Removes a worm without leaving food behind.
    fn remove_worm(&mut self, id: EntityId) {
        if self.worms.remove(&id).is_some() {
            self.remove_owned(id);
        }
    }

    fn remove_owned(&mut self, owner: EntityId) {
        self.gas_clouds.retain(|_, zone| zone.owner != owner);
        self.ice_zones.retain(|_, zone| zone.owner != owner);
        self.black_holes.retain(|_, zone| zone.owner != owner);
        self.decoys.retain(|_, decoy| decoy.owner != owner);
        self.bursts.retain(|burst| burst.owner != owner);
    }

    fn prune_expired(&mut self) {
        let now = self.now;
        self.gas_clouds.retain(|_, zone| zone.expires_at > now);
        self.ice_zones.retain(|_, zone| zone.expires_at > now);
        self.black_holes.retain(|_, zone| zone.expires_at > now);
        self.decoys.retain(|_, decoy| decoy.expires_at > now);
    }

    fn replenish_food(&mut self) {
        let missing = self.food_target.saturating_sub(self.food.len());
        for _ in 0..missing.min(FOOD_REPLENISH_PER_TICK) {
            self.spawn_random_food();
        }
    }

    fn maintain_bots(&mut self) {
        let now = self.now;
        let due = self.pending_bot_respawns.iter().filter(|at| **at <= now).count();
        self.pending_bot_respawns.retain(|at| *at > now);
        let alive = self.worms.values().filter(|worm| worm.is_bot()).count();
        let waiting = self.pending_bot_respawns.len();
        let wanted = self.bot_target.saturating_sub(alive + waiting);
        if due > 0 || wanted > 0 {
            tracing::trace!(due, wanted, "topping up bots");
        }
        for _ in 0..wanted {
            self.spawn_bot();
        }
    }

    fn remember_positions(&mut self) {
        for slot in self.sessions.values_mut() {
            if let Some(worm) = slot.worm.and_then(|id| self.worms.get(&id)) {
                slot.last_position = worm.head();
            }
        }
    }
}
