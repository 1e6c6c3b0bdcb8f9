use super::World;
use crate::game::bots::BotBrain;
use crate::game::constants::{
    CORPSE_FOOD_STRIDE, CORPSE_JITTER, CORPSE_RARE_CHANCE, CORPSE_RARE_VALUE, CORPSE_VALUE,
    FOOD_HARD_CAP, FOOD_MAX_VALUE, FOOD_RADIUS, MAX_SPAWN_ATTEMPTS,
    REWARD_BONUS_FRACTION, SEGMENT_SPACING, SPAWN_CLEARANCE, SPAWN_RADIUS_FRACTION, TRAIL_SLACK,
};
use crate::game::locomotion::sync_body;
use crate::game::math::{angle_between, distance_sq, from_angle, length};
use crate::game::trail::Trail;
use crate::game::tuning::SkinDef;
use crate::game::types::{
    target_segments_for_score, Controller, EntityId, Food, FoodKind, Point, Progress, RewindState,
    SkillSlot, StatusTimers, Worm,
};
use rand::seq::SliceRandom;
use rand::Rng;
use std::f64::consts::TAU;

const BOT_NAMES: [&str; 12] = [
    "Noodle", "Sprocket", "Wiggles", "Fang", "Zigzag", "Pebble", "Coil", "Mamba", "Loop", "Drift",
    "Vex", "Tango",
];

impl World {
    fn random_point_in(&mut self, radius: f64) -> Point {
        let angle = self.rng.gen_range(0.0..TAU);
        let r = radius * self.rng.gen::<f64>().sqrt();
        from_angle(angle, r)
    }

    fn clearance_sq(&self, point: Point) -> f64 {
        self.worms
            .values()
            .flat_map(|worm| worm.body.iter())
            .map(|segment| distance_sq(*segment, point))
            .fold(f64::INFINITY, f64::min)
    }

    /// Random point with no body within the spawn clearance. When every attempt is
    /// crowded the most open candidate wins.
    pub(crate) fn find_spawn_point(&mut self) -> Point {
        let radius = self.arena_radius * SPAWN_RADIUS_FRACTION;
        let wanted = SPAWN_CLEARANCE * SPAWN_CLEARANCE;
        let mut best = Point::default();
        let mut best_clearance = -1.0;
        for _ in 0..MAX_SPAWN_ATTEMPTS {
            let candidate = self.random_point_in(radius);
            let clearance = self.clearance_sq(candidate);
            if clearance >= wanted {
                return candidate;
            }
            if clearance > best_clearance {
                best = candidate;
                best_clearance = clearance;
            }
        }
        best
    }

    pub(crate) fn create_worm(
        &mut self,
        name: String,
        skin: &SkinDef,
        controller: Controller,
        head: Point,
        angle: f64,
        score: i64,
    ) -> EntityId {
        let id = self.allocate_id();
        let segments = target_segments_for_score(score);
        let seeded = segments.saturating_sub(1) as f64 * SEGMENT_SPACING + TRAIL_SLACK;
        let mut worm = Worm {
            id,
            name,
            color: skin.color.clone(),
            class: skin.class,
            skin: skin.id.clone(),
            controller,
            body: vec![head],
            trail: Trail::seeded(head, angle, seeded),
            angle,
            target_angle: angle,
            boost: false,
            boost_blend: 0.0,
            score: score.max(0),
            score_fraction: 0.0,
            spawned_at: self.now,
            timers: StatusTimers::default(),
            skill: SkillSlot {
                ready_at: self.now,
                ..SkillSlot::default()
            },
            mutations: Vec::new(),
            armor_stacks: 0,
            progress: Progress::default(),
            rewind: RewindState::default(),
            last_boost_drop_at: self.now,
        };
        sync_body(&mut worm);
        self.worms.insert(id, worm);
        id
    }

    pub(crate) fn spawn_for_session(&mut self, session_id: &str) -> Option<EntityId> {
        let slot = self.sessions.get(session_id)?;
        let (name, class, skin) = (slot.name.clone(), slot.class, slot.skin.clone());
        let skin = self.tuning.resolve_skin(class, skin.as_deref())?.clone();
        let head = self.find_spawn_point();
        let angle = angle_between(head, Point::default()) + self.rng.gen_range(-0.6..0.6);
        let id = self.create_worm(
            name,
            &skin,
            Controller::Human {
                session_id: session_id.to_string(),
            },
            head,
            angle,
            0,
        );
        if let Some(slot) = self.sessions.get_mut(session_id) {
            slot.worm = Some(id);
            slot.last_position = head;
        }
        tracing::info!(session_id, worm_id = id, skin = %skin.id, "worm spawned");
        Some(id)
    }

    pub(crate) fn spawn_bot(&mut self) -> Option<EntityId> {
        let skin = self.tuning.skins.choose(&mut self.rng)?.clone();
        let label = BOT_NAMES[(self.next_bot_index as usize) % BOT_NAMES.len()];
        let name = format!("{label} {}", self.next_bot_index);
        self.next_bot_index += 1;
        let head = self.find_spawn_point();
        let angle = self.rng.gen_range(0.0..TAU);
        let controller = Controller::Bot(BotBrain::default());
        let id = self.create_worm(name, &skin, controller, head, angle, 0);
        tracing::debug!(worm_id = id, skin = %skin.id, "bot spawned");
        Some(id)
    }

    /// Skipped once the hard food cap is reached.
    pub fn spawn_food(&mut self, position: Point, value: i64, kind: FoodKind) -> Option<EntityId> {
        if self.food.len() >= FOOD_HARD_CAP || !position.x.is_finite() || !position.y.is_finite() {
            return None;
        }
        let id = self.allocate_id();
        let radius = FOOD_RADIUS + (value.max(1) - 1) as f64 * 1.5;
        self.food.insert(
            id,
            Food {
                id,
                position,
                radius,
                value: value.max(1),
                kind,
            },
        );
        self.food_index.insert_at(id, position);
        Some(id)
    }

    pub(crate) fn spawn_random_food(&mut self) -> Option<EntityId> {
        let position = self.random_point_in(self.arena_radius - FOOD_RADIUS);
        let value = self.rng.gen_range(1..=FOOD_MAX_VALUE);
        self.spawn_food(position, value, FoodKind::Normal)
    }

    /// Corpse pellets along the body, with a rare richer pellet. A kill credited to a
    /// reward class scatters an extra pass.
    pub(crate) fn scatter_corpse(&mut self, body: &[Point], reward: bool) {
        for segment in body.iter().step_by(CORPSE_FOOD_STRIDE) {
            self.drop_corpse_pellet(*segment);
        }
        if !reward {
            return;
        }
        let share = body.len() as f64 * REWARD_BONUS_FRACTION;
        let bonus = (share / CORPSE_FOOD_STRIDE as f64).ceil() as usize;
        for segment in body.iter().skip(1).step_by(CORPSE_FOOD_STRIDE).take(bonus) {
            self.drop_corpse_pellet(*segment);
        }
    }

    fn drop_corpse_pellet(&mut self, at: Point) {
        let offset = self.random_point_in(CORPSE_JITTER);
        let mut position = Point {
            x: at.x + offset.x,
            y: at.y + offset.y,
        };
        let limit = self.arena_radius - FOOD_RADIUS;
        let len = length(position);
        if len > limit {
            position = from_angle(position.y.atan2(position.x), limit);
        }
        let value = if self.rng.gen_bool(CORPSE_RARE_CHANCE) {
            CORPSE_RARE_VALUE
        } else {
            CORPSE_VALUE
        };
        self.spawn_food(position, value, FoodKind::Corpse);
    }
}
