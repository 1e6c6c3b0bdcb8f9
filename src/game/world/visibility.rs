use super::World;
use crate::game::constants::{
    FAR_RESERVE_FRACTION, LEADERBOARD_SIZE, MAX_VISIBLE_FOOD, MAX_VISIBLE_HAZARDS, SPAWN_GRACE_MS,
};
use crate::game::math::distance_sq;
use crate::game::progression::{stage, Perks};
use crate::game::skills::{cooldown_remaining, effective_cooldown, energy_fraction, equipped_skill};
use crate::game::types::{active, EntityId, Point, Worm, Zone};
use crate::protocol::{
    quantize, DecoyView, FoodView, LeaderboardEntry, SkillView, StateSnapshot, StatusFlags,
    WormView, ZoneView,
};
use std::collections::{BTreeMap, HashMap};

/// Nearest-first selection within `radius`, capped at `cap`. When over the cap a
/// minority share of the slots goes to the farthest candidates so the edge of the
/// view is not left empty.
pub fn select_visible<T>(candidates: Vec<(f64, T)>, radius: f64, cap: usize) -> Vec<T> {
    let radius_sq = radius * radius;
    let mut inside: Vec<(f64, T)> = candidates
        .into_iter()
        .filter(|(d_sq, _)| *d_sq <= radius_sq)
        .collect();
    if inside.len() <= cap {
        return inside.into_iter().map(|(_, item)| item).collect();
    }
    inside.sort_by(|a, b| a.0.total_cmp(&b.0));
    let far = ((cap as f64) * FAR_RESERVE_FRACTION).floor() as usize;
    let near = cap - far;
    let skip = inside.len() - far;
    inside
        .into_iter()
        .enumerate()
        .filter(|(index, _)| *index < near || *index >= skip)
        .map(|(_, (_, item))| item)
        .collect()
}

impl World {
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<LeaderboardEntry> = self
            .worms
            .values()
            .map(|worm| LeaderboardEntry {
                id: worm.id,
                name: worm.name.clone(),
                score: worm.score,
            })
            .collect();
        entries.sort_by(|a, b| b.score.cmp(&a.score).then(a.id.cmp(&b.id)));
        entries.truncate(LEADERBOARD_SIZE);
        entries
    }

    fn status_flags(&self, worm: &Worm) -> StatusFlags {
        let now = self.now;
        let timers = &worm.timers;
        StatusFlags {
            invulnerable: active(timers.invulnerable_until, now)
                || worm.in_spawn_grace(now, SPAWN_GRACE_MS),
            stealth: active(timers.stealth_until, now),
            phase: active(timers.phase_until, now),
            slow: active(timers.slow_until, now),
            turn_locked: active(timers.turn_locked_until, now),
            charge: active(timers.charge_until, now),
            thorns: active(timers.thorns_until, now),
            electric: active(timers.electric_until, now),
            rewinding: worm.is_rewinding(),
        }
    }

    fn skill_view(&self, worm: &Worm) -> SkillView {
        let now = self.now;
        let id = equipped_skill(worm, &self.tuning);
        let cooldown = id
            .and_then(|id| self.tuning.skill(id))
            .map(|def| effective_cooldown(def, &Perks::for_worm(worm, &self.tuning)))
            .unwrap_or(1);
        SkillView {
            id,
            cooldown_remaining: cooldown_remaining(worm, now),
            active: active(worm.skill.active_until, now),
            held: worm.skill.held,
            energy: energy_fraction(worm.skill.ready_at, cooldown, now),
        }
    }

    fn worm_view(&self, worm: &Worm) -> WormView {
        WormView {
            id: worm.id,
            name: worm.name.clone(),
            color: worm.color.clone(),
            class: worm.class,
            skin: worm.skin.clone(),
            boost: worm.boost_blend > 0.5,
            status: self.status_flags(worm),
            stage: stage(worm, &self.schedule, &self.tuning.tiers),
            skill: self.skill_view(worm),
            mutations: worm.mutations.clone(),
            armor: worm.armor_stacks,
            segments: worm.body.iter().copied().map(quantize).collect(),
            score: worm.score,
        }
    }

    fn zone_views(&self, zones: &HashMap<EntityId, Zone>, center: Point) -> Vec<ZoneView> {
        let candidates = zones
            .values()
            .map(|zone| (distance_sq(zone.position, center), zone))
            .collect();
        select_visible(candidates, self.view_radius, MAX_VISIBLE_HAZARDS)
            .into_iter()
            .map(|zone| {
                let [x, y] = quantize(zone.position);
                ZoneView {
                    id: zone.id,
                    owner: zone.owner,
                    x,
                    y,
                    radius: zone.radius,
                    expires_at: zone.expires_at,
                }
            })
            .collect()
    }

    /// Per-connection snapshot centred on the session's worm, or where it last was.
    /// Other players' stealthed worms are left out.
    pub fn snapshot_for(
        &self,
        session_id: &str,
        leaderboard: &[LeaderboardEntry],
    ) -> Option<StateSnapshot> {
        let slot = self.sessions.get(session_id)?;
        let you = slot.worm.filter(|id| self.worms.contains_key(id));
        let center = you
            .and_then(|id| self.worms.get(&id))
            .map(|worm| worm.head())
            .unwrap_or(slot.last_position);
        let now = self.now;
        let reach_sq = self.view_radius * self.view_radius;

        let worms: BTreeMap<EntityId, WormView> = self
            .worms
            .values()
            .filter(|worm| Some(worm.id) == you || !active(worm.timers.stealth_until, now))
            .filter(|worm| {
                Some(worm.id) == you
                    || worm
                        .body
                        .iter()
                        .any(|point| distance_sq(*point, center) <= reach_sq)
            })
            .map(|worm| (worm.id, self.worm_view(worm)))
            .collect();

        let food_candidates = self
            .food
            .values()
            .map(|food| (distance_sq(food.position, center), food))
            .collect();
        let food = select_visible(food_candidates, self.view_radius, MAX_VISIBLE_FOOD)
            .into_iter()
            .map(|food| {
                let [x, y] = quantize(food.position);
                FoodView {
                    id: food.id,
                    x,
                    y,
                    value: food.value,
                    kind: food.kind,
                }
            })
            .collect();

        let decoy_candidates = self
            .decoys
            .values()
            .filter_map(|decoy| {
                let nearest = decoy
                    .body
                    .iter()
                    .map(|point| distance_sq(*point, center))
                    .fold(f64::INFINITY, f64::min);
                nearest.is_finite().then_some((nearest, decoy))
            })
            .collect();
        let decoys = select_visible(decoy_candidates, self.view_radius, MAX_VISIBLE_HAZARDS)
            .into_iter()
            .map(|decoy| DecoyView {
                id: decoy.id,
                owner: decoy.owner,
                segments: decoy.body.iter().copied().map(quantize).collect(),
                expires_at: decoy.expires_at,
            })
            .collect();

        Some(StateSnapshot {
            tick: self.tick,
            now,
            arena_radius: self.arena_radius,
            you,
            worms,
            food,
            gas_clouds: self.zone_views(&self.gas_clouds, center),
            ice_zones: self.zone_views(&self.ice_zones, center),
            black_holes: self.zone_views(&self.black_holes, center),
            decoys,
            leaderboard: leaderboard.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_everything_under_the_cap() {
        let picked = select_visible(vec![(4.0, 'a'), (1.0, 'b'), (900.0, 'c')], 10.0, 5);
        assert_eq!(picked, vec!['a', 'b']);
    }

    #[test]
    fn reserves_slots_for_the_farthest() {
        let candidates: Vec<(f64, usize)> = (0..100).map(|i| ((i * i) as f64, i)).collect();
        let picked = select_visible(candidates, 1000.0, 10);
        assert_eq!(picked.len(), 10);
        assert_eq!(&picked[..8], &[0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(&picked[8..], &[98, 99]);
    }
}
