//! Per-worm skill slot: cooldown-as-energy gauge, hold/toggle/instant actions and
//! the table mapping each skill id to its effect handler.

use super::constants::{
    AIM_MAX_RANGE, BAIT_COUNT, BAIT_VALUE, ELECTRIC_LOCK_MS, HOLD_MIN_ENERGY, HOLD_REFRESH_MS,
    REWIND_LOOKBACK_MS, REWIND_PUSH_DISTANCE, REWIND_PUSH_RADIUS, REWIND_SAMPLE_MS,
    REWIND_WINDOW_MS, STEALTH_LINGER_MS,
};
use super::locomotion::sync_body;
use super::math::{
    clamp, clamp_to_disc, direction, distance, distance_to_segment, from_angle, lerp, length,
};
use super::progression::Perks;
use super::tuning::{SkillDef, SkillMode, Tuning};
use super::types::{
    Burst, BurstDirection, Decoy, EntityId, FoodKind, Point, RewindSample, RewindTransition,
    Worm, Zone,
};
use super::world::World;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillId {
    Dash,
    Cloak,
    Phase,
    Thorns,
    GasCloud,
    IceZone,
    BlackHole,
    Shockwave,
    Implode,
    Lightning,
    StaticField,
    Rewind,
    Decoy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillAction {
    Tap,
    Start,
    End,
}

/// Everything an effect handler needs to know about one activation (or hold refresh).
#[derive(Debug, Clone, Copy)]
pub struct Cast {
    pub caster: EntityId,
    pub now: i64,
    pub active_until: i64,
    pub target: Point,
}

/// Returns false when the activation could not take effect; no cooldown is spent then.
type EffectFn = fn(&mut World, &SkillDef, Cast) -> bool;

pub struct SkillEffect {
    pub id: SkillId,
    pub apply: EffectFn,
}

static SKILL_EFFECTS: [SkillEffect; 13] = [
    SkillEffect { id: SkillId::Dash, apply: dash },
    SkillEffect { id: SkillId::Cloak, apply: cloak },
    SkillEffect { id: SkillId::Phase, apply: phase },
    SkillEffect { id: SkillId::Thorns, apply: thorns },
    SkillEffect { id: SkillId::GasCloud, apply: gas_cloud },
    SkillEffect { id: SkillId::IceZone, apply: ice_zone },
    SkillEffect { id: SkillId::BlackHole, apply: black_hole },
    SkillEffect { id: SkillId::Shockwave, apply: shockwave },
    SkillEffect { id: SkillId::Implode, apply: implode },
    SkillEffect { id: SkillId::Lightning, apply: lightning },
    SkillEffect { id: SkillId::StaticField, apply: static_field },
    SkillEffect { id: SkillId::Rewind, apply: rewind },
    SkillEffect { id: SkillId::Decoy, apply: decoy },
];

pub fn effect_for(id: SkillId) -> Option<&'static SkillEffect> {
    SKILL_EFFECTS.iter().find(|effect| effect.id == id)
}

/// The slot is re-derived on every use: a granted skill wins, then the skin's,
/// then the class default.
pub fn equipped_skill(worm: &Worm, tuning: &Tuning) -> Option<SkillId> {
    if let Some(granted) = worm.skill.granted {
        return Some(granted);
    }
    if let Some(skill) = tuning.skin(&worm.skin).and_then(|skin| skin.skill) {
        return Some(skill);
    }
    tuning.class(worm.class).map(|class| class.default_skill)
}

pub fn effective_cooldown(def: &SkillDef, perks: &Perks) -> i64 {
    ((def.cooldown_ms as f64) * perks.cooldown_mult).round().max(1.0) as i64
}

/// `1 - clamp((ready_at - now) / cooldown, 0, 1)`.
pub fn energy_fraction(ready_at: i64, cooldown_ms: i64, now: i64) -> f64 {
    if cooldown_ms <= 0 {
        return 1.0;
    }
    1.0 - clamp((ready_at - now) as f64 / cooldown_ms as f64, 0.0, 1.0)
}

pub fn cooldown_remaining(worm: &Worm, now: i64) -> i64 {
    (worm.skill.ready_at - now).max(0)
}

fn aim(head: Point, angle: f64, requested: Option<Point>, range: f64, arena_radius: f64) -> Point {
    let raw = requested
        .filter(|point| point.x.is_finite() && point.y.is_finite())
        .unwrap_or_else(|| {
            let forward = from_angle(angle, range);
            Point {
                x: head.x + forward.x,
                y: head.y + forward.y,
            }
        });
    let offset = Point {
        x: raw.x - head.x,
        y: raw.y - head.y,
    };
    let offset = clamp_to_disc(offset, range.clamp(0.0, AIM_MAX_RANGE));
    clamp_to_disc(
        Point {
            x: head.x + offset.x,
            y: head.y + offset.y,
        },
        arena_radius,
    )
}

pub fn handle_action(
    world: &mut World,
    worm_id: EntityId,
    action: SkillAction,
    target: Option<Point>,
) {
    let now = world.now;
    let Some(worm) = world.worms.get(&worm_id) else { return };
    if action == SkillAction::End {
        end_hold(world, worm_id);
        return;
    }
    if worm.progress.pending.is_some() || worm.is_rewinding() {
        return;
    }
    let Some(skill_id) = equipped_skill(worm, &world.tuning) else { return };
    let Some(def) = world.tuning.skill(skill_id).cloned() else { return };
    let perks = Perks::for_worm(worm, &world.tuning);
    let cooldown = effective_cooldown(&def, &perks);
    let target = aim(worm.head(), worm.angle, target, def.range, world.arena_radius);
    let held = worm.skill.held;
    let ready_at = worm.skill.ready_at;

    match (def.mode, action) {
        (SkillMode::Hold, SkillAction::Tap) if held => end_hold(world, worm_id),
        (SkillMode::Hold, _) => start_hold(world, worm_id, skill_id, &def, cooldown, target),
        (SkillMode::Instant, _) => {
            if now < ready_at {
                return;
            }
            let Some(effect) = effect_for(skill_id) else { return };
            let cast = Cast {
                caster: worm_id,
                now,
                active_until: now + def.duration_ms.max(0),
                target,
            };
            if !(effect.apply)(world, &def, cast) {
                return;
            }
            if let Some(worm) = world.worms.get_mut(&worm_id) {
                worm.skill.active_until = cast.active_until;
                worm.skill.ready_at = now + cooldown;
                tracing::trace!(worm_id, skill = ?skill_id, "skill cast");
            }
        }
    }
}

fn start_hold(
    world: &mut World,
    worm_id: EntityId,
    skill_id: SkillId,
    def: &SkillDef,
    cooldown: i64,
    target: Point,
) {
    let now = world.now;
    let Some(worm) = world.worms.get_mut(&worm_id) else { return };
    if worm.skill.held || energy_fraction(worm.skill.ready_at, cooldown, now) <= HOLD_MIN_ENERGY {
        return;
    }
    worm.skill.held = true;
    worm.skill.hold_started_at = now;
    worm.skill.hold_start_remaining = (worm.skill.ready_at - now).max(0);
    refresh_hold(world, worm_id, skill_id, def, target);
}

fn end_hold(world: &mut World, worm_id: EntityId) {
    if let Some(worm) = world.worms.get_mut(&worm_id) {
        worm.skill.held = false;
    }
}

fn refresh_hold(
    world: &mut World,
    worm_id: EntityId,
    skill_id: SkillId,
    def: &SkillDef,
    target: Point,
) {
    let now = world.now;
    let Some(effect) = effect_for(skill_id) else { return };
    let active_until = now + HOLD_REFRESH_MS;
    let cast = Cast {
        caster: worm_id,
        now,
        active_until,
        target,
    };
    if (effect.apply)(world, def, cast) {
        if let Some(worm) = world.worms.get_mut(&worm_id) {
            worm.skill.active_until = active_until;
        }
    }
}

/// Drains the gauge of every held skill and refreshes its active window. A hold that
/// spent the whole gauge, lost its hold-type skill, or got an offer pending is released.
pub fn advance_holds(world: &mut World) {
    let now = world.now;
    let held: Vec<EntityId> = world
        .worms
        .values()
        .filter(|worm| worm.skill.held)
        .map(|worm| worm.id)
        .collect();

    for worm_id in held {
        let Some(worm) = world.worms.get(&worm_id) else { continue };
        let skill = equipped_skill(worm, &world.tuning)
            .and_then(|id| world.tuning.skill(id).cloned().map(|def| (id, def)));
        let Some((skill_id, def)) = skill.filter(|(_, def)| def.mode == SkillMode::Hold) else {
            end_hold(world, worm_id);
            continue;
        };
        if worm.progress.pending.is_some() {
            end_hold(world, worm_id);
            continue;
        }
        let cooldown = effective_cooldown(&def, &Perks::for_worm(worm, &world.tuning));
        let drain_ms = def.drain_ms.max(1);
        let elapsed = (now - worm.skill.hold_started_at).max(0);
        let drained = elapsed as f64 * cooldown as f64 / drain_ms as f64;
        let spent = worm.skill.hold_start_remaining as f64 + drained;
        let remaining = (spent.round() as i64).min(cooldown);
        let exhausted = remaining >= cooldown;
        let target = aim(worm.head(), worm.angle, None, def.range, world.arena_radius);

        if let Some(worm) = world.worms.get_mut(&worm_id) {
            worm.skill.ready_at = now + remaining;
        }
        if exhausted {
            end_hold(world, worm_id);
        } else {
            refresh_hold(world, worm_id, skill_id, &def, target);
        }
    }
}

pub fn record_rewind_samples(world: &mut World) {
    let now = world.now;
    for worm in world.worms.values_mut() {
        if worm.is_rewinding() {
            continue;
        }
        let due = worm
            .rewind
            .last_sample_at
            .map(|last| now - last >= REWIND_SAMPLE_MS)
            .unwrap_or(true);
        if due {
            worm.rewind.samples.push_back(RewindSample {
                at: now,
                head: worm.head(),
                angle: worm.angle,
                score: worm.score,
            });
            worm.rewind.last_sample_at = Some(now);
        }
        while let Some(front) = worm.rewind.samples.front() {
            if now - front.at > REWIND_WINDOW_MS {
                worm.rewind.samples.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Moves rewinding worms along their transition, nudging nearby heads aside, and
/// snaps score (and so length) down to the target sample when the transition ends.
pub fn advance_rewinds(world: &mut World) {
    let now = world.now;
    let rewinding: Vec<EntityId> = world
        .worms
        .values()
        .filter(|worm| worm.is_rewinding())
        .map(|worm| worm.id)
        .collect();

    for worm_id in rewinding {
        let Some(worm) = world.worms.get_mut(&worm_id) else { continue };
        let Some(transition) = worm.rewind.transition else { continue };
        let span = (transition.ends_at - transition.started_at).max(1) as f64;
        let t = clamp((now - transition.started_at) as f64 / span, 0.0, 1.0);
        let desired = lerp(transition.from, transition.target.head, t);
        let head = worm.head();
        worm.translate(desired.x - head.x, desired.y - head.y);

        if t >= 1.0 {
            worm.angle = transition.target.angle;
            worm.target_angle = transition.target.angle;
            if transition.target.score < worm.score {
                worm.score = transition.target.score;
                worm.score_fraction = 0.0;
            }
            worm.rewind.transition = None;
            worm.rewind.samples.clear();
            worm.rewind.last_sample_at = None;
            sync_body(worm);
        }

        let pushed: Vec<(EntityId, Point)> = world
            .worms
            .values()
            .filter(|other| other.id != worm_id)
            .filter_map(|other| {
                let d = distance(other.head(), desired);
                if d >= REWIND_PUSH_RADIUS {
                    return None;
                }
                let away = direction(desired, other.head(), other.angle);
                let push = REWIND_PUSH_DISTANCE * (1.0 - d / REWIND_PUSH_RADIUS);
                Some((other.id, Point { x: away.x * push, y: away.y * push }))
            })
            .collect();
        for (other_id, push) in pushed {
            if let Some(other) = world.worms.get_mut(&other_id) {
                other.translate(push.x, push.y);
            }
        }
    }
}

fn with_caster(world: &mut World, caster: EntityId, apply: impl FnOnce(&mut Worm)) -> bool {
    match world.worms.get_mut(&caster) {
        Some(worm) => {
            apply(worm);
            true
        }
        None => false,
    }
}

fn dash(world: &mut World, _def: &SkillDef, cast: Cast) -> bool {
    with_caster(world, cast.caster, |worm| {
        worm.timers.charge_until = worm.timers.charge_until.max(cast.active_until);
    })
}

fn cloak(world: &mut World, _def: &SkillDef, cast: Cast) -> bool {
    with_caster(world, cast.caster, |worm| {
        worm.timers.stealth_until = cast.active_until + STEALTH_LINGER_MS;
    })
}

fn phase(world: &mut World, _def: &SkillDef, cast: Cast) -> bool {
    with_caster(world, cast.caster, |worm| {
        worm.timers.phase_until = worm.timers.phase_until.max(cast.active_until);
    })
}

fn thorns(world: &mut World, _def: &SkillDef, cast: Cast) -> bool {
    with_caster(world, cast.caster, |worm| {
        worm.timers.thorns_until = worm.timers.thorns_until.max(cast.active_until);
    })
}

fn static_field(world: &mut World, _def: &SkillDef, cast: Cast) -> bool {
    with_caster(world, cast.caster, |worm| {
        worm.timers.electric_until = worm.timers.electric_until.max(cast.active_until);
    })
}

fn zone_for(world: &mut World, def: &SkillDef, cast: Cast) -> Zone {
    Zone {
        id: world.allocate_id(),
        owner: cast.caster,
        position: cast.target,
        radius: def.radius,
        strength: def.strength,
        expires_at: cast.active_until,
    }
}

fn gas_cloud(world: &mut World, def: &SkillDef, cast: Cast) -> bool {
    if !world.worms.contains_key(&cast.caster) {
        return false;
    }
    let zone = zone_for(world, def, cast);
    world.gas_clouds.retain(|_, existing| existing.owner != cast.caster);
    world.gas_clouds.insert(zone.id, zone);
    true
}

fn ice_zone(world: &mut World, def: &SkillDef, cast: Cast) -> bool {
    if !world.worms.contains_key(&cast.caster) {
        return false;
    }
    let zone = zone_for(world, def, cast);
    world.ice_zones.retain(|_, existing| existing.owner != cast.caster);
    world.ice_zones.insert(zone.id, zone);
    true
}

fn black_hole(world: &mut World, def: &SkillDef, cast: Cast) -> bool {
    if !world.worms.contains_key(&cast.caster) {
        return false;
    }
    let zone = zone_for(world, def, cast);
    world.black_holes.retain(|_, existing| existing.owner != cast.caster);
    world.black_holes.insert(zone.id, zone);
    for k in 0..BAIT_COUNT {
        let angle = k as f64 / BAIT_COUNT as f64 * std::f64::consts::TAU;
        let rim = from_angle(angle, zone.radius * 0.9);
        let position = Point {
            x: zone.position.x + rim.x,
            y: zone.position.y + rim.y,
        };
        if length(position) < world.arena_radius {
            world.spawn_food(position, BAIT_VALUE, FoodKind::Bait);
        }
    }
    true
}

fn burst(world: &mut World, def: &SkillDef, cast: Cast, direction: BurstDirection) -> bool {
    let Some(worm) = world.worms.get(&cast.caster) else { return false };
    world.bursts.push(Burst {
        owner: cast.caster,
        center: worm.head(),
        radius: def.radius,
        strength: def.strength,
        direction,
    });
    true
}

fn shockwave(world: &mut World, def: &SkillDef, cast: Cast) -> bool {
    burst(world, def, cast, BurstDirection::Away)
}

fn implode(world: &mut World, def: &SkillDef, cast: Cast) -> bool {
    burst(world, def, cast, BurstDirection::Toward)
}

fn lightning(world: &mut World, def: &SkillDef, cast: Cast) -> bool {
    let Some(origin) = world.worms.get(&cast.caster).map(|worm| worm.head()) else {
        return false;
    };
    for worm in world.worms.values_mut() {
        if worm.id == cast.caster || worm.timers.phase_until > cast.now {
            continue;
        }
        let reach = def.radius + worm.head_radius();
        if distance_to_segment(worm.head(), origin, cast.target) <= reach {
            let locked = cast.now + ELECTRIC_LOCK_MS;
            worm.timers.turn_locked_until = worm.timers.turn_locked_until.max(locked);
        }
    }
    true
}

fn rewind(world: &mut World, _def: &SkillDef, cast: Cast) -> bool {
    let Some(worm) = world.worms.get_mut(&cast.caster) else { return false };
    let horizon = cast.now - REWIND_LOOKBACK_MS;
    let Some(target) = worm
        .rewind
        .samples
        .iter()
        .filter(|sample| sample.at < cast.now)
        .min_by_key(|sample| (sample.at - horizon).abs())
        .copied()
    else {
        return false;
    };
    worm.rewind.transition = Some(RewindTransition {
        from: worm.head(),
        target,
        started_at: cast.now,
        ends_at: cast.active_until,
    });
    worm.boost = false;
    worm.timers.phase_until = worm.timers.phase_until.max(cast.active_until);
    worm.timers.invulnerable_until = worm.timers.invulnerable_until.max(cast.active_until);
    true
}

fn decoy(world: &mut World, _def: &SkillDef, cast: Cast) -> bool {
    let Some((body, radius)) = world
        .worms
        .get(&cast.caster)
        .map(|worm| (worm.body.clone(), worm.body_radius()))
    else {
        return false;
    };
    let id = world.allocate_id();
    world.decoys.retain(|_, existing| existing.owner != cast.caster);
    world.decoys.insert(
        id,
        Decoy {
            id,
            owner: cast.caster,
            body,
            radius,
            expires_at: cast.active_until,
        },
    );
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::types::WormClass;
    use crate::game::world::tests::{add_worm, make_world};

    fn run_until(world: &mut World, until: i64) {
        while world.now < until {
            world.step();
        }
    }

    #[test]
    fn every_skill_has_an_effect() {
        let tuning = Tuning::default();
        for def in &tuning.skills {
            assert!(effect_for(def.id).is_some(), "{:?} missing from effect table", def.id);
        }
    }

    #[test]
    fn energy_fraction_bounds() {
        assert_eq!(energy_fraction(0, 1000, 500), 1.0);
        assert_eq!(energy_fraction(1500, 1000, 500), 0.0);
        assert!((energy_fraction(750, 1000, 500) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn skin_skill_overrides_class_default_until_granted() {
        let tuning = Tuning::default();
        let mut worm = crate::game::world::tests::make_worm(1, 0);
        worm.class = WormClass::Bulwark;
        worm.skin = "bulwark_stone".to_string();
        assert_eq!(equipped_skill(&worm, &tuning), Some(SkillId::Shockwave));
        worm.skin = "bulwark_frost".to_string();
        assert_eq!(equipped_skill(&worm, &tuning), Some(SkillId::IceZone));
        worm.skill.granted = Some(SkillId::Thorns);
        assert_eq!(equipped_skill(&worm, &tuning), Some(SkillId::Thorns));
    }

    #[test]
    fn tap_is_ignored_on_cooldown_and_with_pending_offer() {
        let mut world = make_world();
        let id = add_worm(&mut world, "striker_ember", Point { x: 0.0, y: 0.0 }, 0);
        run_until(&mut world, 5000);

        handle_action(&mut world, id, SkillAction::Tap, None);
        let first_ready = world.worms[&id].skill.ready_at;
        assert!(first_ready > world.now);
        assert!(world.worms[&id].timers.charge_until > world.now);

        world.step();
        handle_action(&mut world, id, SkillAction::Tap, None);
        assert_eq!(world.worms[&id].skill.ready_at, first_ready);

        let worm = world.worms.get_mut(&id).expect("worm");
        worm.skill.ready_at = 0;
        worm.timers.charge_until = 0;
        worm.progress.pending = Some(crate::game::types::PendingOffer {
            tier: 1,
            options: vec!["swift".to_string()],
        });
        handle_action(&mut world, id, SkillAction::Tap, None);
        assert_eq!(world.worms[&id].skill.ready_at, 0);
        assert_eq!(world.worms[&id].timers.charge_until, 0);
    }

    #[test]
    fn cloak_hold_drains_full_gauge_over_drain_window() {
        let mut world = make_world();
        let id = add_worm(&mut world, "wisp_mist", Point { x: 0.0, y: 0.0 }, 0);
        run_until(&mut world, 5000);
        let def = world.tuning.skill(SkillId::Cloak).cloned().expect("cloak");

        handle_action(&mut world, id, SkillAction::Start, None);
        let started = world.now;
        assert!(world.worms[&id].skill.held);

        run_until(&mut world, started + def.drain_ms);
        handle_action(&mut world, id, SkillAction::End, None);

        let worm = &world.worms[&id];
        assert!(!worm.skill.held);
        let remaining = worm.skill.ready_at - world.now;
        assert!((remaining - def.cooldown_ms).abs() <= 40, "remaining {remaining}");
        assert!(energy_fraction(worm.skill.ready_at, def.cooldown_ms, world.now) < 0.01);
        assert_eq!(worm.timers.stealth_until, worm.skill.active_until + STEALTH_LINGER_MS);

        let linger_end = worm.timers.stealth_until;
        run_until(&mut world, linger_end);
        assert!(!crate::game::types::active(world.worms[&id].timers.stealth_until, world.now));
    }

    #[test]
    fn hold_refused_without_energy_and_tap_toggles() {
        let mut world = make_world();
        let id = add_worm(&mut world, "wisp_mist", Point { x: 0.0, y: 0.0 }, 0);
        run_until(&mut world, 5000);

        world.worms.get_mut(&id).expect("worm").skill.ready_at = world.now + 100_000;
        handle_action(&mut world, id, SkillAction::Start, None);
        assert!(!world.worms[&id].skill.held);

        world.worms.get_mut(&id).expect("worm").skill.ready_at = 0;
        handle_action(&mut world, id, SkillAction::Tap, None);
        assert!(world.worms[&id].skill.held);
        world.step();
        handle_action(&mut world, id, SkillAction::Tap, None);
        assert!(!world.worms[&id].skill.held);
    }

    #[test]
    fn zone_cast_replaces_previous_zone_and_clamps_range() {
        let mut world = make_world();
        let id = add_worm(&mut world, "reaper_bone", Point { x: 0.0, y: 0.0 }, 0);
        run_until(&mut world, 5000);
        let range = world.tuning.skill(SkillId::GasCloud).expect("gas").range;

        handle_action(&mut world, id, SkillAction::Tap, Some(Point { x: 10_000.0, y: 0.0 }));
        assert_eq!(world.gas_clouds.len(), 1);
        let head = world.worms[&id].head();
        let zone = *world.gas_clouds.values().next().expect("zone");
        assert!(distance(zone.position, head) <= range + 1e-6);

        world.worms.get_mut(&id).expect("worm").skill.ready_at = 0;
        handle_action(&mut world, id, SkillAction::Tap, Some(Point { x: -100.0, y: 0.0 }));
        assert_eq!(world.gas_clouds.len(), 1);
        assert_ne!(world.gas_clouds.values().next().expect("zone").id, zone.id);
    }

    #[test]
    fn lightning_locks_heads_along_the_ray() {
        let mut world = make_world();
        let caster = add_worm(&mut world, "arcanist_storm", Point { x: 0.0, y: 0.0 }, 0);
        let victim = add_worm(&mut world, "striker_ember", Point { x: 300.0, y: 200.0 }, 0);
        let bystander = add_worm(&mut world, "striker_ember", Point { x: 300.0, y: -600.0 }, 0);
        run_until(&mut world, 5000);
        let target = world.worms[&victim].head();

        handle_action(&mut world, caster, SkillAction::Tap, Some(target));
        assert!(world.worms[&victim].timers.turn_locked_until > world.now);
        assert!(world.worms[&bystander].timers.turn_locked_until <= world.now);
    }

    #[test]
    fn rewind_returns_to_lookback_sample_and_never_adds_score() {
        let mut world = make_world();
        let id = add_worm(&mut world, "arcanist_hourglass", Point { x: -500.0, y: 0.0 }, 40);
        run_until(&mut world, 4000);
        let horizon_head = world.worms[&id]
            .rewind
            .samples
            .iter()
            .min_by_key(|sample| (sample.at - (world.now - REWIND_LOOKBACK_MS)).abs())
            .map(|sample| sample.head)
            .expect("sample");
        world.worms.get_mut(&id).expect("worm").add_score(30.0);

        handle_action(&mut world, id, SkillAction::Tap, None);
        let worm = &world.worms[&id];
        let transition = worm.rewind.transition.expect("rewinding");
        assert!(worm.timers.phase_until >= transition.ends_at);
        assert!(worm.timers.invulnerable_until >= transition.ends_at);

        run_until(&mut world, transition.ends_at);
        let worm = &world.worms[&id];
        assert!(worm.rewind.transition.is_none());
        assert!(distance(worm.head(), horizon_head) < 1e-6);
        assert_eq!(worm.score, 40);
    }
}
