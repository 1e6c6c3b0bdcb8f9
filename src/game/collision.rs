use super::constants::{
    ARMOR_PUSH_DISTANCE, ARMOR_REFUND_SCORE, BODY_CONTACT_FACTOR, BODY_RADIUS_RATIO,
    BODY_SAMPLE_STRIDE, ELECTRIC_LOCK_MS, ELECTRIC_PUSH, HEAD_CONTACT_FACTOR,
    HEAD_OVERLAP_FACTOR, HEAD_RADIUS_MAX, NECK_SKIP_SEGMENTS, SPAWN_GRACE_MS, WELL_CORE_FRACTION,
    WELL_SIZE_RATIO,
};
use super::math::{direction, distance, from_angle};
use super::types::{active, BodySample, BurstDirection, DeathCause, EntityId, Point, Worm};
use super::world::World;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kill {
    pub cause: DeathCause,
    pub killer: Option<EntityId>,
}

/// Deaths detected this tick. A worm is recorded at most once; the first cause wins.
#[derive(Debug, Default)]
pub struct KillSet {
    kills: BTreeMap<EntityId, Kill>,
}

impl KillSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&mut self, victim: EntityId, cause: DeathCause, killer: Option<EntityId>) -> bool {
        if self.kills.contains_key(&victim) {
            return false;
        }
        self.kills.insert(victim, Kill { cause, killer });
        true
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.kills.contains_key(&id)
    }

    #[cfg(test)]
    pub fn get(&self, id: EntityId) -> Option<Kill> {
        self.kills.get(&id).copied()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.kills.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.kills.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, Kill)> + '_ {
        self.kills.iter().map(|(id, kill)| (*id, *kill))
    }
}

/// What one side of a head-on contact brings to the fight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Combatant {
    pub segments: usize,
    pub charging: bool,
    pub thorns: bool,
    pub glass: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blow {
    Charge,
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeadOnVerdict {
    pub a: Option<Blow>,
    pub b: Option<Blow>,
}

/// Precedence: charge, then thorns, then glass, then length. Armor and invulnerability
/// are applied by the caller afterwards.
pub fn resolve_head_on(a: &Combatant, b: &Combatant) -> HeadOnVerdict {
    match (a.charging, b.charging) {
        (true, true) => return HeadOnVerdict::default(),
        (true, false) => {
            return HeadOnVerdict {
                a: None,
                b: Some(Blow::Charge),
            }
        }
        (false, true) => {
            return HeadOnVerdict {
                a: Some(Blow::Charge),
                b: None,
            }
        }
        (false, false) => {}
    }

    let normal = |dies: bool| dies.then_some(Blow::Normal);
    if a.thorns != b.thorns {
        return HeadOnVerdict {
            a: normal(b.thorns),
            b: normal(a.thorns),
        };
    }
    if a.glass || b.glass {
        return HeadOnVerdict {
            a: normal(a.glass),
            b: normal(b.glass),
        };
    }
    HeadOnVerdict {
        a: normal(a.segments <= b.segments),
        b: normal(b.segments <= a.segments),
    }
}

fn untouchable(worm: &Worm, now: i64) -> bool {
    worm.in_spawn_grace(now, SPAWN_GRACE_MS) || active(worm.timers.phase_until, now)
}

fn protected(worm: &Worm, now: i64) -> bool {
    worm.in_spawn_grace(now, SPAWN_GRACE_MS) || active(worm.timers.invulnerable_until, now)
}

/// Runs every detection pass for the current tick, adding to deaths already found
/// by locomotion. Nothing is removed here.
pub fn resolve(world: &mut World, kills: &mut KillSet) {
    apply_well_pulls(world, kills);
    apply_bursts(world);
    rebuild_head_index(world);
    resolve_head_to_head(world, kills);
    rebuild_body_index(world);
    resolve_head_to_body(world, kills);
    absorb_into_wells(world, kills);
}

/// A well only swallows worms clearly smaller than the worm that cast it.
fn well_victims(world: &World, kills: &KillSet) -> Vec<(EntityId, EntityId, Point, f64, f64, f64)> {
    let now = world.now;
    let mut victims = Vec::new();
    for well in world.black_holes.values() {
        let Some(owner) = world.worms.get(&well.owner) else { continue };
        let limit = owner.segment_count() as f64 * WELL_SIZE_RATIO;
        for worm in world.worms.values() {
            if worm.id == well.owner || kills.contains(worm.id) || untouchable(worm, now) {
                continue;
            }
            if worm.segment_count() as f64 >= limit {
                continue;
            }
            let d = distance(worm.head(), well.position);
            if d < well.radius {
                victims.push((worm.id, well.owner, well.position, well.radius, well.strength, d));
            }
        }
    }
    victims
}

pub fn apply_well_pulls(world: &mut World, kills: &mut KillSet) {
    let now = world.now;
    let dt = world.dt();
    for (worm_id, owner, center, radius, strength, d) in well_victims(world, kills) {
        let Some(worm) = world.worms.get_mut(&worm_id) else { continue };
        if d <= radius * WELL_CORE_FRACTION {
            if !protected(worm, now) && kills.mark(worm_id, DeathCause::BlackHole, Some(owner)) {
                tracing::debug!(worm_id, owner, "worm absorbed by black hole");
            }
            continue;
        }
        let pull = (strength * (1.0 - d / radius) * dt).min(d);
        let toward = direction(worm.head(), center, worm.angle);
        worm.translate(toward.x * pull, toward.y * pull);
    }
}

pub fn apply_bursts(world: &mut World) {
    let now = world.now;
    let bursts = std::mem::take(&mut world.bursts);
    for burst in bursts {
        for worm in world.worms.values_mut() {
            if worm.id == burst.owner || untouchable(worm, now) {
                continue;
            }
            let d = distance(worm.head(), burst.center);
            if d >= burst.radius {
                continue;
            }
            let magnitude = burst.strength * (1.0 - d / burst.radius);
            let (unit, magnitude) = match burst.direction {
                BurstDirection::Away => {
                    (direction(burst.center, worm.head(), worm.angle), magnitude)
                }
                BurstDirection::Toward => {
                    (direction(worm.head(), burst.center, worm.angle), magnitude.min(d))
                }
            };
            worm.translate(unit.x * magnitude, unit.y * magnitude);
        }
    }
}

pub fn rebuild_head_index(world: &mut World) {
    world.head_index.clear();
    for worm in world.worms.values() {
        world.head_index.insert_at(worm.id, worm.head());
    }
}

pub fn rebuild_body_index(world: &mut World) {
    world.body_index.clear();
    for worm in world.worms.values() {
        for index in (NECK_SKIP_SEGMENTS..worm.body.len()).step_by(BODY_SAMPLE_STRIDE) {
            world.body_index.insert_at(
                BodySample {
                    worm: worm.id,
                    index,
                    position: worm.body[index],
                },
                worm.body[index],
            );
        }
    }
}

fn combatant(world: &World, worm: &Worm) -> Combatant {
    let now = world.now;
    Combatant {
        segments: worm.segment_count(),
        charging: active(worm.timers.charge_until, now),
        thorns: active(worm.timers.thorns_until, now),
        glass: world.tuning.class(worm.class).map(|def| def.glass).unwrap_or(false),
    }
}

pub fn resolve_head_to_head(world: &mut World, kills: &mut KillSet) {
    let now = world.now;
    let ring = world.head_index.ring_for(HEAD_RADIUS_MAX * 2.0 * HEAD_OVERLAP_FACTOR);
    let mut pairs = Vec::new();
    for worm in world.worms.values() {
        if untouchable(worm, now) {
            continue;
        }
        for other_id in world.head_index.query_point(worm.head(), ring) {
            if *other_id <= worm.id {
                continue;
            }
            let Some(other) = world.worms.get(other_id) else { continue };
            if untouchable(other, now) {
                continue;
            }
            let reach = (worm.head_radius() + other.head_radius()) * HEAD_OVERLAP_FACTOR;
            if distance(worm.head(), other.head()) < reach {
                pairs.push((worm.id, other.id));
            }
        }
    }
    pairs.sort_unstable();

    for (a_id, b_id) in pairs {
        if kills.contains(a_id) || kills.contains(b_id) {
            continue;
        }
        let (Some(a), Some(b)) = (world.worms.get(&a_id), world.worms.get(&b_id)) else {
            continue;
        };
        let verdict = resolve_head_on(&combatant(world, a), &combatant(world, b));
        let a_dies = blow_is_fatal(world, a_id, b_id, verdict.a);
        let b_dies = blow_is_fatal(world, b_id, a_id, verdict.b);
        if a_dies {
            kills.mark(a_id, DeathCause::HeadToHead, Some(b_id));
        }
        if b_dies {
            kills.mark(b_id, DeathCause::HeadToHead, Some(a_id));
        }
    }
}

/// Returns true when the blow is fatal. Armor absorbs a non-charge blow, refunds a
/// little size and shoves the pair apart.
fn blow_is_fatal(
    world: &mut World,
    victim_id: EntityId,
    other_id: EntityId,
    blow: Option<Blow>,
) -> bool {
    let now = world.now;
    let Some(blow) = blow else { return false };
    let Some(other_head) = world.worms.get(&other_id).map(|other| other.head()) else {
        return false;
    };
    let Some(victim) = world.worms.get_mut(&victim_id) else { return false };
    if protected(victim, now) {
        return false;
    }
    if blow == Blow::Charge || victim.armor_stacks == 0 {
        return true;
    }

    victim.armor_stacks -= 1;
    victim.add_score(ARMOR_REFUND_SCORE as f64);
    let away = direction(other_head, victim.head(), victim.angle + std::f64::consts::PI);
    let half = ARMOR_PUSH_DISTANCE * 0.5;
    victim.translate(away.x * half, away.y * half);
    tracing::debug!(
        worm_id = victim_id,
        remaining = victim.armor_stacks,
        "armor absorbed a head-on"
    );
    if let Some(other) = world.worms.get_mut(&other_id) {
        other.translate(-away.x * half, -away.y * half);
    }
    false
}

enum BodyContact {
    HeadDies(DeathCause, EntityId),
    BodyDies(EntityId),
    Shocked,
}

pub fn resolve_head_to_body(world: &mut World, kills: &mut KillSet) {
    let now = world.now;
    let max_reach = HEAD_RADIUS_MAX * HEAD_CONTACT_FACTOR
        + HEAD_RADIUS_MAX * BODY_RADIUS_RATIO * BODY_CONTACT_FACTOR;
    let ring = world.body_index.ring_for(max_reach);
    let mut ids: Vec<EntityId> = world.worms.keys().copied().collect();
    ids.sort_unstable();

    for head_id in ids {
        if kills.contains(head_id) {
            continue;
        }
        let Some(worm) = world.worms.get(&head_id) else { continue };
        if untouchable(worm, now) {
            continue;
        }
        let head = worm.head();
        let head_reach = worm.head_radius() * HEAD_CONTACT_FACTOR;
        let charging = active(worm.timers.charge_until, now);
        let shielded = active(worm.timers.invulnerable_until, now);

        let mut outcome = None;
        for sample in world.body_index.query_point(head, ring) {
            if sample.worm == head_id {
                continue;
            }
            let Some(owner) = world.worms.get(&sample.worm) else { continue };
            if untouchable(owner, now) {
                continue;
            }
            let reach = head_reach + owner.body_radius() * BODY_CONTACT_FACTOR;
            if distance(head, sample.position) >= reach {
                continue;
            }
            let contact = if charging {
                if protected(owner, now) || kills.contains(owner.id) {
                    continue;
                }
                BodyContact::BodyDies(owner.id)
            } else if active(owner.timers.thorns_until, now) {
                BodyContact::HeadDies(DeathCause::Thorns, owner.id)
            } else if active(owner.timers.electric_until, now) {
                BodyContact::Shocked
            } else if shielded {
                continue;
            } else {
                BodyContact::HeadDies(DeathCause::BodyCollision, owner.id)
            };
            outcome = Some(contact);
            break;
        }

        match outcome {
            Some(BodyContact::HeadDies(cause, killer)) => {
                kills.mark(head_id, cause, Some(killer));
            }
            Some(BodyContact::BodyDies(victim)) => {
                kills.mark(victim, DeathCause::BodyCollision, Some(head_id));
            }
            Some(BodyContact::Shocked) => {
                if let Some(worm) = world.worms.get_mut(&head_id) {
                    let locked = now + ELECTRIC_LOCK_MS;
                    worm.timers.turn_locked_until = worm.timers.turn_locked_until.max(locked);
                    let back = from_angle(worm.angle, -ELECTRIC_PUSH);
                    worm.translate(back.x, back.y);
                }
            }
            None => {}
        }
    }
}

pub fn absorb_into_wells(world: &mut World, kills: &mut KillSet) {
    let now = world.now;
    for (worm_id, owner, _, radius, _, d) in well_victims(world, kills) {
        if d > radius * WELL_CORE_FRACTION {
            continue;
        }
        let Some(worm) = world.worms.get(&worm_id) else { continue };
        if !protected(worm, now) {
            kills.mark(worm_id, DeathCause::BlackHole, Some(owner));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fighter(segments: usize) -> Combatant {
        Combatant {
            segments,
            charging: false,
            thorns: false,
            glass: false,
        }
    }

    #[test]
    fn equal_length_both_die() {
        let verdict = resolve_head_on(&fighter(40), &fighter(40));
        assert_eq!(verdict.a, Some(Blow::Normal));
        assert_eq!(verdict.b, Some(Blow::Normal));
    }

    #[test]
    fn shorter_dies() {
        let verdict = resolve_head_on(&fighter(30), &fighter(40));
        assert_eq!(verdict.a, Some(Blow::Normal));
        assert_eq!(verdict.b, None);
    }

    #[test]
    fn glass_dies_even_when_longer() {
        let glass = Combatant {
            glass: true,
            ..fighter(200)
        };
        let verdict = resolve_head_on(&glass, &fighter(20));
        assert_eq!(verdict.a, Some(Blow::Normal));
        assert_eq!(verdict.b, None);
    }

    #[test]
    fn charge_beats_everything_and_mutual_charge_spares_both() {
        let charger = Combatant {
            charging: true,
            ..fighter(10)
        };
        let thorny = Combatant {
            thorns: true,
            ..fighter(500)
        };
        let verdict = resolve_head_on(&charger, &thorny);
        assert_eq!(verdict.a, None);
        assert_eq!(verdict.b, Some(Blow::Charge));

        let verdict = resolve_head_on(&charger, &charger);
        assert_eq!(verdict, HeadOnVerdict::default());
    }

    #[test]
    fn thorns_beat_length_and_glass() {
        let thorny_glass = Combatant {
            thorns: true,
            glass: true,
            ..fighter(10)
        };
        let verdict = resolve_head_on(&fighter(300), &thorny_glass);
        assert_eq!(verdict.a, Some(Blow::Normal));
        assert_eq!(verdict.b, None);
    }

    #[test]
    fn kill_set_keeps_first_cause() {
        let mut kills = KillSet::new();
        assert!(kills.mark(7, DeathCause::Wall, None));
        assert!(!kills.mark(7, DeathCause::HeadToHead, Some(3)));
        assert_eq!(kills.len(), 1);
        assert_eq!(
            kills.get(7),
            Some(Kill {
                cause: DeathCause::Wall,
                killer: None
            })
        );
    }
}
