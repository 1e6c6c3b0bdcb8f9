use super::constants::{
    BASE_MASS, BASE_SPEED, BASE_TURN_RATE, BOOST_MIN_SCORE, BOOST_RAMP_DOWN_PER_SEC,
    BOOST_RAMP_UP_PER_SEC, BOOST_SPEED, DASH_SPEED_MULT, LENGTH_SPEED_FALLOFF,
    LENGTH_TURN_FALLOFF, MIN_LENGTH_SPEED_MULT, MIN_LENGTH_TURN_MULT, MIN_SEGMENTS,
    MIN_TURN_PENALTY, SEGMENT_SPACING, SLOW_MULTIPLIER, TRAIL_SLACK, TURN_RATIO_PER_DOUBLING,
};
use super::math::{clamp, from_angle, is_finite, length, rotate_toward};
use super::progression::Perks;
use super::types::{active, Point, Worm};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepOutcome {
    pub boosting: bool,
    pub hit_wall: bool,
    pub fault: bool,
}

pub fn turn_penalty(mass: f64) -> f64 {
    turn_penalty_with(mass, BASE_MASS, TURN_RATIO_PER_DOUBLING, MIN_TURN_PENALTY)
}

/// `ratio ^ log2(mass / base_mass)` clamped into `[min_penalty, 1]`; exactly 1 up to the base mass.
pub fn turn_penalty_with(
    mass: f64,
    base_mass: f64,
    ratio_per_doubling: f64,
    min_penalty: f64,
) -> f64 {
    if !(mass > base_mass) || base_mass <= 0.0 {
        return 1.0;
    }
    let doublings = (mass / base_mass).log2();
    clamp(ratio_per_doubling.powf(doublings), min_penalty, 1.0)
}

pub fn length_speed_multiplier(segments: usize) -> f64 {
    let extra = segments.saturating_sub(MIN_SEGMENTS) as f64;
    clamp(1.0 - extra * LENGTH_SPEED_FALLOFF, MIN_LENGTH_SPEED_MULT, 1.0)
}

pub fn length_turn_factor(segments: usize) -> f64 {
    let extra = segments.saturating_sub(MIN_SEGMENTS) as f64;
    clamp(1.0 - extra * LENGTH_TURN_FALLOFF, MIN_LENGTH_TURN_MULT, 1.0)
}

pub fn update_boost_blend(blend: f64, boosting: bool, dt: f64) -> f64 {
    if boosting {
        (blend + BOOST_RAMP_UP_PER_SEC * dt).min(1.0)
    } else {
        (blend - BOOST_RAMP_DOWN_PER_SEC * dt).max(0.0)
    }
}

pub fn can_boost(worm: &Worm) -> bool {
    worm.boost && worm.score > BOOST_MIN_SCORE
}

pub fn effective_speed(worm: &Worm, perks: &Perks, now: i64) -> f64 {
    let blend = clamp(worm.boost_blend, 0.0, 1.0);
    let mut speed = BASE_SPEED + (BOOST_SPEED - BASE_SPEED) * blend;
    speed *= length_speed_multiplier(worm.segment_count());
    speed *= perks.speed_mult;
    if active(worm.timers.charge_until, now) {
        speed *= DASH_SPEED_MULT;
    }
    if active(worm.timers.slow_until, now) {
        speed *= SLOW_MULTIPLIER;
    }
    speed
}

/// Largest heading change allowed this tick, in radians.
pub fn turn_budget(worm: &Worm, perks: &Perks, now: i64, dt: f64) -> f64 {
    if active(worm.timers.turn_locked_until, now) {
        return 0.0;
    }
    let mut rate = BASE_TURN_RATE;
    rate *= length_turn_factor(worm.segment_count());
    rate *= turn_penalty(worm.mass());
    rate *= perks.turn_mult;
    if active(worm.timers.slow_until, now) {
        rate *= SLOW_MULTIPLIER;
    }
    rate * dt
}

/// Integrates heading and head position for one tick, then rebuilds the body.
/// A head that would leave the arena by more than its radius is not moved.
pub fn step_worm(
    worm: &mut Worm,
    perks: &Perks,
    arena_radius: f64,
    now: i64,
    dt: f64,
) -> StepOutcome {
    let boosting = can_boost(worm);
    worm.boost_blend = update_boost_blend(worm.boost_blend, boosting, dt);

    let budget = turn_budget(worm, perks, now, dt);
    worm.angle = rotate_toward(worm.angle, worm.target_angle, budget);

    let speed = effective_speed(worm, perks, now);
    let head = worm.head();
    let delta = from_angle(worm.angle, speed * dt);
    let next = Point {
        x: head.x + delta.x,
        y: head.y + delta.y,
    };
    if !is_finite(next) || !worm.angle.is_finite() {
        return StepOutcome {
            boosting,
            hit_wall: false,
            fault: true,
        };
    }
    if length(next) > arena_radius + worm.head_radius() {
        return StepOutcome {
            boosting,
            hit_wall: true,
            fault: false,
        };
    }

    set_head(worm, next);
    sync_body(worm);
    StepOutcome {
        boosting,
        hit_wall: false,
        fault: false,
    }
}

pub fn set_head(worm: &mut Worm, head: Point) {
    match worm.body.first_mut() {
        Some(first) => *first = head,
        None => worm.body.push(head),
    }
}

/// Records the head into the trail, trims the trail, and resamples the body to the
/// segment count implied by the current score.
pub fn sync_body(worm: &mut Worm) {
    let head = worm.head();
    let count = worm.target_segments();
    worm.trail.record(head);
    let needed = (count.saturating_sub(1)) as f64 * SEGMENT_SPACING + TRAIL_SLACK;
    worm.trail.retain_arc(head, needed);
    let mut body = std::mem::take(&mut worm.body);
    worm.trail.resample(head, count, SEGMENT_SPACING, &mut body);
    worm.body = body;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::constants::{ARENA_RADIUS, MAX_SEGMENTS};
    use crate::game::world::tests::make_worm;

    #[test]
    fn penalty_is_one_up_to_base_mass() {
        for mass in [0.0, 1.0, 10.0, BASE_MASS * 0.5, BASE_MASS] {
            assert_eq!(turn_penalty(mass), 1.0);
        }
    }

    #[test]
    fn penalty_is_monotone_and_floored() {
        let mut previous = 1.0;
        let mut mass = BASE_MASS;
        while mass < 1e9 {
            let penalty = turn_penalty(mass);
            assert!(penalty <= previous + 1e-12);
            assert!(penalty >= MIN_TURN_PENALTY);
            previous = penalty;
            mass *= 1.37;
        }
        assert_eq!(turn_penalty(f64::INFINITY), MIN_TURN_PENALTY);
        assert!((turn_penalty(BASE_MASS * 2.0) - TURN_RATIO_PER_DOUBLING).abs() < 1e-12);
    }

    #[test]
    fn boost_blend_ramps_and_decays() {
        let mut blend = 0.0;
        for _ in 0..60 {
            blend = update_boost_blend(blend, true, 1.0 / 60.0);
        }
        assert_eq!(blend, 1.0);
        blend = update_boost_blend(blend, false, 0.1);
        assert!((blend - (1.0 - BOOST_RAMP_DOWN_PER_SEC * 0.1)).abs() < 1e-12);
        assert_eq!(update_boost_blend(0.05, false, 1.0), 0.0);
    }

    #[test]
    fn longer_worms_move_slower_within_clamp() {
        assert_eq!(length_speed_multiplier(MIN_SEGMENTS), 1.0);
        assert!(length_speed_multiplier(200) < 1.0);
        assert_eq!(length_speed_multiplier(MAX_SEGMENTS), MIN_LENGTH_SPEED_MULT);
    }

    #[test]
    fn turn_is_limited_to_budget() {
        let mut worm = make_worm(1, 0);
        worm.angle = 0.0;
        worm.target_angle = std::f64::consts::PI * 0.9;
        let dt = 1.0 / 60.0;
        let budget = turn_budget(&worm, &Perks::default(), 10_000, dt);
        step_worm(&mut worm, &Perks::default(), ARENA_RADIUS, 10_000, dt);
        assert!((worm.angle - budget).abs() < 1e-9);
    }

    #[test]
    fn turn_lock_freezes_heading() {
        let mut worm = make_worm(1, 0);
        worm.angle = 0.3;
        worm.target_angle = -1.0;
        worm.timers.turn_locked_until = 20_000;
        step_worm(&mut worm, &Perks::default(), ARENA_RADIUS, 10_000, 1.0 / 60.0);
        assert_eq!(worm.angle, 0.3);
    }

    #[test]
    fn head_advances_and_body_keeps_segment_count() {
        let mut worm = make_worm(1, 0);
        let start = worm.head();
        let dt = 1.0 / 60.0;
        for tick in 0..120 {
            let outcome = step_worm(&mut worm, &Perks::default(), ARENA_RADIUS, 10_000 + tick, dt);
            assert!(!outcome.hit_wall);
        }
        assert!(worm.head().x > start.x + BASE_SPEED * 1.9);
        assert_eq!(worm.segment_count(), MIN_SEGMENTS);
    }

    #[test]
    fn leaving_arena_reports_wall_hit() {
        let mut worm = make_worm(1, 0);
        let edge = ARENA_RADIUS + worm.head_radius() - 1.0;
        worm.translate(edge - worm.head().x, -worm.head().y);
        worm.angle = 0.0;
        worm.target_angle = 0.0;
        let outcome = step_worm(&mut worm, &Perks::default(), ARENA_RADIUS, 10_000, 1.0 / 60.0);
        assert!(outcome.hit_wall);
    }
}
