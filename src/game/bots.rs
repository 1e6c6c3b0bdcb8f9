//! Scripted steering for AI-controlled worms.

use super::constants::{
    BOT_AVOID_DISTANCE, BOT_BOOST_DISTANCE, BOT_CAST_RANGE, BOT_MIN_SCORE_TO_BOOST,
    BOT_WALL_MARGIN,
};
use super::math::{angle_between, distance, length, wrap_angle};
use super::types::{active, Point, Worm};
use super::world::World;

const FOOD_SEEK_DISTANCE: f64 = 420.0;
const WANDER_MIN_MS: i64 = 1200;
const WANDER_SPREAD_MS: f64 = 2400.0;
const WANDER_TURN: f64 = 1.6;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BotBrain {
    pub wander_angle: f64,
    pub next_wander_at: i64,
}

/// Random draws taken from the world rng before deciding, so deciding only needs `&World`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dice {
    pub roll: f64,
    pub jitter: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BotDecision {
    pub target_angle: f64,
    pub boost: bool,
    pub cast: Option<Point>,
    pub brain: BotBrain,
}

pub fn decide(world: &World, worm: &Worm, brain: BotBrain, dice: Dice) -> BotDecision {
    let now = world.now;
    let head = worm.head();
    let mut brain = brain;
    let can_afford_boost = worm.score > BOT_MIN_SCORE_TO_BOOST;

    let prey = nearest_rival_head(world, worm);
    let cast = prey
        .filter(|(_, d)| *d <= BOT_CAST_RANGE)
        .filter(|_| now >= worm.skill.ready_at && !worm.skill.held)
        .map(|(point, _)| point);

    if length(head) > world.arena_radius * BOT_WALL_MARGIN {
        return BotDecision {
            target_angle: angle_between(head, Point::default()),
            boost: false,
            cast,
            brain,
        };
    }

    if let Some(threat) = nearest_body(world, worm) {
        return BotDecision {
            target_angle: angle_between(threat, head),
            boost: can_afford_boost,
            cast,
            brain,
        };
    }

    if let Some((food, _)) = nearest_food(world, head) {
        let chase = prey
            .filter(|(_, d)| *d < BOT_BOOST_DISTANCE)
            .and_then(|(point, _)| {
                let rival = world.worms.values().find(|other| other.head() == point)?;
                (worm.segment_count() > rival.segment_count()).then_some(point)
            });
        return match chase {
            Some(target) => BotDecision {
                target_angle: angle_between(head, target),
                boost: can_afford_boost,
                cast,
                brain,
            },
            None => BotDecision {
                target_angle: angle_between(head, food),
                boost: false,
                cast,
                brain,
            },
        };
    }

    if now >= brain.next_wander_at {
        brain.wander_angle = wrap_angle(worm.angle + dice.jitter * WANDER_TURN);
        brain.next_wander_at = now + WANDER_MIN_MS + (dice.roll * WANDER_SPREAD_MS) as i64;
    }
    BotDecision {
        target_angle: brain.wander_angle,
        boost: false,
        cast,
        brain,
    }
}

fn nearest_body(world: &World, worm: &Worm) -> Option<Point> {
    let head = worm.head();
    let ring = world.body_index.ring_for(BOT_AVOID_DISTANCE);
    world
        .body_index
        .query_point(head, ring)
        .filter(|sample| sample.worm != worm.id)
        .map(|sample| (sample.position, distance(sample.position, head)))
        .filter(|(_, d)| *d < BOT_AVOID_DISTANCE)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(point, _)| point)
}

fn nearest_food(world: &World, head: Point) -> Option<(Point, f64)> {
    let ring = world.food_index.ring_for(FOOD_SEEK_DISTANCE);
    world
        .food_index
        .query_point(head, ring)
        .filter_map(|id| world.food.get(id))
        .map(|food| (food.position, distance(food.position, head)))
        .filter(|(_, d)| *d < FOOD_SEEK_DISTANCE)
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

fn nearest_rival_head(world: &World, worm: &Worm) -> Option<(Point, f64)> {
    let head = worm.head();
    let now = world.now;
    world
        .worms
        .values()
        .filter(|other| other.id != worm.id && !active(other.timers.stealth_until, now))
        .map(|other| (other.head(), distance(other.head(), head)))
        .filter(|(_, d)| *d < BOT_CAST_RANGE.max(BOT_BOOST_DISTANCE))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::types::FoodKind;
    use crate::game::world::tests::{add_worm, make_world};

    #[test]
    fn steers_home_near_the_wall() {
        let mut world = make_world();
        let edge = world.arena_radius * 0.95;
        let id = add_worm(&mut world, "striker_ember", Point { x: edge, y: 0.0 }, 0);
        let worm = world.worms[&id].clone();
        let decision = decide(&world, &worm, BotBrain::default(), Dice::default());
        assert!((wrap_angle(decision.target_angle - std::f64::consts::PI)).abs() < 1e-9);
        assert!(!decision.boost);
    }

    #[test]
    fn heads_for_nearby_food() {
        let mut world = make_world();
        let id = add_worm(&mut world, "striker_ember", Point { x: 0.0, y: 0.0 }, 0);
        world.spawn_food(Point { x: 0.0, y: 120.0 }, 1, FoodKind::Normal);
        let worm = world.worms[&id].clone();
        let decision = decide(&world, &worm, BotBrain::default(), Dice::default());
        assert!((decision.target_angle - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn wanders_when_nothing_is_around() {
        let mut world = make_world();
        let id = add_worm(&mut world, "striker_ember", Point { x: 0.0, y: 0.0 }, 0);
        let worm = world.worms[&id].clone();
        let dice = Dice {
            roll: 0.5,
            jitter: 0.5,
        };
        let decision = decide(&world, &worm, BotBrain::default(), dice);
        assert!((decision.target_angle - 0.8).abs() < 1e-9);
        assert_eq!(decision.brain.next_wander_at, world.now + WANDER_MIN_MS + 1200);
        assert!(decision.cast.is_none());
    }
}
