pub const DEFAULT_TICK_RATE: u32 = 60;
pub const ARENA_RADIUS: f64 = 3000.0;

pub const MIN_SEGMENTS: usize = 10;
pub const MAX_SEGMENTS: usize = 600;
pub const SEGMENT_SPACING: f64 = 9.0;
pub const SCORE_PER_SEGMENT: f64 = 4.0;

pub const TRAIL_MIN_RECORD_DISTANCE: f64 = 2.5;
pub const TRAIL_SLACK: f64 = SEGMENT_SPACING * 6.0;
pub const TRAIL_COMPACT_THRESHOLD: usize = 512;

pub const BASE_SPEED: f64 = 180.0;
pub const BOOST_SPEED: f64 = 330.0;
pub const BOOST_RAMP_UP_PER_SEC: f64 = 5.0;
pub const BOOST_RAMP_DOWN_PER_SEC: f64 = 3.0;
pub const LENGTH_SPEED_FALLOFF: f64 = 0.0006;
pub const MIN_LENGTH_SPEED_MULT: f64 = 0.7;
pub const DASH_SPEED_MULT: f64 = 2.2;
pub const SLOW_MULTIPLIER: f64 = 0.6;

pub const BASE_TURN_RATE: f64 = 4.2;
pub const LENGTH_TURN_FALLOFF: f64 = 0.0015;
pub const MIN_LENGTH_TURN_MULT: f64 = 0.55;
pub const BASE_MASS: f64 = 40.0;
pub const TURN_RATIO_PER_DOUBLING: f64 = 0.85;
pub const MIN_TURN_PENALTY: f64 = 0.45;

pub const BOOST_MIN_SCORE: i64 = 10;
pub const BOOST_SCORE_DRAIN_PER_SEC: f64 = 4.0;
pub const BOOST_DROP_INTERVAL_MS: i64 = 250;
pub const BOOST_DROP_VALUE: i64 = 1;

pub const HEAD_RADIUS_BASE: f64 = 11.0;
pub const HEAD_RADIUS_PER_SEGMENT: f64 = 0.025;
pub const HEAD_RADIUS_MAX: f64 = 26.0;
pub const BODY_RADIUS_RATIO: f64 = 0.9;

pub const HEAD_OVERLAP_FACTOR: f64 = 0.9;
pub const HEAD_CONTACT_FACTOR: f64 = 0.85;
pub const BODY_CONTACT_FACTOR: f64 = 0.95;
pub const BODY_SAMPLE_STRIDE: usize = 2;
pub const NECK_SKIP_SEGMENTS: usize = 3;

pub const SPATIAL_CELL_SIZE: f64 = 64.0;
pub const ZONE_CELL_SIZE: f64 = 256.0;

pub const SPAWN_GRACE_MS: i64 = 2500;
pub const SPAWN_CLEARANCE: f64 = 120.0;
pub const SPAWN_RADIUS_FRACTION: f64 = 0.85;
pub const MAX_SPAWN_ATTEMPTS: usize = 32;
pub const REJOIN_GRACE_MS: i64 = 3000;
pub const BOT_RESPAWN_MS: i64 = 3000;

pub const FOOD_TARGET_COUNT: usize = 1200;
pub const FOOD_HARD_CAP: usize = 4000;
pub const FOOD_REPLENISH_PER_TICK: usize = 40;
pub const FOOD_RADIUS: f64 = 5.0;
pub const FOOD_MAX_VALUE: i64 = 3;
pub const CORPSE_FOOD_STRIDE: usize = 2;
pub const CORPSE_VALUE: i64 = 2;
pub const CORPSE_RARE_VALUE: i64 = 6;
pub const CORPSE_RARE_CHANCE: f64 = 0.06;
pub const CORPSE_JITTER: f64 = 6.0;
pub const REWARD_BONUS_FRACTION: f64 = 0.5;
pub const BAIT_COUNT: usize = 8;
pub const BAIT_VALUE: i64 = 2;

pub const ARMOR_REFUND_SCORE: i64 = 8;
pub const ARMOR_PUSH_DISTANCE: f64 = 30.0;

pub const WELL_SIZE_RATIO: f64 = 0.8;
pub const WELL_CORE_FRACTION: f64 = 0.18;
pub const GAS_SCORE_DRAIN_PER_SEC: f64 = 6.0;
pub const ICE_SLOW_LINGER_MS: i64 = 400;
pub const DECOY_SLOW_MS: i64 = 800;
pub const ELECTRIC_LOCK_MS: i64 = 700;
pub const ELECTRIC_PUSH: f64 = 24.0;

pub const HOLD_REFRESH_MS: i64 = 100;
pub const HOLD_MIN_ENERGY: f64 = 0.02;
pub const STEALTH_LINGER_MS: i64 = 300;

pub const REWIND_SAMPLE_MS: i64 = 200;
pub const REWIND_WINDOW_MS: i64 = 4000;
pub const REWIND_LOOKBACK_MS: i64 = 3000;
pub const REWIND_PUSH_RADIUS: f64 = 80.0;
pub const REWIND_PUSH_DISTANCE: f64 = 6.0;

pub const AIM_MAX_RANGE: f64 = 700.0;
pub const OFFER_SIZE: usize = 3;

pub const VIEW_RADIUS: f64 = 1400.0;
pub const MAX_VISIBLE_FOOD: usize = 350;
pub const MAX_VISIBLE_HAZARDS: usize = 48;
pub const FAR_RESERVE_FRACTION: f64 = 0.2;
pub const LEADERBOARD_SIZE: usize = 10;

pub const BOT_COUNT: usize = 12;
pub const BOT_WALL_MARGIN: f64 = 0.85;
pub const BOT_AVOID_DISTANCE: f64 = 90.0;
pub const BOT_BOOST_DISTANCE: f64 = 260.0;
pub const BOT_MIN_SCORE_TO_BOOST: i64 = 40;
pub const BOT_CAST_RANGE: f64 = 320.0;
