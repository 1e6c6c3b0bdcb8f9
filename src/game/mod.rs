pub mod bots;
pub mod collision;
pub mod constants;
pub mod input;
pub mod locomotion;
pub mod math;
pub mod progression;
pub mod room;
pub mod skills;
pub mod spatial;
pub mod trail;
pub mod tuning;
pub mod types;
pub mod world;
