//! Injected identifier/number table for classes, skins, skills and mutations.

use super::skills::SkillId;
use super::types::WormClass;
use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillMode {
    Instant,
    Hold,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillDef {
    pub id: SkillId,
    pub mode: SkillMode,
    pub cooldown_ms: i64,
    #[serde(default)]
    pub duration_ms: i64,
    /// Hold skills: how long a continuous hold takes to spend a full gauge.
    #[serde(default)]
    pub drain_ms: i64,
    #[serde(default)]
    pub radius: f64,
    #[serde(default)]
    pub strength: f64,
    #[serde(default)]
    pub range: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDef {
    pub class: WormClass,
    pub default_skill: SkillId,
    #[serde(default)]
    pub glass: bool,
    #[serde(default)]
    pub reward_on_kill: bool,
    #[serde(default)]
    pub tier2_perk: Option<String>,
    pub ultimate: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkinDef {
    pub id: String,
    pub class: WormClass,
    pub color: String,
    #[serde(default)]
    pub skill: Option<SkillId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationPool {
    Shared,
    Class,
    Ultimate,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MutationEffect {
    Speed { per_stack: f64 },
    Turn { per_stack: f64 },
    Magnet { radius_per_stack: f64 },
    Cooldown { per_stack: f64 },
    FoodValue { per_stack: f64 },
    BoostEfficiency { per_stack: f64 },
    Armor { stacks: u32 },
    GrantSkill { skill: SkillId },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationDef {
    pub id: String,
    pub pool: MutationPool,
    pub max_stacks: u32,
    pub effect: MutationEffect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierThreshold {
    pub threshold: i64,
    pub offers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tuning {
    pub skills: Vec<SkillDef>,
    pub classes: Vec<ClassDef>,
    pub skins: Vec<SkinDef>,
    pub mutations: Vec<MutationDef>,
    pub tiers: [TierThreshold; 3],
}

impl Tuning {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let tuning: Tuning = serde_json::from_str(&raw)?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn skill(&self, id: SkillId) -> Option<&SkillDef> {
        self.skills.iter().find(|skill| skill.id == id)
    }

    pub fn class(&self, class: WormClass) -> Option<&ClassDef> {
        self.classes.iter().find(|def| def.class == class)
    }

    pub fn skin(&self, id: &str) -> Option<&SkinDef> {
        self.skins.iter().find(|skin| skin.id == id)
    }

    pub fn default_skin(&self, class: WormClass) -> Option<&SkinDef> {
        self.skins.iter().find(|skin| skin.class == class)
    }

    pub fn mutation(&self, id: &str) -> Option<&MutationDef> {
        self.mutations.iter().find(|def| def.id == id)
    }

    /// The skin decides the class. An unknown skin falls back to the default skin of
    /// the requested class (or the first class when none was requested).
    pub fn resolve_skin(&self, class: Option<WormClass>, skin: Option<&str>) -> Option<&SkinDef> {
        if let Some(found) = skin.and_then(|id| self.skin(id)) {
            return Some(found);
        }
        let class = class.unwrap_or(WormClass::ALL[0]);
        self.default_skin(class).or_else(|| self.skins.first())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: String| Err(ConfigError::Invalid(message));

        let mut seen = HashSet::new();
        for skill in &self.skills {
            if !seen.insert(skill.id) {
                return invalid(format!("duplicate skill {:?}", skill.id));
            }
            if skill.cooldown_ms <= 0 {
                return invalid(format!("skill {:?} needs a positive cooldown", skill.id));
            }
            if skill.mode == SkillMode::Hold && skill.drain_ms <= 0 {
                return invalid(format!("hold skill {:?} needs a positive drain window", skill.id));
            }
        }

        for class in WormClass::ALL {
            let Some(def) = self.class(class) else {
                return invalid(format!("class {class:?} missing"));
            };
            if self.skill(def.default_skill).is_none() {
                return invalid(format!("class {class:?} default skill unknown"));
            }
            match self.mutation(&def.ultimate) {
                Some(ultimate) if ultimate.pool == MutationPool::Ultimate => {}
                _ => {
                    return invalid(format!("class {class:?} ultimate must be an ultimate mutation"))
                }
            }
            if let Some(perk) = &def.tier2_perk {
                match self.mutation(perk) {
                    Some(perk) if perk.pool == MutationPool::Class => {}
                    _ => {
                        let message =
                            format!("class {class:?} tier-2 perk must be a class mutation");
                        return invalid(message);
                    }
                }
            }
            if self.default_skin(class).is_none() {
                return invalid(format!("class {class:?} has no skin"));
            }
        }

        for skin in &self.skins {
            if let Some(skill) = skin.skill {
                if self.skill(skill).is_none() {
                    return invalid(format!("skin {} references unknown skill", skin.id));
                }
            }
        }

        for mutation in &self.mutations {
            if mutation.max_stacks == 0 {
                return invalid(format!("mutation {} has zero max stacks", mutation.id));
            }
            if let MutationEffect::GrantSkill { skill } = mutation.effect {
                if self.skill(skill).is_none() {
                    return invalid(format!("mutation {} grants unknown skill", mutation.id));
                }
            }
        }

        let mut previous = 0;
        for tier in &self.tiers {
            if tier.offers == 0 {
                return invalid("every tier needs at least one offer".to_string());
            }
            if tier.threshold - previous < tier.offers as i64 {
                return invalid(format!(
                    "threshold {} too close to {} for {} offers",
                    tier.threshold, previous, tier.offers
                ));
            }
            previous = tier.threshold;
        }
        Ok(())
    }
}

fn skill(id: SkillId, mode: SkillMode, cooldown_ms: i64, duration_ms: i64) -> SkillDef {
    SkillDef {
        id,
        mode,
        cooldown_ms,
        duration_ms,
        drain_ms: 0,
        radius: 0.0,
        strength: 0.0,
        range: 0.0,
    }
}

fn skin(id: &str, class: WormClass, color: &str, skill: Option<SkillId>) -> SkinDef {
    SkinDef {
        id: id.to_string(),
        class,
        color: color.to_string(),
        skill,
    }
}

fn mutation(id: &str, pool: MutationPool, max_stacks: u32, effect: MutationEffect) -> MutationDef {
    MutationDef {
        id: id.to_string(),
        pool,
        max_stacks,
        effect,
    }
}

impl Default for Tuning {
    fn default() -> Self {
        use MutationEffect as E;
        use MutationPool::{Class, Shared, Ultimate};
        use SkillMode::{Hold, Instant};
        use WormClass::{Arcanist, Bulwark, Reaper, Striker, Wisp};

        let skills = vec![
            skill(SkillId::Dash, Instant, 6000, 700),
            SkillDef {
                drain_ms: 4000,
                ..skill(SkillId::Cloak, Hold, 8000, 0)
            },
            skill(SkillId::Phase, Instant, 9000, 1500),
            skill(SkillId::Thorns, Instant, 10_000, 2500),
            SkillDef {
                radius: 110.0,
                range: 500.0,
                ..skill(SkillId::GasCloud, Instant, 7000, 6000)
            },
            SkillDef {
                radius: 140.0,
                range: 500.0,
                ..skill(SkillId::IceZone, Instant, 7000, 5000)
            },
            SkillDef {
                radius: 260.0,
                strength: 220.0,
                range: 600.0,
                ..skill(SkillId::BlackHole, Instant, 14_000, 4500)
            },
            SkillDef {
                radius: 220.0,
                strength: 140.0,
                ..skill(SkillId::Shockwave, Instant, 8000, 150)
            },
            SkillDef {
                radius: 220.0,
                strength: 110.0,
                ..skill(SkillId::Implode, Instant, 8000, 150)
            },
            SkillDef {
                radius: 18.0,
                range: 650.0,
                ..skill(SkillId::Lightning, Instant, 6000, 200)
            },
            skill(SkillId::StaticField, Instant, 9000, 2000),
            skill(SkillId::Rewind, Instant, 12_000, 350),
            skill(SkillId::Decoy, Instant, 9000, 5000),
        ];

        let classes = vec![
            ClassDef {
                class: Bulwark,
                default_skill: SkillId::Shockwave,
                glass: false,
                reward_on_kill: false,
                tier2_perk: Some("plating".to_string()),
                ultimate: "bulwark_thorns".to_string(),
            },
            ClassDef {
                class: Striker,
                default_skill: SkillId::Dash,
                glass: false,
                reward_on_kill: false,
                tier2_perk: Some("adrenaline".to_string()),
                ultimate: "striker_implode".to_string(),
            },
            ClassDef {
                class: Wisp,
                default_skill: SkillId::Cloak,
                glass: true,
                reward_on_kill: false,
                tier2_perk: Some("ethereal".to_string()),
                ultimate: "wisp_phase".to_string(),
            },
            ClassDef {
                class: Reaper,
                default_skill: SkillId::GasCloud,
                glass: false,
                reward_on_kill: true,
                tier2_perk: Some("harvest".to_string()),
                ultimate: "reaper_black_hole".to_string(),
            },
            ClassDef {
                class: Arcanist,
                default_skill: SkillId::Lightning,
                glass: false,
                reward_on_kill: false,
                tier2_perk: Some("chrono".to_string()),
                ultimate: "arcanist_rewind".to_string(),
            },
        ];

        let skins = vec![
            skin("bulwark_stone", Bulwark, "#8d99ae", None),
            skin("bulwark_frost", Bulwark, "#a5d8ff", Some(SkillId::IceZone)),
            skin("striker_ember", Striker, "#ff6b6b", None),
            skin("striker_volt", Striker, "#ffd166", Some(SkillId::StaticField)),
            skin("wisp_mist", Wisp, "#e5dbff", None),
            skin("wisp_echo", Wisp, "#f06595", Some(SkillId::Decoy)),
            skin("reaper_bone", Reaper, "#20c997", None),
            skin("reaper_void", Reaper, "#845ef7", Some(SkillId::BlackHole)),
            skin("arcanist_storm", Arcanist, "#4dabf7", None),
            skin("arcanist_hourglass", Arcanist, "#fcc419", Some(SkillId::Rewind)),
        ];

        let mutations = vec![
            mutation("swift", Shared, 3, E::Speed { per_stack: 0.05 }),
            mutation("agile", Shared, 3, E::Turn { per_stack: 0.08 }),
            mutation("magnet", Shared, 3, E::Magnet { radius_per_stack: 40.0 }),
            mutation("focus", Shared, 3, E::Cooldown { per_stack: 0.08 }),
            mutation("glutton", Shared, 2, E::FoodValue { per_stack: 0.15 }),
            mutation("lean", Shared, 2, E::BoostEfficiency { per_stack: 0.15 }),
            mutation("plating", Class, 3, E::Armor { stacks: 1 }),
            mutation("adrenaline", Class, 1, E::Speed { per_stack: 0.08 }),
            mutation("ethereal", Class, 1, E::Cooldown { per_stack: 0.15 }),
            mutation("harvest", Class, 1, E::FoodValue { per_stack: 0.3 }),
            mutation("chrono", Class, 1, E::Cooldown { per_stack: 0.12 }),
            mutation("bulwark_thorns", Ultimate, 1, E::GrantSkill { skill: SkillId::Thorns }),
            mutation("striker_implode", Ultimate, 1, E::GrantSkill { skill: SkillId::Implode }),
            mutation("wisp_phase", Ultimate, 1, E::GrantSkill { skill: SkillId::Phase }),
            mutation("reaper_black_hole", Ultimate, 1, E::GrantSkill { skill: SkillId::BlackHole }),
            mutation("arcanist_rewind", Ultimate, 1, E::GrantSkill { skill: SkillId::Rewind }),
        ];

        Self {
            skills,
            classes,
            skins,
            mutations,
            tiers: [
                TierThreshold {
                    threshold: 300,
                    offers: 3,
                },
                TierThreshold {
                    threshold: 1200,
                    offers: 3,
                },
                TierThreshold {
                    threshold: 3000,
                    offers: 1,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_is_valid() {
        Tuning::default().validate().expect("default tuning validates");
    }

    #[test]
    fn table_round_trips_through_json() {
        let json = serde_json::to_string(&Tuning::default()).expect("serialize");
        let parsed: Tuning = serde_json::from_str(&json).expect("parse");
        parsed.validate().expect("parsed tuning validates");
        assert_eq!(parsed.skins.len(), Tuning::default().skins.len());
    }

    #[test]
    fn unknown_skin_falls_back_to_requested_class() {
        let tuning = Tuning::default();
        let skin = tuning
            .resolve_skin(Some(WormClass::Reaper), Some("no_such_skin"))
            .expect("fallback skin");
        assert_eq!(skin.class, WormClass::Reaper);
        let skin = tuning
            .resolve_skin(Some(WormClass::Reaper), Some("wisp_echo"))
            .expect("explicit skin");
        assert_eq!(skin.class, WormClass::Wisp);
    }

    #[test]
    fn crowded_thresholds_are_rejected() {
        let mut tuning = Tuning::default();
        tuning.tiers[1].threshold = tuning.tiers[0].threshold + 1;
        assert!(matches!(tuning.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn hold_skill_without_drain_is_rejected() {
        let mut tuning = Tuning::default();
        for skill in &mut tuning.skills {
            if skill.id == SkillId::Cloak {
                skill.drain_ms = 0;
            }
        }
        assert!(tuning.validate().is_err());
    }
}
