//! Score milestones, mutation offers and the perks acquired mutations grant.

use super::constants::OFFER_SIZE;
use super::tuning::{MutationEffect, MutationPool, TierThreshold, Tuning};
use super::types::{PendingOffer, SkillSlot, Worm};
use rand::seq::SliceRandom;
use rand::Rng;

/// Multipliers derived from a worm's acquired mutations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Perks {
    pub speed_mult: f64,
    pub turn_mult: f64,
    pub magnet_radius: f64,
    pub cooldown_mult: f64,
    pub food_value_mult: f64,
    pub boost_drain_mult: f64,
}

impl Default for Perks {
    fn default() -> Self {
        Self {
            speed_mult: 1.0,
            turn_mult: 1.0,
            magnet_radius: 0.0,
            cooldown_mult: 1.0,
            food_value_mult: 1.0,
            boost_drain_mult: 1.0,
        }
    }
}

impl Perks {
    pub fn for_worm(worm: &Worm, tuning: &Tuning) -> Self {
        let mut perks = Perks::default();
        let mut cooldown_cut = 0.0;
        let mut boost_cut = 0.0;
        for id in &worm.mutations {
            let Some(def) = tuning.mutation(id) else { continue };
            match def.effect {
                MutationEffect::Speed { per_stack } => perks.speed_mult += per_stack,
                MutationEffect::Turn { per_stack } => perks.turn_mult += per_stack,
                MutationEffect::Magnet { radius_per_stack } => {
                    perks.magnet_radius += radius_per_stack
                }
                MutationEffect::Cooldown { per_stack } => cooldown_cut += per_stack,
                MutationEffect::FoodValue { per_stack } => perks.food_value_mult += per_stack,
                MutationEffect::BoostEfficiency { per_stack } => boost_cut += per_stack,
                MutationEffect::Armor { .. } | MutationEffect::GrantSkill { .. } => {}
            }
        }
        perks.cooldown_mult = (1.0 - cooldown_cut).max(0.4);
        perks.boost_drain_mult = (1.0 - boost_cut).max(0.3);
        perks
    }
}

/// Splits each `[previous, threshold]` band into the tier's offer count. Cut points
/// are rounded and the last cut of every band lands exactly on its threshold.
pub fn build_schedule(tiers: &[TierThreshold; 3]) -> Vec<i64> {
    let mut schedule = Vec::with_capacity(tiers.iter().map(|tier| tier.offers).sum());
    let mut previous = 0i64;
    for tier in tiers {
        let span = (tier.threshold - previous) as f64;
        let offers = tier.offers.max(1);
        for k in 1..=offers {
            let cut = if k == offers {
                tier.threshold
            } else {
                previous + (span * k as f64 / offers as f64).round() as i64
            };
            schedule.push(cut);
        }
        previous = tier.threshold;
    }
    schedule
}

pub fn tier_for_milestone(tiers: &[TierThreshold; 3], milestone: i64) -> u8 {
    for (index, tier) in tiers.iter().enumerate() {
        if milestone <= tier.threshold {
            return index as u8 + 1;
        }
    }
    tiers.len() as u8
}

pub fn next_milestone(worm: &Worm, schedule: &[i64]) -> Option<i64> {
    schedule.get(worm.progress.offer_index).copied()
}

/// Tier of the last milestone the worm has passed, 0 before the first.
pub fn stage(worm: &Worm, schedule: &[i64], tiers: &[TierThreshold; 3]) -> u8 {
    let passed = worm.progress.offer_index;
    if passed == 0 {
        return 0;
    }
    schedule
        .get(passed - 1)
        .map(|milestone| tier_for_milestone(tiers, *milestone))
        .unwrap_or(0)
}

/// Advances past the next milestone once the score reaches it. The index moves on
/// whether or not an offer results; nothing happens while an offer is pending.
pub fn check_milestone<R: Rng>(
    worm: &mut Worm,
    schedule: &[i64],
    tuning: &Tuning,
    rng: &mut R,
) -> Option<PendingOffer> {
    if worm.progress.pending.is_some() {
        return None;
    }
    let milestone = next_milestone(worm, schedule)?;
    if worm.score < milestone {
        return None;
    }
    let index = worm.progress.offer_index;
    worm.progress.offer_index += 1;
    let offer = build_offer(worm, index, schedule, tuning, rng)?;
    worm.progress.pending = Some(offer.clone());
    Some(offer)
}

pub fn build_offer<R: Rng>(
    worm: &Worm,
    index: usize,
    schedule: &[i64],
    tuning: &Tuning,
    rng: &mut R,
) -> Option<PendingOffer> {
    let milestone = *schedule.get(index)?;
    let tier = tier_for_milestone(&tuning.tiers, milestone);
    let class_def = tuning.class(worm.class)?;
    let below_max = |id: &str| {
        tuning
            .mutation(id)
            .map(|def| worm.mutation_stacks(id) < def.max_stacks)
            .unwrap_or(false)
    };

    if index + 1 == schedule.len() {
        if !below_max(&class_def.ultimate) {
            return None;
        }
        return Some(PendingOffer {
            tier,
            options: vec![class_def.ultimate.clone()],
        });
    }

    let mut options: Vec<String> = Vec::with_capacity(OFFER_SIZE);
    let tier2_unlock = tuning.tiers[0].offers;
    if index == tier2_unlock {
        if let Some(perk) = &class_def.tier2_perk {
            if below_max(perk) {
                options.push(perk.clone());
            }
        }
    }

    let pool: Vec<&str> = tuning
        .mutations
        .iter()
        .filter(|def| def.pool == MutationPool::Shared)
        .map(|def| def.id.as_str())
        .filter(|id| below_max(id))
        .collect();
    let wanted = OFFER_SIZE.saturating_sub(options.len());
    options.extend(pool.choose_multiple(rng, wanted).map(|id| id.to_string()));

    if options.is_empty() {
        return None;
    }
    Some(PendingOffer { tier, options })
}

/// Applies a choice from the pending offer. Anything not in the offer is ignored.
pub fn apply_choice(worm: &mut Worm, id: &str, tuning: &Tuning, now: i64) -> bool {
    let Some(offer) = &worm.progress.pending else { return false };
    if !offer.options.iter().any(|option| option == id) {
        return false;
    }
    worm.progress.pending = None;
    let Some(def) = tuning.mutation(id) else { return false };
    if worm.mutation_stacks(id) >= def.max_stacks {
        return false;
    }
    worm.mutations.push(def.id.clone());
    match def.effect {
        MutationEffect::Armor { stacks } => worm.armor_stacks += stacks,
        MutationEffect::GrantSkill { skill } => {
            worm.skill = SkillSlot {
                ready_at: now,
                granted: Some(skill),
                ..SkillSlot::default()
            };
        }
        _ => {}
    }
    true
}

/// Uniform pick used by scripted controllers.
pub fn pick_random<R: Rng>(offer: &PendingOffer, rng: &mut R) -> Option<String> {
    offer.options.choose(rng).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::skills::SkillId;
    use crate::game::types::WormClass;
    use crate::game::world::tests::make_worm;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn tiers(a: (i64, usize), b: (i64, usize), c: (i64, usize)) -> [TierThreshold; 3] {
        [
            TierThreshold {
                threshold: a.0,
                offers: a.1,
            },
            TierThreshold {
                threshold: b.0,
                offers: b.1,
            },
            TierThreshold {
                threshold: c.0,
                offers: c.1,
            },
        ]
    }

    #[test]
    fn schedule_is_strictly_increasing_and_ends_on_threshold() {
        for table in [
            tiers((300, 3), (1200, 3), (3000, 1)),
            tiers((100, 7), (250, 4), (1000, 3)),
            tiers((10, 10), (11, 1), (20, 9)),
        ] {
            let schedule = build_schedule(&table);
            let expected_len: usize = table.iter().map(|tier| tier.offers).sum();
            assert_eq!(schedule.len(), expected_len);
            assert!(schedule.windows(2).all(|pair| pair[0] < pair[1]));
            assert_eq!(*schedule.last().expect("non-empty"), table[2].threshold);
        }
    }

    #[test]
    fn default_schedule_cut_points() {
        let schedule = build_schedule(&Tuning::default().tiers);
        assert_eq!(schedule, vec![100, 200, 300, 600, 900, 1200, 3000]);
    }

    #[test]
    fn milestone_on_threshold_belongs_to_lower_tier() {
        let tuning = Tuning::default();
        assert_eq!(tier_for_milestone(&tuning.tiers, 300), 1);
        assert_eq!(tier_for_milestone(&tuning.tiers, 301), 2);
        assert_eq!(tier_for_milestone(&tuning.tiers, 3000), 3);
    }

    #[test]
    fn tier2_unlock_offers_class_perk_first() {
        let tuning = Tuning::default();
        let schedule = build_schedule(&tuning.tiers);
        let mut rng = StdRng::seed_from_u64(7);
        let mut worm = make_worm(1, 600);
        worm.class = WormClass::Bulwark;
        worm.progress.offer_index = 3;

        let offer = check_milestone(&mut worm, &schedule, &tuning, &mut rng).expect("offer");
        assert_eq!(offer.tier, 2);
        assert_eq!(offer.options[0], "plating");
        assert_eq!(offer.options.len(), OFFER_SIZE);
        assert_eq!(worm.progress.offer_index, 4);
        assert_eq!(worm.progress.pending.as_ref(), Some(&offer));
    }

    #[test]
    fn offers_never_repeat_and_skip_maxed_perks() {
        let tuning = Tuning::default();
        let schedule = build_schedule(&tuning.tiers);
        let mut rng = StdRng::seed_from_u64(11);
        let mut worm = make_worm(1, 0);
        for _ in 0..3 {
            worm.mutations.push("swift".to_string());
        }
        for seed_index in 0..3 {
            let offer =
                build_offer(&worm, seed_index, &schedule, &tuning, &mut rng).expect("offer");
            assert!(!offer.options.iter().any(|id| id == "swift"));
            let mut unique = offer.options.clone();
            unique.sort();
            unique.dedup();
            assert_eq!(unique.len(), offer.options.len());
        }
    }

    #[test]
    fn exhausted_pool_consumes_milestone_silently() {
        let mut tuning = Tuning::default();
        tuning.mutations.retain(|def| def.pool != MutationPool::Shared);
        let schedule = build_schedule(&tuning.tiers);
        let mut rng = StdRng::seed_from_u64(3);
        let mut worm = make_worm(1, 150);
        assert!(check_milestone(&mut worm, &schedule, &tuning, &mut rng).is_none());
        assert_eq!(worm.progress.offer_index, 1);
        assert!(worm.progress.pending.is_none());
    }

    #[test]
    fn pending_offer_blocks_further_milestones() {
        let tuning = Tuning::default();
        let schedule = build_schedule(&tuning.tiers);
        let mut rng = StdRng::seed_from_u64(5);
        let mut worm = make_worm(1, 2500);
        assert!(check_milestone(&mut worm, &schedule, &tuning, &mut rng).is_some());
        assert!(check_milestone(&mut worm, &schedule, &tuning, &mut rng).is_none());
        assert_eq!(worm.progress.offer_index, 1);
    }

    #[test]
    fn final_milestone_offers_only_the_ultimate() {
        let tuning = Tuning::default();
        let schedule = build_schedule(&tuning.tiers);
        let mut rng = StdRng::seed_from_u64(9);
        let mut worm = make_worm(1, 3000);
        worm.class = WormClass::Reaper;
        worm.progress.offer_index = schedule.len() - 1;
        let offer = check_milestone(&mut worm, &schedule, &tuning, &mut rng).expect("offer");
        assert_eq!(offer.options, vec!["reaper_black_hole".to_string()]);
        assert_eq!(offer.tier, 3);

        assert!(apply_choice(&mut worm, "reaper_black_hole", &tuning, 5000));
        assert_eq!(worm.skill.granted, Some(SkillId::BlackHole));

        worm.progress.offer_index = schedule.len() - 1;
        assert!(check_milestone(&mut worm, &schedule, &tuning, &mut rng).is_none());
    }

    #[test]
    fn choice_outside_offer_is_ignored() {
        let tuning = Tuning::default();
        let mut worm = make_worm(1, 0);
        worm.progress.pending = Some(PendingOffer {
            tier: 1,
            options: vec!["swift".to_string(), "agile".to_string()],
        });
        assert!(!apply_choice(&mut worm, "magnet", &tuning, 0));
        assert!(worm.progress.pending.is_some());
        assert!(apply_choice(&mut worm, "agile", &tuning, 0));
        assert!(worm.progress.pending.is_none());
        assert_eq!(worm.mutations, vec!["agile".to_string()]);
    }

    #[test]
    fn armor_perk_adds_stack() {
        let tuning = Tuning::default();
        let mut worm = make_worm(1, 0);
        worm.progress.pending = Some(PendingOffer {
            tier: 2,
            options: vec!["plating".to_string()],
        });
        assert!(apply_choice(&mut worm, "plating", &tuning, 0));
        assert_eq!(worm.armor_stacks, 1);
    }

    #[test]
    fn perks_sum_per_stack() {
        let tuning = Tuning::default();
        let mut worm = make_worm(1, 0);
        worm.mutations = vec!["swift".into(), "swift".into(), "focus".into()];
        let perks = Perks::for_worm(&worm, &tuning);
        assert!((perks.speed_mult - 1.1).abs() < 1e-12);
        assert!((perks.cooldown_mult - 0.92).abs() < 1e-12);
    }
}
