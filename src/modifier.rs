//! Reward modifiers: companion abilities and crafted tools.
//!
//! [`apply_modifiers`] runs the companion first and then each tool in the
//! order given. A modifier fires only when its [`Applicability`] matches the
//! current location and resource category. Draws: exactly one per applicable
//! `RarityUpgradeChance` modifier, in application order. Quantity effects
//! never draw.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::reward::RewardOutcome;
use crate::rng::RandomSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EffectKind {
    /// Add `magnitude` to the quantity.
    FlatQuantity,
    /// Add `magnitude`% of the base quantity, floored, at least 1.
    PercentQuantity,
    /// `magnitude`% chance to raise rarity one tier.
    RarityUpgradeChance,
}

/// Where a modifier applies. An empty list places no restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Applicability {
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
}

impl Applicability {
    pub fn anywhere() -> Self {
        Self::default()
    }

    pub fn matches(&self, location: &str, category: &str) -> bool {
        let location_ok = self.locations.is_empty() || self.locations.iter().any(|l| l == location);
        let category_ok =
            self.categories.is_empty() || self.categories.iter().any(|c| c == category);
        location_ok && category_ok
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    pub id: String,
    pub name: String,
    pub kind: EffectKind,
    pub magnitude: u32,
    #[serde(flatten)]
    pub applicability: Applicability,
}

impl Modifier {
    pub fn new(id: &str, name: &str, kind: EffectKind, magnitude: u32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            magnitude,
            applicability: Applicability::anywhere(),
        }
    }

    pub fn only_at(mut self, location: &str) -> Self {
        self.applicability.locations.push(location.to_string());
        self
    }

    pub fn only_for(mut self, category: &str) -> Self {
        self.applicability.categories.push(category.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifiedReward {
    pub outcome: RewardOutcome,
    /// One entry per modifier that changed the outcome, in application order.
    pub bonus_log: Vec<String>,
    /// Set when at least one rarity upgrade actually raised the tier.
    pub rarity_upgraded: bool,
}

fn percent_bonus(base_quantity: u32, percent: u32) -> u32 {
    if base_quantity == 0 || percent == 0 {
        return 0;
    }
    let bonus = u64::from(base_quantity) * u64::from(percent) / 100;
    u32::try_from(bonus).unwrap_or(u32::MAX).max(1)
}

pub fn apply_modifiers<R: RandomSource + ?Sized>(
    base: &RewardOutcome,
    companion: Option<&Modifier>,
    tools: &[Modifier],
    location: &str,
    category: &str,
    rng: &mut R,
) -> ModifiedReward {
    let mut result = ModifiedReward {
        outcome: base.clone(),
        bonus_log: Vec::new(),
        rarity_upgraded: false,
    };
    let Some(resource_id) = base.resource_id.as_deref() else {
        return result;
    };
    let base_quantity = base.quantity;

    for modifier in companion.into_iter().chain(tools) {
        if !modifier.applicability.matches(location, category) {
            continue;
        }
        let outcome = &mut result.outcome;
        match modifier.kind {
            EffectKind::FlatQuantity => {
                if modifier.magnitude > 0 {
                    outcome.quantity = outcome.quantity.saturating_add(modifier.magnitude);
                    result
                        .bonus_log
                        .push(format!("{}: +{} {resource_id}", modifier.name, modifier.magnitude));
                }
            }
            EffectKind::PercentQuantity => {
                let bonus = percent_bonus(base_quantity, modifier.magnitude);
                if bonus > 0 {
                    outcome.quantity = outcome.quantity.saturating_add(bonus);
                    result.bonus_log.push(format!(
                        "{}: +{bonus} {resource_id} (+{}%)",
                        modifier.name, modifier.magnitude
                    ));
                }
            }
            EffectKind::RarityUpgradeChance => {
                let chance = f64::from(modifier.magnitude.min(100)) / 100.0;
                let roll = rng.next_f64();
                if roll >= chance {
                    debug!(modifier = %modifier.id, roll, "rarity upgrade missed");
                    continue;
                }
                if let Some(next) = outcome.rarity.and_then(|r| r.upgraded()) {
                    outcome.rarity = Some(next);
                    result.rarity_upgraded = true;
                    result
                        .bonus_log
                        .push(format!("{}: rarity upgraded to {next}", modifier.name));
                }
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reward::Rarity;
    use crate::rng::FixedSequence;

    fn wood(quantity: u32, rarity: Rarity) -> RewardOutcome {
        RewardOutcome::found("wood", quantity, rarity)
    }

    #[test]
    fn flat_tool_on_matching_category() {
        let axe = Modifier::new("axe", "Stone Axe", EffectKind::FlatQuantity, 1).only_for("tree");
        let mut rng = FixedSequence::new(vec![]);
        let result = apply_modifiers(&wood(2, Rarity::Common), None, &[axe], "forest", "tree", &mut rng);
        assert_eq!(result.outcome.quantity, 3);
        assert_eq!(result.outcome.rarity, Some(Rarity::Common));
        assert_eq!(result.bonus_log, vec!["Stone Axe: +1 wood".to_string()]);
        assert_eq!(rng.consumed(), 0);
    }

    #[test]
    fn non_matching_modifier_is_skipped() {
        let pick = Modifier::new("pick", "Pickaxe", EffectKind::FlatQuantity, 2).only_for("rock");
        let net = Modifier::new("net", "Net", EffectKind::RarityUpgradeChance, 100).only_at("river");
        let mut rng = FixedSequence::new(vec![0.0]);
        let result =
            apply_modifiers(&wood(2, Rarity::Common), None, &[pick, net], "forest", "tree", &mut rng);
        assert_eq!(result.outcome, wood(2, Rarity::Common));
        assert!(result.bonus_log.is_empty());
        assert_eq!(rng.consumed(), 0);
    }

    #[test]
    fn percent_uses_original_base() {
        let fox = Modifier::new("fox", "Fox", EffectKind::PercentQuantity, 50);
        let flat = Modifier::new("saw", "Saw", EffectKind::FlatQuantity, 10);
        let basket = Modifier::new("basket", "Basket", EffectKind::PercentQuantity, 50);
        let mut rng = FixedSequence::new(vec![]);
        let result = apply_modifiers(
            &wood(4, Rarity::Common),
            Some(&fox),
            &[flat, basket],
            "forest",
            "tree",
            &mut rng,
        );
        // 4 + 2 + 10 + 2, not 4 + 2 + 10 + 8
        assert_eq!(result.outcome.quantity, 18);
        assert_eq!(result.bonus_log.len(), 3);
        assert!(result.bonus_log[0].starts_with("Fox"));
    }

    #[test]
    fn small_percent_rounds_up_to_one() {
        let charm = Modifier::new("charm", "Charm", EffectKind::PercentQuantity, 10);
        let mut rng = FixedSequence::new(vec![]);
        let result = apply_modifiers(&wood(1, Rarity::Common), None, &[charm], "forest", "tree", &mut rng);
        assert_eq!(result.outcome.quantity, 2);
    }

    #[test]
    fn rarity_upgrade_advances_one_tier() {
        let lens = Modifier::new("lens", "Lens", EffectKind::RarityUpgradeChance, 30);
        let mut rng = FixedSequence::new(vec![0.29]);
        let result = apply_modifiers(&wood(1, Rarity::Rare), None, &[lens], "forest", "tree", &mut rng);
        assert_eq!(result.outcome.rarity, Some(Rarity::VeryRare));
        assert!(result.rarity_upgraded);
        assert_eq!(result.bonus_log, vec!["Lens: rarity upgraded to very rare".to_string()]);
    }

    #[test]
    fn rarity_upgrade_miss_draws_but_changes_nothing() {
        let lens = Modifier::new("lens", "Lens", EffectKind::RarityUpgradeChance, 30);
        let mut rng = FixedSequence::new(vec![0.3]);
        let result = apply_modifiers(&wood(1, Rarity::Rare), None, &[lens], "forest", "tree", &mut rng);
        assert_eq!(result.outcome.rarity, Some(Rarity::Rare));
        assert!(!result.rarity_upgraded);
        assert!(result.bonus_log.is_empty());
        assert_eq!(rng.consumed(), 1);
    }

    #[test]
    fn legendary_stays_legendary() {
        let lens = Modifier::new("lens", "Lens", EffectKind::RarityUpgradeChance, 100);
        let mut rng = FixedSequence::new(vec![0.0]);
        let result =
            apply_modifiers(&wood(1, Rarity::Legendary), None, &[lens], "forest", "tree", &mut rng);
        assert_eq!(result.outcome.rarity, Some(Rarity::Legendary));
        assert!(!result.rarity_upgraded);
        assert!(result.bonus_log.is_empty());
    }

    #[test]
    fn nothing_found_is_never_fabricated() {
        let fox = Modifier::new("fox", "Fox", EffectKind::FlatQuantity, 5);
        let lens = Modifier::new("lens", "Lens", EffectKind::RarityUpgradeChance, 100);
        let mut rng = FixedSequence::new(vec![0.0]);
        let result = apply_modifiers(
            &RewardOutcome::nothing(),
            Some(&fox),
            &[lens],
            "forest",
            "tree",
            &mut rng,
        );
        assert_eq!(result.outcome, RewardOutcome::nothing());
        assert!(result.bonus_log.is_empty());
        assert_eq!(rng.consumed(), 0);
    }

    #[test]
    fn companion_runs_before_tools() {
        let owl = Modifier::new("owl", "Owl", EffectKind::RarityUpgradeChance, 40);
        let lens = Modifier::new("lens", "Lens", EffectKind::RarityUpgradeChance, 80);
        let base = wood(1, Rarity::Common);

        let mut rng = FixedSequence::new(vec![0.5, 0.1]);
        let companion_first =
            apply_modifiers(&base, Some(&owl), std::slice::from_ref(&lens), "forest", "tree", &mut rng);

        let mut rng = FixedSequence::new(vec![0.5, 0.1]);
        let tools_first = apply_modifiers(&base, None, &[lens, owl], "forest", "tree", &mut rng);

        assert_eq!(companion_first.outcome.rarity, Some(Rarity::Rare));
        assert_eq!(companion_first.bonus_log, vec!["Lens: rarity upgraded to rare".to_string()]);
        assert_eq!(tools_first.outcome.rarity, Some(Rarity::VeryRare));
        assert_ne!(companion_first, tools_first);
    }

    #[test]
    fn modifier_toml_shape() {
        let m: Modifier = toml::from_str(
            r#"
            id = "axe"
            name = "Stone Axe"
            kind = "flat-quantity"
            magnitude = 1
            categories = ["tree"]
            "#,
        )
        .unwrap();
        assert_eq!(m.kind, EffectKind::FlatQuantity);
        assert!(m.applicability.matches("anywhere", "tree"));
        assert!(!m.applicability.matches("anywhere", "rock"));
    }
}
