//! Base reward resolution.
//!
//! Each review rolls against the chosen location's drop table. The roll
//! takes at most three draws from the [`RandomSource`], in this order, and
//! stops at the first draw that ends in "nothing found":
//!
//! 1. existence: found when the draw is below the quality's `find_chance`
//! 2. resource: cumulative walk over the location's drop chances
//! 3. rarity: cumulative walk over the quality's rarity weights
//!
//! Table gaps (chances summing below one) and dangling ids resolve to
//! nothing found and are logged, never raised.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::rng::{RandomSource, pick_weighted};
use crate::scheduler::RecallQuality;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Rarity {
    Common,
    Rare,
    VeryRare,
    Legendary,
}

impl Rarity {
    pub const ALL: [Rarity; 4] = [Rarity::Common, Rarity::Rare, Rarity::VeryRare, Rarity::Legendary];

    /// The next tier up, or `None` at the top.
    pub fn upgraded(self) -> Option<Rarity> {
        match self {
            Rarity::Common => Some(Rarity::Rare),
            Rarity::Rare => Some(Rarity::VeryRare),
            Rarity::VeryRare => Some(Rarity::Legendary),
            Rarity::Legendary => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Rare => "rare",
            Rarity::VeryRare => "very rare",
            Rarity::Legendary => "legendary",
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What a single review turned up. `resource_id == None` means nothing was
/// found, and then `quantity` is 0 and `rarity` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardOutcome {
    pub resource_id: Option<String>,
    pub quantity: u32,
    pub rarity: Option<Rarity>,
}

impl RewardOutcome {
    pub fn nothing() -> Self {
        Self {
            resource_id: None,
            quantity: 0,
            rarity: None,
        }
    }

    pub fn found(resource_id: &str, quantity: u32, rarity: Rarity) -> Self {
        Self {
            resource_id: Some(resource_id.to_string()),
            quantity,
            rarity: Some(rarity),
        }
    }

    pub fn is_nothing(&self) -> bool {
        self.resource_id.is_none()
    }
}

impl fmt::Display for RewardOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.resource_id, self.rarity) {
            (Some(id), Some(rarity)) => write!(f, "{} x {id} ({rarity})", self.quantity),
            (Some(id), None) => write!(f, "{} x {id}", self.quantity),
            (None, _) => f.write_str("nothing found"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDef {
    pub id: String,
    pub name: String,
    /// Grouping that modifiers match against, e.g. "tree" or "ore".
    pub category: String,
    /// Inventory cap for this resource.
    pub max_stack: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropChance {
    pub resource: String,
    pub chance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationDef {
    pub id: String,
    pub name: String,
    pub drops: Vec<DropChance>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RarityWeights {
    #[serde(default)]
    pub common: f64,
    #[serde(default)]
    pub rare: f64,
    #[serde(default)]
    pub very_rare: f64,
    #[serde(default)]
    pub legendary: f64,
}

impl RarityWeights {
    fn as_array(&self) -> [f64; 4] {
        [self.common, self.rare, self.very_rare, self.legendary]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityProfile {
    pub find_chance: f64,
    pub quantity: u32,
    pub rarity: RarityWeights,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityProfiles {
    pub fail: QualityProfile,
    pub hard: QualityProfile,
    pub good: QualityProfile,
    pub easy: QualityProfile,
}

impl QualityProfiles {
    pub fn get(&self, quality: RecallQuality) -> &QualityProfile {
        match quality {
            RecallQuality::Fail => &self.fail,
            RecallQuality::Hard => &self.hard,
            RecallQuality::Good => &self.good,
            RecallQuality::Easy => &self.easy,
        }
    }
}

impl Default for QualityProfiles {
    fn default() -> Self {
        let profile = |find_chance, quantity, common, rare, very_rare, legendary| QualityProfile {
            find_chance,
            quantity,
            rarity: RarityWeights {
                common,
                rare,
                very_rare,
                legendary,
            },
        };
        Self {
            fail: profile(0.3, 1, 0.9, 0.1, 0.0, 0.0),
            hard: profile(0.5, 1, 0.8, 0.17, 0.03, 0.0),
            good: profile(0.8, 2, 0.65, 0.25, 0.08, 0.02),
            easy: profile(0.95, 3, 0.5, 0.3, 0.15, 0.05),
        }
    }
}

/// Resource catalog, location drop tables and per-quality roll profiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardTables {
    pub resources: Vec<ResourceDef>,
    pub locations: Vec<LocationDef>,
    pub qualities: QualityProfiles,
}

impl RewardTables {
    pub fn resource(&self, id: &str) -> Option<&ResourceDef> {
        self.resources.iter().find(|r| r.id == id)
    }

    pub fn location(&self, id: &str) -> Option<&LocationDef> {
        self.locations.iter().find(|l| l.id == id)
    }

    pub fn category_of(&self, resource_id: &str) -> Option<&str> {
        self.resource(resource_id).map(|r| r.category.as_str())
    }
}

impl Default for RewardTables {
    fn default() -> Self {
        let resource = |id: &str, name: &str, category: &str, max_stack| ResourceDef {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            max_stack,
        };
        let drop = |resource: &str, chance| DropChance {
            resource: resource.into(),
            chance,
        };
        Self {
            resources: vec![
                resource("wood", "Wood", "tree", 999),
                resource("herbs", "Herbs", "plant", 500),
                resource("stone", "Stone", "rock", 999),
                resource("iron_ore", "Iron Ore", "ore", 500),
                resource("crystal", "Crystal", "gem", 100),
                resource("fish", "Fish", "water", 300),
            ],
            locations: vec![
                LocationDef {
                    id: "forest".into(),
                    name: "Whispering Forest".into(),
                    drops: vec![drop("wood", 0.65), drop("herbs", 0.35)],
                },
                LocationDef {
                    id: "quarry".into(),
                    name: "Old Quarry".into(),
                    drops: vec![drop("stone", 0.7), drop("iron_ore", 0.25), drop("crystal", 0.05)],
                },
                LocationDef {
                    id: "river".into(),
                    name: "Silver River".into(),
                    drops: vec![drop("fish", 0.8), drop("herbs", 0.2)],
                },
            ],
            qualities: QualityProfiles::default(),
        }
    }
}

pub fn resolve_base_reward<R: RandomSource + ?Sized>(
    tables: &RewardTables,
    quality: RecallQuality,
    location: &str,
    rng: &mut R,
) -> RewardOutcome {
    let Some(loc) = tables.location(location) else {
        warn!(location, "unknown location, nothing found");
        return RewardOutcome::nothing();
    };
    let profile = tables.qualities.get(quality);

    let roll = rng.next_f64();
    if roll >= profile.find_chance {
        debug!(location, quality = quality.label(), roll, "nothing found");
        return RewardOutcome::nothing();
    }

    let chances: Vec<f64> = loc.drops.iter().map(|d| d.chance).collect();
    let roll = rng.next_f64();
    let Some(drop) = pick_weighted(roll, &chances).map(|i| &loc.drops[i]) else {
        warn!(location, roll, "drop table remainder hit, nothing found");
        return RewardOutcome::nothing();
    };

    let Some(resource) = tables.resource(&drop.resource) else {
        warn!(location, resource = %drop.resource, "drop references unknown resource");
        return RewardOutcome::nothing();
    };

    let roll = rng.next_f64();
    let Some(rarity) = pick_weighted(roll, &profile.rarity.as_array()).map(|i| Rarity::ALL[i]) else {
        warn!(quality = quality.label(), roll, "rarity table remainder hit, nothing found");
        return RewardOutcome::nothing();
    };

    debug!(location, resource = %resource.id, %rarity, quantity = profile.quantity, "base reward");
    RewardOutcome::found(&resource.id, profile.quantity, rarity)
}
