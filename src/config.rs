//! Game configuration: reward tables, modifiers and session defaults.
//!
//! Every section of the TOML file is optional and falls back to the built-in
//! defaults. Structural problems (duplicate ids, no locations) are errors;
//! dangling references and odd probabilities are only logged, because the
//! reward path already degrades them to "nothing found" / "no bonus".

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;
use crate::modifier::{EffectKind, Modifier};
use crate::reward::{LocationDef, QualityProfiles, ResourceDef, RewardTables};
use crate::scheduler::RecallQuality;
use crate::session::Loadout;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub location: String,
    pub companion: Option<String>,
    /// Tool ids, applied in this order.
    pub tools: Vec<String>,
    pub card_limit: Option<usize>,
    pub seed: Option<u64>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            location: "forest".into(),
            companion: Some("fox".into()),
            tools: vec!["stone_axe".into(), "lucky_charm".into()],
            card_limit: None,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub rewards: RewardTables,
    pub companions: Vec<Modifier>,
    pub tools: Vec<Modifier>,
    pub session: SessionSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rewards: RewardTables::default(),
            companions: default_companions(),
            tools: default_tools(),
            session: SessionSettings::default(),
        }
    }
}

fn default_companions() -> Vec<Modifier> {
    vec![
        Modifier::new("fox", "Fox", EffectKind::PercentQuantity, 50),
        Modifier::new("owl", "Owl", EffectKind::RarityUpgradeChance, 15),
        Modifier::new("otter", "Otter", EffectKind::FlatQuantity, 2).only_at("river"),
    ]
}

fn default_tools() -> Vec<Modifier> {
    vec![
        Modifier::new("stone_axe", "Stone Axe", EffectKind::FlatQuantity, 1).only_for("tree"),
        Modifier::new("iron_pickaxe", "Iron Pickaxe", EffectKind::FlatQuantity, 2)
            .only_for("rock")
            .only_for("ore"),
        Modifier::new("fishing_net", "Fishing Net", EffectKind::PercentQuantity, 100)
            .only_at("river"),
        Modifier::new("lucky_charm", "Lucky Charm", EffectKind::RarityUpgradeChance, 10),
    ]
}

/// TOML representation; absent sections keep their defaults.
#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    resources: Option<Vec<ResourceDef>>,
    locations: Option<Vec<LocationDef>>,
    qualities: Option<QualityProfiles>,
    companions: Option<Vec<Modifier>>,
    tools: Option<Vec<Modifier>>,
    #[serde(default)]
    session: SessionSettings,
}

fn check_unique<'a>(kind: &str, ids: impl Iterator<Item = &'a str>) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(ConfigError::Invalid(format!("duplicate {kind} id: {id}")));
        }
    }
    Ok(())
}

impl Config {
    pub fn load_from_toml(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let raw: TomlConfig = toml::from_str(content)?;
        let defaults = Config::default();
        let config = Config {
            rewards: RewardTables {
                resources: raw.resources.unwrap_or(defaults.rewards.resources),
                locations: raw.locations.unwrap_or(defaults.rewards.locations),
                qualities: raw.qualities.unwrap_or(defaults.rewards.qualities),
            },
            companions: raw.companions.unwrap_or(defaults.companions),
            tools: raw.tools.unwrap_or(defaults.tools),
            session: raw.session,
        };
        config.validate()?;
        for problem in config.diagnostics() {
            warn!("config: {problem}");
        }
        Ok(config)
    }

    /// Hard errors only.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rewards.locations.is_empty() {
            return Err(ConfigError::Invalid("no locations defined".into()));
        }
        check_unique("resource", self.rewards.resources.iter().map(|r| r.id.as_str()))?;
        check_unique("location", self.rewards.locations.iter().map(|l| l.id.as_str()))?;
        check_unique("companion", self.companions.iter().map(|m| m.id.as_str()))?;
        check_unique("tool", self.tools.iter().map(|m| m.id.as_str()))?;
        Ok(())
    }

    /// Soft problems that the reward path tolerates but that are probably
    /// mistakes.
    pub fn diagnostics(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let tables = &self.rewards;

        for loc in &tables.locations {
            for drop in &loc.drops {
                if tables.resource(&drop.resource).is_none() {
                    problems.push(format!(
                        "location {} drops unknown resource {}",
                        loc.id, drop.resource
                    ));
                }
            }
            let total: f64 = loc.drops.iter().map(|d| d.chance).sum();
            if (total - 1.0).abs() > 1e-6 {
                problems.push(format!("location {} drop chances sum to {total:.3}", loc.id));
            }
        }

        for quality in RecallQuality::ALL {
            let profile = tables.qualities.get(quality);
            if !(0.0..=1.0).contains(&profile.find_chance) {
                problems.push(format!(
                    "quality {} find_chance {} outside [0, 1]",
                    quality.label(),
                    profile.find_chance
                ));
            }
            let r = &profile.rarity;
            let total = r.common + r.rare + r.very_rare + r.legendary;
            if (total - 1.0).abs() > 1e-6 {
                problems.push(format!(
                    "quality {} rarity weights sum to {total:.3}",
                    quality.label()
                ));
            }
        }

        let categories: HashSet<&str> = tables.resources.iter().map(|r| r.category.as_str()).collect();
        for m in self.companions.iter().chain(&self.tools) {
            if m.kind == EffectKind::RarityUpgradeChance && m.magnitude > 100 {
                problems.push(format!("modifier {} chance {}% capped at 100%", m.id, m.magnitude));
            }
            for loc in &m.applicability.locations {
                if tables.location(loc).is_none() {
                    problems.push(format!("modifier {} names unknown location {loc}", m.id));
                }
            }
            for cat in &m.applicability.categories {
                if !categories.contains(cat.as_str()) {
                    problems.push(format!("modifier {} names unknown category {cat}", m.id));
                }
            }
        }

        if tables.location(&self.session.location).is_none() {
            problems.push(format!("session location {} is unknown", self.session.location));
        }
        problems
    }

    /// Resolve the session's companion and tool ids. Unknown ids are logged
    /// and dropped.
    pub fn loadout(&self) -> Loadout {
        let companion = self.session.companion.as_deref().and_then(|id| {
            let found = self.companions.iter().find(|m| m.id == id).cloned();
            if found.is_none() {
                warn!(companion = id, "unknown companion, none active");
            }
            found
        });
        let tools = self
            .session
            .tools
            .iter()
            .filter_map(|id| {
                let found = self.tools.iter().find(|m| &m.id == id).cloned();
                if found.is_none() {
                    warn!(tool = %id, "unknown tool, skipped");
                }
                found
            })
            .collect();
        Loadout {
            location: self.session.location.clone(),
            companion,
            tools,
        }
    }
}
