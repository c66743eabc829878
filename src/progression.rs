//! Outbound progression data: raw XP deltas per review and the study
//! streak. Levels are computed elsewhere.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::inventory::Inventory;
use crate::scheduler::RecallQuality;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum XpEventKind {
    Review,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpEvent {
    #[serde(rename = "type")]
    pub kind: XpEventKind,
    pub amount: u32,
    pub description: String,
}

impl XpEvent {
    pub fn review(quality: RecallQuality) -> Self {
        Self {
            kind: XpEventKind::Review,
            amount: quality.xp(),
            description: format!("Reviewed a card ({})", quality.label()),
        }
    }
}

/// Consecutive calendar days with at least one closed session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyStreak {
    pub current: u32,
    pub longest: u32,
    pub last_day: Option<NaiveDate>,
}

impl StudyStreak {
    pub fn record_day(&mut self, day: NaiveDate) {
        match self.last_day {
            Some(last) if last >= day => return,
            Some(last) if last.succ_opt() == Some(day) => self.current += 1,
            _ => self.current = 1,
        }
        self.last_day = Some(day);
        self.longest = self.longest.max(self.current);
    }
}

/// Everything about a learner that outlives a single session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub inventory: Inventory,
    pub streak: StudyStreak,
}
