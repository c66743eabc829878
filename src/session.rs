//! Review sessions.
//!
//! [`SessionManager`] is the only stateful piece of the core. It owns the
//! learner's cards, progress and the open session, and every mutation goes
//! through `&mut self`, so review steps for one learner can never
//! interleave. A step runs to completion in this order: schedule the card,
//! resolve the base reward, apply modifiers, add to the inventory, accrue XP,
//! log, advance. The card write happens last; if it fails the step stays
//! applied in memory and the session moves on to the next card.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::card::Card;
use crate::clock::Clock;
use crate::config::Config;
use crate::error::SessionError;
use crate::modifier::{self, Modifier};
use crate::progression::{Progress, XpEvent};
use crate::queue;
use crate::reward::{self, RewardOutcome, RewardTables};
use crate::rng::RandomSource;
use crate::scheduler::{self, RecallQuality, SchedulingResult};
use crate::store::Store;

/// Where the learner is foraging and what they carry.
#[derive(Debug, Clone, PartialEq)]
pub struct Loadout {
    pub location: String,
    pub companion: Option<Modifier>,
    /// Applied after the companion, in this order.
    pub tools: Vec<Modifier>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityCounts {
    pub fail: u32,
    pub hard: u32,
    pub good: u32,
    pub easy: u32,
}

impl QualityCounts {
    fn bump(&mut self, quality: RecallQuality) {
        match quality {
            RecallQuality::Fail => self.fail += 1,
            RecallQuality::Hard => self.hard += 1,
            RecallQuality::Good => self.good += 1,
            RecallQuality::Easy => self.easy += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardLogEntry {
    pub card_id: String,
    pub quality: RecallQuality,
    pub xp: u32,
    pub location: String,
    pub outcome: RewardOutcome,
    pub bonus_log: Vec<String>,
    /// Amount that actually fit into the inventory.
    pub stored: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSession {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cards_reviewed: u32,
    pub xp_earned: u32,
    pub quality_counts: QualityCounts,
    pub reward_log: Vec<RewardLogEntry>,
}

impl ReviewSession {
    fn start(now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: now,
            completed_at: None,
            cards_reviewed: 0,
            xp_earned: 0,
            quality_counts: QualityCounts::default(),
            reward_log: Vec::new(),
        }
    }
}

/// Everything one `review_card` call produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewStep {
    pub card_id: String,
    pub scheduling: SchedulingResult,
    pub base: RewardOutcome,
    pub outcome: RewardOutcome,
    pub bonus_log: Vec<String>,
    pub rarity_upgraded: bool,
    pub stored: u32,
    pub xp_event: XpEvent,
}

struct ActiveSession {
    record: ReviewSession,
    queue: Vec<usize>,
    cursor: usize,
}

pub struct SessionManager<S: Store> {
    store: S,
    tables: RewardTables,
    loadout: Loadout,
    card_limit: Option<usize>,
    clock: Box<dyn Clock>,
    rng: Box<dyn RandomSource>,
    cards: Vec<Card>,
    progress: Progress,
    active: Option<ActiveSession>,
}

impl<S: Store> SessionManager<S> {
    pub fn new(
        store: S,
        config: &Config,
        clock: Box<dyn Clock>,
        rng: Box<dyn RandomSource>,
    ) -> Self {
        Self {
            store,
            tables: config.rewards.clone(),
            loadout: config.loadout(),
            card_limit: config.session.card_limit,
            clock,
            rng,
            cards: Vec::new(),
            progress: Progress::default(),
            active: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn loadout(&self) -> &Loadout {
        &self.loadout
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Change location or gear between sessions.
    pub fn set_loadout(&mut self, loadout: Loadout) -> Result<(), SessionError> {
        if self.active.is_some() {
            return Err(SessionError::AlreadyActive);
        }
        self.loadout = loadout;
        Ok(())
    }

    /// Reload cards and progress from the store and open a session over the
    /// cards due now. Returns the queue length.
    pub fn start_session(&mut self) -> Result<usize, SessionError> {
        if self.active.is_some() {
            return Err(SessionError::AlreadyActive);
        }
        let now = self.clock.now();
        self.cards = self.store.load_cards(now)?;
        self.progress = self.store.load_progress()?;

        let queue = queue::due_indices(&self.cards, now, self.card_limit);
        let record = ReviewSession::start(now);
        info!(session = %record.id, due = queue.len(), location = %self.loadout.location, "session started");

        let due = queue.len();
        self.active = Some(ActiveSession {
            record,
            queue,
            cursor: 0,
        });
        Ok(due)
    }

    pub fn current_card(&self) -> Option<&Card> {
        let active = self.active.as_ref()?;
        active.queue.get(active.cursor).map(|&i| &self.cards[i])
    }

    /// Cards left in the queue, including the current one.
    pub fn remaining(&self) -> usize {
        self.active
            .as_ref()
            .map_or(0, |a| a.queue.len().saturating_sub(a.cursor))
    }

    pub fn current_session(&self) -> Option<&ReviewSession> {
        self.active.as_ref().map(|a| &a.record)
    }

    pub fn review_card(&mut self, quality: RecallQuality) -> Result<ReviewStep, SessionError> {
        let now = self.clock.now();
        let active = self.active.as_mut().ok_or(SessionError::NoActiveSession)?;
        let &index = active
            .queue
            .get(active.cursor)
            .ok_or(SessionError::NoCurrentCard)?;

        let card = &mut self.cards[index];
        let scheduling = scheduler::schedule(&card.snapshot(), quality, now);
        card.apply(&scheduling, now);

        let location = self.loadout.location.as_str();
        let base = reward::resolve_base_reward(&self.tables, quality, location, &mut *self.rng);
        let category = base
            .resource_id
            .as_deref()
            .and_then(|id| self.tables.category_of(id))
            .unwrap_or_default();
        let modified = modifier::apply_modifiers(
            &base,
            self.loadout.companion.as_ref(),
            &self.loadout.tools,
            location,
            category,
            &mut *self.rng,
        );

        let stored = match modified.outcome.resource_id.as_deref() {
            Some(id) => {
                let cap = self.tables.resource(id).map_or(0, |r| r.max_stack);
                self.progress.inventory.add(id, modified.outcome.quantity, cap)
            }
            None => 0,
        };

        let xp_event = XpEvent::review(quality);
        let record = &mut active.record;
        record.cards_reviewed += 1;
        record.xp_earned += xp_event.amount;
        record.quality_counts.bump(quality);
        record.reward_log.push(RewardLogEntry {
            card_id: card.id.clone(),
            quality,
            xp: xp_event.amount,
            location: location.to_string(),
            outcome: modified.outcome.clone(),
            bonus_log: modified.bonus_log.clone(),
            stored,
        });
        active.cursor += 1;

        debug!(
            card = %card.id,
            quality = quality.label(),
            interval = scheduling.interval,
            reward = %modified.outcome,
            stored,
            "card reviewed"
        );

        let step = ReviewStep {
            card_id: card.id.clone(),
            scheduling,
            base,
            outcome: modified.outcome,
            bonus_log: modified.bonus_log,
            rarity_upgraded: modified.rarity_upgraded,
            stored,
            xp_event,
        };
        self.store.save_card(card)?;
        Ok(step)
    }

    /// Close the open session, persist it with the updated progress, and
    /// return it. A second call reports `NoActiveSession`.
    ///
    /// Progress is written before the session record, and nothing is
    /// committed in memory until both writes succeed; on a store error the
    /// session stays open and the call can be retried.
    pub fn end_session(&mut self) -> Result<ReviewSession, SessionError> {
        let active = self.active.as_ref().ok_or(SessionError::NoActiveSession)?;
        let now = self.clock.now();
        let mut record = active.record.clone();
        record.completed_at = Some(now);
        let mut progress = self.progress.clone();
        progress.streak.record_day(now.date_naive());

        self.store.save_progress(&progress)?;
        self.store.append_session(&record)?;

        self.active = None;
        self.progress = progress;
        info!(
            session = %record.id,
            cards = record.cards_reviewed,
            xp = record.xp_earned,
            streak = self.progress.streak.current,
            "session completed"
        );
        Ok(record)
    }

    /// Drop the open session without persisting it. Card updates already
    /// written by `review_card` stay written.
    pub fn abandon_session(&mut self) -> Option<ReviewSession> {
        let active = self.active.take()?;
        info!(session = %active.record.id, "session abandoned");
        Some(active.record)
    }
}
