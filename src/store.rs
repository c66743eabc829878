//! Persistence gateway.
//!
//! The session manager reads cards and progress when a session starts,
//! writes a card after every review step, and writes the closed session and
//! progress once at the end. Nothing here is transactional: a crash between
//! a step and its write loses that step.
//!
//! Saves address cards by id, so loading refuses a collection where two
//! cards share one.

use std::collections::{HashMap, HashSet};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::card::{self, Card};
use crate::error::StoreError;
use crate::progression::Progress;
use crate::session::ReviewSession;

pub trait Store {
    fn load_cards(&mut self, now: DateTime<Utc>) -> Result<Vec<Card>, StoreError>;
    fn save_card(&mut self, card: &Card) -> Result<(), StoreError>;
    fn load_progress(&mut self) -> Result<Progress, StoreError>;
    fn save_progress(&mut self, progress: &Progress) -> Result<(), StoreError>;
    fn append_session(&mut self, session: &ReviewSession) -> Result<(), StoreError>;
}

/// Keeps everything in memory and counts writes.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    pub cards: Vec<Card>,
    pub progress: Progress,
    pub sessions: Vec<ReviewSession>,
    pub card_writes: usize,
}

impl MemoryStore {
    pub fn with_cards(cards: Vec<Card>) -> Self {
        Self {
            cards,
            ..Self::default()
        }
    }
}

impl Store for MemoryStore {
    fn load_cards(&mut self, _now: DateTime<Utc>) -> Result<Vec<Card>, StoreError> {
        let mut seen = HashSet::new();
        if let Some(dup) = self.cards.iter().find(|c| !seen.insert(c.id.as_str())) {
            return Err(StoreError::DuplicateCard(dup.id.clone()));
        }
        Ok(self.cards.clone())
    }

    fn save_card(&mut self, card: &Card) -> Result<(), StoreError> {
        let slot = self
            .cards
            .iter_mut()
            .find(|c| c.id == card.id)
            .ok_or_else(|| StoreError::UnknownCard(card.id.clone()))?;
        *slot = card.clone();
        self.card_writes += 1;
        Ok(())
    }

    fn load_progress(&mut self) -> Result<Progress, StoreError> {
        Ok(self.progress.clone())
    }

    fn save_progress(&mut self, progress: &Progress) -> Result<(), StoreError> {
        self.progress = progress.clone();
        Ok(())
    }

    fn append_session(&mut self, session: &ReviewSession) -> Result<(), StoreError> {
        self.sessions.push(session.clone());
        Ok(())
    }
}

/// Cards live in user-editable CSV files; progress and session history live
/// as JSON under `data_dir`.
#[derive(Debug)]
pub struct FileStore {
    card_files: Vec<PathBuf>,
    data_dir: PathBuf,
    cards: Vec<Card>,
    sources: HashMap<String, PathBuf>,
}

impl FileStore {
    pub fn new(card_files: Vec<PathBuf>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            card_files,
            data_dir: data_dir.into(),
            cards: Vec::new(),
            sources: HashMap::new(),
        }
    }

    fn progress_path(&self) -> PathBuf {
        self.data_dir.join("progress.json")
    }

    fn sessions_path(&self) -> PathBuf {
        self.data_dir.join("sessions.jsonl")
    }

    /// Every session appended so far, oldest first.
    pub fn load_sessions(&self) -> Result<Vec<ReviewSession>, StoreError> {
        let path = self.sessions_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(fs::File::open(&path)?);
        let mut sessions = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            sessions.push(serde_json::from_str(&line)?);
        }
        Ok(sessions)
    }

    fn save_file(&self, path: &Path) -> Result<(), StoreError> {
        let file_cards: Vec<Card> = self
            .cards
            .iter()
            .filter(|c| self.sources.get(&c.id).map(PathBuf::as_path) == Some(path))
            .cloned()
            .collect();
        debug!(path = %path.display(), cards = file_cards.len(), "saving card file");
        card::save_csv(path, &file_cards)
    }
}

impl Store for FileStore {
    fn load_cards(&mut self, now: DateTime<Utc>) -> Result<Vec<Card>, StoreError> {
        self.cards.clear();
        self.sources.clear();
        for file in &self.card_files {
            match card::load_csv(file, now) {
                Ok(cards) => {
                    for c in cards {
                        if let Some(first) = self.sources.get(&c.id) {
                            let message = format!(
                                "card id {:?} already loaded from {}",
                                c.id,
                                first.display()
                            );
                            self.cards.clear();
                            self.sources.clear();
                            return Err(StoreError::Parse {
                                path: file.clone(),
                                message,
                            });
                        }
                        self.sources.insert(c.id.clone(), file.clone());
                        self.cards.push(c);
                    }
                }
                Err(e) => {
                    warn!(path = %file.display(), error = %e, "skipping unreadable card file");
                }
            }
        }
        Ok(self.cards.clone())
    }

    fn save_card(&mut self, card: &Card) -> Result<(), StoreError> {
        let slot = self
            .cards
            .iter_mut()
            .find(|c| c.id == card.id)
            .ok_or_else(|| StoreError::UnknownCard(card.id.clone()))?;
        *slot = card.clone();
        let path = self
            .sources
            .get(&card.id)
            .cloned()
            .ok_or_else(|| StoreError::UnknownCard(card.id.clone()))?;
        self.save_file(&path)
    }

    fn load_progress(&mut self) -> Result<Progress, StoreError> {
        let path = self.progress_path();
        if !path.exists() {
            return Ok(Progress::default());
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save_progress(&mut self, progress: &Progress) -> Result<(), StoreError> {
        fs::create_dir_all(&self.data_dir)?;
        let json = serde_json::to_string_pretty(progress)?;
        fs::write(self.progress_path(), json)?;
        Ok(())
    }

    fn append_session(&mut self, session: &ReviewSession) -> Result<(), StoreError> {
        fs::create_dir_all(&self.data_dir)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.sessions_path())?;
        let line = serde_json::to_string(session)?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}
