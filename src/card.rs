use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::scheduler::{SchedulingResult, SchedulingSnapshot};

/// Starting ease for a card that has never been reviewed.
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

const HEADER: [&str; 11] = [
    "deck",
    "front",
    "back",
    "media",
    "id",
    "repetitions",
    "ease_factor",
    "interval",
    "next_due_at",
    "last_reviewed_at",
    "status",
];

/// Where a card sits in the learning lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CardStatus {
    /// Never reviewed
    #[default]
    New,
    /// First recall attempts
    Learning,
    /// Regular spaced review
    Review,
    /// Failed after having graduated, relearning
    Relearning,
}

impl CardStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CardStatus::New => "new",
            CardStatus::Learning => "learning",
            CardStatus::Review => "review",
            CardStatus::Relearning => "relearning",
        }
    }
}

impl fmt::Display for CardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CardStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "new" => Ok(CardStatus::New),
            "learning" => Ok(CardStatus::Learning),
            "review" => Ok(CardStatus::Review),
            "relearning" => Ok(CardStatus::Relearning),
            other => Err(format!("unknown card status: {other}")),
        }
    }
}

/// A reviewable item. `front`, `back` and `media` are opaque payload; only
/// the scheduling fields are read by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub deck: String,
    pub front: String,
    pub back: String,
    pub media: String,
    pub id: String,
    pub repetitions: u32,
    pub ease_factor: f64,
    pub interval: u32,
    pub next_due_at: DateTime<Utc>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub status: CardStatus,
}

impl Card {
    /// A fresh card, due immediately.
    pub fn new(deck: &str, front: &str, back: &str, now: DateTime<Utc>) -> Self {
        Self {
            deck: deck.to_string(),
            front: front.to_string(),
            back: back.to_string(),
            media: String::new(),
            id: uuid::Uuid::new_v4().to_string(),
            repetitions: 0,
            ease_factor: DEFAULT_EASE_FACTOR,
            interval: 0,
            next_due_at: now,
            last_reviewed_at: None,
            status: CardStatus::New,
        }
    }

    pub fn snapshot(&self) -> SchedulingSnapshot {
        SchedulingSnapshot {
            repetitions: self.repetitions,
            ease_factor: self.ease_factor,
            interval: self.interval,
            status: self.status,
        }
    }

    /// Merge a scheduler result into this card.
    pub fn apply(&mut self, result: &SchedulingResult, reviewed_at: DateTime<Utc>) {
        self.repetitions = result.repetitions;
        self.ease_factor = result.ease_factor;
        self.interval = result.interval;
        self.next_due_at = result.next_due_at;
        self.status = result.status;
        self.last_reviewed_at = Some(reviewed_at);
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_due_at <= now
    }
}

fn get_field(record: &csv::StringRecord, index: usize) -> String {
    record.get(index).unwrap_or("").to_string()
}

fn parse_field<T: FromStr>(
    raw: &str,
    default: T,
    column: &str,
    path: &Path,
    row: usize,
) -> Result<T, StoreError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(default);
    }
    raw.parse().map_err(|_| StoreError::Parse {
        path: path.to_path_buf(),
        message: format!("row {row}: invalid {column} {raw:?}"),
    })
}

fn parse_timestamp(raw: &str, path: &Path, row: usize) -> Result<Option<DateTime<Utc>>, StoreError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|d| Some(d.with_timezone(&Utc)))
        .map_err(|e| StoreError::Parse {
            path: path.to_path_buf(),
            message: format!("row {row}: invalid timestamp {raw:?}: {e}"),
        })
}

/// Load cards from a CSV file. Rows written by hand may leave every
/// scheduling column blank; such cards are new and due at `now`.
///
/// Card ids must be unique within the file, since saves address cards by id.
pub fn load_csv(path: &Path, now: DateTime<Utc>) -> Result<Vec<Card>, StoreError> {
    let default_deck = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("default")
        .to_string();

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;

    let mut cards = Vec::new();
    let mut seen = HashSet::new();
    for (i, result) in reader.records().enumerate() {
        let record = result?;
        let row = i + 2;

        let deck_raw = get_field(&record, 0);
        let deck = if deck_raw.trim().is_empty() {
            default_deck.clone()
        } else {
            deck_raw
        };

        let id_raw = get_field(&record, 4);
        let id = if id_raw.trim().is_empty() {
            uuid::Uuid::new_v4().to_string()
        } else {
            id_raw
        };
        if !seen.insert(id.clone()) {
            return Err(StoreError::Parse {
                path: path.to_path_buf(),
                message: format!("row {row}: duplicate card id {id:?}"),
            });
        }

        let ease_factor: f64 = parse_field(
            &get_field(&record, 6),
            DEFAULT_EASE_FACTOR,
            "ease_factor",
            path,
            row,
        )?;
        let status = match get_field(&record, 10).trim() {
            "" => CardStatus::New,
            raw => raw.parse().map_err(|message| StoreError::Parse {
                path: path.to_path_buf(),
                message: format!("row {row}: {message}"),
            })?,
        };

        cards.push(Card {
            deck,
            front: get_field(&record, 1),
            back: get_field(&record, 2),
            media: get_field(&record, 3),
            id,
            repetitions: parse_field(&get_field(&record, 5), 0, "repetitions", path, row)?,
            ease_factor: ease_factor.max(crate::scheduler::MIN_EASE_FACTOR),
            interval: parse_field(&get_field(&record, 7), 0, "interval", path, row)?,
            next_due_at: parse_timestamp(&get_field(&record, 8), path, row)?.unwrap_or(now),
            last_reviewed_at: parse_timestamp(&get_field(&record, 9), path, row)?,
            status,
        });
    }
    Ok(cards)
}

pub fn save_csv(path: &Path, cards: &[Card]) -> Result<(), StoreError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(HEADER)?;

    for card in cards {
        writer.write_record([
            &card.deck,
            &card.front,
            &card.back,
            &card.media,
            &card.id,
            &card.repetitions.to_string(),
            &format!("{:.3}", card.ease_factor),
            &card.interval.to_string(),
            &card.next_due_at.to_rfc3339(),
            &card
                .last_reviewed_at
                .map_or(String::new(), |d| d.to_rfc3339()),
            card.status.as_str(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

pub fn discover_files(paths: &[String]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for p in paths {
        let path = PathBuf::from(p);
        if path.is_dir() {
            collect_csv_recursive(&path, &mut files);
        } else if path.extension().and_then(|e| e.to_str()) == Some("csv") {
            files.push(path);
        }
    }
    files
}

fn collect_csv_recursive(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_csv_recursive(&path, files);
        } else if path.extension().and_then(|e| e.to_str()) == Some("csv") {
            files.push(path);
        }
    }
}
