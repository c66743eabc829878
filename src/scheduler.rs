//! SM-2 derived scheduler.
//!
//! Ease always moves, even on a failed recall. Anything scoring below 3
//! (which includes `Hard`) resets the card; successes walk 1 -> 6 ->
//! interval * ease, with a further 1.3x stretch for `Easy`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::card::CardStatus;

pub const MIN_EASE_FACTOR: f64 = 1.3;
const PASS_SCORE: u8 = 3;
const EASY_BONUS: f64 = 1.3;
const FIRST_INTERVAL: u32 = 1;
const SECOND_INTERVAL: u32 = 6;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecallQuality {
    Fail,
    Hard,
    Good,
    Easy,
}

impl RecallQuality {
    pub const ALL: [RecallQuality; 4] = [
        RecallQuality::Fail,
        RecallQuality::Hard,
        RecallQuality::Good,
        RecallQuality::Easy,
    ];

    pub fn from_u8(n: u8) -> Option<RecallQuality> {
        match n {
            1 => Some(RecallQuality::Fail),
            2 => Some(RecallQuality::Hard),
            3 => Some(RecallQuality::Good),
            4 => Some(RecallQuality::Easy),
            _ => None,
        }
    }

    /// SM-2 quality score.
    pub fn score(self) -> u8 {
        match self {
            RecallQuality::Fail => 0,
            RecallQuality::Hard => 2,
            RecallQuality::Good => 3,
            RecallQuality::Easy => 5,
        }
    }

    /// Experience granted for answering with this quality.
    pub fn xp(self) -> u32 {
        match self {
            RecallQuality::Fail => 2,
            RecallQuality::Hard => 5,
            RecallQuality::Good => 10,
            RecallQuality::Easy => 15,
        }
    }

    pub fn index(self) -> usize {
        match self {
            RecallQuality::Fail => 0,
            RecallQuality::Hard => 1,
            RecallQuality::Good => 2,
            RecallQuality::Easy => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RecallQuality::Fail => "fail",
            RecallQuality::Hard => "hard",
            RecallQuality::Good => "good",
            RecallQuality::Easy => "easy",
        }
    }

    pub fn is_pass(self) -> bool {
        self.score() >= PASS_SCORE
    }
}

/// The scheduling fields of a card, detached from its payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulingSnapshot {
    pub repetitions: u32,
    pub ease_factor: f64,
    pub interval: u32,
    pub status: CardStatus,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulingResult {
    pub repetitions: u32,
    pub ease_factor: f64,
    pub interval: u32,
    pub next_due_at: DateTime<Utc>,
    pub status: CardStatus,
}

fn next_ease(ef: f64, q: u8) -> f64 {
    let miss = f64::from(5 - q);
    f64::max(MIN_EASE_FACTOR, ef + (0.1 - miss * (0.08 + miss * 0.02)))
}

pub fn schedule(
    item: &SchedulingSnapshot,
    quality: RecallQuality,
    now: DateTime<Utc>,
) -> SchedulingResult {
    let ease_factor = next_ease(item.ease_factor, quality.score());

    let (repetitions, interval, status) = if !quality.is_pass() {
        let status = match item.status {
            CardStatus::New => CardStatus::Learning,
            CardStatus::Learning | CardStatus::Review | CardStatus::Relearning => {
                CardStatus::Relearning
            }
        };
        (0, FIRST_INTERVAL, status)
    } else {
        let repetitions = item.repetitions + 1;
        let mut interval = match repetitions {
            1 => FIRST_INTERVAL,
            2 => SECOND_INTERVAL,
            _ => (f64::from(item.interval) * ease_factor).round() as u32,
        };
        if quality == RecallQuality::Easy {
            interval = (f64::from(interval) * EASY_BONUS).round() as u32;
        }
        (repetitions, interval.max(FIRST_INTERVAL), CardStatus::Review)
    };

    SchedulingResult {
        repetitions,
        ease_factor,
        interval,
        next_due_at: now + Duration::days(i64::from(interval)),
        status,
    }
}

/// Interval (days) each quality would produce, without touching the item.
pub fn preview_all_intervals(
    item: &SchedulingSnapshot,
    now: DateTime<Utc>,
) -> [(RecallQuality, u32); 4] {
    RecallQuality::ALL.map(|q| (q, schedule(item, q, now).interval))
}

pub fn format_interval(days: u32) -> String {
    match days {
        0 => "now".to_string(),
        1..=6 => format!("{days}d"),
        7..=29 => format!("{}w", days / 7),
        30..=364 => format!("{}mo", days / 30),
        _ => format!("{}y", days / 365),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
    }

    fn snapshot(repetitions: u32, ease_factor: f64, interval: u32, status: CardStatus) -> SchedulingSnapshot {
        SchedulingSnapshot {
            repetitions,
            ease_factor,
            interval,
            status,
        }
    }

    #[test]
    fn new_card_good_graduates_to_review() {
        let result = schedule(&snapshot(0, 2.5, 0, CardStatus::New), RecallQuality::Good, now());
        assert_eq!(result.repetitions, 1);
        assert_eq!(result.interval, 1);
        assert_eq!(result.status, CardStatus::Review);
        assert_eq!(result.next_due_at, now() + Duration::days(1));
    }

    #[test]
    fn second_success_is_six_days() {
        let first = schedule(&snapshot(0, 2.5, 0, CardStatus::New), RecallQuality::Good, now());
        let second = schedule(
            &snapshot(first.repetitions, first.ease_factor, first.interval, first.status),
            RecallQuality::Good,
            now(),
        );
        assert_eq!(second.repetitions, 2);
        assert_eq!(second.interval, 6);
    }

    #[test]
    fn easy_stretches_the_multiplied_interval() {
        let result = schedule(&snapshot(2, 2.5, 6, CardStatus::Review), RecallQuality::Easy, now());
        assert!(result.ease_factor > 2.5);
        let expected = ((6.0 * result.ease_factor).round() * 1.3).round() as u32;
        assert_eq!(result.interval, expected);
        assert_eq!(result.interval, 21);
    }

    #[test]
    fn ease_moves_by_quality() {
        let item = snapshot(3, 2.5, 10, CardStatus::Review);
        let ease = |q| schedule(&item, q, now()).ease_factor;
        assert!((ease(RecallQuality::Easy) - 2.6).abs() < 1e-9);
        assert!((ease(RecallQuality::Good) - 2.36).abs() < 1e-9);
        assert!((ease(RecallQuality::Hard) - 2.18).abs() < 1e-9);
        assert!((ease(RecallQuality::Fail) - 1.7).abs() < 1e-9);
    }

    #[test]
    fn hard_counts_as_a_failure() {
        let result = schedule(&snapshot(4, 2.5, 20, CardStatus::Review), RecallQuality::Hard, now());
        assert_eq!(result.repetitions, 0);
        assert_eq!(result.interval, 1);
        assert_eq!(result.status, CardStatus::Relearning);
    }

    #[test]
    fn failing_a_new_card_starts_learning() {
        let result = schedule(&snapshot(0, 2.5, 0, CardStatus::New), RecallQuality::Fail, now());
        assert_eq!(result.status, CardStatus::Learning);
        assert_eq!(result.interval, 1);
    }

    #[test]
    fn ease_never_drops_below_floor() {
        let mut item = snapshot(5, 1.4, 10, CardStatus::Review);
        for _ in 0..10 {
            let result = schedule(&item, RecallQuality::Fail, now());
            assert!(result.ease_factor >= MIN_EASE_FACTOR);
            item.ease_factor = result.ease_factor;
        }
        assert_eq!(item.ease_factor, MIN_EASE_FACTOR);
    }

    #[test]
    fn zero_interval_review_card_still_waits_a_day() {
        let result = schedule(&snapshot(5, 1.3, 0, CardStatus::Review), RecallQuality::Good, now());
        assert_eq!(result.interval, 1);
    }

    #[test]
    fn preview_matches_schedule() {
        let item = snapshot(2, 2.5, 6, CardStatus::Review);
        let preview = preview_all_intervals(&item, now());
        for (q, days) in preview {
            assert_eq!(days, schedule(&item, q, now()).interval);
        }
        assert_eq!(preview[0], (RecallQuality::Fail, 1));
        assert_eq!(preview[2], (RecallQuality::Good, 14));
    }

    #[test]
    fn from_u8_keypad() {
        assert_eq!(RecallQuality::from_u8(1), Some(RecallQuality::Fail));
        assert_eq!(RecallQuality::from_u8(4), Some(RecallQuality::Easy));
        assert_eq!(RecallQuality::from_u8(0), None);
        assert_eq!(RecallQuality::from_u8(5), None);
    }

    #[test]
    fn test_format_interval() {
        assert_eq!(format_interval(0), "now");
        assert_eq!(format_interval(1), "1d");
        assert_eq!(format_interval(7), "1w");
        assert_eq!(format_interval(20), "2w");
        assert_eq!(format_interval(90), "3mo");
        assert_eq!(format_interval(730), "2y");
    }
}
