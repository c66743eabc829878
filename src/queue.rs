use chrono::{DateTime, Utc};

use crate::card::{Card, CardStatus};

pub struct DeckSummary {
    pub name: String,
    pub total: usize,
    pub due: usize,
}

// Cards mid-learning surface before graduated reviews; never-seen cards last.
fn status_priority(status: CardStatus) -> u8 {
    match status {
        CardStatus::Learning => 0,
        CardStatus::Relearning => 1,
        CardStatus::Review => 2,
        CardStatus::New => 3,
    }
}

/// Indices of cards due at `now`, in review order, truncated to `limit`.
///
/// Ordering is status priority, then most overdue first; the sort is stable
/// so equal keys keep collection order.
pub fn due_indices(cards: &[Card], now: DateTime<Utc>, limit: Option<usize>) -> Vec<usize> {
    let mut due: Vec<usize> = cards
        .iter()
        .enumerate()
        .filter(|(_, card)| card.is_due(now))
        .map(|(i, _)| i)
        .collect();

    due.sort_by_key(|&i| (status_priority(cards[i].status), cards[i].next_due_at));

    if let Some(limit) = limit {
        due.truncate(limit);
    }
    due
}

pub fn due_items<'a>(cards: &'a [Card], now: DateTime<Utc>, limit: Option<usize>) -> Vec<&'a Card> {
    due_indices(cards, now, limit)
        .into_iter()
        .map(|i| &cards[i])
        .collect()
}

pub fn deck_summaries(cards: &[Card], now: DateTime<Utc>) -> Vec<DeckSummary> {
    let mut decks: std::collections::BTreeMap<String, (usize, usize)> =
        std::collections::BTreeMap::new();
    for card in cards {
        let entry = decks.entry(card.deck.clone()).or_insert((0, 0));
        entry.0 += 1;
        if card.is_due(now) {
            entry.1 += 1;
        }
    }
    decks
        .into_iter()
        .map(|(name, (total, due))| DeckSummary { name, total, due })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap()
    }

    fn card(id: &str, deck: &str, status: CardStatus, due_in_hours: i64) -> Card {
        let mut c = Card::new(deck, "q", "a", now() + Duration::hours(due_in_hours));
        c.id = id.to_string();
        c.status = status;
        c
    }

    #[test]
    fn filters_to_due_cards() {
        let cards = vec![
            card("past", "d", CardStatus::Review, -5),
            card("exact", "d", CardStatus::Review, 0),
            card("future", "d", CardStatus::Review, 3),
        ];
        let ids: Vec<&str> = due_items(&cards, now(), None).iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["past", "exact"]);
    }

    #[test]
    fn orders_by_status_then_overdue() {
        let cards = vec![
            card("new", "d", CardStatus::New, -100),
            card("review-old", "d", CardStatus::Review, -48),
            card("relearn", "d", CardStatus::Relearning, -1),
            card("review-recent", "d", CardStatus::Review, -2),
            card("learn", "d", CardStatus::Learning, -1),
        ];
        let ids: Vec<&str> = due_items(&cards, now(), None).iter().map(|c| c.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["learn", "relearn", "review-old", "review-recent", "new"]
        );
    }

    #[test]
    fn ties_keep_collection_order() {
        let cards = vec![
            card("a", "d", CardStatus::New, -1),
            card("b", "d", CardStatus::New, -1),
            card("c", "d", CardStatus::New, -1),
        ];
        assert_eq!(due_indices(&cards, now(), None), vec![0, 1, 2]);
    }

    #[test]
    fn limit_truncates_after_sorting() {
        let cards = vec![
            card("new", "d", CardStatus::New, -10),
            card("learn", "d", CardStatus::Learning, -1),
            card("review", "d", CardStatus::Review, -1),
        ];
        assert_eq!(due_indices(&cards, now(), Some(2)), vec![1, 2]);
        assert!(due_indices(&cards, now(), Some(0)).is_empty());
    }

    #[test]
    fn repeated_calls_agree() {
        let cards = vec![
            card("x", "d", CardStatus::Review, -3),
            card("y", "d", CardStatus::Learning, -3),
            card("z", "d", CardStatus::Review, -3),
        ];
        assert_eq!(due_indices(&cards, now(), None), due_indices(&cards, now(), None));
    }

    #[test]
    fn deck_summaries_grouping() {
        let cards = vec![
            card("1", "math", CardStatus::New, -1),
            card("2", "math", CardStatus::Review, 24 * 20),
            card("3", "science", CardStatus::New, 0),
        ];
        let summaries = deck_summaries(&cards, now());
        assert_eq!(summaries.len(), 2);
        let math = summaries.iter().find(|s| s.name == "math").unwrap();
        assert_eq!(math.total, 2);
        assert_eq!(math.due, 1);
        let science = summaries.iter().find(|s| s.name == "science").unwrap();
        assert_eq!(science.total, 1);
        assert_eq!(science.due, 1);
    }
}
