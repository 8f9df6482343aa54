use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::giveaway::currency::CurrencyPool;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GiveawayStatus {
    // Accepting entries.
    Active,
    // No longer accepting entries, a winner hasn't been picked yet.
    Closed,
    // The winner has been recorded. Terminal state.
    Drawn,
}

impl GiveawayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GiveawayStatus::Active => "active",
            GiveawayStatus::Closed => "closed",
            GiveawayStatus::Drawn => "drawn",
        }
    }

    // Statuses only move forward: active -> closed | drawn, closed -> drawn.
    pub fn can_transition_to(&self, next: GiveawayStatus) -> bool {
        matches!(
            (self, next),
            (GiveawayStatus::Active, GiveawayStatus::Closed)
                | (GiveawayStatus::Active, GiveawayStatus::Drawn)
                | (GiveawayStatus::Closed, GiveawayStatus::Drawn)
        )
    }
}

#[derive(Clone, Eq, PartialEq, Serialize)]
pub struct Giveaway {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub creator_name: String,
    // Shown to the creator once, never sent back by the API.
    #[serde(skip_serializing)]
    pub creator_password: String,
    #[serde(flatten)]
    pub currencies: CurrencyPool,
    // Entries must carry the reddit name and profile link when set.
    pub allow_strict: bool,
    pub status: GiveawayStatus,
    pub winner_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl Giveaway {
    pub fn has_winner(&self) -> bool {
        self.winner_id.is_some()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.ends_at {
            Some(ends_at) => ends_at <= now,
            None => false,
        }
    }
}

impl fmt::Debug for Giveaway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Giveaway")
            .field("id", &self.id)
            .field("slug", &self.slug)
            .field("title", &self.title)
            .field("creator_name", &self.creator_name)
            .field("status", &self.status)
            .field("winner_id", &self.winner_id)
            .finish()
    }
}

#[derive(Clone)]
pub struct NewGiveaway {
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub creator_name: String,
    pub creator_password: String,
    pub currencies: CurrencyPool,
    pub allow_strict: bool,
    pub ends_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default)]
pub struct GiveawayUpdate {
    pub status: Option<GiveawayStatus>,
    pub winner_id: Option<Uuid>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: Uuid,
    pub giveaway_id: Uuid,
    pub participant_name: String,
    pub reddit_name: Option<String>,
    pub reddit_profile_link: Option<String>,
    // Kept for the duplicate check only, never exposed to other participants.
    #[serde(default, skip_serializing)]
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewEntry {
    pub giveaway_id: Uuid,
    pub participant_name: String,
    pub reddit_name: Option<String>,
    pub reddit_profile_link: Option<String>,
    pub ip_address: Option<String>,
}

#[cfg(test)]
mod tests {
    use crate::db::models::GiveawayStatus;

    #[test]
    fn test_status_moves_only_forward() {
        assert!(GiveawayStatus::Active.can_transition_to(GiveawayStatus::Closed));
        assert!(GiveawayStatus::Active.can_transition_to(GiveawayStatus::Drawn));
        assert!(GiveawayStatus::Closed.can_transition_to(GiveawayStatus::Drawn));

        assert!(!GiveawayStatus::Closed.can_transition_to(GiveawayStatus::Active));
        assert!(!GiveawayStatus::Drawn.can_transition_to(GiveawayStatus::Active));
        assert!(!GiveawayStatus::Drawn.can_transition_to(GiveawayStatus::Closed));
        assert!(!GiveawayStatus::Active.can_transition_to(GiveawayStatus::Active));
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let value = serde_json::to_value(GiveawayStatus::Drawn).unwrap();
        assert_eq!(value, serde_json::json!("drawn"));
        assert_eq!(GiveawayStatus::Closed.as_str(), "closed");
    }
}
