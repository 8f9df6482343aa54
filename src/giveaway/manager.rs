use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::models::{Entry, Giveaway, GiveawayStatus, GiveawayUpdate, NewGiveaway};
use crate::db::{Datastore, EntryFeed};
use crate::error::{Error, Result};
use crate::giveaway::credential::generate_password;
use crate::giveaway::currency::CurrencyPool;
use crate::giveaway::formatters::{DefaultPrizeFormatter, PrizeFormatter};
use crate::giveaway::selector::{CursorStep, WinnerSelector};
use crate::giveaway::strategies::{ManualSelectStrategy, RandomSelectStrategy};
use crate::giveaway::utils::{generate_slug, normalize_optional};

#[derive(Clone, Debug, Default)]
pub struct GiveawayDraft {
    pub creator_name: String,
    pub title: String,
    pub description: Option<String>,
    pub require_extended_identity: bool,
    pub currencies: HashMap<String, i64>,
    pub ends_at: Option<DateTime<Utc>>,
}

// The new giveaway along with the password. The password is never
// available again after this point.
#[derive(Debug)]
pub struct CreatedGiveaway {
    pub giveaway: Giveaway,
    pub password: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SelectionMode {
    Manual(Uuid),
    Random,
}

// An entry as the operator sees it while going through the pool.
#[derive(Clone, Debug)]
pub struct EntryPosition {
    pub entry: Entry,
    pub index: usize,
    pub position: String,
    pub is_winner: bool,
}

/// Giveaway lifecycle: creation, owner checks, state transitions and
/// winner recording.
pub struct GiveawayManager {
    store: Arc<dyn Datastore>,
    password_length: usize,
}

impl GiveawayManager {
    pub fn new(store: Arc<dyn Datastore>, password_length: usize) -> Self {
        GiveawayManager {
            store,
            password_length,
        }
    }

    #[instrument(skip(self, draft), fields(title = %draft.title))]
    pub async fn create_giveaway(&self, draft: GiveawayDraft) -> Result<CreatedGiveaway> {
        let creator_name = draft.creator_name.trim().to_string();
        let title = draft.title.trim().to_string();
        if creator_name.is_empty() || title.is_empty() {
            let message = "The creator name and the title are required.".to_string();
            return Err(Error::Validation(message));
        }

        let currencies = CurrencyPool::from_quantities(&draft.currencies)?;
        if !currencies.has_any() {
            let message = "At least one currency quantity must be greater than zero.".to_string();
            return Err(Error::Validation(message));
        }

        if let Some(ends_at) = draft.ends_at {
            if ends_at <= Utc::now() {
                let message = "The end date of the giveaway must be in the future.".to_string();
                return Err(Error::Validation(message));
            }
        }

        let password = generate_password(self.password_length);
        let new_giveaway = NewGiveaway {
            slug: generate_slug(&title),
            title,
            description: normalize_optional(draft.description),
            creator_name,
            creator_password: password.clone(),
            currencies,
            allow_strict: draft.require_extended_identity,
            ends_at: draft.ends_at,
        };

        let giveaway = self.store.insert_giveaway(new_giveaway).await?;
        info!(
            "Created giveaway '{}' by {} offering {}",
            giveaway.slug,
            giveaway.creator_name,
            DefaultPrizeFormatter::new().summary(&giveaway.currencies)
        );
        Ok(CreatedGiveaway { giveaway, password })
    }

    pub async fn get_giveaway(&self, slug: &str) -> Result<Giveaway> {
        self.store
            .find_giveaway_by_slug(slug)
            .await?
            .ok_or_else(|| Error::NotFound("The requested giveaway was not found.".to_string()))
    }

    // Loads the giveaway and checks the password of its creator.
    pub async fn authorize(&self, slug: &str, password: Option<&str>) -> Result<Giveaway> {
        let giveaway = self.get_giveaway(slug).await?;
        self.check_giveaway_owner(&giveaway, password)?;
        Ok(giveaway)
    }

    #[instrument(skip(self, password))]
    pub async fn close_giveaway(&self, slug: &str, password: Option<&str>) -> Result<Giveaway> {
        let giveaway = self.authorize(slug, password).await?;
        self.check_transition(&giveaway, GiveawayStatus::Closed)?;

        let update = GiveawayUpdate {
            status: Some(GiveawayStatus::Closed),
            winner_id: None,
        };
        let giveaway = self.store.update_giveaway(giveaway.id, update).await?;
        info!("Closed giveaway '{}'", giveaway.slug);
        Ok(giveaway)
    }

    // Records the winner and moves the giveaway into the drawn state.
    #[instrument(skip(self, password))]
    pub async fn select_winner(
        &self,
        slug: &str,
        password: Option<&str>,
        mode: SelectionMode,
    ) -> Result<(Giveaway, Entry)> {
        let giveaway = self.authorize(slug, password).await?;
        self.check_transition(&giveaway, GiveawayStatus::Drawn)?;

        let selector = self.selector(&giveaway).await?;
        let winner = match mode {
            SelectionMode::Manual(entry_id) => {
                selector.choose(&ManualSelectStrategy::new(), Some(entry_id))?
            }
            SelectionMode::Random => selector.choose(&RandomSelectStrategy::new(), None)?,
        };

        let update = GiveawayUpdate {
            status: Some(GiveawayStatus::Drawn),
            winner_id: Some(winner.id),
        };
        let giveaway = self.store.update_giveaway(giveaway.id, update).await?;
        info!(
            "Giveaway '{}' drawn, the winner is '{}'",
            giveaway.slug, winner.participant_name
        );
        Ok((giveaway, winner.as_ref().clone()))
    }

    // Random candidate for the operator to look at. Nothing is recorded.
    pub async fn preview_winner(&self, slug: &str, password: Option<&str>) -> Result<EntryPosition> {
        let giveaway = self.authorize(slug, password).await?;
        self.check_not_drawn(&giveaway)?;

        let selector = self.selector(&giveaway).await?;
        let entry = selector.choose(&RandomSelectStrategy::new(), None)?;
        Ok(self.entry_position(&selector, &entry))
    }

    // Puts the cursor on `index`, then takes one step from there.
    pub async fn browse_entries(
        &self,
        slug: &str,
        password: Option<&str>,
        index: usize,
        step: CursorStep,
    ) -> Result<EntryPosition> {
        let giveaway = self.authorize(slug, password).await?;
        let selector = self.selector(&giveaway).await?;
        if selector.is_empty() {
            let message = "The giveaway doesn't have any entries yet.".to_string();
            return Err(Error::Giveaway(message));
        }

        selector.slide_to(index)?;
        let entry = selector
            .step(step)
            .ok_or_else(|| Error::NotFound("The requested entry was not found.".to_string()))?;
        Ok(self.entry_position(&selector, &entry))
    }

    pub async fn list_entries(&self, slug: &str) -> Result<Vec<Entry>> {
        let giveaway = self.get_giveaway(slug).await?;
        let entries = self.store.list_entries(giveaway.id).await?;
        Ok(entries)
    }

    pub async fn count_entries(&self, giveaway: &Giveaway) -> Result<usize> {
        let entries = self.store.list_entries(giveaway.id).await?;
        Ok(entries.len())
    }

    // Moderation: the creator removes an entry from the pool.
    #[instrument(skip(self, password))]
    pub async fn remove_entry(&self, slug: &str, password: Option<&str>, entry_id: Uuid) -> Result<Entry> {
        let giveaway = self.authorize(slug, password).await?;
        let belongs_to_giveaway = self
            .store
            .list_entries(giveaway.id)
            .await?
            .iter()
            .any(|entry| entry.id == entry_id);
        if !belongs_to_giveaway {
            return Err(Error::NotFound("The requested entry was not found.".to_string()));
        }

        let entry = self.store.delete_entry(entry_id).await?;
        info!(
            "Removed '{}' from giveaway '{}'",
            entry.participant_name, giveaway.slug
        );
        Ok(entry)
    }

    pub async fn subscribe(&self, slug: &str) -> Result<EntryFeed> {
        let giveaway = self.get_giveaway(slug).await?;
        Ok(self.store.subscribe(giveaway.id))
    }

    async fn selector(&self, giveaway: &Giveaway) -> Result<WinnerSelector> {
        let entries = self.store.list_entries(giveaway.id).await?;
        Ok(WinnerSelector::new(entries, giveaway.winner_id))
    }

    fn entry_position(&self, selector: &WinnerSelector, entry: &Entry) -> EntryPosition {
        EntryPosition {
            entry: entry.clone(),
            index: selector.current_index(),
            position: selector.position_label(),
            is_winner: selector.is_winner(entry),
        }
    }

    fn check_giveaway_owner(&self, giveaway: &Giveaway, password: Option<&str>) -> Result<()> {
        match password {
            Some(password) if password == giveaway.creator_password => Ok(()),
            _ => {
                let message = "For managing this giveaway you need to provide its password.".to_string();
                Err(Error::Unauthorized(message))
            }
        }
    }

    fn check_not_drawn(&self, giveaway: &Giveaway) -> Result<()> {
        if giveaway.status == GiveawayStatus::Drawn || giveaway.has_winner() {
            let message = "A winner has already been selected for this giveaway.".to_string();
            return Err(Error::Giveaway(message));
        }

        Ok(())
    }

    fn check_transition(&self, giveaway: &Giveaway, next: GiveawayStatus) -> Result<()> {
        self.check_not_drawn(giveaway)?;
        if !giveaway.status.can_transition_to(next) {
            let message = format!(
                "The giveaway can't go from {} to {}.",
                giveaway.status.as_str(),
                next.as_str()
            );
            return Err(Error::Giveaway(message));
        }

        Ok(())
    }
}
