use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry as MapEntry;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::db::models::{Entry, Giveaway, GiveawayStatus, GiveawayUpdate, NewEntry, NewGiveaway};
use crate::db::schema::{ENTRIES_GIVEAWAY_FKEY, ENTRIES_PARTICIPANT_KEY, ENTRIES_TABLE, GIVEAWAYS_SLUG_KEY};
use crate::db::{Datastore, DatastoreError, DatastoreResult, EntryEvent, EntryFeed};

pub const DEFAULT_EVENTS_CAPACITY: usize = 64;

/// In-process implementation of the managed store.
///
/// Keeps the same contract as the hosted database: generated ids and
/// timestamps, unique slugs, the `(giveaway_id, participant_name)` unique
/// constraint, the foreign key from entries to giveaways and a change feed.
pub struct MemoryDatastore {
    giveaways: DashMap<Uuid, Giveaway>,
    slugs: DashMap<String, Uuid>,
    // Entries with their insertion sequence number, used as a tie breaker
    // when two entries share a timestamp.
    entries: DashMap<Uuid, (u64, Entry)>,
    participant_names: DashMap<(Uuid, String), Uuid>,
    sequence: AtomicU64,
    events: broadcast::Sender<EntryEvent>,
}

impl MemoryDatastore {
    pub fn new() -> Self {
        MemoryDatastore::with_capacity(DEFAULT_EVENTS_CAPACITY)
    }

    // Creates a store whose change feed buffers up to `capacity` events
    // for slow subscribers.
    pub fn with_capacity(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        MemoryDatastore {
            giveaways: DashMap::new(),
            slugs: DashMap::new(),
            entries: DashMap::new(),
            participant_names: DashMap::new(),
            sequence: AtomicU64::new(0),
            events,
        }
    }

    fn publish(&self, event: EntryEvent) {
        // No subscribers is not an error for the writer.
        if self.events.send(event).is_err() {
            debug!("No subscribers for the entry feed");
        }
    }
}

impl Default for MemoryDatastore {
    fn default() -> Self {
        MemoryDatastore::new()
    }
}

#[async_trait]
impl Datastore for MemoryDatastore {
    async fn insert_giveaway(&self, giveaway: NewGiveaway) -> DatastoreResult<Giveaway> {
        let id = Uuid::new_v4();
        match self.slugs.entry(giveaway.slug.clone()) {
            MapEntry::Occupied(_) => {
                return Err(DatastoreError::UniqueViolation(GIVEAWAYS_SLUG_KEY.to_string()));
            }
            MapEntry::Vacant(slot) => {
                slot.insert(id);
            }
        }

        let record = Giveaway {
            id,
            slug: giveaway.slug,
            title: giveaway.title,
            description: giveaway.description,
            creator_name: giveaway.creator_name,
            creator_password: giveaway.creator_password,
            currencies: giveaway.currencies,
            allow_strict: giveaway.allow_strict,
            status: GiveawayStatus::Active,
            winner_id: None,
            created_at: Utc::now(),
            ends_at: giveaway.ends_at,
        };
        self.giveaways.insert(id, record.clone());
        Ok(record)
    }

    async fn find_giveaway(&self, id: Uuid) -> DatastoreResult<Option<Giveaway>> {
        Ok(self.giveaways.get(&id).map(|pair| pair.value().clone()))
    }

    async fn find_giveaway_by_slug(&self, slug: &str) -> DatastoreResult<Option<Giveaway>> {
        let id = match self.slugs.get(slug) {
            Some(pair) => *pair.value(),
            None => return Ok(None),
        };
        self.find_giveaway(id).await
    }

    async fn update_giveaway(&self, id: Uuid, update: GiveawayUpdate) -> DatastoreResult<Giveaway> {
        let mut record = self
            .giveaways
            .get_mut(&id)
            .ok_or_else(|| DatastoreError::NotFound("giveaway".to_string()))?;

        if let Some(status) = update.status {
            record.status = status;
        }
        if let Some(winner_id) = update.winner_id {
            record.winner_id = Some(winner_id);
        }

        Ok(record.clone())
    }

    async fn insert_entry(&self, entry: NewEntry) -> DatastoreResult<Entry> {
        if !self.giveaways.contains_key(&entry.giveaway_id) {
            return Err(DatastoreError::ForeignKeyViolation {
                table: ENTRIES_TABLE.to_string(),
                constraint: ENTRIES_GIVEAWAY_FKEY.to_string(),
            });
        }

        let id = Uuid::new_v4();
        let key = (entry.giveaway_id, entry.participant_name.clone());
        match self.participant_names.entry(key) {
            MapEntry::Occupied(_) => {
                return Err(DatastoreError::UniqueViolation(ENTRIES_PARTICIPANT_KEY.to_string()));
            }
            MapEntry::Vacant(slot) => {
                slot.insert(id);
            }
        }

        let record = Entry {
            id,
            giveaway_id: entry.giveaway_id,
            participant_name: entry.participant_name,
            reddit_name: entry.reddit_name,
            reddit_profile_link: entry.reddit_profile_link,
            ip_address: entry.ip_address,
            created_at: Utc::now(),
        };
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        self.entries.insert(id, (sequence, record.clone()));
        self.publish(EntryEvent::Insert(record.clone()));
        Ok(record)
    }

    async fn find_entries_by_address(
        &self,
        giveaway_id: Uuid,
        ip_address: &str,
        limit: usize,
    ) -> DatastoreResult<Vec<Entry>> {
        let entries = self
            .entries
            .iter()
            .filter(|pair| {
                let entry = &pair.value().1;
                entry.giveaway_id == giveaway_id && entry.ip_address.as_deref() == Some(ip_address)
            })
            .take(limit)
            .map(|pair| pair.value().1.clone())
            .collect::<Vec<Entry>>();
        Ok(entries)
    }

    async fn list_entries(&self, giveaway_id: Uuid) -> DatastoreResult<Vec<Entry>> {
        let mut entries = self
            .entries
            .iter()
            .filter(|pair| pair.value().1.giveaway_id == giveaway_id)
            .map(|pair| pair.value().clone())
            .collect::<Vec<(u64, Entry)>>();
        entries.sort_by(|(left_seq, left), (right_seq, right)| {
            right
                .created_at
                .cmp(&left.created_at)
                .then(right_seq.cmp(left_seq))
        });
        Ok(entries.into_iter().map(|(_, entry)| entry).collect())
    }

    async fn delete_entry(&self, id: Uuid) -> DatastoreResult<Entry> {
        let (_, (_, entry)) = self
            .entries
            .remove(&id)
            .ok_or_else(|| DatastoreError::NotFound("entry".to_string()))?;
        self.participant_names
            .remove(&(entry.giveaway_id, entry.participant_name.clone()));
        self.publish(EntryEvent::Delete(entry.clone()));
        Ok(entry)
    }

    fn subscribe(&self, giveaway_id: Uuid) -> EntryFeed {
        EntryFeed::new(giveaway_id, self.events.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use crate::db::memory::MemoryDatastore;
    use crate::db::models::{GiveawayStatus, GiveawayUpdate, NewEntry, NewGiveaway};
    use crate::db::schema::{ENTRIES_PARTICIPANT_KEY, GIVEAWAYS_SLUG_KEY};
    use crate::db::{Datastore, DatastoreError, EntryEvent};
    use crate::giveaway::currency::CurrencyPool;

    fn new_giveaway(slug: &str) -> NewGiveaway {
        let mut currencies = CurrencyPool::default();
        currencies.divine_orb = 1;
        NewGiveaway {
            slug: slug.to_string(),
            title: "Test giveaway".to_string(),
            description: None,
            creator_name: "Owner".to_string(),
            creator_password: "secret".to_string(),
            currencies,
            allow_strict: false,
            ends_at: None,
        }
    }

    fn new_entry(giveaway_id: Uuid, name: &str, ip_address: Option<&str>) -> NewEntry {
        NewEntry {
            giveaway_id,
            participant_name: name.to_string(),
            reddit_name: None,
            reddit_profile_link: None,
            ip_address: ip_address.map(|value| value.to_string()),
        }
    }

    #[tokio::test]
    async fn test_insert_giveaway_starts_active() {
        let store = MemoryDatastore::new();
        let giveaway = store.insert_giveaway(new_giveaway("test")).await.unwrap();

        assert_eq!(giveaway.status, GiveawayStatus::Active);
        assert_eq!(giveaway.winner_id, None);
        let found = store.find_giveaway_by_slug("test").await.unwrap();
        assert_eq!(found, Some(giveaway));
    }

    #[tokio::test]
    async fn test_get_error_for_duplicate_slug() {
        let store = MemoryDatastore::new();
        store.insert_giveaway(new_giveaway("test")).await.unwrap();

        let result = store.insert_giveaway(new_giveaway("test")).await;
        assert_eq!(
            result.unwrap_err(),
            DatastoreError::UniqueViolation(GIVEAWAYS_SLUG_KEY.to_string())
        );
    }

    #[tokio::test]
    async fn test_get_error_for_duplicate_participant_name() {
        let store = MemoryDatastore::new();
        let giveaway = store.insert_giveaway(new_giveaway("test")).await.unwrap();
        store
            .insert_entry(new_entry(giveaway.id, "Player", Some("10.0.0.1")))
            .await
            .unwrap();

        let result = store
            .insert_entry(new_entry(giveaway.id, "Player", Some("10.0.0.2")))
            .await;
        assert_eq!(
            result.unwrap_err(),
            DatastoreError::UniqueViolation(ENTRIES_PARTICIPANT_KEY.to_string())
        );
    }

    #[tokio::test]
    async fn test_same_name_is_allowed_in_another_giveaway() {
        let store = MemoryDatastore::new();
        let first = store.insert_giveaway(new_giveaway("first")).await.unwrap();
        let second = store.insert_giveaway(new_giveaway("second")).await.unwrap();

        store.insert_entry(new_entry(first.id, "Player", None)).await.unwrap();
        let result = store.insert_entry(new_entry(second.id, "Player", None)).await;
        assert_eq!(result.is_ok(), true);
    }

    #[tokio::test]
    async fn test_get_error_for_entry_of_unknown_giveaway() {
        let store = MemoryDatastore::new();

        let result = store.insert_entry(new_entry(Uuid::new_v4(), "Player", None)).await;
        assert!(matches!(
            result,
            Err(DatastoreError::ForeignKeyViolation { .. })
        ));
    }

    #[tokio::test]
    async fn test_find_entries_by_address() {
        let store = MemoryDatastore::new();
        let giveaway = store.insert_giveaway(new_giveaway("test")).await.unwrap();
        store
            .insert_entry(new_entry(giveaway.id, "First", Some("10.0.0.1")))
            .await
            .unwrap();
        store
            .insert_entry(new_entry(giveaway.id, "Second", Some("10.0.0.2")))
            .await
            .unwrap();

        let found = store
            .find_entries_by_address(giveaway.id, "10.0.0.1", 1)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].participant_name, "First");

        let missing = store
            .find_entries_by_address(giveaway.id, "10.0.0.3", 1)
            .await
            .unwrap();
        assert_eq!(missing.is_empty(), true);
    }

    #[tokio::test]
    async fn test_list_entries_newest_first() {
        let store = MemoryDatastore::new();
        let giveaway = store.insert_giveaway(new_giveaway("test")).await.unwrap();
        for name in ["First", "Second", "Third"] {
            store.insert_entry(new_entry(giveaway.id, name, None)).await.unwrap();
        }

        let names = store
            .list_entries(giveaway.id)
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.participant_name)
            .collect::<Vec<String>>();
        assert_eq!(names, vec!["Third", "Second", "First"]);
    }

    #[tokio::test]
    async fn test_delete_entry_frees_the_name() {
        let store = MemoryDatastore::new();
        let giveaway = store.insert_giveaway(new_giveaway("test")).await.unwrap();
        let entry = store.insert_entry(new_entry(giveaway.id, "Player", None)).await.unwrap();

        let deleted = store.delete_entry(entry.id).await.unwrap();
        assert_eq!(deleted, entry);
        assert_eq!(store.list_entries(giveaway.id).await.unwrap().is_empty(), true);

        let result = store.insert_entry(new_entry(giveaway.id, "Player", None)).await;
        assert_eq!(result.is_ok(), true);
    }

    #[tokio::test]
    async fn test_get_error_for_deleting_missing_entry() {
        let store = MemoryDatastore::new();

        let result = store.delete_entry(Uuid::new_v4()).await;
        assert_eq!(result.unwrap_err(), DatastoreError::NotFound("entry".to_string()));
    }

    #[tokio::test]
    async fn test_update_giveaway_status_and_winner() {
        let store = MemoryDatastore::new();
        let giveaway = store.insert_giveaway(new_giveaway("test")).await.unwrap();
        let winner_id = Uuid::new_v4();

        let update = GiveawayUpdate {
            status: Some(GiveawayStatus::Drawn),
            winner_id: Some(winner_id),
        };
        let updated = store.update_giveaway(giveaway.id, update).await.unwrap();
        assert_eq!(updated.status, GiveawayStatus::Drawn);
        assert_eq!(updated.winner_id, Some(winner_id));
    }

    #[tokio::test]
    async fn test_subscription_only_delivers_own_giveaway_events() {
        let store = MemoryDatastore::new();
        let watched = store.insert_giveaway(new_giveaway("watched")).await.unwrap();
        let other = store.insert_giveaway(new_giveaway("other")).await.unwrap();
        let mut feed = store.subscribe(watched.id);

        store.insert_entry(new_entry(other.id, "Noise", None)).await.unwrap();
        let entry = store.insert_entry(new_entry(watched.id, "Player", None)).await.unwrap();
        store.delete_entry(entry.id).await.unwrap();

        assert_eq!(feed.recv().await, Some(EntryEvent::Insert(entry.clone())));
        assert_eq!(feed.recv().await, Some(EntryEvent::Delete(entry)));
    }
}
