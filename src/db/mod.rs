pub mod memory;
pub mod models;
pub mod schema;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error as ThisError;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;
use uuid::Uuid;

use crate::db::models::{Entry, Giveaway, GiveawayUpdate, NewEntry, NewGiveaway};

pub use crate::db::memory::MemoryDatastore;

pub type DatastoreResult<T> = std::result::Result<T, DatastoreError>;

#[derive(Debug, Clone, Eq, PartialEq, ThisError)]
pub enum DatastoreError {
    #[error("duplicate key value violates unique constraint \"{0}\"")]
    UniqueViolation(String),
    #[error("insert or update on table \"{table}\" violates foreign key constraint \"{constraint}\"")]
    ForeignKeyViolation { table: String, constraint: String },
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Backend(String),
}

// Row change notification published by the store.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "event", content = "entry", rename_all = "lowercase")]
pub enum EntryEvent {
    Insert(Entry),
    Delete(Entry),
}

impl EntryEvent {
    pub fn entry(&self) -> &Entry {
        match self {
            EntryEvent::Insert(entry) | EntryEvent::Delete(entry) => entry,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            EntryEvent::Insert(_) => "insert",
            EntryEvent::Delete(_) => "delete",
        }
    }
}

/// Change feed of a single giveaway's entries.
///
/// Wraps the store-wide broadcast channel and drops the notifications that
/// belong to other giveaways.
pub struct EntryFeed {
    giveaway_id: Uuid,
    receiver: broadcast::Receiver<EntryEvent>,
}

impl EntryFeed {
    pub fn new(giveaway_id: Uuid, receiver: broadcast::Receiver<EntryEvent>) -> Self {
        EntryFeed {
            giveaway_id,
            receiver,
        }
    }

    pub fn giveaway_id(&self) -> Uuid {
        self.giveaway_id
    }

    // Waits for the next event of the giveaway. Returns None once the store
    // has been dropped.
    pub async fn recv(&mut self) -> Option<EntryEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.entry().giveaway_id == self.giveaway_id => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        "Entry feed for giveaway {} lagged behind, {} events skipped",
                        self.giveaway_id, skipped
                    );
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

/// Managed datastore holding the `giveaways` and `entries` collections.
///
/// Implementations enforce the unique constraint on
/// `(giveaway_id, participant_name)` themselves and report it as
/// [`DatastoreError::UniqueViolation`].
#[async_trait]
pub trait Datastore: Send + Sync {
    async fn insert_giveaway(&self, giveaway: NewGiveaway) -> DatastoreResult<Giveaway>;

    async fn find_giveaway(&self, id: Uuid) -> DatastoreResult<Option<Giveaway>>;

    async fn find_giveaway_by_slug(&self, slug: &str) -> DatastoreResult<Option<Giveaway>>;

    async fn update_giveaway(&self, id: Uuid, update: GiveawayUpdate) -> DatastoreResult<Giveaway>;

    async fn insert_entry(&self, entry: NewEntry) -> DatastoreResult<Entry>;

    // Entries of the giveaway submitted from the given network address.
    async fn find_entries_by_address(
        &self,
        giveaway_id: Uuid,
        ip_address: &str,
        limit: usize,
    ) -> DatastoreResult<Vec<Entry>>;

    // Newest first.
    async fn list_entries(&self, giveaway_id: Uuid) -> DatastoreResult<Vec<Entry>>;

    async fn delete_entry(&self, id: Uuid) -> DatastoreResult<Entry>;

    fn subscribe(&self, giveaway_id: Uuid) -> EntryFeed;
}
