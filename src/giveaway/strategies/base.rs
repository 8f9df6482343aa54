use std::sync::Arc;

use uuid::Uuid;

use crate::db::models::Entry;
use crate::error::Result;

pub struct SelectOptions<'a> {
    entries: &'a [Arc<Entry>],
    entry_id: Option<Uuid>,
}

impl<'a> SelectOptions<'a> {
    pub fn new(entries: &'a [Arc<Entry>]) -> Self {
        SelectOptions {
            entries,
            entry_id: None,
        }
    }

    // Designates the entry picked by the operator.
    pub fn with_entry_id(mut self, entry_id: Uuid) -> Self {
        self.entry_id = Some(entry_id);
        self
    }

    // Returns the entry pool of the giveaway.
    pub fn entries(&self) -> &'a [Arc<Entry>] {
        self.entries
    }

    // Returns the entry designated by the operator (if any).
    pub fn entry_id(&self) -> Option<Uuid> {
        self.entry_id
    }
}

pub trait SelectionStrategy: Send + Sync {
    // Returns the index of the chosen entry in the pool.
    fn select(&self, options: &SelectOptions) -> Result<usize>;
}
