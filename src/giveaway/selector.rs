use std::sync::Arc;

use crossbeam::atomic::AtomicCell;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::models::Entry;
use crate::error::{Error, Result};
use crate::giveaway::strategies::{SelectOptions, SelectionStrategy};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CursorStep {
    #[default]
    Stay,
    Next,
    Previous,
}

/// Walks through the entry pool of a giveaway and picks the winner.
///
/// The cursor mirrors what the operator is looking at. Choosing a winner
/// moves the cursor onto the chosen entry; recording it on the giveaway is
/// up to the caller.
pub struct WinnerSelector {
    entries: Vec<Arc<Entry>>,
    // Index of the entry currently shown to the operator.
    current: AtomicCell<usize>,
    // The entry already recorded as the winner, if any.
    winner_id: Option<Uuid>,
}

impl WinnerSelector {
    pub fn new(entries: Vec<Entry>, winner_id: Option<Uuid>) -> Self {
        WinnerSelector {
            entries: entries.into_iter().map(Arc::new).collect(),
            current: AtomicCell::new(0),
            winner_id,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current.load()
    }

    // Returns the entry under the cursor.
    pub fn current(&self) -> Option<Arc<Entry>> {
        self.entries.get(self.current.load()).cloned()
    }

    // Moves the cursor forward. Stays on the last entry.
    pub fn next(&self) -> Option<Arc<Entry>> {
        let index = self.current.load();
        if index + 1 < self.entries.len() {
            self.current.store(index + 1);
        }
        self.current()
    }

    // Moves the cursor back. Stays on the first entry.
    pub fn previous(&self) -> Option<Arc<Entry>> {
        let index = self.current.load();
        if index > 0 {
            self.current.store(index - 1);
        }
        self.current()
    }

    pub fn step(&self, step: CursorStep) -> Option<Arc<Entry>> {
        match step {
            CursorStep::Stay => self.current(),
            CursorStep::Next => self.next(),
            CursorStep::Previous => self.previous(),
        }
    }

    pub fn slide_to(&self, index: usize) -> Result<Arc<Entry>> {
        match self.entries.get(index) {
            Some(entry) => {
                self.current.store(index);
                Ok(entry.clone())
            }
            None => Err(Error::NotFound("The requested entry was not found.".to_string())),
        }
    }

    // "Showing 2 of 5", or an empty string for an empty pool.
    pub fn position_label(&self) -> String {
        match self.entries.is_empty() {
            true => String::new(),
            false => format!("Showing {} of {}", self.current.load() + 1, self.entries.len()),
        }
    }

    pub fn is_winner(&self, entry: &Entry) -> bool {
        self.winner_id == Some(entry.id)
    }

    // Runs the strategy over the pool and slides to the chosen entry.
    // Doesn't check whether a winner was recorded before.
    pub fn choose(&self, strategy: &dyn SelectionStrategy, entry_id: Option<Uuid>) -> Result<Arc<Entry>> {
        let mut options = SelectOptions::new(&self.entries);
        if let Some(entry_id) = entry_id {
            options = options.with_entry_id(entry_id);
        }

        let index = strategy.select(&options)?;
        self.slide_to(index)
    }
}
