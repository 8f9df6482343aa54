use crate::error::{Error, Result};
use crate::giveaway::strategies::base::{SelectOptions, SelectionStrategy};

#[derive(Debug)]
pub struct ManualSelectStrategy;

impl ManualSelectStrategy {
    pub fn new() -> Self {
        ManualSelectStrategy {}
    }

    fn check_entries_are_defined(&self, options: &SelectOptions) -> Result<()> {
        if options.entries().is_empty() {
            let message = "The giveaway doesn't have any entries yet.".to_string();
            return Err(Error::Giveaway(message));
        }

        Ok(())
    }

    fn get_entry_index(&self, options: &SelectOptions) -> Result<usize> {
        let entry_id = options.entry_id().ok_or_else(|| {
            Error::Validation("The winning entry must be specified.".to_string())
        })?;

        options
            .entries()
            .iter()
            .position(|entry| entry.id == entry_id)
            .ok_or_else(|| Error::NotFound("The requested entry was not found.".to_string()))
    }
}

impl Default for ManualSelectStrategy {
    fn default() -> Self {
        ManualSelectStrategy::new()
    }
}

impl SelectionStrategy for ManualSelectStrategy {
    fn select(&self, options: &SelectOptions) -> Result<usize> {
        self.check_entries_are_defined(options)?;
        let index = self.get_entry_index(options)?;
        Ok(index)
    }
}
