use rand::Rng;

use crate::error::{Error, Result};
use crate::giveaway::strategies::base::{SelectOptions, SelectionStrategy};

// Picks an index uniformly from [0, len). `len` must be positive.
pub fn pick_index<R: Rng + ?Sized>(rng: &mut R, len: usize) -> usize {
    rng.random_range(0..len)
}

#[derive(Debug)]
pub struct RandomSelectStrategy;

impl RandomSelectStrategy {
    pub fn new() -> Self {
        RandomSelectStrategy {}
    }
}

impl Default for RandomSelectStrategy {
    fn default() -> Self {
        RandomSelectStrategy::new()
    }
}

impl SelectionStrategy for RandomSelectStrategy {
    fn select(&self, options: &SelectOptions) -> Result<usize> {
        let entries_count = options.entries().len();
        if entries_count == 0 {
            let message = "The giveaway doesn't have any entries yet.".to_string();
            return Err(Error::Giveaway(message));
        }

        Ok(pick_index(&mut rand::rng(), entries_count))
    }
}
