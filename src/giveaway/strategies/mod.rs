pub mod base;
pub mod manual;
pub mod random;

pub use crate::giveaway::strategies::base::{SelectOptions, SelectionStrategy};
pub use crate::giveaway::strategies::manual::ManualSelectStrategy;
pub use crate::giveaway::strategies::random::RandomSelectStrategy;
