pub mod base;
pub mod prize;

pub use crate::giveaway::formatters::base::PrizeFormatter;
pub use crate::giveaway::formatters::prize::DefaultPrizeFormatter;
