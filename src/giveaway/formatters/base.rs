use crate::giveaway::currency::CurrencyPool;

pub trait PrizeFormatter {
    // One line per offered currency, for listing the prizes.
    fn pretty_print(&self, pool: &CurrencyPool) -> Vec<String>;
    // Single-line summary used in logs and titles.
    fn summary(&self, pool: &CurrencyPool) -> String;
}
