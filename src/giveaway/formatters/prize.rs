use crate::giveaway::currency::CurrencyPool;
use crate::giveaway::formatters::base::PrizeFormatter;

pub struct DefaultPrizeFormatter;

impl DefaultPrizeFormatter {
    pub fn new() -> Self {
        DefaultPrizeFormatter {}
    }
}

impl Default for DefaultPrizeFormatter {
    fn default() -> Self {
        DefaultPrizeFormatter::new()
    }
}

impl PrizeFormatter for DefaultPrizeFormatter {
    fn pretty_print(&self, pool: &CurrencyPool) -> Vec<String> {
        pool.offered()
            .into_iter()
            .map(|(currency, quantity)| format!("{}x {}", quantity, currency.display_name()))
            .collect()
    }

    fn summary(&self, pool: &CurrencyPool) -> String {
        let lines = self.pretty_print(pool);
        match lines.is_empty() {
            true => "no currency".to_string(),
            false => lines.join(", "),
        }
    }
}
