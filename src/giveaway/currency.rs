use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Currency {
    DivineOrb,
    ExaltedOrb,
    ChaosOrb,
    MirrorOfKalandra,
    OrbOfAlchemy,
    OrbOfAugmentation,
    OrbOfChance,
    OrbOfTransmutation,
    RegalOrb,
    VaalOrb,
    AnnulmentOrb,
}

impl Currency {
    pub const ALL: [Currency; 11] = [
        Currency::DivineOrb,
        Currency::ExaltedOrb,
        Currency::ChaosOrb,
        Currency::MirrorOfKalandra,
        Currency::OrbOfAlchemy,
        Currency::OrbOfAugmentation,
        Currency::OrbOfChance,
        Currency::OrbOfTransmutation,
        Currency::RegalOrb,
        Currency::VaalOrb,
        Currency::AnnulmentOrb,
    ];

    // Name used by the clients in request payloads.
    pub fn name(&self) -> &'static str {
        match self {
            Currency::DivineOrb => "divineOrb",
            Currency::ExaltedOrb => "exaltedOrb",
            Currency::ChaosOrb => "chaosOrb",
            Currency::MirrorOfKalandra => "mirrorOfKalandra",
            Currency::OrbOfAlchemy => "orbOfAlchemy",
            Currency::OrbOfAugmentation => "orbOfAugmentation",
            Currency::OrbOfChance => "orbOfChance",
            Currency::OrbOfTransmutation => "orbOfTransmutation",
            Currency::RegalOrb => "regalOrb",
            Currency::VaalOrb => "vaalOrb",
            Currency::AnnulmentOrb => "annulmentOrb",
        }
    }

    // Name of the counter column in the `giveaways` collection.
    pub fn column_name(&self) -> &'static str {
        match self {
            Currency::DivineOrb => "divine_orb",
            Currency::ExaltedOrb => "exalted_orb",
            Currency::ChaosOrb => "chaos_orb",
            Currency::MirrorOfKalandra => "mirror_of_kalandra",
            Currency::OrbOfAlchemy => "orb_of_alchemy",
            Currency::OrbOfAugmentation => "orb_of_augmentation",
            Currency::OrbOfChance => "orb_of_chance",
            Currency::OrbOfTransmutation => "orb_of_transmutation",
            Currency::RegalOrb => "regal_orb",
            Currency::VaalOrb => "vaal_orb",
            Currency::AnnulmentOrb => "annulment_orb",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Currency::DivineOrb => "Divine Orb",
            Currency::ExaltedOrb => "Exalted Orb",
            Currency::ChaosOrb => "Chaos Orb",
            Currency::MirrorOfKalandra => "Mirror of Kalandra",
            Currency::OrbOfAlchemy => "Orb of Alchemy",
            Currency::OrbOfAugmentation => "Orb of Augmentation",
            Currency::OrbOfChance => "Orb of Chance",
            Currency::OrbOfTransmutation => "Orb of Transmutation",
            Currency::RegalOrb => "Regal Orb",
            Currency::VaalOrb => "Vaal Orb",
            Currency::AnnulmentOrb => "Orb of Annulment",
        }
    }

    pub fn from_column_name(column_name: &str) -> Option<Currency> {
        Currency::ALL
            .into_iter()
            .find(|currency| currency.column_name() == column_name)
    }
}

impl FromStr for Currency {
    type Err = Error;

    // Accepts both the payload name and the column name.
    fn from_str(value: &str) -> Result<Self> {
        Currency::ALL
            .into_iter()
            .find(|currency| currency.name() == value)
            .or_else(|| Currency::from_column_name(value))
            .ok_or_else(|| Error::Validation(format!("Unknown currency: {}", value)))
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Quantity counters of every currency offered by a giveaway. Serialized as
/// one field per column.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrencyPool {
    pub divine_orb: u32,
    pub exalted_orb: u32,
    pub chaos_orb: u32,
    pub mirror_of_kalandra: u32,
    pub orb_of_alchemy: u32,
    pub orb_of_augmentation: u32,
    pub orb_of_chance: u32,
    pub orb_of_transmutation: u32,
    pub regal_orb: u32,
    pub vaal_orb: u32,
    pub annulment_orb: u32,
}

impl CurrencyPool {
    // Builds the pool from a "currency name -> quantity" mapping. Currencies
    // missing from the mapping stay at zero.
    // A currency may be named only once, by either of its names.
    pub fn from_quantities(quantities: &HashMap<String, i64>) -> Result<Self> {
        let mut pool = CurrencyPool::default();
        let mut seen = HashSet::new();
        for (name, quantity) in quantities {
            let currency = name.parse::<Currency>()?;
            if !seen.insert(currency) {
                return Err(Error::Validation(format!(
                    "The quantity of {} is given more than once.",
                    currency.display_name()
                )));
            }

            if *quantity < 0 {
                return Err(Error::Validation(format!(
                    "The quantity of {} must be a non-negative number.",
                    currency.display_name()
                )));
            }
            let quantity = u32::try_from(*quantity).map_err(|_| {
                Error::Validation(format!(
                    "The quantity of {} must not exceed {}.",
                    currency.display_name(),
                    u32::MAX
                ))
            })?;
            pool.set(currency, quantity);
        }
        Ok(pool)
    }

    pub fn get(&self, currency: Currency) -> u32 {
        match currency {
            Currency::DivineOrb => self.divine_orb,
            Currency::ExaltedOrb => self.exalted_orb,
            Currency::ChaosOrb => self.chaos_orb,
            Currency::MirrorOfKalandra => self.mirror_of_kalandra,
            Currency::OrbOfAlchemy => self.orb_of_alchemy,
            Currency::OrbOfAugmentation => self.orb_of_augmentation,
            Currency::OrbOfChance => self.orb_of_chance,
            Currency::OrbOfTransmutation => self.orb_of_transmutation,
            Currency::RegalOrb => self.regal_orb,
            Currency::VaalOrb => self.vaal_orb,
            Currency::AnnulmentOrb => self.annulment_orb,
        }
    }

    pub fn set(&mut self, currency: Currency, quantity: u32) {
        let counter = match currency {
            Currency::DivineOrb => &mut self.divine_orb,
            Currency::ExaltedOrb => &mut self.exalted_orb,
            Currency::ChaosOrb => &mut self.chaos_orb,
            Currency::MirrorOfKalandra => &mut self.mirror_of_kalandra,
            Currency::OrbOfAlchemy => &mut self.orb_of_alchemy,
            Currency::OrbOfAugmentation => &mut self.orb_of_augmentation,
            Currency::OrbOfChance => &mut self.orb_of_chance,
            Currency::OrbOfTransmutation => &mut self.orb_of_transmutation,
            Currency::RegalOrb => &mut self.regal_orb,
            Currency::VaalOrb => &mut self.vaal_orb,
            Currency::AnnulmentOrb => &mut self.annulment_orb,
        };
        *counter = quantity;
    }

    // Currencies with a non-zero quantity, in catalogue order.
    pub fn offered(&self) -> Vec<(Currency, u32)> {
        Currency::ALL
            .into_iter()
            .map(|currency| (currency, self.get(currency)))
            .filter(|(_, quantity)| *quantity > 0)
            .collect()
    }

    pub fn has_any(&self) -> bool {
        !self.offered().is_empty()
    }
}
