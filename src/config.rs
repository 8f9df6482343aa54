use std::env;
use std::fmt::Display;
use std::str::FromStr;

use tracing::{info, warn};

use crate::db::memory::DEFAULT_EVENTS_CAPACITY;
use crate::error::{Error, Result};
use crate::giveaway::cookies::DEFAULT_COOKIE_MAX_AGE;
use crate::giveaway::credential::DEFAULT_PASSWORD_LENGTH;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub password_length: usize,
    pub cookie_max_age: u64,
    pub events_capacity: usize,
    pub allowed_origin: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Config::from_lookup(|key| env::var(key).ok())
    }

    // Reads the settings through `lookup`, falling back to the defaults for
    // the missing ones.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Config {
            host: try_load(&lookup, "HOST", "0.0.0.0")?,
            port: try_load(&lookup, "PORT", "3000")?,
            password_length: try_load(&lookup, "PASSWORD_LENGTH", &DEFAULT_PASSWORD_LENGTH.to_string())?,
            cookie_max_age: try_load(&lookup, "COOKIE_MAX_AGE", &DEFAULT_COOKIE_MAX_AGE.to_string())?,
            events_capacity: try_load(&lookup, "EVENTS_CAPACITY", &DEFAULT_EVENTS_CAPACITY.to_string())?,
            allowed_origin: lookup("ALLOWED_ORIGIN").filter(|value| !value.trim().is_empty()),
        };

        if config.password_length == 0 {
            return Err(Error::Config("PASSWORD_LENGTH must be greater than zero".to_string()));
        }

        Ok(config)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "0.0.0.0".to_string(),
            port: 3000,
            password_length: DEFAULT_PASSWORD_LENGTH,
            cookie_max_age: DEFAULT_COOKIE_MAX_AGE,
            events_capacity: DEFAULT_EVENTS_CAPACITY,
            allowed_origin: None,
        }
    }
}

fn try_load<T, F>(lookup: &F, key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    value.trim().parse::<T>().map_err(|err| {
        warn!("Invalid {key} value: {err}");
        Error::Config(format!("Invalid {key} value '{value}': {err}"))
    })
}
