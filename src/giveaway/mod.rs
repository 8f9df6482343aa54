pub mod admission;
pub mod cookies;
pub mod credential;
pub mod currency;
pub mod formatters;
pub mod manager;
pub mod selector;
pub mod strategies;
pub mod utils;
