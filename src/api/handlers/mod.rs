//! API request handlers

pub mod dns;
pub mod fetch;
pub mod health;
pub mod proxy;
