//! Background services

pub mod refresher;

pub use refresher::{PoolRefresher, PoolRefresherHandle};
