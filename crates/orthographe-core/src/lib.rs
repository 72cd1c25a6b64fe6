//! Orthographe core crate - shared domain types, configuration, errors and events.

pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::TrainerConfig;
pub use error::{Result, TrainerError};
pub use events::DomainEvent;
pub use types::*;
