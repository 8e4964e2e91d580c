//! Configuration for the megaphone gateway: channel credentials, dispatch
//! limits, gateway bind address, and the seeded account list.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{discover_and_load, load_config},
    schema::MegaphoneConfig,
};
