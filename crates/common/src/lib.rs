//! Shared domain types for the megaphone outreach engine.
//!
//! Accounts, contacts, dispatch requests and per-recipient outcomes live
//! here, along with the account-store boundary trait.

pub mod store;
pub mod types;

pub use types::{
    Account, BatchResult, Contact, DispatchRequest, RecipientOutcome, SendStatus, Tier,
};
