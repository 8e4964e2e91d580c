//! HTTP surface for the outreach engine.
//!
//! Thin mapping from the core's error taxonomy to status codes: denial →
//! 403, whole-batch errors → 500, a batch result (including embedded
//! per-recipient failures) → 200. Caller identity arrives pre-validated
//! from the upstream auth layer; this crate never sees credentials.

pub mod server;

pub use server::{GatewayState, build_app, start_gateway};
