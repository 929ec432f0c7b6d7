//! Telaio: a small service frame with deterministic, fail-fast bootstrap.
//!
//! The crate wires four infrastructure concerns behind one entry point:
//! typed configuration, structured logging, a pooled Postgres handle, and a
//! Redis cache handle, composed with an HTTP router into an [`App`] plus an
//! idempotent [`Teardown`]. Construction is strictly ordered; the first
//! provider failure aborts bootstrap and rolls back what was acquired.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod infra;

pub use bootstrap::{App, Teardown, initialize};
