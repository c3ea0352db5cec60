//! Test helpers module
//!
//! Shared setup for the integration tests: an in-memory test context with a
//! controllable clock, a recording dispatcher, fixture builders and the
//! optional PostgreSQL pool.

#![allow(dead_code)]

pub mod database_helper;
pub mod test_context;
pub mod test_data;

pub use database_helper::*;
pub use test_context::*;
pub use test_data::*;
