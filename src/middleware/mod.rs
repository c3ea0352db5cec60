//! Middleware module
//!
//! This module contains request extractors shared by the handlers

pub mod actor;

pub use actor::{ACTOR_ID_HEADER, ACTOR_ROLE_HEADER};
