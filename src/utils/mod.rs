//! Utility modules
//! 
//! This module contains common utilities used throughout the application,
//! including error handling, logging setup, time sources and helper functions.

pub mod clock;
pub mod errors;
pub mod logging;
pub mod helpers;

pub use clock::{Clock, FixedClock, SystemClock};
pub use errors::{EventHubError, ErrorKind, Result};
