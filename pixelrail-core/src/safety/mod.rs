//! Safety monitoring
//!
//! Cuts strip power when the host goes quiet.

pub mod watchdog;

pub use watchdog::{Watchdog, WatchdogStatus, DEFAULT_TIMEOUT_MS};
