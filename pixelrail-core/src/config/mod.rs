//! Configuration types
//!
//! Static wiring and link settings. The firmware builds these from
//! `strips.toml` at compile time; nothing here changes after boot.

pub mod types;

pub use types::*;
