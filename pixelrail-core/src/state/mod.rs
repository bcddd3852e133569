//! Runtime state
//!
//! The single owned aggregate the controller mutates: channel table, pixel
//! buffer, pending-show flag, power state and watchdog bookkeeping.

pub mod engine;

pub use engine::EngineState;
