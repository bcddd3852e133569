//! Hardware abstraction traits
//!
//! These traits define the interface between the application logic
//! and the waveform backends.

pub mod serializer;

pub use serializer::{EmitError, Serializer};
