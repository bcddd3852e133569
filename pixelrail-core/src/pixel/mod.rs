//! Pixel storage
//!
//! The channel table and the flat buffer that holds every channel's bytes
//! back to back, plus the color-order permutation applied at emission time.

pub mod buffer;
pub mod channel;
pub mod order;

pub use buffer::PixelBuffer;
pub use channel::{Channel, ChannelTable};
pub use order::{ColorOrder, Scratch, StagingPlan, StagingStep};
