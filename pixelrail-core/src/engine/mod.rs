//! Waveform engine
//!
//! Everything needed to turn the pixel buffer into WS281x waveforms:
//!
//! - [`timing`]: nanosecond bit timing and its cycle-count calibration
//! - [`plan`]: per-frame lane ordering and interleave segments
//! - [`bitbang`]: the software serializer
//! - [`lanes`]: state machine / DMA resource planning for the hardware backend

pub mod bitbang;
pub mod lanes;
pub mod plan;
pub mod timing;

pub use bitbang::BitBangSerializer;
pub use lanes::{InitError, LaneAssignment, LanePlan, LanePlanner, ResourceBudget};
pub use plan::{FramePlan, Lane, Segment, MAX_BITBANG_LANES};
pub use timing::{BitTiming, CycleTiming};
