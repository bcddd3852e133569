//! Millisecond clock backed by the embassy time driver

use embassy_time::Instant;
use pixelrail_hal::Clock;

/// [`Clock`] reading the embassy monotonic timer
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now_ms(&self) -> u64 {
        Instant::now().as_millis()
    }
}
