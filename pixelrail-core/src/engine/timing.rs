//! WS281x bit timing
//!
//! Every bit is one fixed-length period that starts high. A 0-bit drops low
//! early, a 1-bit drops low late:
//!
//! ```text
//!        ┌──────┐                    ┌────────────┐
//!  0-bit │ T0H  │       T0L          │    T1H     │  T1L     1-bit
//!  ──────┘      └────────────────────┘            └──────────
//!        |<────────── period ───────>|
//! ```
//!
//! | Phase | Target  | Accepted       |
//! |-------|---------|----------------|
//! | T0H   | 400 ns  | 250 – 550 ns   |
//! | T1H   | 800 ns  | 650 – 950 ns   |
//! | T0L   | 850 ns  | 700 – 1000 ns  |
//! | T1L   | 450 ns  | 300 – 600 ns   |
//! | Reset | ≥ 280 µs low latches the frame |
//!
//! Phases are busy-waited. On the RP2040 one delay loop step costs 3 core
//! cycles (24 ns at 125 MHz), see [`CycleTiming::in_steps`].

use crate::config::ConfigError;

/// Accepted deviation from each target phase
pub const TOLERANCE_NS: u32 = 150;

/// Nanosecond timing targets for one bit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BitTiming {
    /// High time of a 0-bit
    pub t0h_ns: u32,
    /// High time of a 1-bit
    pub t1h_ns: u32,
    /// Total bit period
    pub period_ns: u32,
    /// Low time that latches a frame
    pub reset_ns: u32,
}

impl Default for BitTiming {
    fn default() -> Self {
        Self::WS2812B
    }
}

impl BitTiming {
    /// WS2812B reference timing
    pub const WS2812B: Self = Self {
        t0h_ns: 400,
        t1h_ns: 800,
        period_ns: 1250,
        reset_ns: 280_000,
    };

    /// Check that the phases are ordered and fit in the period
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.t0h_ns == 0 || self.t0h_ns >= self.t1h_ns || self.t1h_ns >= self.period_ns {
            return Err(ConfigError::InvalidTiming);
        }
        if self.reset_ns <= self.period_ns {
            return Err(ConfigError::InvalidTiming);
        }
        Ok(())
    }

    /// Classify a measured high time
    ///
    /// Returns the bit value when `high_ns` is within [`TOLERANCE_NS`] of
    /// T0H or T1H, `None` otherwise.
    pub fn classify_high(&self, high_ns: u32) -> Option<bool> {
        if high_ns.abs_diff(self.t0h_ns) <= TOLERANCE_NS {
            Some(false)
        } else if high_ns.abs_diff(self.t1h_ns) <= TOLERANCE_NS {
            Some(true)
        } else {
            None
        }
    }

    /// Convert to busy-loop cycle counts for a `clk_hz` core clock
    ///
    /// `overhead_cycles` is the measured cost of the port write and loop
    /// bookkeeping around each delay; it is subtracted from every phase and
    /// each phase saturates at zero.
    pub fn to_cycles(&self, clk_hz: u32, overhead_cycles: u32) -> CycleTiming {
        let cycles = |ns: u32| -> u32 {
            let exact = (ns as u64 * clk_hz as u64 + 500_000_000) / 1_000_000_000;
            exact.min(u32::MAX as u64) as u32
        };

        let second_high_ns = self.t1h_ns.saturating_sub(self.t0h_ns);
        let low_ns = self.period_ns.saturating_sub(self.t1h_ns);

        CycleTiming {
            first_high: cycles(self.t0h_ns).saturating_sub(overhead_cycles),
            second_high: cycles(second_high_ns).saturating_sub(overhead_cycles),
            low: cycles(low_ns).saturating_sub(overhead_cycles),
            reset: cycles(self.reset_ns),
        }
    }
}

/// Calibrated delays for the three phases of a bit
///
/// ```text
/// set(active) ─ first_high ─ clear(zeros) ─ second_high ─ clear(active) ─ low
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CycleTiming {
    /// All active lines high; ends at T0H
    pub first_high: u32,
    /// Only 1-bit lines still high; ends at T1H
    pub second_high: u32,
    /// All lines low until the end of the period
    pub low: u32,
    /// Latch time after the last bit of a frame
    pub reset: u32,
}

impl CycleTiming {
    /// Re-express every phase in delay loop steps of `cycles_per_step`
    ///
    /// Rounds to the nearest step. The RP2040 busy loop (`subs` + taken
    /// `bne`) costs 3 cycles per step on the Cortex-M0+, so a phase can be
    /// off by at most 1 cycle (8 ns at 125 MHz), well inside
    /// [`TOLERANCE_NS`].
    pub fn in_steps(self, cycles_per_step: u32) -> Self {
        let per = cycles_per_step.max(1);
        let steps = |cycles: u32| -> u32 {
            ((cycles as u64 + (per / 2) as u64) / per as u64) as u32
        };

        Self {
            first_high: steps(self.first_high),
            second_high: steps(self.second_high),
            low: steps(self.low),
            reset: steps(self.reset),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_timing_is_valid() {
        assert_eq!(BitTiming::WS2812B.validate(), Ok(()));
    }

    #[test]
    fn test_invalid_timing() {
        let swapped = BitTiming {
            t0h_ns: 800,
            t1h_ns: 400,
            ..BitTiming::WS2812B
        };
        assert_eq!(swapped.validate(), Err(ConfigError::InvalidTiming));

        let too_long = BitTiming {
            t1h_ns: 1300,
            ..BitTiming::WS2812B
        };
        assert_eq!(too_long.validate(), Err(ConfigError::InvalidTiming));
    }

    #[test]
    fn test_cycles_at_125mhz() {
        let cycles = BitTiming::WS2812B.to_cycles(125_000_000, 0);
        assert_eq!(cycles.first_high, 50);
        assert_eq!(cycles.second_high, 50);
        assert_eq!(cycles.low, 56);
        assert_eq!(cycles.reset, 35_000);
    }

    #[test]
    fn test_overhead_saturates() {
        let cycles = BitTiming::WS2812B.to_cycles(16_000_000, 10);
        // 400 ns at 16 MHz is 6.4 cycles
        assert_eq!(cycles.first_high, 0);
        assert_eq!(cycles.second_high, 0);
        assert_eq!(cycles.low, 0);
    }

    #[test]
    fn test_steps_for_three_cycle_loop() {
        let cycles = BitTiming::WS2812B.to_cycles(125_000_000, 4);
        assert_eq!(cycles.first_high, 46);

        let steps = cycles.in_steps(3);
        assert_eq!(steps.first_high, 15);
        assert_eq!(steps.second_high, 15);
        assert_eq!(steps.low, 17);
        assert_eq!(steps.reset, 11_667);

        // One cycle per step leaves the counts untouched
        assert_eq!(cycles.in_steps(1), cycles);
    }

    #[test]
    fn test_classify_high() {
        let timing = BitTiming::WS2812B;
        assert_eq!(timing.classify_high(400), Some(false));
        assert_eq!(timing.classify_high(520), Some(false));
        assert_eq!(timing.classify_high(800), Some(true));
        assert_eq!(timing.classify_high(680), Some(true));
        assert_eq!(timing.classify_high(600), None);
        assert_eq!(timing.classify_high(1000), None);
    }
}
