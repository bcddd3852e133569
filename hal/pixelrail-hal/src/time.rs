//! Timekeeping abstractions
//!
//! [`Clock`] is the coarse millisecond time base used by the watchdog and the
//! timed byte reads. [`CycleDelay`] is the fine-grained busy wait used by the
//! bit-bang serializer, counted in CPU cycles.

/// Monotonic millisecond clock
pub trait Clock {
    /// Milliseconds since an arbitrary, fixed epoch (usually boot)
    ///
    /// Must never go backwards.
    fn now_ms(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

/// Busy-wait delay counted in fixed-length loop steps
///
/// One step costs exactly [`CYCLES_PER_STEP`](Self::CYCLES_PER_STEP) CPU
/// cycles. Callers convert cycle budgets into steps once, outside the timed
/// path. Implementations must not yield, sleep, or enable interrupts. The
/// delay is allowed to be off by a small, constant number of cycles, which
/// the caller calibrates out.
pub trait CycleDelay {
    /// CPU cycles spent by one delay step
    const CYCLES_PER_STEP: u32 = 1;

    /// Spin for `steps` delay steps
    fn delay_steps(&mut self, steps: u32);
}
