//! GPIO implementations
//!
//! [`SioPort`] writes the single-cycle SIO set/clear registers directly, so
//! every bit-banged data line changes on the same clock edge.

use embassy_rp::gpio::Output;
use embassy_rp::pac;
use heapless::Vec;
use pixelrail_core::engine::MAX_BITBANG_LANES;
use pixelrail_hal::{CycleDelay, OutputPin, OutputPort};

/// Bank 0 GPIO port driven through SIO set/clear masks
///
/// Owns the data line [`Output`]s so the pins stay configured as SIO outputs
/// for as long as the port exists.
pub struct SioPort<'d> {
    _lines: Vec<Output<'d>, MAX_BITBANG_LANES>,
}

impl<'d> SioPort<'d> {
    /// Take ownership of the data lines
    ///
    /// Lines beyond [`MAX_BITBANG_LANES`] are returned in the error.
    pub fn new<I>(lines: I) -> Result<Self, Output<'d>>
    where
        I: IntoIterator<Item = Output<'d>>,
    {
        let mut owned = Vec::new();
        for line in lines {
            owned.push(line)?;
        }
        Ok(Self { _lines: owned })
    }
}

impl OutputPort for SioPort<'_> {
    #[inline(always)]
    fn set_mask(&mut self, mask: u32) {
        pac::SIO.gpio_out(0).value_set().write_value(mask);
    }

    #[inline(always)]
    fn clear_mask(&mut self, mask: u32) {
        pac::SIO.gpio_out(0).value_clr().write_value(mask);
    }
}

impl CycleDelay for SioPort<'_> {
    /// `subs` (1 cycle) plus a taken `bne` (2 cycles) on the Cortex-M0+
    const CYCLES_PER_STEP: u32 = 3;

    #[inline(always)]
    fn delay_steps(&mut self, steps: u32) {
        if steps == 0 {
            return;
        }
        // SAFETY: register-only countdown loop, no memory or stack access
        unsafe {
            core::arch::asm!(
                "1:",
                "subs {0}, #1",
                "bne 1b",
                inout(reg) steps => _,
                options(nomem, nostack),
            );
        }
    }
}

/// Strip power rail relay
pub struct RelayPin<'d> {
    pin: Output<'d>,
}

impl<'d> RelayPin<'d> {
    /// Wrap an output that is already driven low (rail off)
    pub fn new(pin: Output<'d>) -> Self {
        Self { pin }
    }
}

impl OutputPin for RelayPin<'_> {
    fn set_high(&mut self) {
        self.pin.set_high();
    }

    fn set_low(&mut self) {
        self.pin.set_low();
    }

    fn is_set_high(&self) -> bool {
        self.pin.is_set_high()
    }
}
