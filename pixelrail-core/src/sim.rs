//! Cycle-accurate simulated hardware for host tests
//!
//! [`SimPort`] stands in for a GPIO port plus busy-wait delay. Every port
//! write is recorded with a virtual cycle timestamp so tests can measure
//! pulse widths and decode the waveform back into bytes.

use std::cell::Cell;
use std::collections::VecDeque;
use std::vec::Vec;

use pixelrail_hal::{Clock, CycleDelay, OutputPin, OutputPort, UartRx, UartTx};

use crate::engine::BitTiming;
use crate::traits::{EmitError, Serializer};

/// Virtual core clock of the simulated port
pub const SIM_CLOCK_HZ: u32 = 125_000_000;

/// Cycles one port write takes
pub const SIM_WRITE_CYCLES: u32 = 2;

/// Simulated GPIO port with a cycle counter
#[derive(Debug, Default)]
pub struct SimPort {
    now: u64,
    level: u32,
    /// (cycle, port level after the write)
    trace: Vec<(u64, u32)>,
}

impl SimPort {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self) {
        self.now += SIM_WRITE_CYCLES as u64;
        self.trace.push((self.now, self.level));
    }

    /// (rise, fall) cycle pairs of every high pulse on `pin`
    pub fn pulses(&self, pin: u8) -> Vec<(u64, u64)> {
        let mask = 1u32 << pin;
        let mut pulses = Vec::new();
        let mut high_since = None;

        for &(at, level) in &self.trace {
            match (level & mask != 0, high_since) {
                (true, None) => high_since = Some(at),
                (false, Some(rise)) => {
                    pulses.push((rise, at));
                    high_since = None;
                }
                _ => {}
            }
        }
        pulses
    }

    pub fn pulse_count(&self, pin: u8) -> usize {
        self.pulses(pin).len()
    }

    pub fn rising_edges(&self, pin: u8) -> Vec<u64> {
        self.pulses(pin).into_iter().map(|(rise, _)| rise).collect()
    }

    /// (high time, rise-to-rise period) in ns for every pulse that has a successor
    pub fn pulses_ns(&self, pin: u8) -> Vec<(u32, u32)> {
        let pulses = self.pulses(pin);
        pulses
            .windows(2)
            .map(|pair| {
                let (rise, fall) = pair[0];
                (cycles_to_ns(fall - rise), cycles_to_ns(pair[1].0 - rise))
            })
            .collect()
    }

    /// Decode every pulse on `pin` into bytes, MSB first
    ///
    /// Panics on a pulse outside the tolerance window.
    pub fn decode(&self, pin: u8, timing: &BitTiming) -> Vec<u8> {
        let bits: Vec<bool> = self
            .pulses(pin)
            .into_iter()
            .map(|(rise, fall)| {
                let high_ns = cycles_to_ns(fall - rise);
                timing
                    .classify_high(high_ns)
                    .unwrap_or_else(|| panic!("pulse of {} ns out of tolerance", high_ns))
            })
            .collect();

        bits.chunks(8)
            .map(|chunk| chunk.iter().fold(0u8, |byte, &bit| (byte << 1) | bit as u8))
            .collect()
    }
}

fn cycles_to_ns(cycles: u64) -> u32 {
    (cycles * 1_000_000_000 / SIM_CLOCK_HZ as u64) as u32
}

impl OutputPort for SimPort {
    fn set_mask(&mut self, mask: u32) {
        self.level |= mask;
        self.record();
    }

    fn clear_mask(&mut self, mask: u32) {
        self.level &= !mask;
        self.record();
    }
}

impl CycleDelay for SimPort {
    fn delay_steps(&mut self, steps: u32) {
        self.now += steps as u64;
    }
}

/// [`SimPort`] behind a 3-cycle delay loop, like `subs`/`bne` on a Cortex-M0+
#[derive(Debug, Default)]
pub struct SteppedSimPort(pub SimPort);

impl OutputPort for SteppedSimPort {
    fn set_mask(&mut self, mask: u32) {
        self.0.set_mask(mask);
    }

    fn clear_mask(&mut self, mask: u32) {
        self.0.clear_mask(mask);
    }
}

impl CycleDelay for SteppedSimPort {
    const CYCLES_PER_STEP: u32 = 3;

    fn delay_steps(&mut self, steps: u32) {
        // Last `bne` falls through in one cycle
        self.0.now += (steps as u64 * 3).saturating_sub(1);
    }
}

/// Serializer that records frames instead of emitting them
#[derive(Debug, Default)]
pub struct RecordingSerializer {
    pub frames: Vec<Vec<u8>>,
    /// Channels that report a transfer in flight until waited on
    pub busy: Vec<usize>,
    /// Order of `wait_channel_idle` calls
    pub waits: Vec<usize>,
}

impl Serializer for RecordingSerializer {
    fn emit(&mut self, pixels: &[u8]) -> Result<(), EmitError> {
        self.frames.push(pixels.to_vec());
        Ok(())
    }

    fn wait_channel_idle(&mut self, index: usize) {
        self.waits.push(index);
        self.busy.retain(|&c| c != index);
    }
}

/// Host serial stand-in with scripted input
#[derive(Debug, Default)]
pub struct SimSerial {
    pub rx: VecDeque<u8>,
    pub tx: Vec<u8>,
}

impl SimSerial {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes.iter().copied());
    }
}

impl UartRx for SimSerial {
    type Error = ();

    fn try_read_byte(&mut self) -> Result<Option<u8>, ()> {
        Ok(self.rx.pop_front())
    }
}

impl UartTx for SimSerial {
    type Error = ();

    fn write_blocking(&mut self, data: &[u8]) -> Result<(), ()> {
        self.tx.extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ()> {
        Ok(())
    }
}

/// Millisecond clock that advances by `tick_ms` on every read
///
/// The tick lets blocking reads on an empty queue time out instead of
/// spinning forever.
#[derive(Debug, Default)]
pub struct SimClock {
    now_ms: Cell<u64>,
    tick_ms: u64,
}

impl SimClock {
    pub fn new(tick_ms: u64) -> Self {
        Self {
            now_ms: Cell::new(0),
            tick_ms,
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now_ms.set(self.now_ms.get() + ms);
    }

    pub fn peek(&self) -> u64 {
        self.now_ms.get()
    }
}

impl Clock for SimClock {
    fn now_ms(&self) -> u64 {
        let now = self.now_ms.get();
        self.now_ms.set(now + self.tick_ms);
        now
    }
}

/// Power rail stand-in
#[derive(Debug, Default)]
pub struct SimRail {
    pub on: bool,
    pub switches: usize,
}

impl OutputPin for SimRail {
    fn set_high(&mut self) {
        self.on = true;
        self.switches += 1;
    }

    fn set_low(&mut self) {
        self.on = false;
        self.switches += 1;
    }

    fn is_set_high(&self) -> bool {
        self.on
    }
}
