//! Software bit-bang serializer
//!
//! Drives up to [`MAX_BITBANG_LANES`] data lines that share one GPIO port.
//! Every bit is sent on all active lanes at once:
//!
//! ```text
//! set(active)      all active lines go high
//! wait T0H
//! clear(zeros)     lines sending a 0 drop
//! wait T1H - T0H
//! clear(active)    remaining lines drop
//! wait rest of period
//! ```
//!
//! The whole frame runs inside a critical section, so interrupts cannot
//! stretch a pulse past the latch threshold. UART bytes arriving meanwhile
//! are only kept as far as the hardware FIFO reaches.

use pixelrail_hal::{CycleDelay, OutputPort};

use crate::config::{ConfigError, BYTES_PER_PIXEL};
use crate::engine::plan::{FramePlan, MAX_BITBANG_LANES};
use crate::engine::timing::{BitTiming, CycleTiming};
use crate::pixel::ChannelTable;
use crate::traits::{EmitError, Serializer};

/// Cycle-counted serializer over a shared output port
pub struct BitBangSerializer<P> {
    port: P,
    plan: FramePlan,
    steps: CycleTiming,
}

impl<P: OutputPort + CycleDelay> BitBangSerializer<P> {
    /// Create a serializer for `table`
    ///
    /// `overhead_cycles` is the cost of one port write plus loop bookkeeping
    /// on the target, measured once per board. Phase delays are converted
    /// into the port's delay steps here, outside the timed loop.
    pub fn new(
        port: P,
        table: &ChannelTable,
        timing: &BitTiming,
        clk_hz: u32,
        overhead_cycles: u32,
    ) -> Result<Self, ConfigError> {
        timing.validate()?;
        let plan = FramePlan::new(table)?;

        Ok(Self {
            port,
            plan,
            steps: timing
                .to_cycles(clk_hz, overhead_cycles)
                .in_steps(P::CYCLES_PER_STEP),
        })
    }

    /// Lane order and segments in use
    pub fn plan(&self) -> &FramePlan {
        &self.plan
    }

    /// Calibrated phase delays in use, in delay steps
    pub fn steps(&self) -> CycleTiming {
        self.steps
    }

    /// Access the underlying port
    pub fn port(&self) -> &P {
        &self.port
    }

    fn emit_frame(&mut self, pixels: &[u8]) {
        let lanes = self.plan.lanes();
        let steps = self.steps;
        let mut slot = 0;
        // Running pixel start and byte within it, kept free of division
        let mut pixel = 0;
        let mut position = 0;

        for segment in self.plan.segments() {
            let active = &lanes[..segment.lanes];

            while slot < segment.end {
                let mut bytes = [0u8; MAX_BITBANG_LANES];
                for (byte, lane) in bytes.iter_mut().zip(active) {
                    *byte = lane.byte_at(pixels, pixel, position);
                }

                for bit in (0..8).rev() {
                    let mut zeros = 0u32;
                    for (byte, lane) in bytes.iter().zip(active) {
                        if byte & (1 << bit) == 0 {
                            zeros |= lane.mask;
                        }
                    }

                    self.port.set_mask(segment.active_mask);
                    self.port.delay_steps(steps.first_high);
                    self.port.clear_mask(zeros);
                    self.port.delay_steps(steps.second_high);
                    self.port.clear_mask(segment.active_mask);
                    self.port.delay_steps(steps.low);
                }

                slot += 1;
                position += 1;
                if position == BYTES_PER_PIXEL {
                    position = 0;
                    pixel += BYTES_PER_PIXEL;
                }
            }
        }
    }
}

impl<P: OutputPort + CycleDelay> Serializer for BitBangSerializer<P> {
    fn emit(&mut self, pixels: &[u8]) -> Result<(), EmitError> {
        let expected = self.plan.frame_len();
        if pixels.len() != expected {
            return Err(EmitError::FrameSizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }

        critical_section::with(|_| self.emit_frame(pixels));

        // Lines are already low; hold them there long enough to latch
        self.port.delay_steps(self.steps.reset);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChannelConfig;
    use crate::pixel::ColorOrder;
    use crate::sim::{SimPort, SteppedSimPort, SIM_CLOCK_HZ, SIM_WRITE_CYCLES};
    use proptest::prelude::*;

    fn serializer(configs: &[ChannelConfig]) -> (BitBangSerializer<SimPort>, ChannelTable) {
        let table = ChannelTable::new(configs).unwrap();
        let serializer = BitBangSerializer::new(
            SimPort::new(),
            &table,
            &BitTiming::WS2812B,
            SIM_CLOCK_HZ,
            SIM_WRITE_CYCLES,
        )
        .unwrap();
        (serializer, table)
    }

    #[test]
    fn test_single_lane_waveform() {
        let (mut serializer, _) = serializer(&[ChannelConfig::new(4, 1, ColorOrder::Rgb)]);
        serializer.emit(&[0xA5, 0x00, 0xFF]).unwrap();

        let port = serializer.port();
        assert_eq!(port.decode(4, &BitTiming::WS2812B), [0xA5, 0x00, 0xFF]);
        assert_eq!(port.pulse_count(4), 24);
    }

    #[test]
    fn test_pulse_widths_within_tolerance() {
        let (mut serializer, _) = serializer(&[ChannelConfig::new(0, 1, ColorOrder::Rgb)]);
        serializer.emit(&[0xF0, 0x0F, 0x55]).unwrap();

        let timing = BitTiming::WS2812B;
        for (high_ns, period_ns) in serializer.port().pulses_ns(0) {
            assert!(timing.classify_high(high_ns).is_some(), "high {} ns", high_ns);
            assert!(period_ns.abs_diff(timing.period_ns) <= 150, "period {} ns", period_ns);
        }
    }

    #[test]
    fn test_color_order_applied_per_channel() {
        let (mut serializer, _) = serializer(&[
            ChannelConfig::new(1, 1, ColorOrder::Grb),
            ChannelConfig::new(2, 1, ColorOrder::Bgr),
        ]);
        serializer.emit(&[0x11, 0x22, 0x33, 0x44, 0x55, 0x66]).unwrap();

        let port = serializer.port();
        assert_eq!(port.decode(1, &BitTiming::WS2812B), [0x22, 0x11, 0x33]);
        assert_eq!(port.decode(2, &BitTiming::WS2812B), [0x66, 0x55, 0x44]);
    }

    #[test]
    fn test_interleave_drops_exhausted_lanes() {
        // 4, 2 and 1 pixels on pins 10, 11, 12
        let (mut serializer, table) = serializer(&[
            ChannelConfig::new(10, 4, ColorOrder::Rgb),
            ChannelConfig::new(11, 2, ColorOrder::Rgb),
            ChannelConfig::new(12, 1, ColorOrder::Rgb),
        ]);
        let pixels: std::vec::Vec<u8> = (0..table.total_len() as u8).collect();
        serializer.emit(&pixels).unwrap();

        let port = serializer.port();
        let long = port.rising_edges(10);
        let mid = port.rising_edges(11);
        let short = port.rising_edges(12);
        assert_eq!(long.len(), 96);
        assert_eq!(mid.len(), 48);
        assert_eq!(short.len(), 24);

        // Bit k starts on every active lane at the same instant
        for (k, edge) in mid.iter().enumerate() {
            assert_eq!(*edge, long[k]);
        }
        for (k, edge) in short.iter().enumerate() {
            assert_eq!(*edge, long[k]);
        }
        // ...and strictly before bit k + 1 of any lane
        for pair in long.windows(2) {
            assert!(pair[0] < pair[1]);
        }

        assert_eq!(port.decode(10, &BitTiming::WS2812B), &pixels[0..12]);
        assert_eq!(port.decode(11, &BitTiming::WS2812B), &pixels[12..18]);
        assert_eq!(port.decode(12, &BitTiming::WS2812B), &pixels[18..21]);
    }

    #[test]
    fn test_three_cycle_delay_loop_keeps_timing() {
        let table = ChannelTable::new(&[ChannelConfig::new(0, 1, ColorOrder::Rgb)]).unwrap();
        let mut serializer = BitBangSerializer::new(
            SteppedSimPort::default(),
            &table,
            &BitTiming::WS2812B,
            SIM_CLOCK_HZ,
            4,
        )
        .unwrap();
        assert_eq!(serializer.steps().first_high, 15);

        serializer.emit(&[0x00, 0xFF, 0x0F]).unwrap();

        let timing = BitTiming::WS2812B;
        let port = &serializer.port().0;
        for (high_ns, period_ns) in port.pulses_ns(0) {
            assert!(timing.classify_high(high_ns).is_some(), "high {} ns", high_ns);
            assert!(period_ns.abs_diff(timing.period_ns) <= 150, "period {} ns", period_ns);
        }
        assert_eq!(port.decode(0, &timing), [0x00, 0xFF, 0x0F]);
    }

    #[test]
    fn test_frame_size_mismatch() {
        let (mut serializer, _) = serializer(&[ChannelConfig::new(0, 2, ColorOrder::Grb)]);
        assert_eq!(
            serializer.emit(&[0; 3]),
            Err(EmitError::FrameSizeMismatch {
                expected: 6,
                actual: 3
            })
        );
        assert_eq!(serializer.port().pulse_count(0), 0);
    }

    #[test]
    fn test_latch_gap_between_frames() {
        let (mut serializer, _) = serializer(&[ChannelConfig::new(3, 1, ColorOrder::Rgb)]);
        serializer.emit(&[0, 0, 0]).unwrap();
        serializer.emit(&[0, 0, 0]).unwrap();

        let edges = serializer.port().rising_edges(3);
        assert_eq!(edges.len(), 48);
        let gap_cycles = edges[24] - edges[23];
        let reset = BitTiming::WS2812B.to_cycles(SIM_CLOCK_HZ, 0).reset as u64;
        assert!(gap_cycles >= reset);
    }

    proptest! {
        #[test]
        fn prop_decoded_waveform_matches_strip_order(
            order_a in 0..6usize,
            order_b in 0..6usize,
            pixels_a in 1..4u16,
            pixels_b in 1..4u16,
            seed in any::<u64>(),
        ) {
            let orders = [ColorOrder::ALL[order_a], ColorOrder::ALL[order_b]];
            let (mut serializer, table) = serializer(&[
                ChannelConfig::new(5, pixels_a, orders[0]),
                ChannelConfig::new(6, pixels_b, orders[1]),
            ]);
            let frame: std::vec::Vec<u8> = (0..table.total_len())
                .map(|i| (seed >> ((i % 8) * 8)) as u8 ^ i as u8)
                .collect();
            serializer.emit(&frame).unwrap();

            for (channel, pin) in table.iter().zip([5u8, 6]) {
                let expected: std::vec::Vec<u8> = frame[channel.range()]
                    .chunks(3)
                    .flat_map(|px| channel.order.apply([px[0], px[1], px[2]]))
                    .collect();
                prop_assert_eq!(serializer.port().decode(pin, &BitTiming::WS2812B), expected);
            }
        }
    }
}
