//! PIO + DMA serializer
//!
//! Each channel gets one state machine running the program for its color
//! order and one DMA channel streaming its slice of the pixel buffer into the
//! state machine's TX FIFO. All transfers start back to back; `emit()` then
//! blocks on the longest channel only. Shorter channels are done by then in
//! practice, and [`Serializer::wait_channel_idle`] covers the rest before
//! their buffer range is overwritten.
//!
//! The DMA channels are driven through raw registers rather than
//! `embassy_rp::dma::Transfer`, since a transfer must outlive `emit()` and
//! lanes of different state machines live in one list.

use core::sync::atomic::{compiler_fence, Ordering};

use embassy_rp::dma::Channel as DmaChannel;
use embassy_rp::pac;
use embassy_rp::pac::dma::vals::{DataSize, TreqSel};
use embassy_rp::pio::{
    Common, Config, Direction as PioDirection, FifoJoin, Instance, PioPin, ShiftConfig,
    ShiftDirection, StateMachine,
};
use embassy_rp::Peri;
use embassy_time::{block_for, Duration};
use heapless::Vec;
use pixelrail_core::config::MAX_CHANNELS;
use pixelrail_core::engine::InitError;
use pixelrail_core::pixel::{Channel, ChannelTable};
use pixelrail_core::traits::{EmitError, Serializer};

use crate::pio::{clock_divider, Ws2812Program};

/// Low time enforced between two frames, in microseconds
pub const LATCH_US: u64 = 300;

/// PIO block a lane's state machine lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PioBlock {
    Pio0,
    Pio1,
}

impl PioBlock {
    /// Block for a planner block index
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(PioBlock::Pio0),
            1 => Some(PioBlock::Pio1),
            _ => None,
        }
    }

    pub fn index(self) -> u8 {
        match self {
            PioBlock::Pio0 => 0,
            PioBlock::Pio1 => 1,
        }
    }

    fn regs(self) -> pac::pio::Pio {
        match self {
            PioBlock::Pio0 => pac::PIO0,
            PioBlock::Pio1 => pac::PIO1,
        }
    }
}

/// One channel's state machine and DMA channel
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PioLane {
    channel: u8,
    block: PioBlock,
    machine: u8,
    dma: u8,
    offset: usize,
    len: usize,
}

impl PioLane {
    /// Configure and start a state machine for one channel
    ///
    /// The state machine is left enabled and stalled on its first `pull`
    /// with the data line low. It must stay alive (not dropped) for as long
    /// as the lane is used; the DMA channel is consumed.
    #[allow(clippy::too_many_arguments)]
    pub fn new<'d, PIO: Instance, const SM: usize, P: PioPin, D: DmaChannel>(
        common: &mut Common<'d, PIO>,
        sm: &mut StateMachine<'d, PIO, SM>,
        program: &Ws2812Program<'d, PIO>,
        pin: Peri<'d, P>,
        dma: Peri<'d, D>,
        block: PioBlock,
        index: usize,
        channel: &Channel,
    ) -> Result<Self, InitError> {
        let id = index as u8;
        if pin.pin() != channel.pin || program.order() != channel.order {
            return Err(InitError::LaneMismatch { channel: id });
        }

        let out_pin = common.make_pio_pin(pin);
        let mut cfg = Config::default();
        cfg.use_program(program.loaded(), &[&out_pin]);
        cfg.clock_divider = clock_divider();
        cfg.fifo_join = FifoJoin::TxOnly;
        cfg.shift_out = ShiftConfig {
            auto_fill: false,
            threshold: 8,
            direction: ShiftDirection::Left,
        };

        sm.set_config(&cfg);
        sm.set_pin_dirs(PioDirection::Out, &[&out_pin]);
        sm.set_enable(true);

        Ok(Self {
            channel: id,
            block,
            machine: SM as u8,
            dma: dma.number(),
            offset: channel.offset,
            len: channel.len,
        })
    }

    /// Channel table index this lane serves
    pub fn channel(&self) -> u8 {
        self.channel
    }

    fn dreq(&self) -> TreqSel {
        // PIOn TX requests are numbered n * 8 + state machine
        TreqSel::from(self.block.index() * 8 + self.machine)
    }

    /// Start streaming this lane's slice of `pixels`
    ///
    /// `pixels` must stay untouched until [`is_busy`](Self::is_busy) reports
    /// false.
    fn start(&self, pixels: &[u8]) {
        let bytes = &pixels[self.offset..self.offset + self.len];
        let regs = pac::DMA.ch(self.dma as usize);
        let fifo = self.block.regs().txf(self.machine as usize).as_ptr() as u32;

        regs.read_addr().write_value(bytes.as_ptr() as u32);
        regs.write_addr().write_value(fifo);
        regs.trans_count().write_value(bytes.len() as u32);
        compiler_fence(Ordering::SeqCst);
        regs.ctrl_trig().write(|w| {
            w.set_treq_sel(self.dreq());
            w.set_data_size(DataSize::SIZE_BYTE);
            w.set_incr_read(true);
            w.set_incr_write(false);
            w.set_chain_to(self.dma);
            w.set_en(true);
        });
        compiler_fence(Ordering::SeqCst);
    }

    /// DMA transfer still running
    fn is_busy(&self) -> bool {
        pac::DMA.ch(self.dma as usize).ctrl_trig().read().busy()
    }

    /// State machine has consumed every queued byte
    fn is_drained(&self) -> bool {
        self.block.regs().fstat().read().txempty() & (1 << self.machine) != 0
    }

    fn wait_idle(&self) {
        while self.is_busy() {}
        compiler_fence(Ordering::SeqCst);
    }

    fn wait_drained(&self) {
        self.wait_idle();
        while !self.is_drained() {}
    }
}

/// Hardware-assisted serializer over a set of [`PioLane`]s
pub struct PioSerializer {
    lanes: Vec<PioLane, MAX_CHANNELS>,
    longest: usize,
    frame_len: usize,
    latch: Duration,
}

impl PioSerializer {
    /// Combine lanes into a serializer for `table`
    ///
    /// `lanes` must hold exactly one lane per channel, in table order.
    pub fn new(table: &ChannelTable, lanes: Vec<PioLane, MAX_CHANNELS>) -> Result<Self, InitError> {
        for (index, channel) in table.iter().enumerate() {
            let matches = lanes.get(index).is_some_and(|lane| {
                lane.channel as usize == index
                    && lane.offset == channel.offset
                    && lane.len == channel.len
            });
            if !matches {
                return Err(InitError::LaneMismatch {
                    channel: index as u8,
                });
            }
        }
        if lanes.len() != table.len() {
            return Err(InitError::LaneMismatch {
                channel: table.len() as u8,
            });
        }

        Ok(Self {
            lanes,
            longest: table.longest(),
            frame_len: table.total_len(),
            latch: Duration::from_micros(LATCH_US),
        })
    }
}

impl Serializer for PioSerializer {
    fn emit(&mut self, pixels: &[u8]) -> Result<(), EmitError> {
        if pixels.len() != self.frame_len {
            return Err(EmitError::FrameSizeMismatch {
                expected: self.frame_len,
                actual: pixels.len(),
            });
        }

        // Previous frame fully shifted out, then held low long enough to latch
        for lane in &self.lanes {
            lane.wait_drained();
        }
        block_for(self.latch);

        for lane in &self.lanes {
            lane.start(pixels);
        }

        if let Some(lane) = self.lanes.get(self.longest) {
            lane.wait_idle();
        }

        Ok(())
    }

    fn wait_channel_idle(&mut self, index: usize) {
        if let Some(lane) = self.lanes.get(index) {
            lane.wait_idle();
        }
    }
}

impl Drop for PioSerializer {
    fn drop(&mut self) {
        for lane in &self.lanes {
            lane.wait_idle();
        }
    }
}
