//! WS281x state machine programs
//!
//! One program is assembled per color order from its
//! [staging plan](pixelrail_core::pixel::ColorOrder::staging_plan). Bytes
//! arrive from DMA in wire order; the program pulls them, parks the ones that
//! are not yet due in `y`/`isr`, and shifts them out in strip order.
//!
//! Every emitted byte uses the same eight-bit loop, driven by side-set on a
//! single data pin:
//!
//! ```text
//! bit:  out x, 1        side 0 [T3 - 1]   ; low tail of previous bit
//!       jmp !x zero     side 1 [T1 - 1]   ; high for every bit
//!       jmp !osre bit   side 1 [T2 - 1]   ; a 1 stays high
//!       jmp exit        side 0
//! zero: jmp !osre bit   side 0 [T2 - 1]   ; a 0 drops early
//! exit:
//! ```
//!
//! When the FIFO runs dry the state machine stalls on `pull` with the line
//! held low, which is the latch.

use embassy_rp::clocks::clk_sys_freq;
use embassy_rp::pio::{Common, Instance, LoadedProgram};
use fixed::types::U24F8;
use pio::{
    Assembler, JmpCondition, Label, MovDestination, MovOperation, MovSource, OutDestination,
    Program, SideSet,
};
use pixelrail_core::engine::lanes::program_len;
use pixelrail_core::engine::InitError;
use pixelrail_core::pixel::{ColorOrder, Scratch, StagingStep};

/// High time shared by 0 and 1 bits, in state machine cycles
pub const T1: u8 = 2;
/// Extra high time of a 1 bit
pub const T2: u8 = 5;
/// Low tail of a 1 bit
pub const T3: u8 = 3;

/// State machine cycles per WS281x bit
pub const CYCLES_PER_BIT: u32 = (T1 + T2 + T3) as u32;

/// WS281x bit rate in kHz
pub const BIT_RATE_KHZ: u32 = 800;

/// Instruction memory of one PIO block
pub const PROGRAM_SIZE: usize = 32;

/// Assemble the state machine program for `order`
pub fn assemble(order: ColorOrder) -> Program<PROGRAM_SIZE> {
    let side_set = SideSet::new(false, 1, false);
    let mut a: Assembler<PROGRAM_SIZE> = Assembler::new_with_side_set(side_set);

    let mut wrap_target = a.label();
    let mut wrap_source = a.label();
    a.bind(&mut wrap_target);

    let plan = order.staging_plan();
    let mut pending = plan.emit_count();

    for step in plan.steps() {
        match *step {
            StagingStep::PullEmit => {
                a.pull_with_side_set(false, true, 0);
                pending -= 1;
                emit_byte(&mut a, &mut wrap_target, pending == 0);
            }
            StagingStep::PullPark(reg) => {
                a.pull_with_side_set(false, true, 0);
                a.mov_with_side_set(park_into(reg), MovOperation::None, MovSource::OSR, 0);
            }
            StagingStep::EmitParked(reg) => {
                a.mov_with_side_set(MovDestination::OSR, MovOperation::None, restore_from(reg), 0);
                pending -= 1;
                emit_byte(&mut a, &mut wrap_target, pending == 0);
            }
        }
    }

    a.bind(&mut wrap_source);
    let program = a.assemble_with_wrap(wrap_source, wrap_target);
    debug_assert_eq!(program.code.len(), program_len(order) as usize);
    program
}

/// Shift the eight bits in OSR out on the side-set pin
///
/// The last byte of a pixel jumps straight back to the wrap target instead
/// of to a label past the end of the program.
fn emit_byte(a: &mut Assembler<PROGRAM_SIZE>, wrap_target: &mut Label, last: bool) {
    let mut bit = a.label();
    let mut zero = a.label();

    a.bind(&mut bit);
    a.out_with_delay_and_side_set(OutDestination::X, 1, T3 - 1, 0);
    a.jmp_with_delay_and_side_set(JmpCondition::XIsZero, &mut zero, T1 - 1, 1);
    a.jmp_with_delay_and_side_set(JmpCondition::OutputShiftRegisterNotEmpty, &mut bit, T2 - 1, 1);

    if last {
        a.jmp_with_side_set(JmpCondition::Always, wrap_target, 0);
        a.bind(&mut zero);
        a.jmp_with_delay_and_side_set(JmpCondition::OutputShiftRegisterNotEmpty, &mut bit, T2 - 1, 0);
    } else {
        let mut exit = a.label();
        a.jmp_with_side_set(JmpCondition::Always, &mut exit, 0);
        a.bind(&mut zero);
        a.jmp_with_delay_and_side_set(JmpCondition::OutputShiftRegisterNotEmpty, &mut bit, T2 - 1, 0);
        a.bind(&mut exit);
    }
}

fn park_into(reg: Scratch) -> MovDestination {
    match reg {
        Scratch::Y => MovDestination::Y,
        Scratch::Isr => MovDestination::ISR,
    }
}

fn restore_from(reg: Scratch) -> MovSource {
    match reg {
        Scratch::Y => MovSource::Y,
        Scratch::Isr => MovSource::ISR,
    }
}

/// PIO clock divider for [`BIT_RATE_KHZ`] at [`CYCLES_PER_BIT`]
pub fn clock_divider() -> U24F8 {
    let clock_khz = U24F8::from_num(clk_sys_freq() / 1000);
    clock_khz / (U24F8::from_num(BIT_RATE_KHZ) * CYCLES_PER_BIT)
}

/// A color order's program, loaded into one PIO block
pub struct Ws2812Program<'d, PIO: Instance> {
    order: ColorOrder,
    loaded: LoadedProgram<'d, PIO>,
}

impl<'d, PIO: Instance> Ws2812Program<'d, PIO> {
    /// Assemble and load the program for `order`
    ///
    /// `channel` is the first channel that needs it, reported if the block's
    /// instruction memory is already full.
    pub fn load(
        common: &mut Common<'d, PIO>,
        order: ColorOrder,
        channel: u8,
    ) -> Result<Self, InitError> {
        let program = assemble(order);
        let loaded = common
            .try_load_program(&program)
            .map_err(|_| InitError::InstructionMemoryFull { channel })?;

        Ok(Self { order, loaded })
    }

    /// Color order this program emits
    pub fn order(&self) -> ColorOrder {
        self.order
    }

    /// The loaded program, for state machine configuration
    pub fn loaded(&self) -> &LoadedProgram<'d, PIO> {
        &self.loaded
    }
}
