//! Resource planning for the state machine + DMA backend
//!
//! Each channel needs one state machine to generate its waveform and one DMA
//! channel to feed it. State machines in the same block share instruction
//! memory, so channels with the same color order reuse one loaded program.
//!
//! The program shape is fixed; its length depends only on the color order's
//! [staging plan](crate::pixel::ColorOrder::staging_plan):
//!
//! | Step          | Instructions                      |
//! |---------------|-----------------------------------|
//! | `PullEmit`    | pull + byte loop                  |
//! | `PullPark`    | pull + mov                        |
//! | `EmitParked`  | mov + byte loop                   |

use heapless::Vec;

use crate::config::{ConfigError, MAX_CHANNELS};
use crate::pixel::{ChannelTable, ColorOrder, StagingStep};

/// Instructions in the unrolled 8-bit shift loop
pub const BYTE_LOOP_LEN: u8 = 5;

/// Upper bound on state machine blocks in any budget
pub const MAX_BLOCKS: usize = 4;

/// Upper bound on loaded programs (one per color order per block)
pub const MAX_PROGRAMS: usize = 8;

/// Errors that abort startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitError {
    /// Every state machine is taken
    NoStateMachine { channel: u8 },
    /// Every DMA channel is taken
    NoDmaChannel { channel: u8 },
    /// No block has room for another program
    InstructionMemoryFull { channel: u8 },
    /// A lane was wired to a different pin than the channel table says
    LaneMismatch { channel: u8 },
    /// Invalid static configuration
    Config(ConfigError),
}

impl From<ConfigError> for InitError {
    fn from(e: ConfigError) -> Self {
        InitError::Config(e)
    }
}

/// Instruction count of the state machine program for `order`
pub fn program_len(order: ColorOrder) -> u8 {
    order
        .staging_plan()
        .steps()
        .iter()
        .map(|step| match step {
            StagingStep::PullEmit => 1 + BYTE_LOOP_LEN,
            StagingStep::PullPark(_) => 2,
            StagingStep::EmitParked(_) => 1 + BYTE_LOOP_LEN,
        })
        .sum()
}

/// Hardware resources available to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ResourceBudget {
    /// State machine blocks
    pub blocks: u8,
    /// State machines per block
    pub machines_per_block: u8,
    /// DMA channels usable for strips
    pub dma_channels: u8,
    /// Instruction memory per block
    pub instructions_per_block: u8,
}

impl ResourceBudget {
    /// RP2040: two PIO blocks of four state machines, 12 DMA channels
    pub const RP2040: Self = Self {
        blocks: 2,
        machines_per_block: 4,
        dma_channels: 12,
        instructions_per_block: 32,
    };
}

/// Where one channel runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LaneAssignment {
    /// Channel table index
    pub channel: usize,
    /// State machine block
    pub block: u8,
    /// State machine within the block
    pub machine: u8,
    /// DMA channel
    pub dma: u8,
    /// Index into [`LanePlan::programs`]
    pub program: usize,
}

/// A program loaded into one block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ProgramSlot {
    pub block: u8,
    pub order: ColorOrder,
    pub len: u8,
}

/// Complete resource assignment for a channel table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanePlan {
    pub lanes: Vec<LaneAssignment, MAX_CHANNELS>,
    pub programs: Vec<ProgramSlot, MAX_PROGRAMS>,
}

/// Assigns state machines, DMA channels and program slots
#[derive(Debug, Clone, Copy)]
pub struct LanePlanner {
    budget: ResourceBudget,
}

impl LanePlanner {
    pub fn new(budget: ResourceBudget) -> Self {
        Self { budget }
    }

    /// Plan every channel, or fail on the first one that does not fit
    pub fn plan(&self, table: &ChannelTable) -> Result<LanePlan, InitError> {
        let blocks = (self.budget.blocks as usize).min(MAX_BLOCKS);
        let mut machines_used = [0u8; MAX_BLOCKS];
        let mut instructions_used = [0u8; MAX_BLOCKS];
        let mut plan = LanePlan {
            lanes: Vec::new(),
            programs: Vec::new(),
        };

        for (index, channel) in table.iter().enumerate() {
            let id = index as u8;
            let per_block = self.budget.machines_per_block;
            let has_machine = |block: usize, used: &[u8; MAX_BLOCKS]| used[block] < per_block;

            // Reuse a loaded program if its block still has a free machine
            let reuse = plan.programs.iter().position(|p| {
                p.order == channel.order && has_machine(p.block as usize, &machines_used)
            });

            let program = match reuse {
                Some(program) => program,
                None => {
                    let len = program_len(channel.order);
                    let free = (0..blocks).find(|&b| {
                        has_machine(b, &machines_used)
                            && instructions_used[b] as u16 + len as u16
                                <= self.budget.instructions_per_block as u16
                    });
                    let block = match free {
                        Some(block) => block,
                        None if (0..blocks).any(|b| has_machine(b, &machines_used)) => {
                            return Err(InitError::InstructionMemoryFull { channel: id });
                        }
                        None => return Err(InitError::NoStateMachine { channel: id }),
                    };

                    instructions_used[block] += len;
                    plan.programs
                        .push(ProgramSlot {
                            block: block as u8,
                            order: channel.order,
                            len,
                        })
                        .map_err(|_| InitError::InstructionMemoryFull { channel: id })?;
                    plan.programs.len() - 1
                }
            };

            if index >= self.budget.dma_channels as usize {
                return Err(InitError::NoDmaChannel { channel: id });
            }

            let block = plan.programs[program].block;
            let machine = machines_used[block as usize];
            machines_used[block as usize] += 1;

            plan.lanes
                .push(LaneAssignment {
                    channel: index,
                    block,
                    machine,
                    dma: id,
                    program,
                })
                .map_err(|_| InitError::Config(ConfigError::TooManyChannels))?;
        }

        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChannelConfig;

    fn table(orders: &[ColorOrder]) -> ChannelTable {
        let configs: std::vec::Vec<ChannelConfig> = orders
            .iter()
            .enumerate()
            .map(|(i, &order)| ChannelConfig::new(10 + i as u8, 30, order))
            .collect();
        ChannelTable::new(&configs).unwrap()
    }

    #[test]
    fn test_program_lengths() {
        assert_eq!(program_len(ColorOrder::Rgb), 18);
        assert_eq!(program_len(ColorOrder::Grb), 20);
        assert_eq!(program_len(ColorOrder::Bgr), 22);
        for order in ColorOrder::ALL {
            assert!(program_len(order) <= ResourceBudget::RP2040.instructions_per_block);
        }
    }

    #[test]
    fn test_same_order_shares_program() {
        let plan = LanePlanner::new(ResourceBudget::RP2040)
            .plan(&table(&[ColorOrder::Grb; 3]))
            .unwrap();

        assert_eq!(plan.programs.len(), 1);
        let slots: std::vec::Vec<(u8, u8, u8)> =
            plan.lanes.iter().map(|l| (l.block, l.machine, l.dma)).collect();
        assert_eq!(slots, [(0, 0, 0), (0, 1, 1), (0, 2, 2)]);
    }

    #[test]
    fn test_overflow_to_second_block() {
        let plan = LanePlanner::new(ResourceBudget::RP2040)
            .plan(&table(&[ColorOrder::Grb; 6]))
            .unwrap();

        assert_eq!(plan.programs.len(), 2);
        assert_eq!(plan.lanes[3].block, 0);
        assert_eq!(plan.lanes[3].machine, 3);
        assert_eq!(plan.lanes[4].block, 1);
        assert_eq!(plan.lanes[4].machine, 0);
        assert_eq!(plan.lanes[4].program, 1);
    }

    #[test]
    fn test_different_orders_need_separate_blocks() {
        // 20 + 22 instructions do not fit one 32-word block
        let plan = LanePlanner::new(ResourceBudget::RP2040)
            .plan(&table(&[ColorOrder::Grb, ColorOrder::Bgr, ColorOrder::Grb]))
            .unwrap();

        assert_eq!(plan.lanes[0].block, 0);
        assert_eq!(plan.lanes[1].block, 1);
        assert_eq!(plan.lanes[2].block, 0);
        assert_eq!(plan.lanes[2].program, plan.lanes[0].program);
    }

    #[test]
    fn test_instruction_memory_exhausted() {
        let err = LanePlanner::new(ResourceBudget::RP2040)
            .plan(&table(&[ColorOrder::Grb, ColorOrder::Bgr, ColorOrder::Rgb]))
            .unwrap_err();
        assert_eq!(err, InitError::InstructionMemoryFull { channel: 2 });
    }

    #[test]
    fn test_state_machines_exhausted() {
        let budget = ResourceBudget {
            blocks: 1,
            machines_per_block: 2,
            ..ResourceBudget::RP2040
        };
        let err = LanePlanner::new(budget)
            .plan(&table(&[ColorOrder::Grb; 3]))
            .unwrap_err();
        assert_eq!(err, InitError::NoStateMachine { channel: 2 });
    }

    #[test]
    fn test_dma_exhausted() {
        let budget = ResourceBudget {
            dma_channels: 1,
            ..ResourceBudget::RP2040
        };
        let err = LanePlanner::new(budget)
            .plan(&table(&[ColorOrder::Grb; 2]))
            .unwrap_err();
        assert_eq!(err, InitError::NoDmaChannel { channel: 1 });
    }
}
