//! Color order permutations
//!
//! The host always sends pixels as R, G, B ("wire order"). Strips expect
//! their own order, most commonly GRB. The buffer keeps wire order and the
//! backend permutes each pixel while emitting it.
//!
//! The state machine backend cannot index into a pixel, it can only pull the
//! next byte from its FIFO. [`ColorOrder::staging_plan`] turns a permutation
//! into a short sequence of pull / park / emit steps that produce the right
//! output order using at most two scratch registers.

use heapless::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Byte order a strip expects for each pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ColorOrder {
    Rgb,
    Rbg,
    #[default]
    Grb,
    Gbr,
    Brg,
    Bgr,
}

impl ColorOrder {
    /// Every supported order
    pub const ALL: [ColorOrder; 6] = [
        ColorOrder::Rgb,
        ColorOrder::Rbg,
        ColorOrder::Grb,
        ColorOrder::Gbr,
        ColorOrder::Brg,
        ColorOrder::Bgr,
    ];

    /// Wire index of each emitted byte
    ///
    /// `emitted[i] = wire[permutation()[i]]`, with wire order R=0, G=1, B=2.
    pub const fn permutation(self) -> [u8; 3] {
        match self {
            ColorOrder::Rgb => [0, 1, 2],
            ColorOrder::Rbg => [0, 2, 1],
            ColorOrder::Grb => [1, 0, 2],
            ColorOrder::Gbr => [1, 2, 0],
            ColorOrder::Brg => [2, 0, 1],
            ColorOrder::Bgr => [2, 1, 0],
        }
    }

    /// Reorder one wire-order pixel into emission order
    pub fn apply(self, wire: [u8; 3]) -> [u8; 3] {
        let perm = self.permutation();
        [
            wire[perm[0] as usize],
            wire[perm[1] as usize],
            wire[perm[2] as usize],
        ]
    }

    /// Parse an order name such as `"grb"` (case-insensitive)
    pub fn from_str_name(name: &str) -> Option<Self> {
        ColorOrder::ALL
            .into_iter()
            .find(|order| order.name().eq_ignore_ascii_case(name))
    }

    /// Lowercase name, as written in `strips.toml`
    pub const fn name(self) -> &'static str {
        match self {
            ColorOrder::Rgb => "rgb",
            ColorOrder::Rbg => "rbg",
            ColorOrder::Grb => "grb",
            ColorOrder::Gbr => "gbr",
            ColorOrder::Brg => "brg",
            ColorOrder::Bgr => "bgr",
        }
    }

    /// Build the pull / park / emit sequence for one pixel
    ///
    /// Bytes arrive in wire order. A byte is emitted as soon as it is the
    /// next one due; otherwise it is parked in the first free scratch
    /// register until its turn comes.
    pub fn staging_plan(self) -> StagingPlan {
        let perm = self.permutation();
        let mut steps = Vec::new();
        // parked[wire index] = register holding that byte
        let mut parked: [Option<Scratch>; 3] = [None; 3];
        let mut next = 0usize;

        for wire in 0..3u8 {
            if perm[next] == wire {
                // At most 5 steps per pixel (3 pulls, 2 parked emits)
                let _ = steps.push(StagingStep::PullEmit);
                next += 1;
                while next < 3 {
                    match parked[perm[next] as usize] {
                        Some(reg) => {
                            let _ = steps.push(StagingStep::EmitParked(reg));
                            next += 1;
                        }
                        None => break,
                    }
                }
            } else {
                let reg = if parked.iter().any(|p| *p == Some(Scratch::Y)) {
                    Scratch::Isr
                } else {
                    Scratch::Y
                };
                parked[wire as usize] = Some(reg);
                let _ = steps.push(StagingStep::PullPark(reg));
            }
        }

        StagingPlan { steps }
    }
}

/// Scratch register a byte can be parked in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Scratch {
    Y,
    Isr,
}

/// One step of the per-pixel staging sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StagingStep {
    /// Pull the next byte and shift it out immediately
    PullEmit,
    /// Pull the next byte and hold it in a scratch register
    PullPark(Scratch),
    /// Shift out a previously parked byte
    EmitParked(Scratch),
}

/// Step sequence that emits one pixel in a strip's color order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingPlan {
    steps: Vec<StagingStep, 5>,
}

impl StagingPlan {
    /// The steps, in execution order
    pub fn steps(&self) -> &[StagingStep] {
        &self.steps
    }

    /// Number of steps that shift a byte out (always 3)
    pub fn emit_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s, StagingStep::PullEmit | StagingStep::EmitParked(_)))
            .count()
    }

    /// Execute the plan on one wire-order pixel
    ///
    /// Mirrors what the state machine does with its FIFO and scratch
    /// registers, so the plan can be checked on the host.
    pub fn run(&self, wire: [u8; 3]) -> [u8; 3] {
        let mut out = [0u8; 3];
        let mut emitted = 0;
        let mut pulled = 0;
        let mut y = 0u8;
        let mut isr = 0u8;

        for step in self.steps.iter() {
            let byte = match *step {
                StagingStep::PullEmit => {
                    pulled += 1;
                    wire[pulled - 1]
                }
                StagingStep::PullPark(reg) => {
                    pulled += 1;
                    match reg {
                        Scratch::Y => y = wire[pulled - 1],
                        Scratch::Isr => isr = wire[pulled - 1],
                    }
                    continue;
                }
                StagingStep::EmitParked(Scratch::Y) => y,
                StagingStep::EmitParked(Scratch::Isr) => isr,
            };
            out[emitted] = byte;
            emitted += 1;
        }

        out
    }
}
