//! Frame plans for the bit-bang serializer
//!
//! Lanes are sorted longest-first so the set of active lanes only ever
//! shrinks from the front: lanes `0..n` are active for the first segment,
//! `0..n-1` for the next, and so on. Each [`Segment`] carries the port mask
//! of its active lanes, so the hot loop never recomputes masks.
//!
//! ```text
//! lane 0 (4 px) ████████████████████████████████████
//! lane 1 (2 px) ██████████████████
//! lane 2 (1 px) █████████
//!               |segment 0|segment 1|   segment 2   |
//!               3 lanes    2 lanes     1 lane
//! ```

use heapless::Vec;

use crate::config::ConfigError;
use crate::pixel::{ChannelTable, ColorOrder};

/// Maximum lanes the bit-bang serializer can interleave
///
/// Bounded by how many mask updates fit inside one T0H window.
pub const MAX_BITBANG_LANES: usize = 3;

/// One channel as seen by the bit-bang loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Lane {
    /// Index into the channel table
    pub channel: usize,
    /// Port mask of the data pin
    pub mask: u32,
    /// First buffer byte of the channel
    pub offset: usize,
    /// Number of bytes to emit
    pub len: usize,
    /// Byte order the strip expects
    pub order: ColorOrder,
}

impl Lane {
    /// Byte `position` (0..3) of the pixel starting `pixel` bytes into the
    /// channel, with the color order applied
    ///
    /// The caller walks `pixel` and `position` as running counters; the
    /// Cortex-M0+ has no divider to split a flat slot index in the hot loop.
    #[inline(always)]
    pub fn byte_at(&self, pixels: &[u8], pixel: usize, position: usize) -> u8 {
        let wire = self.order.permutation()[position] as usize;
        pixels[self.offset + pixel + wire]
    }
}

/// Stretch of byte slots during which the active lane set is constant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Segment {
    /// Exclusive end slot; the segment starts where the previous one ended
    pub end: usize,
    /// Lanes `0..lanes` are active
    pub lanes: usize,
    /// Combined mask of the active lanes
    pub active_mask: u32,
}

/// Lane order and interleave segments for a channel table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePlan {
    lanes: Vec<Lane, MAX_BITBANG_LANES>,
    segments: Vec<Segment, MAX_BITBANG_LANES>,
    frame_len: usize,
}

impl FramePlan {
    /// Build the plan for `table`
    ///
    /// Fails with [`ConfigError::TooManyLanes`] when the table has more
    /// channels than the bit-bang loop can interleave.
    pub fn new(table: &ChannelTable) -> Result<Self, ConfigError> {
        if table.len() > MAX_BITBANG_LANES {
            return Err(ConfigError::TooManyLanes);
        }

        let mut lanes: Vec<Lane, MAX_BITBANG_LANES> = Vec::new();
        for (index, channel) in table.iter().enumerate() {
            lanes
                .push(Lane {
                    channel: index,
                    mask: channel.pin_mask(),
                    offset: channel.offset,
                    len: channel.len,
                    order: channel.order,
                })
                .map_err(|_| ConfigError::TooManyLanes)?;
        }
        // Longest first; ties keep declaration order
        lanes.sort_unstable_by_key(|lane| (core::cmp::Reverse(lane.len), lane.channel));

        let mut segments: Vec<Segment, MAX_BITBANG_LANES> = Vec::new();
        let mut start = 0;
        for active in (1..=lanes.len()).rev() {
            let end = lanes[active - 1].len;
            if end > start {
                let active_mask = lanes[..active].iter().fold(0, |m, l| m | l.mask);
                segments
                    .push(Segment {
                        end,
                        lanes: active,
                        active_mask,
                    })
                    .map_err(|_| ConfigError::TooManyLanes)?;
                start = end;
            }
        }

        Ok(Self {
            lanes,
            segments,
            frame_len: table.total_len(),
        })
    }

    /// Lanes, longest first
    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    /// Segments in emission order
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Buffer size the plan was built for
    pub fn frame_len(&self) -> usize {
        self.frame_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChannelConfig;

    fn table(lengths: &[(u8, u16)]) -> ChannelTable {
        let configs: std::vec::Vec<ChannelConfig> = lengths
            .iter()
            .map(|&(pin, pixels)| ChannelConfig::new(pin, pixels, ColorOrder::Rgb))
            .collect();
        ChannelTable::new(&configs).unwrap()
    }

    #[test]
    fn test_segments_shrink_active_set() {
        // Declared shortest first to check the sort
        let plan = FramePlan::new(&table(&[(5, 1), (6, 2), (7, 4)])).unwrap();

        let order: std::vec::Vec<usize> = plan.lanes().iter().map(|l| l.channel).collect();
        assert_eq!(order, [2, 1, 0]);

        assert_eq!(
            plan.segments(),
            &[
                Segment {
                    end: 3,
                    lanes: 3,
                    active_mask: (1 << 5) | (1 << 6) | (1 << 7)
                },
                Segment {
                    end: 6,
                    lanes: 2,
                    active_mask: (1 << 6) | (1 << 7)
                },
                Segment {
                    end: 12,
                    lanes: 1,
                    active_mask: 1 << 7
                },
            ]
        );
        assert_eq!(plan.frame_len(), 21);
    }

    #[test]
    fn test_equal_lengths_share_one_segment() {
        let plan = FramePlan::new(&table(&[(0, 2), (1, 2)])).unwrap();
        assert_eq!(plan.segments().len(), 1);
        assert_eq!(plan.segments()[0].lanes, 2);
        assert_eq!(plan.segments()[0].end, 6);
        assert_eq!(plan.lanes()[0].channel, 0);
    }

    #[test]
    fn test_too_many_lanes() {
        assert_eq!(
            FramePlan::new(&table(&[(0, 1), (1, 1), (2, 1), (3, 1)])).unwrap_err(),
            ConfigError::TooManyLanes
        );
    }

    #[test]
    fn test_byte_at_applies_order() {
        let table = ChannelTable::new(&[ChannelConfig::new(0, 2, ColorOrder::Grb)]).unwrap();
        let plan = FramePlan::new(&table).unwrap();
        let pixels = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66];
        let lane = &plan.lanes()[0];
        let emitted: std::vec::Vec<u8> = [0, 3]
            .into_iter()
            .flat_map(|pixel| (0..3).map(move |position| lane.byte_at(&pixels, pixel, position)))
            .collect();
        assert_eq!(emitted, [0x22, 0x11, 0x33, 0x55, 0x44, 0x66]);
    }

    #[test]
    fn test_byte_at_matches_order_for_every_order() {
        for order in ColorOrder::ALL {
            let table = ChannelTable::new(&[
                ChannelConfig::new(0, 1, ColorOrder::Rgb),
                ChannelConfig::new(1, 2, order),
            ])
            .unwrap();
            let plan = FramePlan::new(&table).unwrap();
            let pixels: std::vec::Vec<u8> = (0..9).collect();
            let lane = plan.lanes().iter().find(|l| l.channel == 1).unwrap();

            for pixel in [0, 3] {
                let wire = [pixels[3 + pixel], pixels[4 + pixel], pixels[5 + pixel]];
                let emitted = [0, 1, 2].map(|position| lane.byte_at(&pixels, pixel, position));
                assert_eq!(emitted, order.apply(wire), "{:?}", order);
            }
        }
    }
}
