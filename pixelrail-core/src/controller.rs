//! Command dispatcher and control loop step
//!
//! One [`Controller::poll`] is one control-loop iteration:
//!
//! 1. Check the watchdog; on a trip, power off and blank.
//! 2. Take at most one opcode byte from the link and run its command to
//!    completion.
//!
//! # Commands
//!
//! - **SetPower** `[0x00, on]`: `on == 0` opens the rail and emits a blank
//!   frame; anything else closes the rail.
//! - **LoadPixelData** `[0x01, N bytes]`: overwrites the buffer from offset
//!   0, channel by channel. Each byte must arrive before the watchdog
//!   deadline; a stall aborts the load and leaves the buffer partially
//!   written and not pending.
//! - **Commit** `[0x02]`: emits if new data is pending, then always answers
//!   with [`ACK`] once emission has finished.
//!
//! Unknown opcode bytes are dropped and do not count as host activity.

use pixelrail_hal::{Clock, OutputPin, UartRx, UartTx};
use pixelrail_protocol::{Opcode, ACK, READY};

use crate::link::{Link, LinkError};
use crate::safety::WatchdogStatus;
use crate::state::EngineState;
use crate::traits::{EmitError, Serializer};

/// What one poll did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PollOutcome {
    /// Nothing received
    Idle,
    /// A command ran to completion
    Handled(Opcode),
    /// Unknown opcode byte, dropped
    Ignored(u8),
    /// The payload stalled past the deadline
    LoadAborted { opcode: Opcode, received: usize },
    /// Host silence forced a power-off
    WatchdogTripped,
}

/// Errors that end a poll early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControllerError<E> {
    /// Transport failure
    Link(LinkError<E>),
    /// Backend failure
    Emit(EmitError),
}

impl<E> From<LinkError<E>> for ControllerError<E> {
    fn from(e: LinkError<E>) -> Self {
        ControllerError::Link(e)
    }
}

impl<E> From<EmitError> for ControllerError<E> {
    fn from(e: EmitError) -> Self {
        ControllerError::Emit(e)
    }
}

/// Owns the link, the backend, the power rail and the engine state
pub struct Controller<'a, T, C, S, R> {
    link: Link<T, C>,
    serializer: S,
    rail: R,
    state: EngineState<'a>,
}

impl<'a, T, C, S, R, E> Controller<'a, T, C, S, R>
where
    T: UartRx<Error = E> + UartTx<Error = E>,
    C: Clock,
    S: Serializer,
    R: OutputPin,
{
    pub fn new(link: Link<T, C>, serializer: S, rail: R, state: EngineState<'a>) -> Self {
        Self {
            link,
            serializer,
            rail,
            state,
        }
    }

    /// Startup handshake
    ///
    /// Drops stale input, forces the strips off and blank, then tells the
    /// host it may start sending. Returns the number of stale bytes dropped.
    pub fn boot(&mut self) -> Result<usize, ControllerError<E>> {
        let dropped = self.link.drain()?;
        self.power_off()?;
        self.feed_watchdog();
        self.link.write_byte(READY)?;
        Ok(dropped)
    }

    /// Run one control-loop iteration
    pub fn poll(&mut self) -> Result<PollOutcome, ControllerError<E>> {
        let now = self.link.now_ms();
        let powered = self.state.is_powered();
        if self.state.watchdog_mut().check(now, powered) == WatchdogStatus::Tripped {
            self.power_off()?;
            return Ok(PollOutcome::WatchdogTripped);
        }

        let Some(byte) = self.link.try_read()? else {
            return Ok(PollOutcome::Idle);
        };
        let Some(opcode) = Opcode::from_byte(byte) else {
            return Ok(PollOutcome::Ignored(byte));
        };
        self.feed_watchdog();

        match opcode {
            Opcode::SetPower => self.set_power(),
            Opcode::LoadPixelData => self.load_pixel_data(),
            Opcode::Commit => self.commit(),
        }
    }

    fn feed_watchdog(&mut self) {
        let now = self.link.now_ms();
        self.state.watchdog_mut().feed(now);
    }

    fn set_power(&mut self) -> Result<PollOutcome, ControllerError<E>> {
        let deadline = self.state.watchdog().deadline_ms();
        let arg = match self.link.read_until(deadline) {
            Ok(arg) => arg,
            Err(LinkError::Timeout) => {
                return Ok(PollOutcome::LoadAborted {
                    opcode: Opcode::SetPower,
                    received: 0,
                })
            }
            Err(e) => return Err(e.into()),
        };
        self.feed_watchdog();

        if arg == 0 {
            self.power_off()?;
        } else {
            self.rail.set_high();
            self.state.set_powered(true);
        }
        Ok(PollOutcome::Handled(Opcode::SetPower))
    }

    fn load_pixel_data(&mut self) -> Result<PollOutcome, ControllerError<E>> {
        let mut received = 0;

        for index in 0..self.state.channels().len() {
            // A DMA transfer may still be reading this range
            self.serializer.wait_channel_idle(index);

            let (table, buffer, watchdog) = self.state.split_mut();
            let channel = table.channels()[index];
            for slot in buffer.channel_mut(&channel).iter_mut() {
                match self.link.read_until(watchdog.deadline_ms()) {
                    Ok(byte) => {
                        *slot = byte;
                        received += 1;
                        watchdog.feed(self.link.now_ms());
                    }
                    Err(LinkError::Timeout) => {
                        return Ok(PollOutcome::LoadAborted {
                            opcode: Opcode::LoadPixelData,
                            received,
                        })
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }

        self.state.mark_dirty();
        Ok(PollOutcome::Handled(Opcode::LoadPixelData))
    }

    fn commit(&mut self) -> Result<PollOutcome, ControllerError<E>> {
        let shown = if self.state.is_dirty() {
            self.state.show(&mut self.serializer)
        } else {
            Ok(())
        };
        // The host waits for this byte whatever happened
        self.link.write_byte(ACK)?;
        shown?;
        Ok(PollOutcome::Handled(Opcode::Commit))
    }

    fn power_off(&mut self) -> Result<(), ControllerError<E>> {
        self.rail.set_low();
        self.state.set_powered(false);
        self.state.blank(&mut self.serializer)?;
        Ok(())
    }

    pub fn state(&self) -> &EngineState<'a> {
        &self.state
    }

    pub fn serializer(&self) -> &S {
        &self.serializer
    }

    pub fn rail(&self) -> &R {
        &self.rail
    }

    pub fn link(&self) -> &Link<T, C> {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut Link<T, C> {
        &mut self.link
    }
}
