//! Host silence watchdog
//!
//! Tracks the time of the last valid protocol byte. When the strips are
//! powered and the host has been silent for longer than the timeout, the
//! controller blanks the strips and opens the power rail.
//!
//! The watchdog disarms when it trips and re-arms on the next valid byte,
//! so one silence period causes exactly one power-off.

/// Default silence timeout
pub const DEFAULT_TIMEOUT_MS: u32 = 5000;

/// Result of a watchdog check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WatchdogStatus {
    /// Host is alive, strips are off, or the watchdog already fired
    Ok,
    /// Timeout elapsed while powered; force power-off now
    Tripped,
}

/// Host silence watchdog
#[derive(Debug, Clone)]
pub struct Watchdog {
    timeout_ms: u32,
    last_valid_ms: u64,
    armed: bool,
}

impl Watchdog {
    /// Create an armed watchdog, counting from `now_ms`
    pub fn new(timeout_ms: u32, now_ms: u64) -> Self {
        Self {
            timeout_ms,
            last_valid_ms: now_ms,
            armed: true,
        }
    }

    /// Record a valid protocol byte
    pub fn feed(&mut self, now_ms: u64) {
        self.last_valid_ms = now_ms;
        self.armed = true;
    }

    /// Last instant at which the host still counts as alive
    ///
    /// Blocking reads use this as their deadline, so a stalled payload and
    /// an idle link time out at the same moment.
    pub fn deadline_ms(&self) -> u64 {
        self.last_valid_ms.saturating_add(self.timeout_ms as u64)
    }

    /// True once more than the timeout has passed since the last valid byte
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms > self.deadline_ms()
    }

    /// Check for a trip
    ///
    /// Trips at most once per silence period, and only while `powered`.
    pub fn check(&mut self, now_ms: u64, powered: bool) -> WatchdogStatus {
        if self.armed && powered && self.is_expired(now_ms) {
            self.armed = false;
            WatchdogStatus::Tripped
        } else {
            WatchdogStatus::Ok
        }
    }

    /// Whether the watchdog can still trip
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Configured timeout
    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }
}
