//! Tick-count driven cycle trigger for Passgate.
//!
//! The host calls [`TickCounter::tick`] once per server tick. Every
//! `ticks_per_cycle` ticks the counter fires a reconciliation cycle and
//! resets to zero.
//!
//! # Level-triggered, not drift-corrected
//!
//! Firing depends on the number of host ticks observed, never on wall-clock
//! time. If the host stalls or skips ticks, the next cycle simply happens
//! later. Missed cycles are not backfilled.
//!
//! ```ignore
//! // host tick handler
//! if let Some(cycle) = counter.tick() {
//!     run_reconciliation(cycle);
//! }
//! ```

use std::time::Duration;

use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How often a reconciliation cycle should fire, in host terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleConfig {
    /// Target wall-clock length of one cycle at the nominal tick rate.
    pub cycle_seconds: u32,
    /// The host's nominal ticks per second (20 for a Minecraft server).
    pub host_ticks_per_second: u32,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            cycle_seconds: 2,
            host_ticks_per_second: 20,
        }
    }
}

impl CycleConfig {
    /// Ticks between two cycles: `cycle_seconds × host_ticks_per_second`.
    ///
    /// Clamped to at least 1 so a zero in either field can't produce a
    /// counter that never fires.
    pub fn ticks_per_cycle(&self) -> u64 {
        let ticks = u64::from(self.cycle_seconds) * u64::from(self.host_ticks_per_second);
        if ticks == 0 {
            warn!(
                cycle_seconds = self.cycle_seconds,
                host_ticks_per_second = self.host_ticks_per_second,
                "ticks per cycle is zero, clamping to 1"
            );
            1
        } else {
            ticks
        }
    }

    /// Nominal wall-clock length of a cycle. Only meaningful when the host
    /// keeps its nominal rate.
    pub fn nominal_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.cycle_seconds))
    }
}

// ---------------------------------------------------------------------------
// Cycle info (returned when the counter fires)
// ---------------------------------------------------------------------------

/// Information about a cycle that just fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleInfo {
    /// Monotonically increasing cycle number (starts at 1).
    pub cycle: u64,
    /// Total host ticks observed since the counter was created.
    pub total_ticks: u64,
}

// ---------------------------------------------------------------------------
// Counter
// ---------------------------------------------------------------------------

/// Counts host ticks and fires once per `ticks_per_cycle`.
///
/// Lives for the whole process and is never persisted: a restart begins a
/// fresh counting window.
#[derive(Debug, Clone)]
pub struct TickCounter {
    ticks_per_cycle: u64,
    count: u64,
    total_ticks: u64,
    cycles_fired: u64,
}

impl TickCounter {
    /// Creates a counter from config. Starts at zero.
    pub fn new(config: CycleConfig) -> Self {
        let ticks_per_cycle = config.ticks_per_cycle();
        debug!(
            ticks_per_cycle,
            cycle_seconds = config.cycle_seconds,
            host_tps = config.host_ticks_per_second,
            "tick counter created"
        );
        Self {
            ticks_per_cycle,
            count: 0,
            total_ticks: 0,
            cycles_fired: 0,
        }
    }

    /// Records one host tick. Returns `Some` exactly when a cycle fires.
    ///
    /// The counter is reset to zero on firing, so it never exceeds
    /// `ticks_per_cycle`.
    pub fn tick(&mut self) -> Option<CycleInfo> {
        self.count += 1;
        self.total_ticks += 1;

        if self.count < self.ticks_per_cycle {
            return None;
        }

        self.count = 0;
        self.cycles_fired += 1;
        trace!(cycle = self.cycles_fired, total_ticks = self.total_ticks, "cycle fired");

        Some(CycleInfo {
            cycle: self.cycles_fired,
            total_ticks: self.total_ticks,
        })
    }

    /// Ticks counted in the current window.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Ticks between two cycles.
    pub fn ticks_per_cycle(&self) -> u64 {
        self.ticks_per_cycle
    }

    /// Ticks left before the next cycle fires.
    pub fn ticks_until_next(&self) -> u64 {
        self.ticks_per_cycle - self.count
    }

    /// Cycles fired so far.
    pub fn cycles_fired(&self) -> u64 {
        self.cycles_fired
    }

    /// Host ticks observed so far.
    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }
}

impl Default for TickCounter {
    fn default() -> Self {
        Self::new(CycleConfig::default())
    }
}
