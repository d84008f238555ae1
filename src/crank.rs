//! Crank Timing Tracker.
//!
//! Both crank-position edges feed [`CrankTracker::record_half_rev`] with
//! the free-running counter value captured (and zeroed) at the edge. The
//! tracker keeps a rolling window of the last 8 half-revolution durations
//! and derives the mean, the instantaneous acceleration, and — on the
//! reference edge — the engine speed.

/// Prescaled timer clock feeding the half-revolution counter (16 MHz / 64).
pub const TICK_RATE_HZ: u32 = 250_000;

/// Rolling window of half-revolution durations used for the mean.
pub const HALF_REV_WINDOW: usize = 8;

/// Rolling crank timing state shared by both edge handlers.
#[derive(Debug, Clone)]
pub struct CrankTracker {
    window: [u16; HALF_REV_WINDOW],
    head: usize,
    mean_half_ticks: u16,
    acceleration: i16,
    rpm: u16,
    stall_periods: u16,
}

impl CrankTracker {
    pub const fn new() -> Self {
        Self {
            window: [0; HALF_REV_WINDOW],
            head: 0,
            mean_half_ticks: 0,
            acceleration: 0,
            rpm: 0,
            stall_periods: 0,
        }
    }

    /// Record one half-revolution duration and refresh the mean.
    ///
    /// The first edge after a stall primes the entire window with the
    /// sample, so the mean is usable immediately instead of slowly
    /// converging away from stale zeros. That edge also clears the stall
    /// counter.
    pub fn record_half_rev(&mut self, elapsed_ticks: u16) {
        self.head = (self.head + 1) % HALF_REV_WINDOW;
        self.window[self.head] = elapsed_ticks;

        if self.mean_half_ticks == 0 {
            // Crank is starting to turn.
            self.stall_periods = 0;
            self.mean_half_ticks = elapsed_ticks;
            self.window = [elapsed_ticks; HALF_REV_WINDOW];
            self.acceleration = 0;
        } else {
            let previous = self.mean_half_ticks;
            let sum: u32 = self.window.iter().map(|&t| u32::from(t)).sum();
            self.mean_half_ticks = (sum / HALF_REV_WINDOW as u32) as u16;
            // Positive while the crank speeds up (durations shrinking);
            // applied later as a correction term on the spark delay.
            self.acceleration =
                (i32::from(previous) - i32::from(self.mean_half_ticks)) as i16;
        }
    }

    /// Derive RPM from the mean half-revolution duration.
    ///
    /// Two edges per revolution, so the tick-rate quotient is halved. A
    /// zero mean reads as 0 RPM (stalled).
    pub fn update_rpm(&mut self) {
        self.rpm = if self.mean_half_ticks == 0 {
            0
        } else {
            let per_minute = (60 * TICK_RATE_HZ / u32::from(self.mean_half_ticks)) >> 1;
            per_minute.min(u32::from(u16::MAX)) as u16
        };
    }

    /// One timer-overflow period elapsed with no crank edge.
    pub fn mark_stalled(&mut self) {
        self.mean_half_ticks = 0;
        self.rpm = 0;
        self.stall_periods = self.stall_periods.saturating_add(1);
    }

    #[inline]
    pub const fn rpm(&self) -> u16 {
        self.rpm
    }

    #[inline]
    pub const fn mean_half_ticks(&self) -> u16 {
        self.mean_half_ticks
    }

    #[inline]
    pub const fn acceleration(&self) -> i16 {
        self.acceleration
    }

    #[inline]
    pub const fn stall_periods(&self) -> u16 {
        self.stall_periods
    }

    /// A zero mean means the crank is not turning.
    #[inline]
    pub const fn is_stalled(&self) -> bool {
        self.mean_half_ticks == 0
    }
}

impl Default for CrankTracker {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
