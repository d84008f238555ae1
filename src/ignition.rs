//! Ignition Scheduler — the safety-critical per-revolution path.
//!
//! Edge-A ("coil edge", near top of stroke) ends the previous dwell and
//! refreshes the hysteresis flags; Edge-B ("reference edge", bottom of
//! stroke) derives RPM and arms the spark countdown for the coming
//! stroke. The rev limiter, the dynamic-timing switch, the immobilizer
//! gate, and the stall watchdog all converge here.
//!
//! Handlers never allocate and never log: each one directly gates the
//! next scheduled hardware event.

use crate::crank::CrankTracker;
use crate::hal::IgnitionOutputs;
use crate::state::StatusFlags;
use crate::store::map::IgnitionMap;
use crate::store::params::Parameters;

/// Degrees of crank rotation between the two sensor edges.
const HALF_REV_DEGREES: u32 = 180;

/// Stall periods (~262 ms each) after which the coil is forced off so it
/// cannot overheat while the engine sits with ignition switched on.
const COIL_SAFETY_STALL_PERIODS: u16 = 10;

/// Per-revolution scheduling state.
#[derive(Debug, Clone)]
pub struct IgnitionController {
    tracker: CrankTracker,
    cutoff_active: bool,
    dynamic_timing: bool,
    coil_on: bool,
    coil_off_time: u16,
    advance: i16,
}

impl IgnitionController {
    pub const fn new() -> Self {
        Self {
            tracker: CrankTracker::new(),
            cutoff_active: false,
            dynamic_timing: false,
            coil_on: false,
            coil_off_time: 0,
            advance: 0,
        }
    }

    /// Edge-A: the crank passed the coil-arming position.
    ///
    /// `elapsed_ticks` is the free-running counter value captured at the
    /// edge (ticks since the previous edge of either kind).
    pub fn on_coil_edge(
        &mut self,
        elapsed_ticks: u16,
        params: &Parameters,
        out: &mut impl IgnitionOutputs,
    ) {
        // A countdown armed last stroke that has not fired by now must
        // not fire into the next one.
        out.restart_spark_countdown();

        if self.coil_on {
            // No spark yet this stroke: force it now, late is better
            // than a missed ignition.
            self.coil_on = false;
            out.set_coil(false);
            self.coil_off_time = elapsed_ticks;
        }

        self.tracker.record_half_rev(elapsed_ticks);
        self.update_threshold_flags(params);
        self.advance = self.reported_advance(params);
    }

    /// Edge-B: the crank passed the reference position.
    pub fn on_reference_edge(
        &mut self,
        elapsed_ticks: u16,
        params: &Parameters,
        map: &IgnitionMap,
        immo_unlocked: bool,
        out: &mut impl IgnitionOutputs,
    ) {
        self.tracker.record_half_rev(elapsed_ticks);
        if self.tracker.is_stalled() {
            return;
        }
        self.tracker.update_rpm();

        let rpm = self.tracker.rpm();
        if self.cutoff_active || rpm == 0 || !immo_unlocked {
            return;
        }

        if self.dynamic_timing {
            let advance = u16::from(map.advance_for(params.active_map(), rpm));
            let offset = params.crank_offset();
            if advance <= offset {
                // The map asks for less than the fixed baseline; that
                // cannot be reached this cycle, so the spark falls back
                // to the next coil edge.
                out.restart_spark_countdown();
            } else {
                // The spark leads the next coil edge by the advance
                // excess over the baseline: a full half revolution minus
                // its angle-equivalent. More advance fires earlier, and
                // as the excess shrinks to zero the instant converges to
                // the coil-edge baseline.
                let predicted_half = (i32::from(self.tracker.mean_half_ticks())
                    + i32::from(self.tracker.acceleration()))
                .max(0) as u32;
                let lead = predicted_half * u32::from(advance - offset) / HALF_REV_DEGREES;
                let delay = predicted_half.saturating_sub(lead);
                out.load_spark_countdown(delay.min(u32::from(u16::MAX)) as u16);
            }
        } else {
            out.restart_spark_countdown();
        }

        self.coil_on = true;
        out.set_coil(true);
    }

    /// One timer-overflow period passed with no crank edge.
    pub fn on_stall_period(&mut self, out: &mut impl IgnitionOutputs) {
        self.tracker.mark_stalled();
        self.cutoff_active = false;
        if self.tracker.stall_periods() > COIL_SAFETY_STALL_PERIODS {
            self.coil_on = false;
            out.set_coil(false);
        }
    }

    /// The armed spark countdown expired.
    ///
    /// A countdown scheduled before a stall or cut-off must not produce a
    /// stray spark, hence the guards.
    pub fn on_spark_countdown(
        &mut self,
        elapsed_ticks: u16,
        immo_locked: bool,
        out: &mut impl IgnitionOutputs,
    ) {
        if self.tracker.is_stalled() || self.cutoff_active || immo_locked {
            return;
        }
        self.coil_on = false;
        out.set_coil(false);
        self.coil_off_time = elapsed_ticks;
    }

    /// Hysteresis for the rev limiter and the dynamic-timing switch:
    /// engage above the start threshold, release only below the end
    /// threshold, so oscillation between the two never chatters.
    fn update_threshold_flags(&mut self, params: &Parameters) {
        let rpm = self.tracker.rpm();

        if rpm > params.cutoff_start() && !self.cutoff_active {
            self.cutoff_active = true;
        } else if self.cutoff_active && rpm < params.cutoff_end() {
            self.cutoff_active = false;
        }

        if rpm > params.dynamic_on() && !self.dynamic_timing {
            self.dynamic_timing = true;
        } else if self.dynamic_timing && rpm < params.dynamic_off() {
            self.dynamic_timing = false;
        }
    }

    /// Advance reported over diagnostics. Purely informational: measured
    /// back from the actual coil-off instant, never fed into control.
    fn reported_advance(&self, params: &Parameters) -> i16 {
        let offset = params.crank_offset() as i16;
        let mean = self.tracker.mean_half_ticks();
        if self.cutoff_active || !self.dynamic_timing || mean == 0 {
            offset
        } else {
            let measured = HALF_REV_DEGREES as i32
                * (i32::from(mean) - i32::from(self.coil_off_time))
                / i32::from(mean);
            (measured + i32::from(offset)) as i16
        }
    }

    #[inline]
    pub const fn rpm(&self) -> u16 {
        self.tracker.rpm()
    }

    #[inline]
    pub const fn advance(&self) -> i16 {
        self.advance
    }

    #[inline]
    pub const fn acceleration(&self) -> i16 {
        self.tracker.acceleration()
    }

    #[inline]
    pub const fn coil_on(&self) -> bool {
        self.coil_on
    }

    #[inline]
    pub const fn cutoff_active(&self) -> bool {
        self.cutoff_active
    }

    #[inline]
    pub const fn dynamic_timing(&self) -> bool {
        self.dynamic_timing
    }

    /// Status word for the telemetry cell.
    pub fn status_flags(&self, immo_locked: bool) -> StatusFlags {
        let mut flags = StatusFlags::empty();
        flags.set(StatusFlags::COIL_ON, self.coil_on);
        flags.set(StatusFlags::CUT_OFF, self.cutoff_active);
        flags.set(StatusFlags::DYNAMIC_TIMING, self.dynamic_timing);
        flags.set(StatusFlags::IMMO_LOCKED, immo_locked);
        flags
    }
}

impl Default for IgnitionController {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
