//! Hardware output boundary.
//!
//! The control core only computes; pin and timer side effects go through
//! [`IgnitionOutputs`]. A target board implements the trait over its coil
//! driver, indicator lamp, and spark countdown timer. [`MockOutputs`]
//! records the requests for host-side tests and software-in-loop runs.

/// Sink for the hardware actions requested by the event handlers.
pub trait IgnitionOutputs {
    /// Drive the ignition coil supply. `true` energizes the primary
    /// winding; the spark occurs on the `false` transition.
    fn set_coil(&mut self, energized: bool);

    /// Drive the immobilizer indicator lamp.
    fn set_indicator(&mut self, lit: bool);

    /// Preload the spark countdown to expire `ticks_from_edge` ticks
    /// after the crank edge currently being serviced.
    ///
    /// The delay is measured from the edge, not from the call:
    /// implementations must subtract the ticks the handler has already
    /// consumed (read from the free-running counter) when preloading the
    /// hardware timer.
    fn load_spark_countdown(&mut self, ticks_from_edge: u16);

    /// Restart the countdown from a full overflow period. During normal
    /// running the next coil edge restarts it again before expiry, so a
    /// restarted countdown only fires once the engine stops turning.
    fn restart_spark_countdown(&mut self);
}

/// Recording [`IgnitionOutputs`] for tests and host-side simulation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MockOutputs {
    /// Last commanded coil state.
    pub coil: bool,
    /// Last commanded indicator state.
    pub indicator: bool,
    /// Last preloaded countdown, `None` if restarted to a full period.
    pub countdown: Option<u16>,
    /// Number of `set_coil(true)` requests observed.
    pub energize_count: u32,
    /// Number of `set_coil(false)` requests observed.
    pub deenergize_count: u32,
}

impl MockOutputs {
    pub const fn new() -> Self {
        Self {
            coil: false,
            indicator: false,
            countdown: None,
            energize_count: 0,
            deenergize_count: 0,
        }
    }
}

impl IgnitionOutputs for MockOutputs {
    fn set_coil(&mut self, energized: bool) {
        self.coil = energized;
        if energized {
            self.energize_count += 1;
        } else {
            self.deenergize_count += 1;
        }
    }

    fn set_indicator(&mut self, lit: bool) {
        self.indicator = lit;
    }

    fn load_spark_countdown(&mut self, ticks_from_edge: u16) {
        self.countdown = Some(ticks_from_edge);
    }

    fn restart_spark_countdown(&mut self) {
        self.countdown = None;
    }
}
