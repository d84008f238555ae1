//! The owning aggregate: persisted stores, scheduler, interlock, and the
//! telemetry cell, wired to the platform's event sources.
//!
//! A target board (or the test harness) constructs an [`Ecu`] over its
//! non-volatile store at power-on and then forwards every interrupt to
//! the matching `on_*` entry point. Handlers are mutually exclusive by
//! construction (`&mut self`); the only state readable without exclusive
//! access is the atomic telemetry cell.

use tracing::{info, warn};

use crate::error::{CommandError, StorageError};
use crate::hal::IgnitionOutputs;
use crate::ignition::IgnitionController;
use crate::immo::Immobilizer;
use crate::state::{SharedTelemetry, TelemetrySnapshot};
use crate::store::keys::ImmoKeys;
use crate::store::map::{IgnitionMap, MAP_COUNT, MAP_RPM_BINS};
use crate::store::nv::NvStore;
use crate::store::params::Parameters;

/// The control core singleton.
#[derive(Debug)]
pub struct Ecu<S: NvStore> {
    store: S,
    params: Parameters,
    map: IgnitionMap,
    keys: ImmoKeys,
    ignition: IgnitionController,
    immo: Immobilizer,
    telemetry: SharedTelemetry,
    throttle: u16,
}

impl<S: NvStore> Ecu<S> {
    /// Load all persisted entities and arm the immobilizer.
    ///
    /// A parameter block violating the configuration invariants (e.g. a
    /// factory-blank store) is kept and flagged rather than rejected:
    /// the engine must still run so the tool can fix the configuration.
    pub fn boot(mut store: S, out: &mut impl IgnitionOutputs) -> Result<Self, StorageError> {
        let map = IgnitionMap::load(&mut store)?;
        let params = Parameters::load(&mut store)?;
        let keys = ImmoKeys::load(&mut store)?;

        if let Err(e) = params.validate_all() {
            warn!("persisted parameters violate configuration invariants: {e}");
        }

        let mut immo = Immobilizer::new();
        immo.arm(params.immo_enabled(), out);

        info!(
            active_map = params.active_map(),
            immo_armed = params.immo_enabled(),
            "control core up"
        );

        Ok(Self {
            store,
            params,
            map,
            keys,
            ignition: IgnitionController::new(),
            immo,
            telemetry: SharedTelemetry::new(),
            throttle: 0,
        })
    }

    // ── Interrupt entry points ──────────────────────────────────────

    /// Edge-A: coil-arming crank position.
    pub fn on_coil_edge(&mut self, elapsed_ticks: u16, out: &mut impl IgnitionOutputs) {
        self.ignition.on_coil_edge(elapsed_ticks, &self.params, out);
        self.publish();
    }

    /// Edge-B: reference crank position.
    pub fn on_reference_edge(&mut self, elapsed_ticks: u16, out: &mut impl IgnitionOutputs) {
        self.ignition.on_reference_edge(
            elapsed_ticks,
            &self.params,
            &self.map,
            self.immo.is_unlocked(),
            out,
        );
        self.publish();
    }

    /// Free-running timer overflowed with no crank edge in between.
    pub fn on_stall_period(&mut self, out: &mut impl IgnitionOutputs) {
        self.ignition.on_stall_period(out);
        self.publish();
    }

    /// The spark countdown timer expired.
    pub fn on_spark_countdown(&mut self, elapsed_ticks: u16, out: &mut impl IgnitionOutputs) {
        self.ignition
            .on_spark_countdown(elapsed_ticks, self.immo.is_locked(), out);
        self.publish();
    }

    /// Byte received on the immobilizer channel.
    pub fn on_immo_byte(&mut self, byte: u8, out: &mut impl IgnitionOutputs) {
        self.immo.on_byte(byte, &self.keys, out);
        self.publish();
    }

    /// Latest throttle position sample (acquisition is the platform's).
    pub fn set_throttle(&mut self, raw: u16) {
        self.throttle = raw;
        self.publish();
    }

    // ── Diagnostic access ───────────────────────────────────────────

    /// Tear-free telemetry cell for the diagnostic foreground.
    pub const fn telemetry(&self) -> &SharedTelemetry {
        &self.telemetry
    }

    pub const fn params(&self) -> &Parameters {
        &self.params
    }

    pub const fn map(&self) -> &IgnitionMap {
        &self.map
    }

    pub const fn keys(&self) -> &ImmoKeys {
        &self.keys
    }

    pub const fn ignition(&self) -> &IgnitionController {
        &self.ignition
    }

    pub const fn immobilizer(&self) -> &Immobilizer {
        &self.immo
    }

    /// Validated parameter write, persisted on success.
    pub fn set_param(&mut self, id: u8, value: u16) -> Result<(), CommandError> {
        self.params.set(id, value)?;
        self.params.save(&mut self.store)?;
        Ok(())
    }

    /// Replace the whole ignition map and persist it.
    pub fn write_map(
        &mut self,
        cells: [[u8; MAP_RPM_BINS]; MAP_COUNT],
    ) -> Result<(), StorageError> {
        self.map.cells = cells;
        self.map.save(&mut self.store)
    }

    /// Replace both immobilizer keys and persist them.
    pub fn write_keys(&mut self, key0: &[u8], key1: &[u8]) -> Result<(), StorageError> {
        self.keys.set_key(0, key0);
        self.keys.set_key(1, key1);
        self.keys.save(&mut self.store)
    }

    /// Hand the store back (test harness reboot).
    pub fn into_store(self) -> S {
        self.store
    }

    fn publish(&self) {
        self.telemetry.publish(
            TelemetrySnapshot {
                rpm: self.ignition.rpm(),
                advance: self.ignition.advance(),
                acceleration: self.ignition.acceleration(),
                throttle: self.throttle,
            },
            self.ignition.status_flags(self.immo.is_locked()),
        );
    }
}
