//! Shared runtime state crossing the handler/foreground boundary.
//!
//! Edge handlers publish a [`TelemetrySnapshot`] after every event; the
//! diagnostic foreground reads it without masking interrupts. All four
//! telemetry values are packed into a single `AtomicU64`, so a reader
//! always observes one coherent snapshot — a 16-bit platform provides the
//! equivalent by masking interrupts inside its atomic shim.

use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use bitflags::bitflags;

bitflags! {
    /// Runtime status word published alongside the telemetry snapshot.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StatusFlags: u8 {
        /// Ignition coil primary is energized.
        const COIL_ON        = 0x01;
        /// Rev limiter is suppressing ignition.
        const CUT_OFF        = 0x02;
        /// Advance comes from the map rather than the fixed baseline.
        const DYNAMIC_TIMING = 0x04;
        /// Immobilizer has not been unlocked; firing is suppressed.
        const IMMO_LOCKED    = 0x08;
    }
}

/// One coherent reading of the live engine values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TelemetrySnapshot {
    /// Engine speed, 0 when stalled.
    pub rpm: u16,
    /// Reported timing advance (degree-equivalent, informational).
    pub advance: i16,
    /// Crank acceleration correction term [ticks].
    pub acceleration: i16,
    /// Raw throttle position reading.
    pub throttle: u16,
}

impl TelemetrySnapshot {
    const fn pack(self) -> u64 {
        (self.rpm as u64) << 48
            | ((self.advance as u16) as u64) << 32
            | ((self.acceleration as u16) as u64) << 16
            | self.throttle as u64
    }

    const fn unpack(raw: u64) -> Self {
        Self {
            rpm: (raw >> 48) as u16,
            advance: (raw >> 32) as u16 as i16,
            acceleration: (raw >> 16) as u16 as i16,
            throttle: raw as u16,
        }
    }
}

/// Tear-free telemetry cell: handlers store, the dispatcher loads.
#[derive(Debug, Default)]
pub struct SharedTelemetry {
    packed: AtomicU64,
    status: AtomicU8,
}

impl SharedTelemetry {
    pub const fn new() -> Self {
        Self {
            packed: AtomicU64::new(0),
            status: AtomicU8::new(0),
        }
    }

    pub fn publish(&self, snapshot: TelemetrySnapshot, status: StatusFlags) {
        self.packed.store(snapshot.pack(), Ordering::Release);
        self.status.store(status.bits(), Ordering::Release);
    }

    pub fn load(&self) -> (TelemetrySnapshot, StatusFlags) {
        let snapshot = TelemetrySnapshot::unpack(self.packed.load(Ordering::Acquire));
        let status = StatusFlags::from_bits_truncate(self.status.load(Ordering::Acquire));
        (snapshot, status)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_packs_and_unpacks_signed_fields() {
        let snap = TelemetrySnapshot {
            rpm: 4000,
            advance: -25,
            acceleration: -300,
            throttle: 512,
        };
        assert_eq!(TelemetrySnapshot::unpack(snap.pack()), snap);
    }

    #[test]
    fn cell_returns_last_published() {
        let cell = SharedTelemetry::new();
        let snap = TelemetrySnapshot {
            rpm: 1250,
            advance: 40,
            acceleration: 7,
            throttle: 0,
        };
        cell.publish(snap, StatusFlags::COIL_ON | StatusFlags::DYNAMIC_TIMING);
        let (got, status) = cell.load();
        assert_eq!(got, snap);
        assert!(status.contains(StatusFlags::COIL_ON));
        assert!(!status.contains(StatusFlags::IMMO_LOCKED));
    }
}
