//! End-to-end engine scenarios through the [`Ecu`] aggregate: crank
//! edges in, coil and telemetry behavior out, with the immobilizer and
//! stall watchdog in the loop.

use mz_ecu::Ecu;
use mz_ecu::crank::TICK_RATE_HZ;
use mz_ecu::hal::MockOutputs;
use mz_ecu::immo::{FRAME_END, FRAME_START};
use mz_ecu::state::StatusFlags;
use mz_ecu::store::keys::ImmoKeys;
use mz_ecu::store::map::IgnitionMap;
use mz_ecu::store::nv::MemStore;
use mz_ecu::store::params::{Param, Parameters};

const KEY: &[u8] = b"0D00857241BB";

/// Half-revolution duration that yields exactly `rpm`.
const fn half_ticks_for(rpm: u16) -> u16 {
    (60 * TICK_RATE_HZ / 2 / rpm as u32) as u16
}

/// A store image provisioned the way a bench-flashed EEPROM would be.
fn provisioned_store(immo_enabled: bool) -> MemStore {
    let mut store = MemStore::default();

    let mut params = Parameters::new();
    params.set(Param::CutoffStart as u8, 8000).unwrap();
    params.set(Param::CutoffEnd as u8, 7600).unwrap();
    params.set(Param::DynamicOn as u8, 2500).unwrap();
    params.set(Param::DynamicOff as u8, 2200).unwrap();
    params.set(Param::CrankOffset as u8, 40).unwrap();
    params
        .set(Param::ImmoEnabled as u8, immo_enabled as u16)
        .unwrap();
    params.save(&mut store).unwrap();

    let mut map = IgnitionMap::new();
    for row in map.cells.iter_mut() {
        row.fill(100);
    }
    map.save(&mut store).unwrap();

    let mut keys = ImmoKeys::new();
    keys.set_key(0, KEY);
    keys.save(&mut store).unwrap();

    store
}

fn spin(ecu: &mut Ecu<MemStore>, out: &mut MockOutputs, half_ticks: u16, revolutions: usize) {
    for _ in 0..revolutions {
        ecu.on_coil_edge(half_ticks, out);
        ecu.on_reference_edge(half_ticks, out);
    }
}

fn unlock(ecu: &mut Ecu<MemStore>, out: &mut MockOutputs) {
    ecu.on_immo_byte(FRAME_START, out);
    for &b in KEY {
        ecu.on_immo_byte(b, out);
    }
    ecu.on_immo_byte(FRAME_END, out);
}

#[test]
fn armed_immobilizer_blocks_firing_until_the_key_is_presented() {
    let mut out = MockOutputs::new();
    let mut ecu = Ecu::boot(provisioned_store(true), &mut out).unwrap();
    assert!(out.indicator, "lamp lit while locked");

    spin(&mut ecu, &mut out, half_ticks_for(3000), 20);
    assert_eq!(out.energize_count, 0, "no coil drive while locked");
    let (_, status) = ecu.telemetry().load();
    assert!(status.contains(StatusFlags::IMMO_LOCKED));

    unlock(&mut ecu, &mut out);
    assert!(!out.indicator, "lamp clears on unlock");

    spin(&mut ecu, &mut out, half_ticks_for(3000), 2);
    assert!(out.energize_count > 0);
    let (_, status) = ecu.telemetry().load();
    assert!(!status.contains(StatusFlags::IMMO_LOCKED));
}

#[test]
fn wrong_token_leaves_the_interlock_engaged() {
    let mut out = MockOutputs::new();
    let mut ecu = Ecu::boot(provisioned_store(true), &mut out).unwrap();

    ecu.on_immo_byte(FRAME_START, &mut out);
    for &b in b"WRONGTOKEN" {
        ecu.on_immo_byte(b, &mut out);
    }
    ecu.on_immo_byte(FRAME_END, &mut out);

    spin(&mut ecu, &mut out, half_ticks_for(3000), 5);
    assert_eq!(out.energize_count, 0);
    assert!(ecu.immobilizer().is_locked());
}

#[test]
fn disabled_immobilizer_boots_unlocked() {
    let mut out = MockOutputs::new();
    let mut ecu = Ecu::boot(provisioned_store(false), &mut out).unwrap();
    assert!(!out.indicator);

    spin(&mut ecu, &mut out, half_ticks_for(3000), 2);
    assert!(out.energize_count > 0);
}

#[test]
fn steady_state_revolution_publishes_exact_telemetry() {
    let mut out = MockOutputs::new();
    let mut ecu = Ecu::boot(provisioned_store(false), &mut out).unwrap();
    ecu.set_throttle(300);

    // 1875-tick half revolutions are exactly 4000 RPM.
    spin(&mut ecu, &mut out, 1875, 10);

    let (snap, status) = ecu.telemetry().load();
    assert_eq!(snap.rpm, 4000);
    assert_eq!(snap.acceleration, 0, "steady state");
    assert_eq!(snap.throttle, 300);
    assert!(status.contains(StatusFlags::DYNAMIC_TIMING));
    assert!(status.contains(StatusFlags::COIL_ON));

    // Map advance 100, offset 40: the spark leads the next coil edge by
    // 1875 * 60 / 180 = 625 ticks, so it fires 1250 ticks after the
    // reference edge.
    assert_eq!(out.countdown, Some(1250));

    ecu.on_spark_countdown(1250, &mut out);
    assert!(!out.coil);
    let (_, status) = ecu.telemetry().load();
    assert!(!status.contains(StatusFlags::COIL_ON));

    // Closing the stroke reports the advance the map asked for.
    ecu.on_coil_edge(1875, &mut out);
    let (snap, _) = ecu.telemetry().load();
    assert_eq!(snap.advance, 100);
}

#[test]
fn rev_limiter_shows_up_in_the_status_word() {
    let mut out = MockOutputs::new();
    let mut ecu = Ecu::boot(provisioned_store(false), &mut out).unwrap();

    spin(&mut ecu, &mut out, half_ticks_for(9000), 10);
    let (_, status) = ecu.telemetry().load();
    assert!(status.contains(StatusFlags::CUT_OFF));

    spin(&mut ecu, &mut out, half_ticks_for(7000), 10);
    let (_, status) = ecu.telemetry().load();
    assert!(!status.contains(StatusFlags::CUT_OFF));
}

#[test]
fn stall_zeroes_telemetry_and_the_watchdog_forces_the_coil_off() {
    let mut out = MockOutputs::new();
    let mut ecu = Ecu::boot(provisioned_store(false), &mut out).unwrap();

    spin(&mut ecu, &mut out, half_ticks_for(1500), 5);
    assert!(out.coil, "dwelling between edges");

    ecu.on_stall_period(&mut out);
    let (snap, _) = ecu.telemetry().load();
    assert_eq!(snap.rpm, 0);
    assert!(out.coil, "one quiet period does not drop the coil");

    for _ in 0..11 {
        ecu.on_stall_period(&mut out);
    }
    assert!(!out.coil, "coil safety after a sustained stall");

    // First edges after the stall re-prime the window immediately.
    spin(&mut ecu, &mut out, 1875, 1);
    let (snap, _) = ecu.telemetry().load();
    assert_eq!(snap.rpm, 4000);
}
