//! Persisted data stores.
//!
//! Three entities survive power cycles: the ignition map, the tuning
//! parameters, and the immobilizer keys. All of them go through the
//! generic block store in [`nv`], which owns the busy-wait and
//! write-only-if-changed discipline.

use static_assertions::const_assert_eq;

pub mod keys;
pub mod map;
pub mod nv;
pub mod params;

/// Fixed byte layout of the non-volatile image.
///
/// The layout is an implementation choice of this firmware; the only
/// contract is that it round-trips across power cycles.
pub mod layout {
    use super::{keys, map, params};

    pub const MAP_OFFSET: usize = 0;
    pub const MAP_LEN: usize = map::MAP_COUNT * map::MAP_RPM_BINS;

    pub const PARAMS_OFFSET: usize = MAP_OFFSET + MAP_LEN;
    pub const PARAMS_LEN: usize = params::PARAM_COUNT * 2;

    pub const KEYS_OFFSET: usize = PARAMS_OFFSET + PARAMS_LEN;
    pub const KEYS_LEN: usize = keys::KEY_COUNT * (keys::KEY_LEN + 1);

    /// Total image size a backing store must provide.
    pub const TOTAL_LEN: usize = KEYS_OFFSET + KEYS_LEN;
}

const_assert_eq!(layout::TOTAL_LEN, 104);
