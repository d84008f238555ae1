//! Ignition Map Store.
//!
//! Four selectable maps of 16 RPM bins each. A cell holds the requested
//! advance angle as a raw byte in the same degree-equivalent unit as the
//! crank-offset parameter.

use crate::error::StorageError;
use crate::store::layout;
use crate::store::nv::{self, NvStore};

/// Number of selectable maps.
pub const MAP_COUNT: usize = 4;
/// RPM bins per map.
pub const MAP_RPM_BINS: usize = 16;
/// Width of one RPM bin.
pub const RPM_BIN_WIDTH: u16 = 500;

/// The 4×16 advance-angle table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnitionMap {
    pub cells: [[u8; MAP_RPM_BINS]; MAP_COUNT],
}

impl IgnitionMap {
    pub const fn new() -> Self {
        Self {
            cells: [[0; MAP_RPM_BINS]; MAP_COUNT],
        }
    }

    /// Advance cell for `rpm` in the selected map.
    ///
    /// Both coordinates clamp to the table bounds: RPM beyond the last
    /// 500-RPM bin reads the last bin, and an out-of-range map index
    /// (possible with a blank or corrupted parameter block) reads the
    /// last map instead of faulting.
    pub fn advance_for(&self, map_index: u16, rpm: u16) -> u8 {
        let row = (map_index as usize).min(MAP_COUNT - 1);
        let bin = ((rpm / RPM_BIN_WIDTH) as usize).min(MAP_RPM_BINS - 1);
        self.cells[row][bin]
    }

    pub fn to_bytes(&self) -> [u8; layout::MAP_LEN] {
        let mut out = [0u8; layout::MAP_LEN];
        for (row, cells) in self.cells.iter().enumerate() {
            out[row * MAP_RPM_BINS..(row + 1) * MAP_RPM_BINS].copy_from_slice(cells);
        }
        out
    }

    pub fn from_bytes(bytes: &[u8; layout::MAP_LEN]) -> Self {
        let mut map = Self::new();
        for (row, cells) in map.cells.iter_mut().enumerate() {
            cells.copy_from_slice(&bytes[row * MAP_RPM_BINS..(row + 1) * MAP_RPM_BINS]);
        }
        map
    }

    /// Load the map block from the store at boot.
    pub fn load<S: NvStore>(store: &mut S) -> Result<Self, StorageError> {
        store.wait_ready();
        let mut bytes = [0u8; layout::MAP_LEN];
        store.read(layout::MAP_OFFSET, &mut bytes)?;
        Ok(Self::from_bytes(&bytes))
    }

    /// Persist the map block (write-if-changed).
    pub fn save<S: NvStore>(&self, store: &mut S) -> Result<(), StorageError> {
        nv::update_block(store, layout::MAP_OFFSET, &self.to_bytes())?;
        Ok(())
    }
}

impl Default for IgnitionMap {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::nv::MemStore;

    #[test]
    fn lookup_uses_500_rpm_bins() {
        let mut map = IgnitionMap::new();
        map.cells[1][7] = 42;
        assert_eq!(map.advance_for(1, 3500), 42);
        assert_eq!(map.advance_for(1, 3999), 42);
        assert_eq!(map.advance_for(1, 4000), 0);
    }

    #[test]
    fn out_of_range_coordinates_clamp() {
        let mut map = IgnitionMap::new();
        map.cells[MAP_COUNT - 1][MAP_RPM_BINS - 1] = 99;
        // RPM beyond the table reads the last bin.
        assert_eq!(map.advance_for(MAP_COUNT as u16 - 1, 60_000), 99);
        // Map index beyond the table reads the last map.
        assert_eq!(map.advance_for(500, 7800), 99);
    }

    #[test]
    fn survives_a_store_round_trip() {
        let mut map = IgnitionMap::new();
        for (r, row) in map.cells.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                *cell = (r * 16 + c) as u8;
            }
        }

        let mut store = MemStore::default();
        map.save(&mut store).unwrap();
        let reloaded = IgnitionMap::load(&mut store).unwrap();
        assert_eq!(reloaded, map);
    }
}
