//! Parameter Store.
//!
//! Seven 16-bit tuning values loaded at boot and mutated one at a time by
//! the `s` diagnostic command. Writes are validated against the
//! configuration invariants before anything is touched; a rejected write
//! leaves both RAM and the non-volatile block unchanged.

use crate::error::{ParamError, StorageError};
use crate::store::layout;
use crate::store::map::MAP_COUNT;
use crate::store::nv::{self, NvStore};

/// Number of tuning parameters.
pub const PARAM_COUNT: usize = 7;

/// Typed parameter ids, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Param {
    /// Rev limiter engages above this RPM.
    CutoffStart = 0,
    /// Rev limiter releases below this RPM (must be ≤ `CutoffStart`).
    CutoffEnd = 1,
    /// Dynamic map timing engages above this RPM.
    DynamicOn = 2,
    /// Dynamic map timing releases below this RPM (must be ≤ `DynamicOn`).
    DynamicOff = 3,
    /// Index of the active ignition map.
    ActiveMap = 4,
    /// Baseline advance angle all map values are relative to.
    CrankOffset = 5,
    /// Whether the immobilizer arms at boot (0 or 1).
    ImmoEnabled = 6,
}

impl Param {
    pub const fn from_u8(id: u8) -> Option<Self> {
        match id {
            0 => Some(Self::CutoffStart),
            1 => Some(Self::CutoffEnd),
            2 => Some(Self::DynamicOn),
            3 => Some(Self::DynamicOff),
            4 => Some(Self::ActiveMap),
            5 => Some(Self::CrankOffset),
            6 => Some(Self::ImmoEnabled),
            _ => None,
        }
    }
}

/// The persisted tuning parameter array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameters([u16; PARAM_COUNT]);

impl Parameters {
    /// All-zero parameters (a blank EEPROM image).
    pub const fn new() -> Self {
        Self([0; PARAM_COUNT])
    }

    #[inline]
    pub const fn get(&self, param: Param) -> u16 {
        self.0[param as usize]
    }

    /// Read by raw wire id.
    pub fn get_by_id(&self, id: u8) -> Result<u16, ParamError> {
        let param = Param::from_u8(id).ok_or(ParamError::InvalidId(id))?;
        Ok(self.get(param))
    }

    /// Validated write by raw wire id. State is untouched on rejection.
    pub fn set(&mut self, id: u8, value: u16) -> Result<(), ParamError> {
        let param = Param::from_u8(id).ok_or(ParamError::InvalidId(id))?;
        self.validate(param, value)?;
        self.0[param as usize] = value;
        Ok(())
    }

    /// The configuration invariants. Cut-off and dynamic-timing pairs
    /// keep release ≤ engage, otherwise the hysteresis would never clear;
    /// the active map must exist; the immobilizer flag is boolean.
    fn validate(&self, param: Param, value: u16) -> Result<(), ParamError> {
        let rule = match param {
            Param::CutoffStart if value < self.get(Param::CutoffEnd) => {
                Some("cut-off hysteresis requires end <= start")
            }
            Param::CutoffEnd if value > self.get(Param::CutoffStart) => {
                Some("cut-off hysteresis requires end <= start")
            }
            Param::DynamicOn if value < self.get(Param::DynamicOff) => {
                Some("dynamic-timing hysteresis requires off <= on")
            }
            Param::DynamicOff if value > self.get(Param::DynamicOn) => {
                Some("dynamic-timing hysteresis requires off <= on")
            }
            Param::ActiveMap if value >= MAP_COUNT as u16 => {
                Some("active map index must be below 4")
            }
            Param::ImmoEnabled if value > 1 => Some("immobilizer flag is 0 or 1"),
            _ => None,
        };
        match rule {
            Some(rule) => Err(ParamError::InvalidValue { param, value, rule }),
            None => Ok(()),
        }
    }

    /// Re-check every invariant, for auditing a freshly loaded block.
    pub fn validate_all(&self) -> Result<(), ParamError> {
        for (id, &value) in self.0.iter().enumerate() {
            // Self-consistency check: each value must be admissible
            // against the others as currently stored.
            let param = match Param::from_u8(id as u8) {
                Some(p) => p,
                None => continue,
            };
            self.validate(param, value)?;
        }
        Ok(())
    }

    // Typed accessors for the scheduler hot path.

    #[inline]
    pub const fn cutoff_start(&self) -> u16 {
        self.get(Param::CutoffStart)
    }

    #[inline]
    pub const fn cutoff_end(&self) -> u16 {
        self.get(Param::CutoffEnd)
    }

    #[inline]
    pub const fn dynamic_on(&self) -> u16 {
        self.get(Param::DynamicOn)
    }

    #[inline]
    pub const fn dynamic_off(&self) -> u16 {
        self.get(Param::DynamicOff)
    }

    #[inline]
    pub const fn active_map(&self) -> u16 {
        self.get(Param::ActiveMap)
    }

    #[inline]
    pub const fn crank_offset(&self) -> u16 {
        self.get(Param::CrankOffset)
    }

    #[inline]
    pub const fn immo_enabled(&self) -> bool {
        self.get(Param::ImmoEnabled) != 0
    }

    pub fn to_bytes(&self) -> [u8; layout::PARAMS_LEN] {
        let mut out = [0u8; layout::PARAMS_LEN];
        for (i, value) in self.0.iter().enumerate() {
            out[i * 2..i * 2 + 2].copy_from_slice(&value.to_le_bytes());
        }
        out
    }

    pub fn from_bytes(bytes: &[u8; layout::PARAMS_LEN]) -> Self {
        let mut values = [0u16; PARAM_COUNT];
        for (i, value) in values.iter_mut().enumerate() {
            *value = u16::from_le_bytes([bytes[i * 2], bytes[i * 2 + 1]]);
        }
        Self(values)
    }

    /// Load the parameter block from the store at boot.
    pub fn load<S: NvStore>(store: &mut S) -> Result<Self, StorageError> {
        store.wait_ready();
        let mut bytes = [0u8; layout::PARAMS_LEN];
        store.read(layout::PARAMS_OFFSET, &mut bytes)?;
        Ok(Self::from_bytes(&bytes))
    }

    /// Persist the parameter block (write-if-changed).
    pub fn save<S: NvStore>(&self, store: &mut S) -> Result<(), StorageError> {
        nv::update_block(store, layout::PARAMS_OFFSET, &self.to_bytes())?;
        Ok(())
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::nv::MemStore;

    fn tuned() -> Parameters {
        let mut p = Parameters::new();
        p.set(Param::CutoffStart as u8, 8500).unwrap();
        p.set(Param::CutoffEnd as u8, 8200).unwrap();
        p.set(Param::DynamicOn as u8, 2500).unwrap();
        p.set(Param::DynamicOff as u8, 2200).unwrap();
        p.set(Param::ActiveMap as u8, 1).unwrap();
        p.set(Param::CrankOffset as u8, 40).unwrap();
        p.set(Param::ImmoEnabled as u8, 1).unwrap();
        p
    }

    #[test]
    fn set_then_get_round_trips() {
        let p = tuned();
        assert_eq!(p.cutoff_start(), 8500);
        assert_eq!(p.get_by_id(5).unwrap(), 40);
        assert!(p.immo_enabled());
    }

    #[test]
    fn invalid_id_rejected() {
        let mut p = tuned();
        assert_eq!(p.get_by_id(7), Err(ParamError::InvalidId(7)));
        let before = p.clone();
        assert!(p.set(0x20, 1).is_err());
        assert_eq!(p, before);
    }

    #[test]
    fn cutoff_hysteresis_ordering_enforced() {
        let mut p = tuned();
        // end above start: rejected either way around.
        assert!(p.set(Param::CutoffEnd as u8, 9000).is_err());
        assert!(p.set(Param::CutoffStart as u8, 8300).is_ok());
        assert!(p.set(Param::CutoffStart as u8, 7000).is_err());
        assert_eq!(p.cutoff_start(), 8300);
        assert_eq!(p.cutoff_end(), 8200, "rejected writes leave state untouched");
    }

    #[test]
    fn dynamic_hysteresis_ordering_enforced() {
        let mut p = tuned();
        assert!(p.set(Param::DynamicOff as u8, 2600).is_err());
        assert!(p.set(Param::DynamicOn as u8, 2100).is_err());
    }

    #[test]
    fn active_map_and_immo_flag_bounds() {
        let mut p = tuned();
        assert!(p.set(Param::ActiveMap as u8, 4).is_err());
        assert!(p.set(Param::ActiveMap as u8, 3).is_ok());
        assert!(p.set(Param::ImmoEnabled as u8, 2).is_err());
    }

    #[test]
    fn blank_block_is_self_consistent() {
        assert!(Parameters::new().validate_all().is_ok());
    }

    #[test]
    fn survives_a_store_round_trip() {
        let p = tuned();
        let mut store = MemStore::default();
        p.save(&mut store).unwrap();
        assert_eq!(Parameters::load(&mut store).unwrap(), p);
    }
}
