//! Immobilizer key store.
//!
//! Two NUL-padded ASCII key slots of up to 12 characters. The unlock
//! comparison uses slot 0 only; slot 1 is persisted and editable but
//! never compared (kept as-is pending product clarification — see
//! DESIGN.md).

use crate::error::StorageError;
use crate::store::layout;
use crate::store::nv::{self, NvStore};

/// Number of key slots.
pub const KEY_COUNT: usize = 2;
/// Maximum significant characters per key.
pub const KEY_LEN: usize = 12;

const SLOT_LEN: usize = KEY_LEN + 1;

/// The persisted immobilizer key pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImmoKeys {
    slots: [[u8; SLOT_LEN]; KEY_COUNT],
}

impl ImmoKeys {
    /// Blank (all-NUL) key slots.
    pub const fn new() -> Self {
        Self {
            slots: [[0; SLOT_LEN]; KEY_COUNT],
        }
    }

    /// Key bytes of `slot`, up to the first NUL.
    pub fn key(&self, slot: usize) -> &[u8] {
        let bytes = &self.slots[slot];
        let len = bytes.iter().position(|&b| b == 0).unwrap_or(KEY_LEN);
        &bytes[..len]
    }

    /// Overwrite `slot` with `token`, truncated to [`KEY_LEN`] bytes and
    /// NUL-padded so a shorter key never leaves stale tail bytes behind.
    pub fn set_key(&mut self, slot: usize, token: &[u8]) {
        let token = &token[..token.len().min(KEY_LEN)];
        self.slots[slot] = [0; SLOT_LEN];
        self.slots[slot][..token.len()].copy_from_slice(token);
    }

    pub fn to_bytes(&self) -> [u8; layout::KEYS_LEN] {
        let mut out = [0u8; layout::KEYS_LEN];
        for (i, slot) in self.slots.iter().enumerate() {
            out[i * SLOT_LEN..(i + 1) * SLOT_LEN].copy_from_slice(slot);
        }
        out
    }

    pub fn from_bytes(bytes: &[u8; layout::KEYS_LEN]) -> Self {
        let mut keys = Self::new();
        for (i, slot) in keys.slots.iter_mut().enumerate() {
            slot.copy_from_slice(&bytes[i * SLOT_LEN..(i + 1) * SLOT_LEN]);
        }
        keys
    }

    /// Load the key block from the store at boot.
    pub fn load<S: NvStore>(store: &mut S) -> Result<Self, StorageError> {
        store.wait_ready();
        let mut bytes = [0u8; layout::KEYS_LEN];
        store.read(layout::KEYS_OFFSET, &mut bytes)?;
        Ok(Self::from_bytes(&bytes))
    }

    /// Persist the key block (write-if-changed).
    pub fn save<S: NvStore>(&self, store: &mut S) -> Result<(), StorageError> {
        nv::update_block(store, layout::KEYS_OFFSET, &self.to_bytes())?;
        Ok(())
    }
}

impl Default for ImmoKeys {
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
    fn shorter_key_wipes_stale_tail() {
        let mut keys = ImmoKeys::new();
        keys.set_key(0, b"0D00857241BB");
        keys.set_key(0, b"AB12");
        assert_eq!(keys.key(0), b"AB12");
        assert_eq!(keys.to_bytes()[4], 0, "tail is NUL padded");
    }

    #[test]
    fn over_long_token_truncates_to_twelve() {
        let mut keys = ImmoKeys::new();
        keys.set_key(1, b"0123456789ABCDEF");
        assert_eq!(keys.key(1), b"0123456789AB");
    }

    #[test]
    fn survives_a_store_round_trip() {
        let mut keys = ImmoKeys::new();
        keys.set_key(0, b"0D00857241BB");
        keys.set_key(1, b"SPARE");

        let mut store = MemStore::default();
        keys.save(&mut store).unwrap();
        assert_eq!(ImmoKeys::load(&mut store).unwrap(), keys);
    }
}
