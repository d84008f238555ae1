//! Immobilizer interlock.
//!
//! A secondary byte stream (the key reader) delivers framed tokens:
//! STX resets the receive buffer, ETX terminates the token and compares
//! it against key slot 0. A match clears the lock and the indicator
//! lamp; a mismatch is silently ignored so match attempts leak nothing.
//! There is no runtime re-lock — only a restart arms the interlock
//! again, from the `ImmoEnabled` parameter.

use heapless::Vec;

use crate::hal::IgnitionOutputs;
use crate::store::keys::{ImmoKeys, KEY_LEN};

/// Start-of-token frame marker.
pub const FRAME_START: u8 = 0x02;
/// End-of-token frame marker.
pub const FRAME_END: u8 = 0x03;

/// Lock state plus the partial-token receive buffer.
#[derive(Debug, Clone, Default)]
pub struct Immobilizer {
    locked: bool,
    buf: Vec<u8, KEY_LEN>,
    overflowed: bool,
}

impl Immobilizer {
    pub const fn new() -> Self {
        Self {
            locked: false,
            buf: Vec::new(),
            overflowed: false,
        }
    }

    /// Arm (or leave disarmed) at boot and drive the indicator lamp.
    pub fn arm(&mut self, enabled: bool, out: &mut impl IgnitionOutputs) {
        self.locked = enabled;
        out.set_indicator(enabled);
    }

    /// One byte received from the key reader.
    ///
    /// Reception is skipped entirely while unlocked. A token longer than
    /// [`KEY_LEN`] sets an overflow mark so it can never match a stored
    /// key by truncation.
    pub fn on_byte(&mut self, byte: u8, keys: &ImmoKeys, out: &mut impl IgnitionOutputs) {
        if !self.locked {
            return;
        }
        match byte {
            FRAME_START => {
                self.buf.clear();
                self.overflowed = false;
            }
            FRAME_END => {
                if !self.overflowed && self.buf.as_slice() == keys.key(0) {
                    self.locked = false;
                    out.set_indicator(false);
                }
                self.buf.clear();
                self.overflowed = false;
            }
            byte => {
                if self.buf.push(byte).is_err() {
                    self.overflowed = true;
                }
            }
        }
    }

    #[inline]
    pub const fn is_locked(&self) -> bool {
        self.locked
    }

    #[inline]
    pub const fn is_unlocked(&self) -> bool {
        !self.locked
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
