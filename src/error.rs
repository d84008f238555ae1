//! Error taxonomy for the control core.
//!
//! Protocol errors are values, not panics: every diagnostic command
//! resolves to a 2-digit exit code. Storage and parameter errors carry
//! enough context to log; none of them is fatal to the core.

use thiserror::Error;

use crate::store::params::Param;

/// Exit code for a successfully executed (or empty) command line.
pub const EXIT_OK: u8 = 0x00;
/// Exit code for an invalid id, argument, or out-of-bounds coordinate.
pub const EXIT_INVALID: u8 = 0x01;
/// Exit code for an unrecognized command byte.
pub const EXIT_UNKNOWN: u8 = 0xFF;

/// Non-volatile store access failure.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Requested block lies outside the store.
    #[error("block [{offset}, {offset}+{len}) exceeds store capacity {capacity}")]
    OutOfBounds {
        offset: usize,
        len: usize,
        capacity: usize,
    },
    /// Backing file I/O failure (file-backed stores only).
    #[error("backing store I/O: {0}")]
    Io(#[from] std::io::Error),
}

/// Parameter store mutation rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamError {
    /// Id does not name one of the seven tuning parameters.
    #[error("parameter id {0:#04x} out of range")]
    InvalidId(u8),
    /// Value breaks a configuration invariant; state is left untouched.
    #[error("parameter {param:?} = {value} rejected: {rule}")]
    InvalidValue {
        param: Param,
        value: u16,
        rule: &'static str,
    },
}

/// Diagnostic command rejected. Maps onto the protocol exit codes.
#[derive(Debug, Error)]
pub enum CommandError {
    /// First byte of the line is not a known command.
    #[error("unknown command {0:#04x}")]
    Unknown(u8),
    /// Line too short or contains a non-hex digit where one is required.
    #[error("malformed argument")]
    Malformed,
    /// Map cell outside the 4×16 grid.
    #[error("map cell outside the 4x16 grid")]
    MapBounds,
    /// Parameter id/value rejected by the parameter store.
    #[error(transparent)]
    Param(#[from] ParamError),
    /// Persisting the mutation failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl CommandError {
    /// Protocol exit code reported for this rejection.
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Unknown(_) => EXIT_UNKNOWN,
            _ => EXIT_INVALID,
        }
    }
}
