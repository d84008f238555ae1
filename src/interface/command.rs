//! Command grammar.
//!
//! One request line, dispatched on its first byte, parses into a tagged
//! [`Command`]. Parsing is pure: it never touches ECU state, so a
//! malformed line is rejected before anything is staged or persisted.
//!
//! Grammar (hex digits accept both cases, emitted lowercase):
//!
//! ```text
//! v                       firmware banner
//! d                       live telemetry
//! gII                     read parameter II
//! sIIVVVV                 write parameter II := VVVV
//! r                       read ignition map
//! wHH..;HH..;HH..;HH..    write map cells, ';' starts the next row
//! k                       read immobilizer keys
//! iKEY0 KEY1              write immobilizer keys
//! ```

use heapless::Vec;

use crate::error::CommandError;
use crate::store::keys::KEY_LEN;
use crate::store::map::{MAP_COUNT, MAP_RPM_BINS};

/// One parsed map cell from a `w` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapCell {
    pub row: u8,
    pub col: u8,
    pub value: u8,
}

/// Fixed-capacity immobilizer key token.
pub type KeyToken = Vec<u8, KEY_LEN>;

/// A parsed request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `v` — firmware name and version banner.
    Version,
    /// `d` — live RPM / advance / acceleration / throttle.
    Telemetry,
    /// `g` — read one tuning parameter.
    GetParam { id: u8 },
    /// `s` — write one tuning parameter.
    SetParam { id: u8, value: u16 },
    /// `r` — dump the 4×16 ignition map.
    ReadMap,
    /// `w` — overwrite the supplied prefix of the ignition map.
    WriteMap {
        cells: Vec<MapCell, { MAP_COUNT * MAP_RPM_BINS }>,
    },
    /// `k` — dump both immobilizer key slots.
    ReadKeys,
    /// `i` — overwrite both immobilizer key slots.
    WriteKeys { key0: KeyToken, key1: KeyToken },
}

/// Parse one request line (terminator already stripped). Empty lines are
/// skipped by the dispatcher before parsing.
pub fn parse(line: &[u8]) -> Result<Command, CommandError> {
    let Some(&first) = line.first() else {
        return Err(CommandError::Malformed);
    };
    match first {
        b'v' => Ok(Command::Version),
        b'd' => Ok(Command::Telemetry),
        b'g' => Ok(Command::GetParam {
            id: hex_u8(&line[1..])?,
        }),
        b's' => Ok(Command::SetParam {
            id: hex_u8(&line[1..])?,
            value: hex_u16(&line[3..])?,
        }),
        b'r' => Ok(Command::ReadMap),
        b'w' => parse_map_cells(&line[1..]),
        b'k' => Ok(Command::ReadKeys),
        b'i' => parse_key_tokens(&line[1..]),
        other => Err(CommandError::Unknown(other)),
    }
}

/// Map payload: consecutive 2-hex-digit cells, `;` starts the next row.
/// A payload shorter than the full grid updates only the cells it names.
fn parse_map_cells(payload: &[u8]) -> Result<Command, CommandError> {
    let mut cells = Vec::new();
    let (mut row, mut col) = (0u8, 0u8);

    let mut i = 0;
    while i < payload.len() {
        if payload[i] == b';' {
            row += 1;
            col = 0;
            i += 1;
            continue;
        }
        if row as usize >= MAP_COUNT || col as usize >= MAP_RPM_BINS {
            return Err(CommandError::MapBounds);
        }
        let value = hex_u8(&payload[i..])?;
        cells
            .push(MapCell { row, col, value })
            .map_err(|_| CommandError::MapBounds)?;
        col += 1;
        i += 2;
    }

    Ok(Command::WriteMap { cells })
}

/// Key payload: two tokens of up to 12 significant bytes, each terminated
/// by space, NUL, LF, or end of line. Anything beyond 12 bytes up to the
/// next terminator is discarded. Keys are ASCII; a token carrying a byte
/// outside that range is rejected so the `k` dump stays byte-exact.
fn parse_key_tokens(payload: &[u8]) -> Result<Command, CommandError> {
    let mut tokens = payload
        .split(|&b| b == b' ' || b == 0 || b == b'\n')
        .filter(|t| !t.is_empty());

    let mut take = || -> Result<KeyToken, CommandError> {
        let mut token = KeyToken::new();
        if let Some(bytes) = tokens.next() {
            if !bytes.is_ascii() {
                return Err(CommandError::Malformed);
            }
            token
                .extend_from_slice(&bytes[..bytes.len().min(KEY_LEN)])
                .map_err(|_| CommandError::Malformed)?;
        }
        Ok(token)
    };
    let key0 = take()?;
    let key1 = take()?;
    Ok(Command::WriteKeys { key0, key1 })
}

// ─── Hex helpers ────────────────────────────────────────────────────

const fn hex_nibble(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Two hex digits at the head of `digits`.
fn hex_u8(digits: &[u8]) -> Result<u8, CommandError> {
    match digits {
        [hi, lo, ..] => match (hex_nibble(*hi), hex_nibble(*lo)) {
            (Some(hi), Some(lo)) => Ok(hi << 4 | lo),
            _ => Err(CommandError::Malformed),
        },
        _ => Err(CommandError::Malformed),
    }
}

/// Four hex digits at the head of `digits`.
fn hex_u16(digits: &[u8]) -> Result<u16, CommandError> {
    if digits.len() < 4 {
        return Err(CommandError::Malformed);
    }
    let hi = hex_u8(&digits[..2])?;
    let lo = hex_u8(&digits[2..])?;
    Ok((hi as u16) << 8 | lo as u16)
}

// ─── Tests ──────────────────────────────────────────────────────────
