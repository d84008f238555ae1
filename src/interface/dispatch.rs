//! Command execution and response formatting.
//!
//! [`Interface`] is the foreground half of the diagnostic channel: the
//! platform feeds it received bytes one at a time and transmits whatever
//! it hands back. Every completed line yields exactly one response ending
//! in CRLF, a 2-digit lowercase hex exit code, and the `>` prompt; the
//! payload formats are wire-exact for the existing host tool, trailing
//! separators included.
//!
//! Mutating commands stage their full effect before touching the ECU, so
//! a rejected line never leaves partially applied state behind.

use core::fmt::Write as _;

use heapless::String;
use static_assertions::const_assert;
use tracing::debug;

use crate::FIRMWARE_VERSION;
use crate::ecu::Ecu;
use crate::error::{CommandError, EXIT_OK};
use crate::interface::command::{self, Command};
use crate::interface::line::LineBuffer;
use crate::store::keys::KEY_COUNT;
use crate::store::nv::NvStore;

/// Response capacity. The widest payload is the map dump: 64 cells of up
/// to 4 bytes each plus 4 row separators and the exit-code tail.
pub const RESPONSE_CAPACITY: usize = 512;
const_assert!(RESPONSE_CAPACITY >= 64 * 4 + 4 * 2 + 5);

/// One complete response, exit-code tail included.
pub type Response = String<RESPONSE_CAPACITY>;

/// Diagnostic channel foreground: line assembly plus command execution.
#[derive(Debug, Default)]
pub struct Interface {
    line: LineBuffer,
}

impl Interface {
    pub const fn new() -> Self {
        Self {
            line: LineBuffer::new(),
        }
    }

    /// Feed one received byte. Returns the response to transmit when the
    /// byte completed a line, `None` while one is still accumulating.
    ///
    /// An empty line executes nothing and reports exit code `00`.
    pub fn on_byte<S: NvStore>(&mut self, byte: u8, ecu: &mut Ecu<S>) -> Option<Response> {
        if !self.line.push(byte) {
            return None;
        }

        let mut resp = Response::new();
        let code = if self.line.line().is_empty() {
            EXIT_OK
        } else {
            match execute(self.line.line(), ecu, &mut resp) {
                Ok(()) => EXIT_OK,
                Err(err) => {
                    debug!(command = %(self.line.line()[0] as char), %err, "command rejected");
                    resp.clear();
                    err.exit_code()
                }
            }
        };
        self.line.clear();

        // Capacity is pinned above; a full buffer can only truncate the
        // payload, never the exit-code tail we append afterwards.
        let _ = write!(resp, "\r\n{code:02x}>");
        Some(resp)
    }
}

fn execute<S: NvStore>(
    line: &[u8],
    ecu: &mut Ecu<S>,
    resp: &mut Response,
) -> Result<(), CommandError> {
    match command::parse(line)? {
        Command::Version => {
            let _ = write!(resp, "\r\nMZ ECU, firmware version {FIRMWARE_VERSION}");
        }
        Command::Telemetry => {
            let (snap, _) = ecu.telemetry().load();
            let _ = write!(
                resp,
                "\r\n{} {} {} {}",
                snap.rpm, snap.advance, snap.acceleration, snap.throttle
            );
        }
        Command::GetParam { id } => {
            let value = ecu.params().get_by_id(id).map_err(CommandError::Param)?;
            let _ = write!(resp, "\r\n{value:04x}");
        }
        Command::SetParam { id, value } => ecu.set_param(id, value)?,
        Command::ReadMap => {
            // No leading CRLF, trailing "; " after every row: the host
            // tool splits on exactly this framing.
            for row in &ecu.map().cells {
                for cell in row {
                    let _ = write!(resp, "{cell} ");
                }
                let _ = resp.push_str("; ");
            }
        }
        Command::WriteMap { cells } => {
            let mut staged = ecu.map().cells;
            for cell in &cells {
                staged[cell.row as usize][cell.col as usize] = cell.value;
            }
            ecu.write_map(staged)?;
        }
        Command::ReadKeys => {
            let _ = resp.push_str("\r\n");
            for slot in 0..KEY_COUNT {
                for &b in ecu.keys().key(slot) {
                    let _ = resp.push(b as char);
                }
                let _ = resp.push(' ');
            }
        }
        Command::WriteKeys { key0, key1 } => ecu.write_keys(&key0, &key1)?,
    }
    Ok(())
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::MockOutputs;
    use crate::store::nv::MemStore;

    fn booted() -> (Ecu<MemStore>, MockOutputs) {
        let mut out = MockOutputs::new();
        let ecu = Ecu::boot(MemStore::default(), &mut out).unwrap();
        (ecu, out)
    }

    fn run(iface: &mut Interface, ecu: &mut Ecu<MemStore>, line: &str) -> Response {
        let mut resp = None;
        for &b in line.as_bytes() {
            resp = iface.on_byte(b, ecu);
        }
        resp.expect("line was CR-terminated")
    }

    #[test]
    fn version_banner_carries_the_package_version() {
        let (mut ecu, _out) = booted();
        let mut iface = Interface::new();
        let resp = run(&mut iface, &mut ecu, "v\r");
        assert_eq!(
            resp.as_str(),
            format!("\r\nMZ ECU, firmware version {FIRMWARE_VERSION}\r\n00>")
        );
    }

    #[test]
    fn empty_line_reports_ok_without_side_effects() {
        let (mut ecu, _out) = booted();
        let mut iface = Interface::new();
        assert_eq!(run(&mut iface, &mut ecu, "\r").as_str(), "\r\n00>");
    }

    #[test]
    fn unknown_command_reports_ff() {
        let (mut ecu, _out) = booted();
        let mut iface = Interface::new();
        assert_eq!(run(&mut iface, &mut ecu, "q\r").as_str(), "\r\nff>");
    }

    #[test]
    fn rejected_line_emits_no_payload() {
        let (mut ecu, _out) = booted();
        let mut iface = Interface::new();
        // Id 9 is past the parameter table.
        assert_eq!(run(&mut iface, &mut ecu, "g09\r").as_str(), "\r\n01>");
    }

    #[test]
    fn map_dump_keeps_the_trailing_row_separator() {
        let (mut ecu, _out) = booted();
        let mut iface = Interface::new();
        let resp = run(&mut iface, &mut ecu, "r\r");
        assert!(resp.as_str().starts_with("0 0 "));
        assert!(resp.as_str().ends_with("; \r\n00>"));
    }
}
