//! Generic durable byte-block storage.
//!
//! [`NvStore`] abstracts an EEPROM-like device: blocking readiness, byte
//! addressed reads and writes. [`update_block`] implements the shared
//! wear discipline — busy-wait, read back, and skip the write entirely
//! when the new content equals the stored content.
//!
//! Two host-side backends ship with the core: [`MemStore`] for tests and
//! software-in-loop runs, and [`FileStore`] for bench setups that need
//! real durability.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::debug;

use crate::error::StorageError;
use crate::store::layout;

/// EEPROM-like non-volatile block device.
pub trait NvStore {
    /// Total addressable bytes.
    fn capacity(&self) -> usize;

    /// Block until the device accepts a new operation. Host-side
    /// backends are always ready; EEPROM implementations poll here.
    fn wait_ready(&mut self);

    /// Read `buf.len()` bytes starting at `offset`.
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError>;

    /// Write `data` starting at `offset`.
    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError>;
}

fn check_bounds(offset: usize, len: usize, capacity: usize) -> Result<(), StorageError> {
    if offset.checked_add(len).is_none_or(|end| end > capacity) {
        return Err(StorageError::OutOfBounds {
            offset,
            len,
            capacity,
        });
    }
    Ok(())
}

/// Write `data` at `offset` only if it differs from the stored content.
///
/// Returns whether a write was actually issued. Every persisted entity
/// funnels its saves through here.
pub fn update_block<S: NvStore + ?Sized>(
    store: &mut S,
    offset: usize,
    data: &[u8],
) -> Result<bool, StorageError> {
    store.wait_ready();

    let mut scratch = [0u8; layout::TOTAL_LEN];
    let current = &mut scratch[..data.len().min(layout::TOTAL_LEN)];
    if current.len() == data.len() {
        store.read(offset, current)?;
        if current == data {
            debug!(offset, len = data.len(), "nv block unchanged, write skipped");
            return Ok(false);
        }
    }

    store.write(offset, data)?;
    debug!(offset, len = data.len(), "nv block written");
    Ok(true)
}

// ─── RAM backend ────────────────────────────────────────────────────

/// In-memory backend used by tests and software-in-loop runs.
#[derive(Debug, Clone)]
pub struct MemStore {
    cells: Vec<u8>,
    writes: u32,
}

impl MemStore {
    /// Zero-filled store of `capacity` bytes (a blank EEPROM image).
    pub fn new(capacity: usize) -> Self {
        Self {
            cells: vec![0; capacity],
            writes: 0,
        }
    }

    /// Number of physical writes issued so far (wear accounting).
    pub const fn writes(&self) -> u32 {
        self.writes
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new(layout::TOTAL_LEN)
    }
}

impl NvStore for MemStore {
    fn capacity(&self) -> usize {
        self.cells.len()
    }

    fn wait_ready(&mut self) {}

    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError> {
        check_bounds(offset, buf.len(), self.cells.len())?;
        buf.copy_from_slice(&self.cells[offset..offset + buf.len()]);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError> {
        check_bounds(offset, data.len(), self.cells.len())?;
        self.cells[offset..offset + data.len()].copy_from_slice(data);
        self.writes += 1;
        Ok(())
    }
}

// ─── File backend ───────────────────────────────────────────────────

/// File-backed store for bench setups that need durability across runs.
#[derive(Debug)]
pub struct FileStore {
    file: File,
    capacity: usize,
}

impl FileStore {
    /// Open (or create zero-filled) a backing file of `capacity` bytes.
    pub fn open(path: &Path, capacity: usize) -> Result<Self, StorageError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        file.set_len(capacity as u64)?;
        Ok(Self { file, capacity })
    }
}

impl NvStore for FileStore {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn wait_ready(&mut self) {}

    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError> {
        check_bounds(offset, buf.len(), self.capacity)?;
        self.file.seek(SeekFrom::Start(offset as u64))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError> {
        check_bounds(offset, data.len(), self.capacity)?;
        self.file.seek(SeekFrom::Start(offset as u64))?;
        self.file.write_all(data)?;
        self.file.flush()?;
        Ok(())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
