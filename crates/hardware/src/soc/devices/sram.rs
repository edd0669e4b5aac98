//! On-chip memory slave (SRAM and boot ROM).
//!
//! This module implements the memory behind the `Sram` and `Rom` slave kinds. It provides:
//! 1. **Storage:** A zero-initialised byte buffer sized from the bus map.
//! 2. **Masked writes:** Only lanes enabled in the byte mask are stored.
//! 3. **Read-only mode:** ROM answers writes as valid but ignores the data.
//! 4. **Loading:** Images are written out of band with `load`.

use crate::common::constants::BUS_DATA_BYTES;
use crate::common::error::LoadError;
use crate::soc::devices::Slave;
use crate::soc::transaction::{SlaveRequest, SlaveResponse};

/// Byte-addressed memory slave.
#[derive(Debug)]
pub struct Sram {
    name: String,
    data: Vec<u8>,
    read_only: bool,
}

impl Sram {
    /// Creates a writable memory of `size` bytes.
    pub fn new(name: &str, size: usize) -> Self {
        Self {
            name: name.to_string(),
            data: vec![0; size],
            read_only: false,
        }
    }

    /// Creates a read-only memory of `size` bytes.
    pub fn rom(name: &str, size: usize) -> Self {
        Self {
            read_only: true,
            ..Self::new(name, size)
        }
    }

    /// Returns `true` when bus writes are ignored.
    pub const fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Backing size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` for a zero-sized memory.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Copies `image` into the memory at `offset`, bypassing the read-only flag.
    ///
    /// # Arguments
    ///
    /// * `offset` - Byte offset relative to the slave window.
    /// * `image` - Bytes to store.
    ///
    /// # Errors
    ///
    /// `LoadError::TooLarge` when the image does not fit between `offset` and the end.
    pub fn load(&mut self, offset: u64, image: &[u8]) -> Result<(), LoadError> {
        let start = usize::try_from(offset).unwrap_or(usize::MAX);
        let end = start.checked_add(image.len());
        match end {
            Some(end) if end <= self.data.len() => {
                self.data[start..end].copy_from_slice(image);
                Ok(())
            }
            _ => Err(LoadError::TooLarge {
                name: self.name.clone(),
                offset,
                len: image.len(),
                size: self.data.len(),
            }),
        }
    }

    /// Returns a byte slice of the memory contents.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Reads one little-endian doubleword; bytes past the end read as zero.
    fn read_double(&self, offset: usize) -> u64 {
        let mut buf = [0u8; BUS_DATA_BYTES as usize];
        if let Some(tail) = self.data.get(offset..) {
            let n = tail.len().min(buf.len());
            buf[..n].copy_from_slice(&tail[..n]);
        }
        u64::from_le_bytes(buf)
    }
}

impl Slave for Sram {
    /// Returns the slave name.
    fn name(&self) -> &str {
        &self.name
    }

    /// Reads a doubleword or stores the enabled lanes of one.
    fn access(&mut self, req: &SlaveRequest) -> SlaveResponse {
        let Ok(offset) = usize::try_from(req.offset) else {
            return SlaveResponse::ok(0);
        };
        if req.is_write() {
            if !self.read_only {
                for (lane, byte) in req.data.to_le_bytes().into_iter().enumerate() {
                    if !req.byte_mask.lane(lane as u64) {
                        continue;
                    }
                    if let Some(slot) = self.data.get_mut(offset + lane) {
                        *slot = byte;
                    }
                }
            }
            SlaveResponse::ok(0)
        } else {
            SlaveResponse::ok(self.read_double(offset))
        }
    }

    /// Writable memory powers up zeroed; ROM keeps its loaded image.
    fn reset(&mut self) {
        if !self.read_only {
            self.data.fill(0);
        }
    }

    /// Downcasts the slave to a mutable `Sram` reference.
    fn as_sram_mut(&mut self) -> Option<&mut Sram> {
        Some(self)
    }
}
