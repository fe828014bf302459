//! Address ↔ index translation
//!
//! An [`AddressCodec`] belongs to exactly one heap. It stamps the heap's tag into
//! the upper half of every address, so an address from another heap (or from a
//! heap that was replaced) decodes to `None` instead of aliasing a live cell.
//!
//! ```text
//! address = (tag << 32) | (HEAP_ADDRESS_START + index)
//! ```
//!
//! Adjacent indices map to adjacent addresses, so `encode(i).offset(1) == encode(i + 1)`.

use super::constants::HEAP_ADDRESS_START;
use super::value::Address;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_TAG: AtomicU32 = AtomicU32::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressCodec {
    tag: u32,
    capacity: usize,
}

impl AddressCodec {
    /// Create a codec with a fresh tag for an arena of `capacity` cells
    pub fn new(capacity: usize) -> Self {
        AddressCodec {
            tag: NEXT_TAG.fetch_add(1, Ordering::Relaxed),
            capacity,
        }
    }

    pub fn tag(&self) -> u32 {
        self.tag
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Encode an index; the result is only meaningful for `index < capacity`
    pub fn encode(&self, index: usize) -> Address {
        Address((u64::from(self.tag) << 32) | (HEAP_ADDRESS_START + index as u64))
    }

    /// Decode an address back to an index.
    ///
    /// Returns `None` for foreign tags and for anything outside `[0, capacity)`.
    pub fn decode(&self, address: Address) -> Option<usize> {
        let raw = address.raw();
        if (raw >> 32) as u32 != self.tag {
            return None;
        }
        let low = raw & 0xffff_ffff;
        let index = low.checked_sub(HEAP_ADDRESS_START)? as usize;
        (index < self.capacity).then_some(index)
    }
}
