//! Heap implementation for the memory subsystem
//!
//! A [`Heap`] is a fixed-capacity array of [`Cell`]s with manual alloc/free:
//! - Every allocation is self-describing: a [`Cell::Header`] sits directly in
//!   front of the payload run and records its extent
//! - First-fit placement, no compaction, never grows
//! - Single-cell reads/writes plus a bounded string read
//!
//! # Layout
//!
//! ```text
//! alloc(3) at index 4:
//!   [4] Header { base: 4, length: 3 }
//!   [5] Payload   <- returned address
//!   [6] Payload
//!   [7] Payload
//! ```
//!
//! # Error Handling
//!
//! The public operations are fail-soft. `alloc` returns `None`, `free` logs a
//! contract violation and keeps going, out-of-range writes are dropped and
//! out-of-range reads return `None`. [`Heap::try_alloc`] and [`Heap::try_free`]
//! return the underlying [`MemoryError`] instead.

use super::address::AddressCodec;
use super::constants::{HEADER_CELLS, MAX_HEAP_CELLS, TERMINATOR};
use super::errors::{MemoryError, Result};
use super::value::{Address, Value};
use tracing::{debug, warn};

/// Extent of an allocated block, stored in its first cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// Index of the header cell itself
    pub base: usize,
    /// Number of payload cells following the header
    pub length: usize,
}

/// One unit of heap storage
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Free,
    Header(BlockHeader),
    Payload(Option<Value>), // None until first written
}

impl Cell {
    pub fn is_free(&self) -> bool {
        matches!(self, Cell::Free)
    }
}

/// The heap
#[derive(Debug, Clone)]
pub struct Heap {
    codec: AddressCodec,
    cells: Vec<Cell>,
    used_cells: usize,
}

impl Heap {
    /// Create a heap with a fixed number of cells.
    ///
    /// Falls back to an empty heap (every alloc fails) when the cell array
    /// cannot be reserved; use [`Heap::try_new`] to see the error.
    pub fn new(capacity: usize) -> Self {
        Self::try_new(capacity).unwrap_or_else(|e| {
            warn!("heap: {}, using an empty heap", e);
            Self::with_cells(Vec::new())
        })
    }

    /// Create a heap, failing if `capacity` exceeds [`MAX_HEAP_CELLS`] or the
    /// cell array cannot be reserved
    pub fn try_new(capacity: usize) -> Result<Self> {
        if capacity > MAX_HEAP_CELLS {
            return Err(MemoryError::ArenaUnavailable { capacity });
        }

        let mut cells = Vec::new();
        cells
            .try_reserve_exact(capacity)
            .map_err(|_| MemoryError::ArenaUnavailable { capacity })?;
        cells.resize(capacity, Cell::Free);
        Ok(Self::with_cells(cells))
    }

    fn with_cells(cells: Vec<Cell>) -> Self {
        Heap {
            codec: AddressCodec::new(cells.len()),
            cells,
            used_cells: 0,
        }
    }

    /// Allocate `size` payload cells. Returns `None` when no free run fits.
    pub fn alloc(&mut self, size: usize) -> Option<Address> {
        match self.try_alloc(size) {
            Ok(addr) => Some(addr),
            Err(e) => {
                warn!(tag = self.codec.tag(), "alloc failed: {}", e);
                None
            }
        }
    }

    /// Allocate `size` payload cells using first-fit placement
    pub fn try_alloc(&mut self, size: usize) -> Result<Address> {
        if size == 0 {
            return Err(MemoryError::ZeroSizedAlloc);
        }

        let (base, needed) = size
            .checked_add(HEADER_CELLS)
            .and_then(|needed| Some((self.find_free_run(needed)?, needed)))
            .ok_or_else(|| MemoryError::CapacityExceeded {
                requested: size,
                largest_free: self.largest_free_run().saturating_sub(HEADER_CELLS),
            })?;

        self.cells[base] = Cell::Header(BlockHeader { base, length: size });
        for cell in &mut self.cells[base + HEADER_CELLS..base + needed] {
            *cell = Cell::Payload(None);
        }
        self.used_cells += needed;

        let addr = self.codec.encode(base + HEADER_CELLS);
        debug!(%addr, size, used = self.used_cells, "alloc");
        Ok(addr)
    }

    /// Release a block. A bad `(address, size)` pair is logged, never fatal.
    pub fn free(&mut self, address: Address, size: usize) {
        if let Err(e) = self.try_free(address, size) {
            warn!(tag = self.codec.tag(), "free: {}", e);
        }
    }

    /// Release a block.
    ///
    /// The stored header is authoritative: on a size mismatch the block is still
    /// released using the header's length, and the mismatch is returned as an error.
    /// Without a header at `address` (double free, interior or foreign address)
    /// nothing is touched.
    pub fn try_free(&mut self, address: Address, size: usize) -> Result<()> {
        let index = self
            .codec
            .decode(address)
            .ok_or(MemoryError::InvalidAddress(address))?;

        let header = index
            .checked_sub(HEADER_CELLS)
            .and_then(|h| match self.cells[h] {
                Cell::Header(header) if header.base == h => Some(header),
                _ => None,
            })
            .ok_or(MemoryError::DoubleFreeOrSizeMismatch {
                address,
                expected: size,
                found: None,
            })?;

        let span = header.length + HEADER_CELLS;
        for cell in &mut self.cells[header.base..header.base + span] {
            *cell = Cell::Free;
        }
        self.used_cells -= span;
        debug!(%address, size = header.length, used = self.used_cells, "free");

        if header.length != size {
            return Err(MemoryError::DoubleFreeOrSizeMismatch {
                address,
                expected: size,
                found: Some(header.length),
            });
        }
        Ok(())
    }

    /// Write a single value. Only allocated payload cells accept writes.
    pub fn write_data(&mut self, address: Address, value: Value) {
        match self.codec.decode(address).map(|i| &mut self.cells[i]) {
            Some(Cell::Payload(slot)) => *slot = Some(value),
            Some(_) => debug!(%address, "write to unallocated cell ignored"),
            None => debug!(%address, "write to invalid address ignored"),
        }
    }

    /// Read a single value
    pub fn read_data(&self, address: Address) -> Option<Value> {
        match self.cells.get(self.codec.decode(address)?)? {
            Cell::Payload(value) => *value,
            _ => None,
        }
    }

    /// Read consecutive cells as text.
    ///
    /// Stops at the first terminator, the first cell that holds no value (a header,
    /// a free or an unwritten cell), the arena end, or after `max_length` cells.
    /// Returns `None` only if `address` itself is invalid.
    pub fn read_string(&self, address: Address, max_length: usize) -> Option<String> {
        let start = self.codec.decode(address)?;
        let mut out = String::new();

        for cell in self.cells[start..].iter().take(max_length) {
            match cell {
                Cell::Payload(Some(value)) if !value.is_terminator() => value.push_to(&mut out),
                _ => break,
            }
        }
        Some(out)
    }

    /// Write `text` followed by a terminator, one char per cell.
    ///
    /// Writing stops at the end of the block that owns `address` (the first
    /// cell that is not payload), so a long string is truncated rather than
    /// spilling into the next block. Returns the number of cells written,
    /// terminator included.
    pub fn write_string(&mut self, address: Address, text: &str) -> usize {
        let Some(start) = self.codec.decode(address) else {
            debug!(%address, "write_string to invalid address ignored");
            return 0;
        };

        let mut written = 0;
        let chars = text.chars().chain(std::iter::once(TERMINATOR));
        for (cell, c) in self.cells[start..].iter_mut().zip(chars) {
            match cell {
                Cell::Payload(slot) => *slot = Some(Value::Char(c)),
                _ => break,
            }
            written += 1;
        }
        if written < text.chars().count() + 1 {
            debug!(%address, written, "write_string truncated at block end");
        }
        written
    }

    /// Check whether `address` decodes to a cell of this heap
    pub fn contains(&self, address: Address) -> bool {
        self.codec.decode(address).is_some()
    }

    /// Get a cell by raw index (for diagnostics)
    pub fn cell(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    /// All live blocks as (payload address, header), in index order
    pub fn blocks(&self) -> impl Iterator<Item = (Address, BlockHeader)> + '_ {
        self.cells.iter().filter_map(move |cell| match cell {
            Cell::Header(header) => Some((self.codec.encode(header.base + HEADER_CELLS), *header)),
            _ => None,
        })
    }

    pub fn block_count(&self) -> usize {
        self.blocks().count()
    }

    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    /// Cells taken by blocks, headers included
    pub fn used_cells(&self) -> usize {
        self.used_cells
    }

    pub fn free_cells(&self) -> usize {
        self.cells.len() - self.used_cells
    }

    /// Length of the longest run of free cells
    pub fn largest_free_run(&self) -> usize {
        let mut best = 0;
        let mut run = 0;
        for cell in &self.cells {
            if cell.is_free() {
                run += 1;
                best = best.max(run);
            } else {
                run = 0;
            }
        }
        best
    }

    pub fn codec(&self) -> &AddressCodec {
        &self.codec
    }

    /// First index starting a run of `needed` free cells
    fn find_free_run(&self, needed: usize) -> Option<usize> {
        let mut run_start = 0;
        let mut run = 0;
        for (i, cell) in self.cells.iter().enumerate() {
            if cell.is_free() {
                if run == 0 {
                    run_start = i;
                }
                run += 1;
                if run == needed {
                    return Some(run_start);
                }
            } else {
                run = 0;
            }
        }
        None
    }
}

impl Default for Heap {
    fn default() -> Self {
        // Default heap size: 4096 cells
        Self::new(4096)
    }
}
