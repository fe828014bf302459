// Constants for the memory subsystem

/// Offset added to every cell index when it is encoded as an address.
/// Keeps address 0 free and makes addresses easy to tell apart from indices in logs.
pub const HEAP_ADDRESS_START: u64 = 0x1000_0000;

/// Largest heap capacity the address encoding can represent
pub const MAX_HEAP_CELLS: usize = (u32::MAX as u64 - HEAP_ADDRESS_START) as usize;

/// Heap/shed id that tells `allocate_memory` to skip that kind of arena
pub const SKIP_SLOT: i32 = -1;

/// Freed pids the registry remembers; older ones report as unallocated again
pub const FREED_HISTORY_LIMIT: usize = 1024;

/// Cells consumed by a block header in front of every allocation
pub const HEADER_CELLS: usize = 1;

/// String terminator written after every stored string
pub const TERMINATOR: char = '\0';

/// Suffix of the resource link holding a stored blob's address
pub const ADDR_SUFFIX: &str = "_ADDR";

/// Suffix of the resource link holding a stored blob's cell count
pub const SIZE_SUFFIX: &str = "_SIZE";

/// Separator between a component prefix and its key in the shared scratch store
pub const SCRATCH_KEY_SEPARATOR: char = ':';

/// Capacity of the shared scratch heap when none is configured
pub const DEFAULT_SCRATCH_CAPACITY: usize = 64 * 1024;
