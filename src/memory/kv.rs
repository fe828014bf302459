//! Named-blob persistence over one heap + shed pair
//!
//! [`KeyValueMemoryStore`] is a borrowed view: it owns nothing and can be built
//! over any heap/shed pair, whether it belongs to a process or to the shared
//! [`ScratchStore`](super::scratch::ScratchStore).
//!
//! # Record Layout
//!
//! For a key `k` the shed carries two resource links:
//!
//! ```text
//! k_ADDR = "0x…"   payload address in the heap
//! k_SIZE = "n"     cells in the block (characters + terminator)
//! ```
//!
//! Saving is replace-on-write: the stale block for a key is freed before the
//! new one is allocated, so repeated same-length overwrites reuse the same cells.
//! There is no enumeration; callers must know their own keys.

use super::constants::{ADDR_SUFFIX, SIZE_SUFFIX, TERMINATOR};
use super::errors::{MemoryError, Result};
use super::heap::Heap;
use super::shed::Shed;
use super::value::Address;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

pub struct KeyValueMemoryStore<'a> {
    heap: &'a mut Heap,
    shed: &'a mut Shed,
}

impl<'a> KeyValueMemoryStore<'a> {
    pub fn new(heap: &'a mut Heap, shed: &'a mut Shed) -> Self {
        KeyValueMemoryStore { heap, shed }
    }

    /// Store `payload` under `key`, replacing any previous value.
    ///
    /// Returns `false` if the heap has no room; the key is then left absent.
    /// A payload containing the terminator cannot be stored: `save` returns
    /// `false` and the key keeps its previous value.
    pub fn save(&mut self, key: &str, payload: &str) -> bool {
        if payload.contains(TERMINATOR) {
            warn!(key, "payload contains a terminator, not saved");
            return false;
        }

        self.release(key);

        let size = payload.chars().count() + 1;
        let Some(addr) = self.heap.alloc(size) else {
            warn!(key, size, "save failed, key left empty");
            return false;
        };

        self.heap.write_string(addr, payload);
        self.shed.write_resource_link(addr_key(key), addr.to_string());
        self.shed.write_resource_link(size_key(key), size.to_string());
        debug!(key, %addr, size, "saved");
        true
    }

    /// Load the value stored under `key`; `None` means not found
    pub fn load(&self, key: &str) -> Option<String> {
        match self.try_load(key) {
            Ok(payload) => Some(payload),
            Err(e) => {
                debug!("load: {}", e);
                None
            }
        }
    }

    pub fn try_load(&self, key: &str) -> Result<String> {
        let (addr, size) = self
            .record(key)
            .ok_or_else(|| MemoryError::MissingKey(key.to_string()))?;
        self.heap
            .read_string(addr, size)
            .ok_or(MemoryError::InvalidAddress(addr))
    }

    /// Serialize `value` as JSON and store it under `key`
    pub fn save_json<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> bool {
        match serde_json::to_string(value) {
            Ok(payload) => self.save(key, &payload),
            Err(e) => {
                warn!(key, "save_json: {}", e);
                false
            }
        }
    }

    pub fn load_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.try_load_json(key) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("load_json: {}", e);
                None
            }
        }
    }

    pub fn try_load_json<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let payload = self.try_load(key)?;
        Ok(serde_json::from_str(&payload)?)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.shed.read_resource_link(&addr_key(key)).is_some()
    }

    /// Free the block stored under `key` and forget the key
    pub fn remove(&mut self, key: &str) -> bool {
        self.release(key)
    }

    fn release(&mut self, key: &str) -> bool {
        let Some(addr) = self
            .shed
            .read_resource_link(&addr_key(key))
            .and_then(|s| s.parse::<Address>().ok())
        else {
            return false;
        };
        // a missing size falls back to the block header
        let size = self
            .shed
            .read_resource_link(&size_key(key))
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(0);

        self.heap.free(addr, size);
        self.shed.remove_resource_link(&addr_key(key));
        self.shed.remove_resource_link(&size_key(key));
        true
    }

    fn record(&self, key: &str) -> Option<(Address, usize)> {
        let addr: Address = self.shed.read_resource_link(&addr_key(key))?.parse().ok()?;
        let size: usize = self.shed.read_resource_link(&size_key(key))?.parse().ok()?;
        Some((addr, size))
    }
}

fn addr_key(key: &str) -> String {
    format!("{key}{ADDR_SUFFIX}")
}

fn size_key(key: &str) -> String {
    format!("{key}{SIZE_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_load() {
        let mut heap = Heap::new(64);
        let mut shed = Shed::new();
        let mut store = KeyValueMemoryStore::new(&mut heap, &mut shed);
        assert!(store.save("HISTORY", r#"["ls","pwd"]"#));
        assert_eq!(store.load("HISTORY").as_deref(), Some(r#"["ls","pwd"]"#));
        assert!(shed.read_resource_link("HISTORY_ADDR").is_some());
        assert_eq!(shed.read_resource_link("HISTORY_SIZE"), Some("13"));
    }

    #[test]
    fn test_missing_key() {
        let mut heap = Heap::new(8);
        let mut shed = Shed::new();
        let store = KeyValueMemoryStore::new(&mut heap, &mut shed);
        assert_eq!(store.load("nope"), None);
        assert!(matches!(store.try_load("nope"), Err(MemoryError::MissingKey(k)) if k == "nope"));
    }

    #[test]
    fn test_overwrite_frees_stale_block() {
        let mut heap = Heap::new(64);
        let mut shed = Shed::new();
        let mut store = KeyValueMemoryStore::new(&mut heap, &mut shed);
        store.save("k", "v1");
        store.save("k", "longer value");
        assert_eq!(store.load("k").as_deref(), Some("longer value"));
        assert_eq!(heap.block_count(), 1);
    }

    #[test]
    fn test_failed_save_leaves_key_absent() {
        let mut heap = Heap::new(6);
        let mut shed = Shed::new();
        let mut store = KeyValueMemoryStore::new(&mut heap, &mut shed);
        assert!(store.save("k", "abc"));
        assert!(!store.save("k", "far too long"));
        assert!(!store.contains("k"));
        assert_eq!(store.load("k"), None);
        assert_eq!(heap.used_cells(), 0);
    }

    #[test]
    fn test_terminator_in_payload_rejected() {
        let mut heap = Heap::new(32);
        let mut shed = Shed::new();
        let mut store = KeyValueMemoryStore::new(&mut heap, &mut shed);
        assert!(store.save("k", "old"));
        assert!(!store.save("k", "a\0b"));
        assert_eq!(store.load("k").as_deref(), Some("old"));
        assert!(!store.save("fresh", "\0"));
        assert!(!store.contains("fresh"));
        assert_eq!(heap.block_count(), 1);

        // JSON escapes the terminator, so typed payloads still round-trip
        let mut store = KeyValueMemoryStore::new(&mut heap, &mut shed);
        assert!(store.save_json("j", "a\0b"));
        assert_eq!(store.load_json::<String>("j").as_deref(), Some("a\0b"));
    }

    #[test]
    fn test_remove() {
        let mut heap = Heap::new(16);
        let mut shed = Shed::new();
        let mut store = KeyValueMemoryStore::new(&mut heap, &mut shed);
        store.save("a", "1");
        assert!(store.remove("a"));
        assert!(!store.remove("a"));
        assert_eq!(shed.resource_link_count(), 0);
    }

    #[test]
    fn test_json_round_trip() {
        let mut heap = Heap::new(128);
        let mut shed = Shed::new();
        let mut store = KeyValueMemoryStore::new(&mut heap, &mut shed);
        let history = vec!["ls".to_string(), "cd /tmp".to_string()];
        assert!(store.save_json("HISTORY", &history));
        assert_eq!(store.load_json::<Vec<String>>("HISTORY"), Some(history));

        store.save("BROKEN", "not json");
        assert!(matches!(
            store.try_load_json::<Vec<String>>("BROKEN"),
            Err(MemoryError::Codec(_))
        ));
    }
}
