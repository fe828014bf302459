//! Shared scratch storage for state that outlives a single component
//!
//! A [`ScratchStore`] is one heap + shed pair that several otherwise unrelated
//! components write into. Instead of reaching it through a well-known pid, each
//! component receives a [`ScratchHandle`] and works through a [`ScopedScratch`],
//! which prefixes every key with the component's name:
//!
//! ```text
//! handle.scoped("terminal").save("HISTORY", …)   ->   key "terminal:HISTORY"
//! ```
//!
//! The handle is `Rc<RefCell<_>>`, so access is serialized and the store cannot
//! be shared across threads.

use super::constants::SCRATCH_KEY_SEPARATOR;
use super::heap::Heap;
use super::kv::KeyValueMemoryStore;
use super::shed::Shed;
use super::space::{HeapUsage, ShedUsage};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct ScratchStore {
    heap: Heap,
    shed: Shed,
}

impl ScratchStore {
    pub fn new(capacity: usize) -> Self {
        ScratchStore {
            heap: Heap::new(capacity),
            shed: Shed::new(),
        }
    }

    /// Key/value view over the scratch pair
    pub fn store(&mut self) -> KeyValueMemoryStore<'_> {
        KeyValueMemoryStore::new(&mut self.heap, &mut self.shed)
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn shed(&self) -> &Shed {
        &self.shed
    }
}

/// Cloneable handle to a shared [`ScratchStore`]
#[derive(Debug, Clone)]
pub struct ScratchHandle(Rc<RefCell<ScratchStore>>);

impl ScratchHandle {
    pub fn new(capacity: usize) -> Self {
        ScratchHandle(Rc::new(RefCell::new(ScratchStore::new(capacity))))
    }

    /// View that namespaces every key under `component`
    pub fn scoped(&self, component: &str) -> ScopedScratch {
        ScopedScratch {
            handle: self.clone(),
            prefix: format!("{component}{SCRATCH_KEY_SEPARATOR}"),
        }
    }

    /// Run `f` against the underlying store
    pub fn with<R>(&self, f: impl FnOnce(&mut ScratchStore) -> R) -> R {
        f(&mut self.0.borrow_mut())
    }

    pub fn heap_usage(&self) -> HeapUsage {
        HeapUsage::of(0, &self.0.borrow().heap)
    }

    pub fn shed_usage(&self) -> ShedUsage {
        ShedUsage::of(0, &self.0.borrow().shed)
    }
}

/// A component's key-prefixed view of the shared scratch store
#[derive(Debug, Clone)]
pub struct ScopedScratch {
    handle: ScratchHandle,
    prefix: String,
}

impl ScopedScratch {
    pub fn save(&self, key: &str, payload: &str) -> bool {
        let key = self.key(key);
        self.handle.with(|s| s.store().save(&key, payload))
    }

    pub fn load(&self, key: &str) -> Option<String> {
        let key = self.key(key);
        self.handle.with(|s| s.store().load(&key))
    }

    pub fn save_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        let key = self.key(key);
        self.handle.with(|s| s.store().save_json(&key, value))
    }

    pub fn load_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let key = self.key(key);
        self.handle.with(|s| s.store().load_json(&key))
    }

    pub fn remove(&self, key: &str) -> bool {
        let key = self.key(key);
        self.handle.with(|s| s.store().remove(&key))
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_components_do_not_collide() {
        let scratch = ScratchHandle::new(256);
        let editor = scratch.scoped("editor");
        let terminal = scratch.scoped("terminal");

        assert!(editor.save("STATE", "buffer"));
        assert!(terminal.save("STATE", "scrollback"));
        assert_eq!(editor.load("STATE").as_deref(), Some("buffer"));
        assert_eq!(terminal.load("STATE").as_deref(), Some("scrollback"));
        assert_eq!(scratch.heap_usage().blocks, 2);
    }

    #[test]
    fn test_prefixed_key_visible_in_shed() {
        let scratch = ScratchHandle::new(64);
        scratch.scoped("clip").save("TEXT", "hi");
        scratch.with(|s| {
            assert!(s.shed().read_resource_link("clip:TEXT_ADDR").is_some());
            assert_eq!(s.store().load("clip:TEXT").as_deref(), Some("hi"));
        });
    }

    #[test]
    fn test_handles_share_state() {
        let scratch = ScratchHandle::new(64);
        let writer = scratch.scoped("a");
        let reader = scratch.clone().scoped("a");
        writer.save_json("N", &[1, 2, 3]);
        assert_eq!(reader.load_json::<Vec<i32>>("N"), Some(vec![1, 2, 3]));
        assert!(reader.remove("N"));
        assert_eq!(writer.load("N"), None);
    }
}
