// Integration tests for the memory subsystem

use proptest::prelude::*;
use vos_memory::memory::constants::SKIP_SLOT;
use vos_memory::memory::{Heap, Registry, ScratchHandle, Shed, SpaceState, Value};

fn write_text(heap: &mut Heap, addr: vos_memory::memory::Address, text: &str) {
    for (i, c) in text.chars().enumerate() {
        heap.write_data(addr.offset(i), Value::Char(c));
    }
}

#[test]
fn test_end_to_end_alloc_free_reuse() {
    let mut registry = Registry::new();
    registry.allocate_memory(1, SKIP_SLOT, 100, 42);

    let heap = registry.heap_mut(42, 1).expect("heap 1 of pid 42");
    let addr = heap.alloc(6).expect("alloc failed");
    write_text(heap, addr, "hello\0");
    assert_eq!(heap.read_string(addr, 10).as_deref(), Some("hello"));

    heap.free(addr, 6);
    let again = heap.alloc(6).expect("re-alloc failed");
    assert_eq!(again, addr);
    write_text(heap, again, "world\0");
    assert_eq!(heap.read_string(again, 10).as_deref(), Some("world"));
    assert_eq!(heap.capacity(), 100);
}

#[test]
fn test_alloc_write_read_payload() {
    let mut heap = Heap::new(64);
    let n = 9;
    let addr = heap.alloc(n).unwrap();
    let payload = "abcdefgh";
    write_text(&mut heap, addr, payload);
    heap.write_data(addr.offset(n - 1), Value::Char('\0'));
    assert_eq!(heap.read_string(addr, n).as_deref(), Some(payload));
}

#[test]
fn test_bounded_read_string() {
    let mut heap = Heap::new(64);
    let addr = heap.alloc(20).unwrap();
    write_text(&mut heap, addr, "ab\0garbage");
    assert_eq!(heap.read_string(addr, 100).as_deref(), Some("ab"));
}

#[test]
fn test_free_increases_free_capacity() {
    let mut heap = Heap::new(50);
    let _keep = heap.alloc(10).unwrap();
    let addr = heap.alloc(12).unwrap();
    let before = heap.free_cells();
    heap.free(addr, 12);
    assert!(heap.free_cells() >= before + 12);
    assert!(heap.alloc(12).is_some());
}

#[test]
fn test_history_round_trip() {
    let mut registry = Registry::new();
    registry.allocate_memory(1, SKIP_SLOT, 200, 42);
    registry.allocate_memory(SKIP_SLOT, 1, 0, 42);

    let history = r#"["ls","pwd"]"#;
    let mut store = registry.store(42, 1, 1).expect("store");
    assert!(store.save("HISTORY", history));
    drop(store);

    let store = registry.store(42, 1, 1).expect("store");
    assert_eq!(store.load("HISTORY").as_deref(), Some(history));
}

#[test]
fn test_kv_overwrite_latest_wins() {
    let mut heap = Heap::new(64);
    let mut shed = Shed::new();
    let mut store = vos_memory::memory::KeyValueMemoryStore::new(&mut heap, &mut shed);
    store.save("k", "v1");
    store.save("k", "v2");
    assert_eq!(store.load("k").as_deref(), Some("v2"));
    assert_eq!(store.load("nope"), None);
}

#[test]
fn test_process_isolation() {
    let mut registry = Registry::new();
    registry.allocate_memory(1, SKIP_SLOT, 32, 1);
    registry.allocate_memory(SKIP_SLOT, 1, 0, 1);
    registry.allocate_memory(1, SKIP_SLOT, 32, 2);
    registry.allocate_memory(SKIP_SLOT, 1, 0, 2);

    registry.store(1, 1, 1).unwrap().save("STATE", "one");
    registry.store(2, 1, 1).unwrap().save("STATE", "two");
    registry.shed_mut(2, 1).unwrap().write_code("MODE=insert");
    let before = registry.check_memory(Some(2));

    // an address from pid 1's heap means nothing to pid 2's heap
    let foreign = registry.heap_mut(1, 1).unwrap().alloc(2).unwrap();
    assert_eq!(registry.heap(2, 1).unwrap().read_data(foreign), None);

    assert!(registry.free_memory(1));
    assert_eq!(registry.state(1), SpaceState::Freed);
    assert_eq!(registry.check_memory(Some(2)), before);
    assert_eq!(
        registry.store(2, 1, 1).unwrap().load("STATE").as_deref(),
        Some("two")
    );
    assert_eq!(registry.shed(2, 1).unwrap().lookup_constant("MODE"), Some("insert"));
    assert!(registry.store(1, 1, 1).is_none());
}

#[test]
fn test_scratch_shared_between_components() {
    let scratch = ScratchHandle::new(128);
    let terminal = scratch.scoped("terminal");
    let editor = scratch.clone().scoped("editor");

    assert!(terminal.save_json("HISTORY", &["ls", "pwd"]));
    assert!(editor.save("HISTORY", "unrelated"));
    assert_eq!(
        terminal.load_json::<Vec<String>>("HISTORY"),
        Some(vec!["ls".to_string(), "pwd".to_string()])
    );
    assert_eq!(editor.load("HISTORY").as_deref(), Some("unrelated"));
}

proptest! {
    #[test]
    fn prop_overwrite_does_not_leak(payload in "[a-z]{1,12}", rounds in 1usize..40) {
        let mut heap = Heap::new(64);
        let mut shed = Shed::new();
        let mut store = vos_memory::memory::KeyValueMemoryStore::new(&mut heap, &mut shed);
        prop_assert!(store.save("k", &payload));
        drop(store);
        let free_after_first = heap.free_cells();

        for round in 0..rounds {
            let mut store = vos_memory::memory::KeyValueMemoryStore::new(&mut heap, &mut shed);
            // same length, different content
            let next: String = payload
                .chars()
                .map(|c| if round % 2 == 0 { c.to_ascii_uppercase() } else { c })
                .collect();
            prop_assert!(store.save("k", &next));
            prop_assert_eq!(store.load("k"), Some(next));
            drop(store);
            prop_assert!(heap.free_cells() >= free_after_first);
        }
        prop_assert_eq!(heap.block_count(), 1);
    }

    #[test]
    fn prop_free_restores_capacity(sizes in proptest::collection::vec(1usize..8, 1..10)) {
        let mut heap = Heap::new(128);
        let addrs: Vec<_> = sizes.iter().map(|&n| (heap.alloc(n), n)).collect();
        for (addr, n) in addrs {
            if let Some(addr) = addr {
                heap.free(addr, n);
            }
        }
        prop_assert_eq!(heap.free_cells(), 128);
        prop_assert_eq!(heap.largest_free_run(), 128);
    }
}
