use std::fs;
use std::path::Path;

use vos_memory::config::ReplayConfig;
use vos_memory::memory::SpaceState;
use vos_memory::replay::{parse_script, ReplayError, Replayer};

#[test]
fn test_demo_session() {
    let path = Path::new("demos/session.vms");
    let source = fs::read_to_string(path).expect("Failed to read demo script");
    let statements = parse_script(&source).expect("Parsing failed");

    let mut replayer = Replayer::from_config(&ReplayConfig::for_script(path));
    replayer.run(&statements).expect("Replay failed");

    let outputs: Vec<&str> = replayer
        .snapshots()
        .iter()
        .map(|s| s.output.as_str())
        .collect();
    let joined = outputs.join("\n");
    println!("Replay output:\n{}", joined);

    assert!(joined.contains(r#"= "hello""#));
    assert!(joined.contains(r#"pid 42: HISTORY = ["ls","pwd","cd /tmp"]"#));
    assert!(joined.contains("pid 7: BUFFER = fn main() {}\n"));
    assert!(joined.contains("scratch editor: CLIPBOARD = copied text"));
    assert!(joined.contains("pid 42: no heap 1 / shed 2"));

    let registry = replayer.registry();
    assert_eq!(registry.state(42), SpaceState::Freed);
    assert_eq!(registry.state(7), SpaceState::Allocated);
    assert_eq!(registry.pids(), vec![7]);

    // the last check only sees the editor
    let last = replayer.snapshots().last().unwrap();
    assert!(last.output.contains("pid 7 (editor)"));
    assert!(!last.output.contains("pid 42"));
}

#[test]
fn test_overwrite_keeps_one_block() {
    let script = r#"
        alloc 1 heap 1 40
        alloc 1 shed 1
        save 1 1 1 K "aaaa"
        save 1 1 1 K "bbbb"
        save 1 1 1 K "cccc"
        load 1 1 1 K
    "#;
    let statements = parse_script(script).unwrap();
    let mut replayer = Replayer::new(64, 1024 * 1024);
    replayer.run(&statements).unwrap();

    let history = replayer.snapshots();
    let first_save = &history.get(2).unwrap().report.spaces[0].heaps[0];
    let last_save = &history.get(4).unwrap().report.spaces[0].heaps[0];
    assert_eq!(first_save.free, last_save.free);
    assert_eq!(last_save.blocks, 1);
    assert_eq!(history.last().unwrap().output, "pid 1: K = cccc");
}

#[test]
fn test_snapshot_limit_stops_replay() {
    let statements = parse_script("check\ncheck\ncheck\n").unwrap();
    let mut replayer = Replayer::new(64, 1);
    let result = replayer.run(&statements);
    assert!(matches!(
        result,
        Err(ReplayError::SnapshotLimitExceeded { limit: 1, .. })
    ));
    assert!(replayer.snapshots().is_empty());
}
