mod support;

use std::fs;

use pretty_assertions::assert_eq;
use spider_core::{DedupHash, ProviderState};
use spider_engine::{LedgerStore, StoreError, STATE_FILENAME};
use support::init_logging;
use tempfile::TempDir;

fn state_of(urls: &[&str]) -> ProviderState {
    urls.iter().map(|u| DedupHash::of(u)).collect()
}

#[test]
fn missing_ledger_reads_as_empty() {
    let temp = TempDir::new().unwrap();
    let store = LedgerStore::new(temp.path().join("nowhere"));
    assert!(store.load("feedA").unwrap().is_empty());
    assert!(store.snapshot().unwrap().is_empty());
}

#[test]
fn malformed_ledger_reads_as_empty_and_is_replaced_on_save() {
    init_logging();
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join(STATE_FILENAME), "{ not json").unwrap();
    let store = LedgerStore::new(temp.path());

    assert!(store.load("feedA").unwrap().is_empty());

    store.save("feedA", &state_of(&["http://x/1"])).unwrap();
    let raw = fs::read_to_string(store.path()).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(
        parsed,
        serde_json::json!({ "feedA": [DedupHash::of("http://x/1").as_str()] })
    );
}

#[test]
fn ledger_that_is_not_utf8_reads_as_empty_and_is_replaced_on_save() {
    init_logging();
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join(STATE_FILENAME), [0xff, 0xfe, 0x00, 0x7b]).unwrap();
    let store = LedgerStore::new(temp.path());

    assert!(store.load("feedA").unwrap().is_empty());

    store.save("feedA", &state_of(&["http://x/1"])).unwrap();
    assert_eq!(store.load("feedA").unwrap(), state_of(&["http://x/1"]));
    let raw = fs::read_to_string(store.path()).unwrap();
    assert!(raw.contains(DedupHash::of("http://x/1").as_str()));
}

#[test]
fn save_keeps_other_providers() {
    let temp = TempDir::new().unwrap();
    let store = LedgerStore::new(temp.path());
    store.save("feedA", &state_of(&["a"])).unwrap();
    store.save("feedB", &state_of(&["b"])).unwrap();

    assert_eq!(store.load("feedA").unwrap(), state_of(&["a"]));
    assert_eq!(store.load("feedB").unwrap(), state_of(&["b"]));
}

#[test]
fn save_from_a_stale_snapshot_does_not_lose_hashes() {
    let temp = TempDir::new().unwrap();
    let store = LedgerStore::new(temp.path());
    store.save("feedA", &state_of(&["base"])).unwrap();

    let mut first = store.load("feedA").unwrap();
    let mut second = store.load("feedA").unwrap();
    first.push(DedupHash::of("one"));
    second.push(DedupHash::of("two"));
    store.save("feedA", &first).unwrap();
    store.save("feedA", &second).unwrap();

    assert_eq!(store.load("feedA").unwrap(), state_of(&["base", "one", "two"]));
}

#[test]
fn unreadable_ledger_is_an_error() {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join(STATE_FILENAME)).unwrap();
    let store = LedgerStore::new(temp.path());

    let err = store.load("feedA").unwrap_err();
    assert!(matches!(err, StoreError::Read { .. }));
}

#[test]
fn ledger_dir_that_is_a_file_is_an_error() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();
    let store = LedgerStore::new(&file_path);

    let err = store.save("feedA", &state_of(&["a"])).unwrap_err();
    assert!(matches!(
        err,
        StoreError::Read { .. } | StoreError::Persist(_)
    ));
}
