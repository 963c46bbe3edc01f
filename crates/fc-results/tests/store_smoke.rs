use fc_core::RunKey;
use fc_results::*;

fn fresh_store(name: &str) -> ResultStore {
    let dir = std::env::temp_dir().join(name);
    let _ = std::fs::remove_dir_all(&dir);
    ResultStore::new(dir).unwrap()
}

#[test]
fn save_and_load_archive() {
    let store = fresh_store("fc_results_store_roundtrip");
    let key = RunKey::new("user1", "demo");
    let bytes = b"PK\x05\x06 not really a zip".to_vec();

    assert!(!store.has_archive(&key));
    let manifest = store.save_archive(&key, &bytes).unwrap();
    assert!(store.has_archive(&key));
    assert_eq!(manifest.size_bytes, bytes.len() as u64);
    assert_eq!(manifest.sha256, archive_digest(&bytes));

    assert_eq!(store.load_archive(&key).unwrap(), bytes);
}

#[test]
fn missing_archive_is_not_found() {
    let store = fresh_store("fc_results_store_missing");
    let err = store.load_archive(&RunKey::new("u", "nope")).unwrap_err();
    assert!(matches!(err, ResultsError::ArchiveNotFound { .. }));
}

#[test]
fn tampered_archive_fails_digest_check() {
    let store = fresh_store("fc_results_store_tamper");
    let key = RunKey::new("u", "r1");
    store.save_archive(&key, b"original").unwrap();

    let archive_path = store.root_dir().join("u").join("r1").join("result.zip");
    std::fs::write(archive_path, b"tampered").unwrap();

    let err = store.load_archive(&key).unwrap_err();
    assert!(matches!(err, ResultsError::InvalidHash(_)));
}

#[test]
fn list_and_delete_archives() {
    let store = fresh_store("fc_results_store_list");
    store.save_archive(&RunKey::new("b", "r2"), b"two").unwrap();
    store.save_archive(&RunKey::new("a", "r1"), b"one").unwrap();

    let listed = store.list_archives().unwrap();
    let keys: Vec<(&str, &str)> = listed
        .iter()
        .map(|m| (m.owner.as_str(), m.run_id.as_str()))
        .collect();
    assert_eq!(keys, vec![("a", "r1"), ("b", "r2")]);

    store.delete_archive(&RunKey::new("a", "r1")).unwrap();
    assert_eq!(store.list_archives().unwrap().len(), 1);
}

#[test]
fn similar_keys_do_not_share_a_cache_entry() {
    let store = fresh_store("fc_results_store_similar_keys");
    let slash = RunKey::new("alice", "a/b");
    let underscore = RunKey::new("alice", "a_b");
    store.save_archive(&slash, b"slash").unwrap();

    assert!(!store.has_archive(&underscore));
    store.save_archive(&underscore, b"underscore").unwrap();
    assert_eq!(store.load_archive(&slash).unwrap(), b"slash");
    assert_eq!(store.load_archive(&underscore).unwrap(), b"underscore");

    let flood = RunKey::new("alice", "洪水");
    let typhoon = RunKey::new("alice", "台风");
    store.save_archive(&flood, b"flood").unwrap();
    assert!(!store.has_archive(&typhoon));
    assert_eq!(store.list_archives().unwrap().len(), 3);
}

#[test]
fn manifest_for_another_run_is_rejected() {
    let store = fresh_store("fc_results_store_manifest_owner");
    let key = RunKey::new("u", "r1");
    store.save_archive(&key, b"bytes").unwrap();

    let manifest_path = store.root_dir().join("u").join("r1").join("manifest.json");
    let mut manifest = store.load_manifest(&key).unwrap();
    manifest.run_id = "r2".into();
    std::fs::write(manifest_path, serde_json::to_string(&manifest).unwrap()).unwrap();

    let err = store.load_archive(&key).unwrap_err();
    assert!(matches!(err, ResultsError::ManifestMismatch { .. }));
}
