use dosedock_activation::{
    FileSettingsStore, MemorySettingsStore, SettingsStore, ACTIVATION_SENTINEL,
};

#[tokio::test]
async fn file_store_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSettingsStore::new(dir.path().join("settings.json"));

    assert!(!store.is_activated().await.unwrap());
    assert!(store.activation_flag().await.unwrap().is_none());

    store.set_activation_flag(ACTIVATION_SENTINEL).await.unwrap();
    assert!(store.is_activated().await.unwrap());

    store.clear_activation_flag().await.unwrap();
    assert!(!store.is_activated().await.unwrap());
}

#[tokio::test]
async fn file_store_persists_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");

    let store = FileSettingsStore::new(&path);
    store.set_activation_flag(ACTIVATION_SENTINEL).await.unwrap();
    drop(store);

    let reopened = FileSettingsStore::new(&path);
    assert!(reopened.is_activated().await.unwrap());
}

#[tokio::test]
async fn file_store_creates_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("deeper").join("settings.json");

    let store = FileSettingsStore::new(&path);
    store.set_activation_flag(ACTIVATION_SENTINEL).await.unwrap();
    assert!(path.is_file());
}

#[tokio::test]
async fn foreign_sentinel_is_not_activated() {
    let store = MemorySettingsStore::new();
    store.set_activation_flag("dosedock-activated-v1").await.unwrap();

    // only the current sentinel counts
    assert!(!store.is_activated().await.unwrap());
    assert!(store.activation_flag().await.unwrap().is_some());
}

#[tokio::test]
async fn clear_is_idempotent() {
    let store = MemorySettingsStore::activated();
    store.clear_activation_flag().await.unwrap();
    store.clear_activation_flag().await.unwrap();
    assert!(!store.is_activated().await.unwrap());
}

#[tokio::test]
async fn missing_file_reads_as_unset() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSettingsStore::new(dir.path().join("never-written.json"));
    assert!(store.activation_flag().await.unwrap().is_none());
}
