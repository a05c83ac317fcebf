// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::fake_jwt;

#[test]
fn missing_file_loads_none() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = FileCredentialStore::new(dir.path().join("credentials.json"));
    assert_eq!(store.load()?, None);
    store.clear()?;
    Ok(())
}

#[test]
fn save_load_clear() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = FileCredentialStore::new(dir.path().join("nested/state/credentials.json"));
    let credential = Credential::new(fake_jwt(2_000_000_000), fake_jwt(2_100_000_000));

    store.save(&credential)?;
    assert_eq!(store.load()?, Some(credential.clone()));

    // No temp files left behind.
    let entries: Vec<_> = std::fs::read_dir(dir.path().join("nested/state"))?.collect();
    assert_eq!(entries.len(), 1);

    store.clear()?;
    assert_eq!(store.load()?, None);
    assert!(!store.path().exists());
    Ok(())
}

#[yare::parameterized(
    access_only = { r#"{"access_token":"a"}"# },
    refresh_only = { r#"{"refresh_token":"r"}"# },
    empty_access = { r#"{"access_token":"","refresh_token":"r"}"# },
    empty_object = { "{}" },
)]
fn partial_file_loads_none(contents: &str) -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("credentials.json");
    std::fs::write(&path, contents)?;
    assert_eq!(FileCredentialStore::new(path).load()?, None);
    Ok(())
}

#[test]
fn corrupt_file_is_an_error() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("credentials.json");
    std::fs::write(&path, "not json")?;
    assert!(FileCredentialStore::new(path).load().is_err());
    Ok(())
}

#[test]
fn memory_store_round_trips() -> anyhow::Result<()> {
    let store = MemoryCredentialStore::new();
    assert_eq!(store.load()?, None);
    store.save(&Credential::new("a", "r"))?;
    assert_eq!(store.load()?, Some(Credential::new("a", "r")));
    store.clear()?;
    assert_eq!(store.load()?, None);
    Ok(())
}

#[test]
fn debug_output_hides_tokens() {
    let credential = Credential::new(fake_jwt(10), "secret-refresh");
    let shown = format!("{credential:?}");
    assert!(shown.contains("access_expiry: Some(10)"));
    assert!(!shown.contains("secret-refresh"));
}
