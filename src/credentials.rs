//! Storage for the single cached API key.
//!
//! The key lives in the OS keyring. Older releases wrote it to plain files in
//! the cache and config directories; those are moved into the keyring once
//! and deleted.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};

const KEYRING_SERVICE: &str = "atera_tui";
const KEYRING_USER: &str = "api-key";
const LEGACY_KEY_FILE: &str = "api_key";

pub trait CredentialStore: Send + Sync + fmt::Debug {
    fn get(&self) -> Result<Option<SecretString>>;
    fn set(&self, key: &SecretString) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Keyring entry `atera_tui` / `api-key`.
#[derive(Debug)]
pub struct KeyringCredentialStore {
    entry: keyring::Entry,
}

impl KeyringCredentialStore {
    pub fn new() -> Result<Self> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)
            .context("Failed to open keyring entry")?;
        Ok(Self { entry })
    }

    /// Opens the entry and reads it once, so a missing or locked keyring
    /// backend shows up here instead of on first use.
    pub fn open() -> Result<Self> {
        let store = Self::new()?;
        store.get()?;
        Ok(store)
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn get(&self) -> Result<Option<SecretString>> {
        match self.entry.get_password() {
            Ok(secret) => {
                let trimmed = secret.trim();
                Ok((!trimmed.is_empty()).then(|| SecretString::from(trimmed)))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to read API key from keyring"),
        }
    }

    fn set(&self, key: &SecretString) -> Result<()> {
        self.entry
            .set_password(key.expose_secret())
            .context("Failed to store API key in keyring")
    }

    fn clear(&self) -> Result<()> {
        match self.entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to remove API key from keyring"),
        }
    }
}

/// Process-lifetime store, used when no keyring backend is reachable.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    key: Mutex<Option<SecretString>>,
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Result<Option<SecretString>> {
        let guard = self
            .key
            .lock()
            .map_err(|_| anyhow::anyhow!("credential lock poisoned"))?;
        Ok(guard.clone())
    }

    fn set(&self, key: &SecretString) -> Result<()> {
        let mut guard = self
            .key
            .lock()
            .map_err(|_| anyhow::anyhow!("credential lock poisoned"))?;
        *guard = Some(key.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut guard = self
            .key
            .lock()
            .map_err(|_| anyhow::anyhow!("credential lock poisoned"))?;
        *guard = None;
        Ok(())
    }
}

/// Plain key files written by older releases: `<cache dir>/api_key` and
/// `<config dir>/api_key`.
pub fn legacy_key_files() -> Vec<PathBuf> {
    ProjectDirs::from("com", "atera", "atera_tui")
        .map(|dirs| {
            vec![
                dirs.cache_dir().join(LEGACY_KEY_FILE),
                dirs.config_dir().join(LEGACY_KEY_FILE),
            ]
        })
        .unwrap_or_default()
}

/// Moves the first legacy key found into `store` unless it already holds
/// one, then deletes every legacy file. Returns whether a key moved.
pub fn migrate_legacy_files(store: &dyn CredentialStore, files: &[PathBuf]) -> Result<bool> {
    let mut migrated = false;

    for path in files {
        let key = match read_key(path) {
            Ok(key) => key,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable legacy API key file, discarding");
                None
            }
        };

        if let Some(key) = key {
            if !migrated && store.get()?.is_none() {
                store.set(&key)?;
                migrated = true;
                info!(from = %path.display(), "migrated legacy API key");
            }
        }
        remove_if_present(path)?;
    }

    Ok(migrated)
}

/// Picks the keyring when it is reachable, migrating any legacy key files.
pub fn open_default_store() -> Box<dyn CredentialStore> {
    let store: Box<dyn CredentialStore> = match KeyringCredentialStore::open() {
        Ok(store) => {
            info!(service = KEYRING_SERVICE, "using OS keyring for API key");
            Box::new(store)
        }
        Err(e) => {
            warn!(error = %e, "no keyring available, API key will not outlive this session");
            Box::new(MemoryCredentialStore::default())
        }
    };

    if let Err(e) = migrate_legacy_files(store.as_ref(), &legacy_key_files()) {
        warn!(error = %e, "legacy API key migration failed");
    }
    store
}

fn read_key(path: &Path) -> Result<Option<SecretString>> {
    match fs::read_to_string(path) {
        Ok(contents) => {
            let trimmed = contents.trim();
            Ok((!trimmed.is_empty()).then(|| SecretString::from(trimmed)))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
    }
}
