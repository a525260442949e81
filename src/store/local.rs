//! Anonymous on-device storage.
//!
//! Every invoice for the device profile is kept as one JSON array under
//! [`INVOICES_KEY`]. No concurrency control beyond a per-store write lock;
//! the last writer wins.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::{InvoiceError, InvoiceResult};
use crate::model::{epoch_millis, Invoice, InvoiceStatus};

use super::InvoiceStore;

pub const INVOICES_KEY: &str = "invoices";

pub const LOCAL_STORAGE_WARNING: &str =
    "Your invoices are stored on this device only. They will be lost if local data is cleared.";

pub const CLEAR_ALL_PROMPT: &str =
    "Are you sure you want to clear all local invoice data? This action cannot be undone.";

/// Key-value storage scoped to one device profile.
#[derive(Debug, Clone)]
pub enum DeviceStorage {
    /// One `<key>.json` file per key inside `dir`.
    File { dir: PathBuf },
    Memory(Arc<Mutex<HashMap<String, String>>>),
}

fn sanitize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for ch in key.chars() {
        let ok = ch.is_ascii_alphanumeric() || ch == '-' || ch == '_';
        out.push(if ok { ch } else { '_' });
    }
    out
}

impl DeviceStorage {
    pub fn file(dir: impl Into<PathBuf>) -> Self {
        DeviceStorage::File { dir: dir.into() }
    }

    pub fn memory() -> Self {
        DeviceStorage::Memory(Arc::new(Mutex::new(HashMap::new())))
    }

    fn key_path(dir: &Path, key: &str) -> PathBuf {
        dir.join(format!("{}.json", sanitize_key(key)))
    }

    pub async fn get(&self, key: &str) -> InvoiceResult<Option<String>> {
        match self {
            DeviceStorage::File { dir } => {
                let path = Self::key_path(dir, key);
                match tokio::fs::read_to_string(&path).await {
                    Ok(v) => Ok(Some(v)),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                    Err(e) => Err(e.into()),
                }
            }
            DeviceStorage::Memory(map) => {
                let guard = map
                    .lock()
                    .map_err(|_| InvoiceError::Storage("device storage mutex poisoned".to_string()))?;
                Ok(guard.get(key).cloned())
            }
        }
    }

    pub async fn set(&self, key: &str, value: &str) -> InvoiceResult<()> {
        match self {
            DeviceStorage::File { dir } => {
                tokio::fs::create_dir_all(dir).await?;
                let path = Self::key_path(dir, key);
                // Write beside the target then rename so a crash never leaves half a file.
                let tmp = path.with_extension("json.tmp");
                tokio::fs::write(&tmp, value).await?;
                tokio::fs::rename(&tmp, &path).await?;
                Ok(())
            }
            DeviceStorage::Memory(map) => {
                let mut guard = map
                    .lock()
                    .map_err(|_| InvoiceError::Storage("device storage mutex poisoned".to_string()))?;
                guard.insert(key.to_string(), value.to_string());
                Ok(())
            }
        }
    }

    pub async fn remove(&self, key: &str) -> InvoiceResult<()> {
        match self {
            DeviceStorage::File { dir } => {
                let path = Self::key_path(dir, key);
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => Ok(()),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                    Err(e) => Err(e.into()),
                }
            }
            DeviceStorage::Memory(map) => {
                let mut guard = map
                    .lock()
                    .map_err(|_| InvoiceError::Storage("device storage mutex poisoned".to_string()))?;
                guard.remove(key);
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocalInvoiceStore {
    storage: DeviceStorage,
    write_lock: Arc<tokio::sync::Mutex<()>>,
}

impl LocalInvoiceStore {
    pub fn new(storage: DeviceStorage) -> Self {
        Self {
            storage,
            write_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    async fn read_all(&self) -> InvoiceResult<Vec<Invoice>> {
        match self.storage.get(INVOICES_KEY).await? {
            Some(json) if !json.trim().is_empty() => Ok(serde_json::from_str(&json)?),
            _ => Ok(Vec::new()),
        }
    }

    async fn write_all(&self, invoices: &[Invoice]) -> InvoiceResult<()> {
        let json = serde_json::to_string(invoices)?;
        self.storage.set(INVOICES_KEY, &json).await
    }

    /// Drops every anonymous invoice on this device. Callers gate this on [`CLEAR_ALL_PROMPT`].
    pub async fn clear_all(&self) -> InvoiceResult<()> {
        let _wg = self.write_lock.lock().await;
        self.storage.remove(INVOICES_KEY).await
    }
}

/// Millisecond clock as a string, bumped past any id already in use.
fn fresh_local_id(existing: &[Invoice]) -> String {
    let mut candidate = epoch_millis();
    while existing.iter().any(|inv| inv.id == candidate.to_string()) {
        candidate += 1;
    }
    candidate.to_string()
}

impl InvoiceStore for LocalInvoiceStore {
    async fn list(&self) -> InvoiceResult<Vec<Invoice>> {
        self.read_all().await
    }

    async fn save(&self, invoice: &Invoice) -> InvoiceResult<Invoice> {
        let _wg = self.write_lock.lock().await;
        let mut all = self.read_all().await?;
        let mut saved = invoice.clone();

        if saved.id.trim().is_empty() {
            saved.id = fresh_local_id(&all);
            all.push(saved.clone());
        } else if let Some(slot) = all.iter_mut().find(|inv| inv.id == saved.id) {
            *slot = saved.clone();
        } else {
            all.push(saved.clone());
        }

        self.write_all(&all).await?;
        tracing::debug!(id = %saved.id, "saved invoice to device storage");
        Ok(saved)
    }

    async fn update_status(&self, id: &str, status: InvoiceStatus) -> InvoiceResult<()> {
        let _wg = self.write_lock.lock().await;
        let mut all = self.read_all().await?;
        let Some(slot) = all.iter_mut().find(|inv| inv.id == id) else {
            return Err(InvoiceError::NotFound(id.to_string()));
        };
        slot.status = status;
        self.write_all(&all).await
    }

    async fn delete(&self, id: &str) -> InvoiceResult<()> {
        let _wg = self.write_lock.lock().await;
        let mut all = self.read_all().await?;
        all.retain(|inv| inv.id != id);
        self.write_all(&all).await
    }
}
