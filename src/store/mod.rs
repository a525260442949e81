//! Invoice persistence.
//!
//! Two interchangeable backends sit behind [`InvoiceStore`]. Which one is
//! used is decided once, when an [`InvoiceService`] is built for an actor.

pub mod local;
pub mod remote;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::error::{InvoiceError, InvoiceResult};
use crate::model::{Invoice, InvoiceStatus};
use crate::overdue::OverduePolicy;

use local::{LocalInvoiceStore, LOCAL_STORAGE_WARNING};
use remote::{RemoteDb, RemoteInvoiceStore};

/// Authenticated identity. Anonymous use is `Option::<&Actor>::None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub email: String,
}

/// Create/read/update/delete for the invoices of one actor context.
///
/// `save` creates when `id` is empty and updates otherwise; the returned
/// invoice always carries its id. `update_status` reports `NotFound` for an
/// unknown id, `delete` does not.
#[allow(async_fn_in_trait)]
pub trait InvoiceStore {
    async fn list(&self) -> InvoiceResult<Vec<Invoice>>;
    async fn save(&self, invoice: &Invoice) -> InvoiceResult<Invoice>;
    async fn update_status(&self, id: &str, status: InvoiceStatus) -> InvoiceResult<()>;
    async fn delete(&self, id: &str) -> InvoiceResult<()>;
}

#[derive(Clone)]
pub enum StoreBackend {
    Local(LocalInvoiceStore),
    Remote(RemoteInvoiceStore),
}

impl StoreBackend {
    pub fn select(actor: Option<&Actor>, local: LocalInvoiceStore, remote: &RemoteDb) -> Self {
        match actor {
            Some(actor) => StoreBackend::Remote(remote.scoped(actor)),
            None => StoreBackend::Local(local),
        }
    }
}

impl InvoiceStore for StoreBackend {
    async fn list(&self) -> InvoiceResult<Vec<Invoice>> {
        match self {
            StoreBackend::Local(s) => s.list().await,
            StoreBackend::Remote(s) => s.list().await,
        }
    }

    async fn save(&self, invoice: &Invoice) -> InvoiceResult<Invoice> {
        match self {
            StoreBackend::Local(s) => s.save(invoice).await,
            StoreBackend::Remote(s) => s.save(invoice).await,
        }
    }

    async fn update_status(&self, id: &str, status: InvoiceStatus) -> InvoiceResult<()> {
        match self {
            StoreBackend::Local(s) => s.update_status(id, status).await,
            StoreBackend::Remote(s) => s.update_status(id, status).await,
        }
    }

    async fn delete(&self, id: &str) -> InvoiceResult<()> {
        match self {
            StoreBackend::Local(s) => s.delete(id).await,
            StoreBackend::Remote(s) => s.delete(id).await,
        }
    }
}

struct InFlight {
    set: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.set.lock() {
            guard.remove(&self.key);
        }
    }
}

/// The store as the UI layer sees it: actor-bound, recalculating on save,
/// logging every failure before handing it back.
#[derive(Clone)]
pub struct InvoiceService {
    backend: StoreBackend,
    overdue_policy: OverduePolicy,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl InvoiceService {
    pub fn new(backend: StoreBackend, overdue_policy: OverduePolicy) -> Self {
        Self {
            backend,
            overdue_policy,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn for_actor(
        actor: Option<&Actor>,
        local: LocalInvoiceStore,
        remote: &RemoteDb,
        overdue_policy: OverduePolicy,
    ) -> Self {
        Self::new(StoreBackend::select(actor, local, remote), overdue_policy)
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self.backend, StoreBackend::Local(_))
    }

    /// Shown for as long as invoices live only on this device.
    pub fn storage_warning(&self) -> Option<&'static str> {
        self.is_anonymous().then_some(LOCAL_STORAGE_WARNING)
    }

    fn begin(&self, action: &str, id: &str) -> InvoiceResult<InFlight> {
        let key = format!("{action}:{id}");
        let mut guard = self
            .in_flight
            .lock()
            .map_err(|_| InvoiceError::Storage("in-flight mutex poisoned".to_string()))?;
        if !guard.insert(key.clone()) {
            return Err(InvoiceError::Conflict(format!("{action} already in progress for {id}")));
        }
        Ok(InFlight {
            set: self.in_flight.clone(),
            key,
        })
    }

    pub async fn list(&self) -> InvoiceResult<Vec<Invoice>> {
        self.list_on(OffsetDateTime::now_utc().date()).await
    }

    /// Newest first for the remote backend, insertion order locally.
    pub async fn list_on(&self, today: Date) -> InvoiceResult<Vec<Invoice>> {
        let mut invoices = self
            .backend
            .list()
            .await
            .inspect_err(|e| tracing::error!(op = "list", error = %e, "listing invoices failed"))?;
        self.overdue_policy.apply(&mut invoices, today);
        Ok(invoices)
    }

    pub async fn find(&self, id: &str) -> InvoiceResult<Invoice> {
        self.list()
            .await?
            .into_iter()
            .find(|inv| inv.id == id)
            .ok_or_else(|| InvoiceError::NotFound(id.to_string()))
    }

    /// Totals are recomputed before anything is written.
    pub async fn save(&self, invoice: &Invoice) -> InvoiceResult<Invoice> {
        let mut fresh = invoice.clone();
        fresh.recalculate();
        fresh.validate()?;

        let saved = self
            .backend
            .save(&fresh)
            .await
            .inspect_err(|e| tracing::error!(op = "save", error = %e, "saving invoice failed"))?;
        tracing::debug!(id = %saved.id, number = %saved.invoice_number, "invoice saved");
        Ok(saved)
    }

    pub async fn update_status(&self, id: &str, status: InvoiceStatus) -> InvoiceResult<()> {
        let _flight = self.begin("update_status", id)?;
        self.backend
            .update_status(id, status)
            .await
            .inspect_err(|e| tracing::error!(op = "update_status", %id, error = %e, "status change failed"))?;
        tracing::debug!(%id, %status, "invoice status changed");
        Ok(())
    }

    pub async fn mark_paid(&self, id: &str) -> InvoiceResult<()> {
        self.update_status(id, InvoiceStatus::Paid).await
    }

    pub async fn delete(&self, id: &str) -> InvoiceResult<()> {
        let _flight = self.begin("delete", id)?;
        self.backend
            .delete(id)
            .await
            .inspect_err(|e| tracing::error!(op = "delete", %id, error = %e, "deleting invoice failed"))?;
        tracing::debug!(%id, "invoice deleted");
        Ok(())
    }

    /// An unsaved copy of a stored invoice, ready for editing.
    pub async fn duplicate(&self, id: &str) -> InvoiceResult<Invoice> {
        Ok(self.find(id).await?.duplicate())
    }

    /// Wipes the anonymous device store once `confirm` accepts the prompt.
    /// Returns whether anything was cleared.
    pub async fn clear_local(&self, confirm: impl FnOnce(&str) -> bool) -> InvoiceResult<bool> {
        let StoreBackend::Local(local) = &self.backend else {
            return Err(InvoiceError::Validation(
                "clearing local data is only available without an account".to_string(),
            ));
        };
        if !confirm(local::CLEAR_ALL_PROMPT) {
            return Ok(false);
        }
        local
            .clear_all()
            .await
            .inspect_err(|e| tracing::error!(op = "clear_local", error = %e, "clearing local invoices failed"))?;
        tracing::info!("local invoice data cleared");
        Ok(true)
    }
}
