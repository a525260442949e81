//! Authenticated relational storage.
//!
//! One row per invoice: the whole invoice as a JSON blob plus the owning
//! `user_id`. Status changes rewrite the full blob.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::error::{InvoiceError, InvoiceResult};
use crate::model::{epoch_millis, Invoice, InvoiceStatus};

use super::{Actor, InvoiceStore};

fn configure_sqlite(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;\n\
         PRAGMA synchronous = NORMAL;\n\
         PRAGMA foreign_keys = ON;\n\
         PRAGMA temp_store = MEMORY;\n\
         PRAGMA busy_timeout = 5000;\n",
    )?;
    conn.busy_timeout(Duration::from_millis(5000))?;
    Ok(())
}

fn init_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS invoices (
            id TEXT PRIMARY KEY NOT NULL,
            user_id TEXT NOT NULL,
            invoice_data TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_invoices_user_created ON invoices(user_id, created_at);
        "#,
    )?;
    Ok(())
}

fn now_millis() -> i64 {
    i64::try_from(epoch_millis()).unwrap_or(i64::MAX)
}

/// Shared connection; cheap to clone.
#[derive(Clone)]
pub struct RemoteDb {
    conn: Arc<Mutex<Connection>>,
    write_lock: Arc<Mutex<()>>,
}

impl RemoteDb {
    pub fn open(path: &Path) -> InvoiceResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        configure_sqlite(&conn)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> InvoiceResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> InvoiceResult<Self> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// A store that only ever sees rows owned by `actor`.
    pub fn scoped(&self, actor: &Actor) -> RemoteInvoiceStore {
        RemoteInvoiceStore {
            db: self.clone(),
            user_id: actor.id.clone(),
        }
    }

    async fn with_read<T, F>(&self, op_name: &'static str, f: F) -> InvoiceResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> InvoiceResult<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| InvoiceError::Storage("db mutex poisoned".to_string()))?;
            f(&guard).inspect_err(|e| {
                tracing::error!(op = op_name, error = %e, "sqlite read failed");
            })
        })
        .await
        .map_err(|e| InvoiceError::Storage(e.to_string()))?
    }

    async fn with_write<T, F>(&self, op_name: &'static str, f: F) -> InvoiceResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> InvoiceResult<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        let write_lock = self.write_lock.clone();
        tokio::task::spawn_blocking(move || {
            let _wg = write_lock
                .lock()
                .map_err(|_| InvoiceError::Storage("write mutex poisoned".to_string()))?;
            let mut guard = conn
                .lock()
                .map_err(|_| InvoiceError::Storage("db mutex poisoned".to_string()))?;
            f(&mut guard).inspect_err(|e| {
                tracing::error!(op = op_name, error = %e, "sqlite write failed");
            })
        })
        .await
        .map_err(|e| InvoiceError::Storage(e.to_string()))?
    }
}

fn read_owned_invoice(conn: &Connection, id: &str, user_id: &str) -> InvoiceResult<Option<Invoice>> {
    let json: Option<String> = conn
        .query_row(
            "SELECT invoice_data FROM invoices WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
            |r| r.get(0),
        )
        .optional()?;
    match json {
        Some(j) => {
            let mut inv: Invoice = serde_json::from_str(&j)?;
            inv.id = id.to_string();
            Ok(Some(inv))
        }
        None => Ok(None),
    }
}

#[derive(Clone)]
pub struct RemoteInvoiceStore {
    db: RemoteDb,
    user_id: String,
}

impl RemoteInvoiceStore {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

impl InvoiceStore for RemoteInvoiceStore {
    async fn list(&self) -> InvoiceResult<Vec<Invoice>> {
        let user_id = self.user_id.clone();
        self.db
            .with_read("list_invoices", move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, invoice_data FROM invoices WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC",
                )?;
                let mut rows = stmt.query(params![user_id])?;
                let mut out: Vec<Invoice> = Vec::new();
                while let Some(row) = rows.next()? {
                    let id: String = row.get(0)?;
                    let json: String = row.get(1)?;
                    // A corrupt row fails the whole listing, same as device storage.
                    let mut inv: Invoice = serde_json::from_str(&json)?;
                    inv.id = id;
                    out.push(inv);
                }
                Ok(out)
            })
            .await
    }

    async fn save(&self, invoice: &Invoice) -> InvoiceResult<Invoice> {
        let user_id = self.user_id.clone();
        let mut saved = invoice.clone();
        self.db
            .with_write("save_invoice", move |conn| {
                let now = now_millis();
                if saved.id.trim().is_empty() {
                    saved.id = Uuid::new_v4().to_string();
                }
                let json = serde_json::to_string(&saved)?;

                // Upsert, but never across owners.
                let changed = conn.execute(
                    r#"INSERT INTO invoices (id, user_id, invoice_data, created_at, updated_at)
                       VALUES (?1, ?2, ?3, ?4, ?4)
                       ON CONFLICT(id) DO UPDATE SET
                           invoice_data = excluded.invoice_data,
                           updated_at = excluded.updated_at
                       WHERE invoices.user_id = excluded.user_id"#,
                    params![saved.id, user_id, json, now],
                )?;
                if changed == 0 {
                    return Err(InvoiceError::NotFound(saved.id));
                }
                Ok(saved)
            })
            .await
    }

    async fn update_status(&self, id: &str, status: InvoiceStatus) -> InvoiceResult<()> {
        let user_id = self.user_id.clone();
        let id = id.to_string();
        self.db
            .with_write("update_invoice_status", move |conn| {
                let Some(mut existing) = read_owned_invoice(conn, &id, &user_id)? else {
                    return Err(InvoiceError::NotFound(id));
                };
                existing.status = status;
                let json = serde_json::to_string(&existing)?;
                conn.execute(
                    "UPDATE invoices SET invoice_data = ?3, updated_at = ?4 WHERE id = ?1 AND user_id = ?2",
                    params![id, user_id, json, now_millis()],
                )?;
                Ok(())
            })
            .await
    }

    async fn delete(&self, id: &str) -> InvoiceResult<()> {
        let user_id = self.user_id.clone();
        let id = id.to_string();
        self.db
            .with_write("delete_invoice", move |conn| {
                conn.execute(
                    "DELETE FROM invoices WHERE id = ?1 AND user_id = ?2",
                    params![id, user_id],
                )?;
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::InvoiceItem;

    fn actor(id: &str) -> Actor {
        Actor {
            id: id.to_string(),
            email: format!("{id}@example.com"),
        }
    }

    fn sample(number: &str) -> Invoice {
        let mut inv = Invoice::new_draft_on("EUR", "2026-05-01".into(), number.into());
        inv.sender.name = "Acme".into();
        inv.recipient.name = "Globex".into();
        inv.items = vec![
            InvoiceItem::new("Design", 2.0, 50.0),
            InvoiceItem::new("Hosting", 12.0, 4.0),
        ];
        inv.set_discount_rate(5.0);
        inv
    }

    #[tokio::test]
    async fn save_assigns_row_id_and_round_trips() {
        let db = RemoteDb::open_in_memory().unwrap();
        let store = db.scoped(&actor("u1"));
        let original = sample("INV-100001");

        let saved = store.save(&original).await.unwrap();
        assert!(!saved.id.is_empty());

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, saved.id);
        assert_eq!(Invoice { id: String::new(), ..listed[0].clone() }, original);
    }

    #[tokio::test]
    async fn upsert_replaces_existing_row() {
        let db = RemoteDb::open_in_memory().unwrap();
        let store = db.scoped(&actor("u1"));
        let mut saved = store.save(&sample("INV-100001")).await.unwrap();
        saved.terms = "Net 30".into();
        store.save(&saved).await.unwrap();

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].terms, "Net 30");
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let db = RemoteDb::open_in_memory().unwrap();
        let store = db.scoped(&actor("u1"));
        store.save(&sample("INV-1")).await.unwrap();
        store.save(&sample("INV-2")).await.unwrap();
        store.save(&sample("INV-3")).await.unwrap();

        let numbers: Vec<_> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.invoice_number)
            .collect();
        assert_eq!(numbers, vec!["INV-3", "INV-2", "INV-1"]);
    }

    #[tokio::test]
    async fn users_never_see_each_other() {
        let db = RemoteDb::open_in_memory().unwrap();
        let alice = db.scoped(&actor("alice"));
        let bob = db.scoped(&actor("bob"));

        let a = alice.save(&sample("INV-A")).await.unwrap();
        assert!(bob.list().await.unwrap().is_empty());

        // Bob cannot overwrite, re-status or delete Alice's row.
        let mut hijack = a.clone();
        hijack.notes = "mine now".into();
        assert!(matches!(bob.save(&hijack).await, Err(InvoiceError::NotFound(_))));
        assert!(matches!(
            bob.update_status(&a.id, InvoiceStatus::Paid).await,
            Err(InvoiceError::NotFound(_))
        ));
        bob.delete(&a.id).await.unwrap();

        let still = alice.list().await.unwrap();
        assert_eq!(still.len(), 1);
        assert_eq!(still[0].notes, "");
        assert_eq!(still[0].status, InvoiceStatus::Draft);
    }

    #[tokio::test]
    async fn status_update_rewrites_only_status() {
        let db = RemoteDb::open_in_memory().unwrap();
        let store = db.scoped(&actor("u1"));
        let saved = store.save(&sample("INV-100001")).await.unwrap();

        store.update_status(&saved.id, InvoiceStatus::Paid).await.unwrap();
        let listed = store.list().await.unwrap();
        assert_eq!(listed[0].status, InvoiceStatus::Paid);
        assert_eq!(Invoice { status: InvoiceStatus::Draft, ..listed[0].clone() }, saved);
    }

    #[tokio::test]
    async fn delete_removes_row() {
        let db = RemoteDb::open_in_memory().unwrap();
        let store = db.scoped(&actor("u1"));
        let saved = store.save(&sample("INV-100001")).await.unwrap();
        store.delete(&saved.id).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_row_is_a_serialization_error() {
        let db = RemoteDb::open_in_memory().unwrap();
        let store = db.scoped(&actor("u1"));
        store.save(&sample("INV-1")).await.unwrap();
        db.with_write("insert_corrupt", |conn| {
            conn.execute(
                "INSERT INTO invoices (id, user_id, invoice_data, created_at, updated_at) VALUES ('bad', 'u1', '{not json', 0, 0)",
                [],
            )?;
            Ok(())
        })
        .await
        .unwrap();

        assert!(matches!(store.list().await, Err(InvoiceError::Serialization(_))));
        // Other owners are unaffected.
        assert!(db.scoped(&actor("u2")).list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn file_database_survives_reopen() {
        let path = std::env::temp_dir()
            .join(format!("invoice-studio-{}", Uuid::new_v4()))
            .join("invoices.db");
        let saved = {
            let db = RemoteDb::open(&path).unwrap();
            db.scoped(&actor("u1")).save(&sample("INV-7")).await.unwrap()
        };
        let db = RemoteDb::open(&path).unwrap();
        let listed = db.scoped(&actor("u1")).list().await.unwrap();
        assert_eq!(listed[0].id, saved.id);
        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }
}
