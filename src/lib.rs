//! Invoice drafting, totals, storage and export.
//!
//! The pieces line up as the invoice flows through them: [`model`] holds the
//! editable invoice, [`totals`] keeps its derived amounts current, [`store`]
//! persists it for an anonymous device or an authenticated [`Actor`],
//! [`render`] turns it into a display layout and [`export`] writes that
//! layout out as a PDF or a print page.

pub mod config;
pub mod currency;
pub mod error;
pub mod export;
pub mod model;
pub mod overdue;
pub mod render;
pub mod store;
pub mod totals;

pub use config::AppConfig;
pub use currency::{currency_symbol, find_currency, Currency, CURRENCIES};
pub use error::{InvoiceError, InvoiceResult};
pub use export::{export_to_dir, ExportArtifact, ExportKind, Exporter, PdfExporter, PdfFont, PrintExporter};
pub use model::{Contact, Invoice, InvoiceItem, InvoiceStatus};
pub use overdue::OverduePolicy;
pub use render::{layout, InvoiceLayout, Theme};
pub use store::local::{DeviceStorage, LocalInvoiceStore};
pub use store::remote::RemoteDb;
pub use store::{Actor, InvoiceService, InvoiceStore, StoreBackend};
pub use totals::{calculate_totals, Totals};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the fmt subscriber. `RUST_LOG` wins over the default filter.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "invoice_studio=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
