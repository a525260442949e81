//! Document exports: a drawn PDF and a self-printing HTML page.
//!
//! Both consume the same [`InvoiceLayout`] as the preview. Rendering runs on
//! the blocking pool and the artifact is only moved into place once it is
//! complete, so a failed export leaves nothing behind.

pub mod pdf;
pub mod print;

use std::path::{Path, PathBuf};

use crate::error::{InvoiceError, InvoiceResult};
use crate::model::Invoice;
use crate::render::{layout, InvoiceLayout, Theme};

pub use pdf::{PdfExporter, PdfFont};
pub use print::PrintExporter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Pdf,
    Print,
}

impl ExportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportKind::Pdf => "pdf",
            ExportKind::Print => "print",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub kind: ExportKind,
    pub path: PathBuf,
    pub bytes: usize,
}

pub trait Exporter: Clone + Send + Sync + 'static {
    fn kind(&self) -> ExportKind;

    fn file_name(&self, invoice_number: &str) -> String;

    /// Produces the whole document in memory.
    fn render(&self, layout: &InvoiceLayout) -> InvoiceResult<Vec<u8>>;
}

pub(crate) fn sanitize_filename(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        let ok = ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.';
        out.push(if ok { ch } else { '_' });
    }
    out.trim_matches('.').to_string()
}

/// `invoice-<number>.pdf`, or `invoice.pdf` when the number has nothing usable.
pub fn pdf_file_name(invoice_number: &str) -> String {
    named_file(invoice_number, "", "pdf")
}

pub fn print_file_name(invoice_number: &str) -> String {
    named_file(invoice_number, "-print", "html")
}

fn named_file(invoice_number: &str, suffix: &str, ext: &str) -> String {
    let stem = sanitize_filename(invoice_number.trim());
    if stem.is_empty() {
        format!("invoice{suffix}.{ext}")
    } else {
        format!("invoice-{stem}{suffix}.{ext}")
    }
}

async fn write_atomically(path: &Path, bytes: &[u8]) -> InvoiceResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("part");
    if let Err(e) = tokio::fs::write(&tmp, bytes).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Renders `invoice` off the async executor and writes it into `out_dir`.
pub async fn export_to_dir<E: Exporter>(
    exporter: &E,
    invoice: &Invoice,
    theme: Theme,
    out_dir: &Path,
) -> InvoiceResult<ExportArtifact> {
    let kind = exporter.kind();
    let path = out_dir.join(exporter.file_name(&invoice.invoice_number));
    let doc = layout(invoice, theme);
    let worker = exporter.clone();

    let result: InvoiceResult<ExportArtifact> = async {
        let bytes = tokio::task::spawn_blocking(move || worker.render(&doc))
            .await
            .map_err(|e| InvoiceError::Export(e.to_string()))??;
        write_atomically(&path, &bytes)
            .await
            .map_err(|e| InvoiceError::Export(e.to_string()))?;
        Ok(ExportArtifact {
            kind,
            path: path.clone(),
            bytes: bytes.len(),
        })
    }
    .await;

    match &result {
        Ok(a) => tracing::info!(kind = kind.as_str(), path = %a.path.display(), bytes = a.bytes, "invoice exported"),
        Err(e) => tracing::error!(op = "export", kind = kind.as_str(), error = %e, "invoice export failed"),
    }
    result
}
