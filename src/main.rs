use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};

use invoice_studio::render::{self, html};
use invoice_studio::{
    export_to_dir, Actor, AppConfig, DeviceStorage, Invoice, InvoiceService, InvoiceStatus, LocalInvoiceStore,
    PdfExporter, PrintExporter, RemoteDb, StoreBackend, Theme,
};

#[derive(Parser, Debug)]
#[command(name = "invoice-studio", about = "Create, store and export invoices")]
struct Cli {
    /// Account id; without it invoices stay on this device.
    #[arg(long, global = true)]
    user: Option<String>,

    #[arg(long, global = true, requires = "user")]
    email: Option<String>,

    /// Overrides `default_theme` for preview and export.
    #[arg(long, global = true)]
    theme: Option<Theme>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a blank draft as JSON.
    New {
        #[arg(long)]
        currency: Option<String>,
        #[arg(long)]
        out: Option<PathBuf>,
    },

    List {
        /// Also write the history table as HTML.
        #[arg(long)]
        html: Option<PathBuf>,
    },

    /// Save an invoice JSON file (create when it has no id, update otherwise).
    Save { file: PathBuf },

    MarkPaid { id: String },

    SetStatus {
        id: String,
        #[arg(value_parser = parse_status)]
        status: InvoiceStatus,
    },

    Delete { id: String },

    /// Print an unsaved copy of a stored invoice.
    Duplicate {
        id: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Remove every invoice kept on this device.
    ClearLocal {
        #[arg(long)]
        yes: bool,
    },

    Preview {
        id: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },

    ExportPdf { id: String },

    Print { id: String },
}

fn parse_status(raw: &str) -> Result<InvoiceStatus, String> {
    InvoiceStatus::parse(raw).ok_or_else(|| format!("unknown status: {raw} (draft, sent, paid, overdue)"))
}

async fn write_or_print(out: Option<&Path>, content: &str) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            tokio::fs::write(path, content)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("{}", path.display());
        }
        None => println!("{content}"),
    }
    Ok(())
}

fn confirm_on_stdin(prompt: &str) -> bool {
    print!("{prompt} [y/N] ");
    let _ = std::io::stdout().flush();
    let mut answer = String::new();
    if std::io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    invoice_studio::init_tracing();

    let cli = Cli::parse();
    let config = AppConfig::load().context("failed to load configuration")?;
    let theme = cli.theme.unwrap_or(config.default_theme);

    let actor = cli.user.as_ref().map(|id| Actor {
        id: id.clone(),
        email: cli.email.clone().unwrap_or_default(),
    });
    let backend = match &actor {
        Some(actor) => {
            let db = RemoteDb::open(&config.database_path())
                .with_context(|| format!("failed to open {}", config.database_path().display()))?;
            StoreBackend::Remote(db.scoped(actor))
        }
        None => StoreBackend::Local(LocalInvoiceStore::new(DeviceStorage::file(config.local_dir()))),
    };
    let service = InvoiceService::new(backend, config.overdue_policy);

    if let Some(warning) = service.storage_warning() {
        eprintln!("note: {warning}");
    }

    match cli.command {
        Command::New { currency, out } => {
            let currency = currency.unwrap_or_else(|| config.default_currency.clone());
            let draft = Invoice::new_draft(&currency);
            write_or_print(out.as_deref(), &serde_json::to_string_pretty(&draft)?).await?;
        }

        Command::List { html: html_out } => {
            let invoices = service.list().await?;
            let entries = render::history(&invoices);
            if entries.is_empty() {
                println!("no invoices");
            }
            for e in &entries {
                println!("{}  {}", e.id, e.summary_line());
            }
            if let Some(path) = html_out {
                write_or_print(Some(&path), &html::render_history(&entries)).await?;
            }
        }

        Command::Save { file } => {
            let raw = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let invoice: Invoice = serde_json::from_str(&raw).context("invoice JSON is invalid")?;
            let saved = service.save(&invoice).await?;
            println!("{}", serde_json::to_string_pretty(&saved)?);
        }

        Command::MarkPaid { id } => {
            service.mark_paid(&id).await?;
            println!("{id}: paid");
        }

        Command::SetStatus { id, status } => {
            service.update_status(&id, status).await?;
            println!("{id}: {status}");
        }

        Command::Delete { id } => {
            service.delete(&id).await?;
            println!("{id}: deleted");
        }

        Command::Duplicate { id, out } => {
            let copy = service.duplicate(&id).await?;
            write_or_print(out.as_deref(), &serde_json::to_string_pretty(&copy)?).await?;
        }

        Command::ClearLocal { yes } => {
            if !service.is_anonymous() {
                anyhow::bail!("clear-local only applies without --user");
            }
            let cleared = service
                .clear_local(|prompt| yes || confirm_on_stdin(prompt))
                .await?;
            println!("{}", if cleared { "local invoices cleared" } else { "cancelled" });
        }

        Command::Preview { id, out } => {
            let invoice = service.find(&id).await?;
            let page = html::render_preview(&render::layout(&invoice, theme));
            write_or_print(out.as_deref(), &page).await?;
        }

        Command::ExportPdf { id } => {
            let invoice = service.find(&id).await?;
            let exporter = PdfExporter::from_font_path(config.pdf_font_path.as_deref())?;
            let artifact = export_to_dir(&exporter, &invoice, theme, &config.output_dir).await?;
            println!("{}", artifact.path.display());
        }

        Command::Print { id } => {
            let invoice = service.find(&id).await?;
            let artifact = export_to_dir(&PrintExporter, &invoice, theme, &config.output_dir).await?;
            println!("{} (open in a browser to print)", artifact.path.display());
        }
    }

    Ok(())
}
