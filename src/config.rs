//! Runtime configuration.
//!
//! Loaded from an optional `invoice-studio.toml`, then `INVOICE_STUDIO__*`
//! environment variables. Credentials and session flags never live here;
//! the authenticated actor is passed in explicitly.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::InvoiceResult;
use crate::overdue::OverduePolicy;
use crate::render::Theme;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Anonymous invoices live under `data_dir/local/<profile>`.
    #[serde(default = "default_local_profile")]
    pub local_profile: String,
    #[serde(default = "default_database_file")]
    pub database_file: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_currency")]
    pub default_currency: String,
    #[serde(default)]
    pub default_theme: Theme,
    #[serde(default)]
    pub overdue_policy: OverduePolicy,
    /// TTF used for PDF text instead of the bundled DejaVu Sans.
    #[serde(default)]
    pub pdf_font_path: Option<PathBuf>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_local_profile() -> String {
    "default".to_string()
}

fn default_database_file() -> String {
    "invoices.db".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("out")
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            local_profile: default_local_profile(),
            database_file: default_database_file(),
            output_dir: default_output_dir(),
            default_currency: default_currency(),
            default_theme: Theme::default(),
            overdue_policy: OverduePolicy::default(),
            pdf_font_path: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> InvoiceResult<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("invoice-studio").required(false))
            .add_source(config::Environment::with_prefix("INVOICE_STUDIO").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn local_dir(&self) -> PathBuf {
        self.data_dir.join("local").join(&self.local_profile)
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }
}
