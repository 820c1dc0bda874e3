//! Invoice collection from utility-provider scrapers.
//!
//! Scraping itself happens in external programs. A provider that fails is
//! logged and skipped; the others are still tried.

use std::io::Write;
use std::process::{Command, Stdio};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::logger;
use crate::settings::{ProviderSettings, Settings};

/// What a scraper prints on stdout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceData {
    pub due_date: String,
    pub value: String,
    pub bar_code: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    pub provider: String,
    pub due_date: String,
    pub value: String,
    pub bar_code: String,
    pub status: String,
}

impl Invoice {
    pub fn new(provider: &str, data: InvoiceData) -> Self {
        Self {
            provider: provider.to_string(),
            due_date: data.due_date,
            value: data.value,
            bar_code: data.bar_code,
            status: data.status,
        }
    }

    /// Chat message body for this invoice.
    pub fn to_text(&self) -> String {
        format!(
            "{} successfully captured:\nDueDate: {}\nValue: {}\nStatus: {}",
            self.provider, self.due_date, self.value, self.status
        )
    }
}

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("{provider}: no scraper configured")]
    NotConfigured { provider: String },

    #[error("{provider}: failed to run scraper: {source}")]
    Spawn {
        provider: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{provider}: scraper failed ({status}): {stderr}")]
    Failed {
        provider: String,
        status: String,
        stderr: String,
    },

    #[error("{provider}: bad scraper output: {source}")]
    Decode {
        provider: String,
        #[source]
        source: serde_json::Error,
    },
}

pub trait InvoiceSource {
    fn provider(&self) -> &str;
    fn fetch(&self) -> Result<InvoiceData, ScrapeError>;
}

/// Run every source in order. Failures don't stop the remaining sources;
/// both lists keep call order.
pub fn fetch_all(sources: &[Box<dyn InvoiceSource>]) -> (Vec<Invoice>, Vec<ScrapeError>) {
    let mut invoices = Vec::new();
    let mut errs = Vec::new();

    for source in sources {
        let provider = source.provider();
        logger::info_p("invoice", &format!("fetching {}", provider));
        match source.fetch() {
            Ok(data) => invoices.push(Invoice::new(provider, data)),
            Err(e) => {
                logger::error_p("invoice", &e.to_string());
                errs.push(e);
            }
        }
    }

    logger::info_p(
        "invoice",
        &format!("{} invoice(s), {} error(s)", invoices.len(), errs.len()),
    );
    (invoices, errs)
}

/// Scrapers for the providers in `settings`: comgas first, then enel.
pub fn sources_from_settings(settings: &Settings, headless: bool) -> Vec<Box<dyn InvoiceSource>> {
    [("comgas", &settings.comgas), ("enel", &settings.enel)]
        .into_iter()
        .map(|(name, p)| Box::new(CommandScraper::from_settings(name, p, headless)) as Box<dyn InvoiceSource>)
        .collect()
}

/// External scraper process. Gets the provider's credentials as JSON on
/// stdin and prints [`InvoiceData`] JSON on stdout.
pub struct CommandScraper {
    provider: String,
    argv: Vec<String>,
    credentials: Value,
    headless: bool,
}

impl CommandScraper {
    pub fn new(provider: &str, argv: Vec<String>, credentials: Value, headless: bool) -> Self {
        Self {
            provider: provider.to_string(),
            argv,
            credentials,
            headless,
        }
    }

    pub fn from_settings(provider: &str, p: &ProviderSettings, headless: bool) -> Self {
        Self::new(provider, p.scraper.clone().unwrap_or_default(), p.user.clone(), headless)
    }
}

impl InvoiceSource for CommandScraper {
    fn provider(&self) -> &str {
        &self.provider
    }

    fn fetch(&self) -> Result<InvoiceData, ScrapeError> {
        let provider = self.provider.clone();
        let Some((program, args)) = self.argv.split_first() else {
            return Err(ScrapeError::NotConfigured { provider });
        };

        let mut cmd = Command::new(program);
        cmd.args(args);
        if self.headless {
            cmd.arg("--headless");
        }
        logger::debug_p("invoice", &format!("{:?}", cmd));

        let spawn_err = |source: std::io::Error| ScrapeError::Spawn { provider: provider.clone(), source };
        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_err)?;

        if let Some(mut stdin) = child.stdin.take() {
            let body = self.credentials.to_string();
            // a scraper that ignores stdin may exit before reading it
            if let Err(e) = stdin.write_all(body.as_bytes()) {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(spawn_err(e));
                }
            }
        }

        let output = child.wait_with_output().map_err(spawn_err)?;
        if !output.status.success() {
            return Err(ScrapeError::Failed {
                provider,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        serde_json::from_slice(&output.stdout).map_err(|source| ScrapeError::Decode { provider, source })
    }
}
