use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;

use paybot_core::expressions::ExpressionRegistry;
use paybot_core::flow::{FlowConfig, FlowController};
use paybot_core::settings::Settings;
use paybot_core::{invoice, logger, notify, platform};

/// Pay a utility bill through the banking app over ADB.
#[derive(Debug, Parser)]
#[command(name = "paybot", version)]
struct Args {
    /// Path to the JSON settings file
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Run provider scrapers without a visible browser
    #[arg(long)]
    headless: bool,

    /// Log every device command
    #[arg(long)]
    log: bool,

    /// Base polling interval and settle unit, in milliseconds
    #[arg(long = "default-sleep", default_value_t = 100)]
    default_sleep: u64,

    /// Drive a simulated device instead of a real one
    #[arg(long)]
    stub: bool,

    /// Fetch provider invoices and post them to the webhook before paying
    #[arg(long = "fetch-invoices")]
    fetch_invoices: bool,

    /// Give up on the device flow after this many seconds
    #[arg(long)]
    timeout: Option<u64>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let logs_dir = std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("logs");
    logger::init(&logs_dir);
    logger::set_verbose(args.log);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logger::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let settings = Settings::load(&args.config)?;

    if args.fetch_invoices {
        report_invoices(&settings, args.headless)?;
    }

    let expressions = ExpressionRegistry::with_overrides(&settings.automation.expressions)
        .context("loading UI expressions")?;
    let mut config = FlowConfig::from_settings(&settings.automation, args.default_sleep);
    config.run_timeout = args.timeout.map(Duration::from_secs);

    let device = platform::connect(args.stub)?;
    let mut flow = FlowController::new(device, config, expressions);
    flow.run()?;
    Ok(())
}

/// Fetch every provider's invoice and post each one to the webhook. Fails
/// only when no invoice could be fetched.
fn report_invoices(settings: &Settings, headless: bool) -> Result<()> {
    let sources = invoice::sources_from_settings(settings, headless);
    let (invoices, errs) = invoice::fetch_all(&sources);

    if invoices.is_empty() {
        for (i, e) in errs.iter().enumerate() {
            logger::error(&format!("err[{}]: {}", i, e));
        }
        bail!("no invoices found");
    }

    for inv in &invoices {
        // delivery problems don't change the outcome of the fetch
        if let Err(e) = notify::notify(&inv.to_text(), &settings.hook_url) {
            logger::warn_p("notify", &format!("{}: {}", inv.provider, e));
        }
    }
    Ok(())
}
