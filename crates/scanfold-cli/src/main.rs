// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanfold: scanner to PDF, command-line front end.
//
// Scans the requested number of pages one after another, then folds them
// into a single PDF. Pages that fail are reported and skipped; whatever was
// scanned is still saved, but the exit code is 1 unless every step worked.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use scanfold_bridge::{CaptureHost, platform_host};
use scanfold_capture::{
    AcquireEvent, DeviceEnumerator, DeviceList, PageAcquirer, ScanSession, run_setup_check,
};
use scanfold_core::AppConfig;
use scanfold_core::config::default_config_path;
use scanfold_core::error::ScanError;
use scanfold_core::human_errors::humanize_error;
use scanfold_core::types::{ColorMode, DeviceDescriptor, Resolution, ScanSettings, scan_file_name};
use scanfold_document::{PdfAssembler, PdfInspector};

#[derive(Debug, Parser)]
#[command(
    name = "scanfold-cli",
    about = "Scan paper documents and save the pages as one PDF",
    version
)]
struct Cli {
    /// List available scanners and exit
    #[arg(short, long)]
    list: bool,

    /// Device to use: `auto`, a number from --list, or a device id
    #[arg(short, long, default_value = "auto")]
    device: String,

    /// Number of pages to scan
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pages: u32,

    /// Resolution in dpi: 150, 300 or 600 (default from settings)
    #[arg(short, long)]
    resolution: Option<Resolution>,

    /// Colour mode: color, gray or lineart (default from settings)
    #[arg(short, long)]
    mode: Option<ColorMode>,

    /// Output PDF (default: <output_dir>/Scan_<timestamp>.pdf)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Don't wait for ENTER between pages
    #[arg(long)]
    batch: bool,

    /// Check the scanning setup and exit
    #[arg(long)]
    check: bool,

    /// Settings file to use instead of the default one
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn settings(&self, config: &AppConfig) -> ScanSettings {
        ScanSettings {
            resolution: self.resolution.unwrap_or(config.default_settings.resolution),
            color_mode: self.mode.unwrap_or(config.default_settings.color_mode),
        }
    }

    fn output_path(&self, config: &AppConfig) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| config.output_dir.join(scan_file_name(&chrono::Local::now())))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether everything succeeded.
async fn run(cli: Cli) -> Result<bool> {
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let config = AppConfig::load_or_default(&config_path);
    tracing::debug!(config = %config_path.display(), "settings loaded");

    let host: Arc<dyn CaptureHost> = Arc::from(platform_host());

    if cli.check {
        let report = run_setup_check(host.as_ref(), &config).await;
        print!("{}", report.to_text());
        return Ok(report.passed());
    }

    let devices = DeviceEnumerator::new(host.clone(), config.enumerate_timeout())
        .enumerate()
        .await;
    if let Some(warning) = &devices.warning {
        explain(warning);
    }

    if cli.list {
        print_devices(&devices);
        return Ok(true);
    }

    let device = match devices.select(&cli.device) {
        Ok(device) => device.clone(),
        Err(e) => {
            explain(&e);
            print_devices(&devices);
            return Ok(false);
        }
    };

    let settings = cli.settings(&config);
    let mut session = ScanSession::new(config.scratch_root.clone(), settings);
    let acquirer = PageAcquirer::new(host, config.clone()).on_event(print_progress);

    println!(
        "Scanning {} page(s) with {} at {} dpi, {}.",
        cli.pages, device.label, settings.resolution, settings.color_mode
    );

    let outcome = scan_pages(&cli, &acquirer, &device, settings, &mut session).await;
    let all_scanned = match outcome {
        Ok(all) => all,
        Err(e) => {
            explain(&e);
            discard(&mut session);
            return Ok(false);
        }
    };

    if session.is_empty() {
        println!("No pages were scanned, so nothing was saved.");
        discard(&mut session);
        return Ok(false);
    }

    let output = cli.output_path(&config);
    let saved = save(&session, settings.resolution.dpi(), output).await;
    discard(&mut session);
    let saved = saved?;
    Ok(all_scanned && saved)
}

// -- Scanning -----------------------------------------------------------------

/// Scan every requested page. `Ok(false)` when some page failed; an error
/// only for cancellation.
async fn scan_pages(
    cli: &Cli,
    acquirer: &PageAcquirer,
    device: &DeviceDescriptor,
    settings: ScanSettings,
    session: &mut ScanSession,
) -> scanfold_core::error::Result<bool> {
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut all_scanned = true;

    for page in 1..=cli.pages {
        if !cli.batch {
            wait_for_enter(&mut stdin, page, cli.pages).await?;
        }

        let result = tokio::select! {
            result = acquirer.acquire(device, settings, session) => result,
            _ = tokio::signal::ctrl_c() => return Err(ScanError::Cancelled),
        };

        match result {
            Ok(path) => {
                session.append(path);
                println!("Page {page} of {} scanned.", cli.pages);
            }
            Err(e) => {
                println!("Page {page} of {} was not scanned.", cli.pages);
                explain(&e);
                all_scanned = false;
            }
        }
    }
    Ok(all_scanned)
}

async fn wait_for_enter(
    stdin: &mut Lines<BufReader<Stdin>>,
    page: u32,
    total: u32,
) -> scanfold_core::error::Result<()> {
    println!("Place page {page} of {total} on the scanner. Press ENTER when ready.");
    tokio::select! {
        line = stdin.next_line() => match line? {
            Some(_) => Ok(()),
            None => Err(ScanError::Cancelled),
        },
        _ = tokio::signal::ctrl_c() => Err(ScanError::Cancelled),
    }
}

// -- Saving -------------------------------------------------------------------

async fn save(session: &ScanSession, dpi: u32, output: PathBuf) -> Result<bool> {
    let pages = session.pages().to_vec();
    let target = output.clone();
    let written = tokio::task::spawn_blocking(move || {
        PdfAssembler::new().write_to_file(&pages, dpi, &target)
    })
    .await
    .context("PDF assembly task failed")?;

    if let Err(e) = written {
        explain(&e);
        return Ok(false);
    }

    let pdf = PdfInspector::open(&output)
        .with_context(|| format!("re-opening {}", output.display()))?;
    match pdf.page_size_pt(1) {
        Ok((w, h)) => println!(
            "Saved {} page(s) to {} ({w:.0} x {h:.0} pt).",
            pdf.page_count(),
            output.display()
        ),
        Err(_) => println!("Saved {} page(s) to {}.", pdf.page_count(), output.display()),
    }
    Ok(true)
}

fn discard(session: &mut ScanSession) {
    let outcome = session.clear();
    if let Some(warning) = outcome.warning {
        tracing::warn!(%warning, "scratch files left behind");
    }
}

// -- Output -------------------------------------------------------------------

fn print_devices(devices: &DeviceList) {
    println!("Available devices:");
    for (i, device) in devices.iter().enumerate() {
        println!("  {}. {}  [{}]", i + 1, device.label, device.id);
    }
}

fn print_progress(event: &AcquireEvent) {
    match event {
        AcquireEvent::CaptureStarted { device } => println!("  scanning with {device}..."),
        AcquireEvent::AutomationTriggered => println!("  scanner app started"),
        AcquireEvent::AutomationFailed(reason) => {
            println!("  could not start the scanner app ({reason}); scan by hand instead")
        }
        AcquireEvent::WaitingForDrop {
            folder,
            timeout_secs,
        } => println!(
            "  save the scan into {} (waiting up to {timeout_secs}s)...",
            folder.display()
        ),
        AcquireEvent::DropFileFound(path) => println!("  found {}", path.display()),
        AcquireEvent::Normalized { width, height, .. } => {
            println!("  page is {width} x {height} px")
        }
    }
}

fn explain(err: &ScanError) {
    let human = humanize_error(err);
    eprintln!("{}", human.message);
    eprintln!("  {}", human.suggestion);
    tracing::debug!(error = %err, "reported to user");
}
