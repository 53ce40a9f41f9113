/*============================================================
  Synavera Project: Syn-Cat
  Module: syncat::main
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Entry point for Syn-Cat. Searches the update catalog,
    optionally collects update details, and emits a structured
    JSON report.

  Security / Safety Notes:
    Operates within user privileges. Performs HTTPS requests
    to the public catalog only.

  Dependencies:
    clap for CLI parsing, chrono for timestamps, tokio for the
    runtime and interrupt handling.

  Operational Scope:
    Invoked by operators or scripts needing catalog listings
    without a browser.

  Revision History:
    2025-11-12 COD  Authored Syn-Cat search front end.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Result-first error handling with deterministic exits
    - Structured logging following Synavera cadence
    - Configurable execution via CLI and config file
============================================================*/

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;
use clap::{ArgAction, Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use syncat_core::logger::SessionLog;
use syncat_core::report::{build_report, write_report, ReportDocument};
use syncat_core::{
    CatalogClient, CatalogError, Result, SearchOptions, SearchResult, SortBy, SortDirection,
    SyncatConfig, UpdateDetail,
};

/// Command-line arguments for Syn-Cat.
#[derive(Debug, Parser)]
#[command(
    name = "syncat",
    version,
    author = "Synavera Systems",
    about = "Update catalog search and report builder"
)]
struct Cli {
    /// Search text, as typed into the catalog search box.
    #[arg(value_name = "QUERY")]
    query: String,
    /// Drop results sharing size and title with an earlier one.
    #[arg(long, action = ArgAction::SetTrue)]
    ignore_duplicates: bool,
    /// Column to sort results by.
    #[arg(long, value_enum, value_name = "COLUMN")]
    sort_by: Option<SortColumn>,
    /// Sort ascending instead of descending.
    #[arg(long, action = ArgAction::SetTrue, requires = "sort_by")]
    ascending: bool,
    /// Read only the first page of results.
    #[arg(long, action = ArgAction::SetTrue)]
    first_page: bool,
    /// Collect details and download links for every result.
    #[arg(long, action = ArgAction::SetTrue)]
    details: bool,
    /// Override configuration file path.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Override report output path.
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,
    /// Explicit log file path.
    #[arg(long, value_name = "PATH")]
    log: Option<PathBuf>,
    /// Do not write the report; emit summary only.
    #[arg(long, action = ArgAction::SetTrue)]
    dry_run: bool,
    /// Enable verbose logging to stderr.
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SortColumn {
    Title,
    Products,
    Classification,
    LastUpdated,
    Version,
    Size,
}

impl From<SortColumn> for SortBy {
    fn from(column: SortColumn) -> Self {
        match column {
            SortColumn::Title => SortBy::Title,
            SortColumn::Products => SortBy::Products,
            SortColumn::Classification => SortBy::Classification,
            SortColumn::LastUpdated => SortBy::LastUpdated,
            SortColumn::Version => SortBy::Version,
            SortColumn::Size => SortBy::Size,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("[Syn-Cat] {}", err);
            err.exit_code()
        }
    }
}

async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = SyncatConfig::load_from_optional_path(cli.config.as_deref())?;
    let report_path = cli.report.clone().unwrap_or_else(|| config.report_path());

    let session_stamp = Utc::now().format("%Y-%m-%d_%H-%M-%S").to_string();
    let log_path = cli
        .log
        .clone()
        .or_else(|| Some(config.log_dir().join(format!("syncat_{session_stamp}.log"))));
    let session_log = SessionLog::new(log_path, cli.verbose)?;
    install_subscriber(&session_log, cli.verbose)?;
    info!(code = "INIT", "Syn-Cat awakening.");

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!(code = "SIGNAL", "Interrupt received; cancelling catalog requests");
            interrupt.cancel();
        }
    });

    let client = CatalogClient::new(&config.catalog)?;
    let options = SearchOptions {
        ignore_duplicates: cli.ignore_duplicates,
        sort_by: cli.sort_by.map(SortBy::from),
        sort_direction: if cli.ascending {
            SortDirection::Ascending
        } else {
            SortDirection::Descending
        },
    };

    let (results, advertised) = if cli.first_page {
        match client
            .first_page(&cli.query, options.sort_by, options.sort_direction, &cancel)
            .await
        {
            Ok(page) => (page.results, Some(page.results_count)),
            Err(CatalogError::NoResults(_)) => (Vec::new(), Some(0)),
            Err(err) => return Err(err),
        }
    } else {
        (client.search(&cli.query, &options, &cancel).await?, None)
    };

    if results.is_empty() {
        warn!(code = "EMPTY", "Catalog returned no results for `{}`", cli.query);
    }

    let details = if cli.details {
        collect_details(&client, &results, &cancel).await?
    } else {
        Vec::new()
    };

    let document = build_report(&cli.query, &options, results, details, advertised);

    if cli.dry_run {
        print_summary(&document);
    } else {
        write_report(&document, &report_path)?;
        info!(
            code = "REPORT",
            "Report written to {}",
            report_path.display()
        );
    }

    info!(
        code = "SUMMARY",
        "results={} details={} links={}",
        document.metadata.total_results,
        document.metadata.details_collected,
        document.metadata.download_links
    );
    info!(code = "COMPLETE", "Catalog synchronised.");
    session_log.finalize()?;

    Ok(ExitCode::SUCCESS)
}

fn install_subscriber(session_log: &SessionLog, verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,syncat_core={level},syncat={level}")));
    tracing_subscriber::registry()
        .with(session_log.layer().with_filter(filter))
        .try_init()
        .map_err(|err| CatalogError::Runtime(format!("Failed to install log subscriber: {err}")))
}

async fn collect_details(
    client: &CatalogClient,
    results: &[SearchResult],
    cancel: &CancellationToken,
) -> Result<Vec<Option<UpdateDetail>>> {
    let mut details = Vec::with_capacity(results.len());
    for result in results {
        if cancel.is_cancelled() {
            return Err(CatalogError::Canceled {
                url: client.details_url(&result.update_id),
            });
        }
        details.push(client.try_update_details(result, cancel).await);
    }
    Ok(details)
}

fn print_summary(document: &ReportDocument) {
    let meta = &document.metadata;
    println!(
        "→ Report dry-run. Query=`{}` Results={} Size={} bytes Details={}/{} Links={}",
        meta.query,
        meta.total_results,
        meta.total_size_bytes,
        meta.details_collected,
        meta.details_collected + meta.details_failed,
        meta.download_links
    );
    for (classification, count) in &meta.classifications {
        println!("   {classification}: {count}");
    }
}
