//! tablesnap command line
//!
//! `tablesnap <CONFIG> <OUTPUT> <DOWNLOAD_DIR>`: back up the configured tables
//! into OUTPUT and their attachments into DOWNLOAD_DIR. Progress goes to
//! stderr through `tracing`; on failure a single `Error: ...` line is printed
//! and the exit code reflects the error class.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tablesnap::{BackupOptions, Config, run_backup};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "tablesnap", version, about = "Back up Airtable bases and their attachments")]
struct Cli {
    /// Configuration file (JSON with "token" and "app-tables")
    config: PathBuf,

    /// Where to write the backup file
    output: PathBuf,

    /// Existing directory for attachment files
    download_dir: PathBuf,

    /// Number of attachments downloaded at once
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    download_workers: u16,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tablesnap=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let options = BackupOptions {
        download_workers: usize::from(cli.download_workers),
        ..BackupOptions::default()
    };

    let result = match Config::load(&cli.config) {
        Ok(config) => run_backup(&config, &options, &cli.output, &cli.download_dir).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(summary) => {
            tracing::info!(
                tables = summary.tables,
                records = summary.records,
                attachments = summary.attachments,
                downloaded = summary.downloads.downloaded,
                already_present = summary.downloads.already_present,
                "backup complete"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.class().exit_code())
        }
    }
}
