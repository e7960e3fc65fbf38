///
/// This module implements the CLI for homebox-export: command parsing, option
/// validation and the async entrypoint used by `main` and the integration tests.
///
/// All export logic (naming, pagination, failure isolation) lives in
/// `homebox-export-core`. This module only wires a [`HomeboxClient`] and a
/// [`TracingReporter`] into an [`Exporter`] and prints the outcome.
///
/// ## How To Use
/// - Command line: `homebox-export export --server <url> --user <name> --pass <password>`,
///   or set the matching `HOMEBOX_*` environment variables (a `.env` file is honoured).
/// - Programmatic: build a [`Cli`] and call [`run`].
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use homebox_export_core::config::{ExportConfig, DEFAULT_OUTPUT_DIR, DEFAULT_PAGE_SIZE};
use homebox_export_core::export::Exporter;
use homebox_export_core::report::{ExportReport, TracingReporter};

use crate::client::{ClientConfig, HomeboxClient};

/// Set by release builds; local builds report `none`/`unknown`.
const COMMIT: Option<&str> = option_env!("HOMEBOX_EXPORT_COMMIT");
const BUILD_DATE: Option<&str> = option_env!("HOMEBOX_EXPORT_BUILD_DATE");

/// CLI for homebox-export: back up a Homebox inventory and its attachments.
#[derive(Parser, Debug)]
#[clap(
    name = "homebox-export",
    about = "Download all Homebox items and their attachments into a local directory",
    disable_version_flag = true
)]
pub struct Cli {
    /// Show version information
    #[clap(short = 'v', long = "version")]
    pub version: bool,

    #[clap(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download all items and their attachments
    Export(ExportArgs),
    /// Show version information
    Version,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ExportArgs {
    /// Homebox server URL (required)
    #[clap(long, env = "HOMEBOX_SERVER")]
    pub server: Option<String>,

    /// Username for authentication (required)
    #[clap(long, env = "HOMEBOX_USER")]
    pub user: Option<String>,

    /// Password for authentication (required)
    #[clap(long, env = "HOMEBOX_PASS", hide_env_values = true)]
    pub pass: Option<String>,

    /// Output directory
    #[clap(long, env = "HOMEBOX_OUTPUT", default_value = DEFAULT_OUTPUT_DIR)]
    pub output: PathBuf,

    /// Number of items per page
    #[clap(long, env = "HOMEBOX_PAGESIZE", default_value_t = DEFAULT_PAGE_SIZE)]
    pub pagesize: u32,

    /// Request timeout in seconds (no timeout when unset)
    #[clap(long, env = "HOMEBOX_TIMEOUT")]
    pub timeout: Option<u64>,
}

impl ExportArgs {
    /// Maps parsed options onto a validated [`ExportConfig`]. Missing required
    /// options fail here, before any network activity.
    pub fn to_config(&self) -> Result<ExportConfig> {
        let mut config = ExportConfig {
            server_url: self.server.clone().unwrap_or_default(),
            username: self.user.clone().unwrap_or_default(),
            password: self.pass.clone().unwrap_or_default(),
            output_dir: self.output.clone(),
            page_size: self.pagesize,
        };
        config.validate()?;
        Ok(config)
    }

    fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.server.clone().unwrap_or_default(),
            timeout: self.timeout.map(Duration::from_secs),
        }
    }
}

/// `homebox-export <version> (<commit>) - built <date>` followed by `<os>/<arch>`.
pub fn version_info() -> String {
    format!(
        "homebox-export {} ({}) - built {}\n{}/{}",
        env!("CARGO_PKG_VERSION"),
        COMMIT.unwrap_or("none"),
        BUILD_DATE.unwrap_or("unknown"),
        std::env::consts::OS,
        std::env::consts::ARCH,
    )
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    if cli.version {
        println!("{}", version_info());
        return Ok(());
    }

    match cli.command {
        None => {
            Cli::command().print_help()?;
            println!();
            Ok(())
        }
        Some(Commands::Version) => {
            println!("{}", version_info());
            Ok(())
        }
        Some(Commands::Export(args)) => export(args).await,
    }
}

async fn export(args: ExportArgs) -> Result<()> {
    let config = args.to_config()?;
    tracing::info!(command = "export", "Starting export");

    let client = HomeboxClient::new(args.client_config())
        .context("failed to initialize downloader")?;
    let exporter = Exporter::new(config, client, TracingReporter)
        .context("failed to initialize downloader")?;

    let report = match exporter.export_all().await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(command = "export", error = %e, "Export failed");
            return Err(e.into());
        }
    };

    if let Err(e) = exporter.api().logout().await {
        tracing::warn!(error = %e, "Logout failed");
    }

    print_summary(&report, &exporter.config().output_dir);
    Ok(())
}

fn print_summary(report: &ExportReport, output_dir: &std::path::Path) {
    println!(
        "Export complete: {} items, {} attachments ({} bytes) written to {}",
        report.items_exported,
        report.attachments_saved,
        report.bytes_written,
        output_dir.display()
    );
    if !report.is_clean() {
        println!("Completed with {} warning(s):", report.failures.len());
        for failure in &report.failures {
            println!("  - {}", failure);
        }
    }
}
