// gridrecon CLI - reconcile OCR-extracted tables against a ledger

mod exit_codes;
mod inspect;
mod recon;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::{error_exit_code, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "gridrecon")]
#[command(about = "Align extracted table grids with a ledger and report cell-level mismatches")]
#[command(version)]
struct Cli {
    /// Log engine decisions (debug level). RUST_LOG overrides.
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile one layout dump against one ledger
    #[command(after_help = "\
Examples:
  gridrecon run emei.recon.toml --layout scan.json --ledger marco.xlsx
  gridrecon run emei.recon.toml --layout scan.json --ledger marco.xlsx --sheet EMEI
  gridrecon run emei.recon.toml --layout scan.json --ledger marco.csv --json
  gridrecon run emei.recon.toml --layout scan.json --ledger marco.xlsx --output report.json")]
    Run {
        /// Path to the .recon.toml config file
        config: PathBuf,

        /// Layout dump (JSON) produced by the OCR/layout service
        #[arg(long)]
        layout: PathBuf,

        /// Ledger file: .csv/.tsv/.txt, or a workbook (.xlsx, .xls, .xlsb, .ods)
        #[arg(long)]
        ledger: PathBuf,

        /// Default workbook sheet (case-insensitive, substring match)
        #[arg(long)]
        sheet: Option<String>,

        /// Print the JSON report to stdout
        #[arg(long)]
        json: bool,

        /// Write the JSON report to a file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Validate a recon config without running
    #[command(after_help = "\
Examples:
  gridrecon validate emei.recon.toml")]
    Validate {
        /// Path to the .recon.toml config file
        config: PathBuf,
    },

    /// Reconcile many document pairs listed in a manifest
    #[command(after_help = "\
Manifest: CSV with a header row and columns `layout,ledger`. Relative paths
resolve against the manifest's directory.

Examples:
  gridrecon batch emei.recon.toml --manifest march.csv
  gridrecon batch emei.recon.toml --manifest march.csv --workers 8 --output-dir reports/")]
    Batch {
        /// Path to the .recon.toml config file
        config: PathBuf,

        /// CSV manifest of layout,ledger pairs
        #[arg(long)]
        manifest: PathBuf,

        /// Worker threads (overrides `workers` in the config)
        #[arg(long, env = "GRIDRECON_WORKERS")]
        workers: Option<usize>,

        /// Default workbook sheet for every ledger
        #[arg(long)]
        sheet: Option<String>,

        /// Write one `<layout>.report.json` per manifest row
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// List the grids in a layout dump, for calibrating section envelopes
    #[command(after_help = "\
Examples:
  gridrecon inspect --layout scan.json
  gridrecon inspect --layout scan.json --json")]
    Inspect {
        /// Layout dump (JSON)
        #[arg(long)]
        layout: PathBuf,

        /// Output JSON to stdout instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run { config, layout, ledger, sheet, json, output } => {
            recon::cmd_run(config, layout, ledger, sheet, json, output)
        }
        Commands::Validate { config } => recon::cmd_validate(config),
        Commands::Batch { config, manifest, workers, sheet, output_dir } => {
            recon::cmd_batch(config, manifest, workers, sheet, output_dir)
        }
        Commands::Inspect { layout, json } => inspect::cmd_inspect(layout, json),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn args(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    /// Outcome that is not an error but still needs a non-zero exit.
    /// The summary has already been printed, so there is no message.
    pub fn silent(code: u8) -> Self {
        Self::new(code, "")
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<gridrecon::ReconError> for CliError {
    fn from(err: gridrecon::ReconError) -> Self {
        Self::new(error_exit_code(&err), err.to_string())
    }
}
