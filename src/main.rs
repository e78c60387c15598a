//! Sheetwatch - keep a CSV export in sync with an order spreadsheet.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sheetwatch::config::{ConfigLoader, WatchConfig};
use sheetwatch::display;
use sheetwatch::pipeline::Pipeline;

#[derive(Parser)]
#[command(
    name = "sheetwatch",
    about = "Watch a directory for order spreadsheets and keep a CSV export in sync",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file (default: ./.sheetwatch.toml, then the user config dir).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert the current spreadsheet, then reconvert on every change.
    Watch {
        #[command(flatten)]
        target: TargetArgs,
        /// Debounce window for filesystem events, in milliseconds.
        #[arg(long)]
        debounce_ms: Option<u64>,
    },
    /// Convert the current spreadsheet once and exit.
    Convert {
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Report whether file names would be picked up.
    Check {
        /// File names to test.
        #[arg(required = true)]
        names: Vec<String>,
        #[command(flatten)]
        target: TargetArgs,
    },
}

/// Overrides for the file configuration.
#[derive(Args)]
struct TargetArgs {
    /// Directory holding the spreadsheet.
    #[arg(short, long)]
    dir: Option<PathBuf>,
    /// Output CSV, relative to the directory unless absolute.
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Marker the file name must contain.
    #[arg(long)]
    marker: Option<String>,
    /// Spreadsheet extension.
    #[arg(long)]
    extension: Option<String>,
    /// Regex replacing the marker test.
    #[arg(long)]
    pattern: Option<String>,
    /// Match the marker regardless of case.
    #[arg(long)]
    case_insensitive: bool,
}

impl TargetArgs {
    fn apply(self, config: &mut WatchConfig) {
        if let Some(dir) = self.dir {
            config.directory = dir;
        }
        if let Some(output) = self.output {
            config.output = output;
        }
        if let Some(marker) = self.marker {
            config.marker = marker;
        }
        if let Some(extension) = self.extension {
            config.extension = extension;
        }
        if self.pattern.is_some() {
            config.pattern = self.pattern;
        }
        if self.case_insensitive {
            config.marker_case_sensitive = false;
        }
    }
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn build_pipeline(config: &WatchConfig) -> Option<Pipeline> {
    match Pipeline::new(config) {
        Ok(pipeline) => Some(pipeline),
        Err(e) => {
            display::print_error(&e.to_string());
            None
        }
    }
}

async fn run_watch(config: &WatchConfig) -> ExitCode {
    let Some(pipeline) = build_pipeline(config) else {
        return ExitCode::FAILURE;
    };

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            return;
        }
        tracing::info!("Interrupt received");
        signal_token.cancel();
    });

    match pipeline.run(shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            display::print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

async fn run_convert(config: &WatchConfig) -> ExitCode {
    let Some(pipeline) = build_pipeline(config) else {
        return ExitCode::FAILURE;
    };

    let targets = match pipeline.find_targets() {
        Ok(targets) => targets,
        Err(e) => {
            display::print_error(&e.to_string());
            return ExitCode::FAILURE;
        }
    };
    let Some(first) = targets.first() else {
        display::print_error(&format!(
            "No spreadsheet found in {} (name must match marker {:?} and end in .{})",
            pipeline.directory().display(),
            config.pattern.as_deref().unwrap_or(&config.marker),
            pipeline.matcher().extension()
        ));
        return ExitCode::FAILURE;
    };

    display::print_scan_found(first, targets.len());
    if pipeline.convert(first).await.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn run_check(config: &WatchConfig, names: &[String]) -> ExitCode {
    let Some(pipeline) = build_pipeline(config) else {
        return ExitCode::FAILURE;
    };
    for name in names {
        display::print_check(name, pipeline.is_candidate(Path::new(name)));
    }
    ExitCode::SUCCESS
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let loader = cli
        .config
        .map_or_else(ConfigLoader::new, ConfigLoader::with_path);
    if let Some(path) = loader.find_config_file() {
        tracing::info!(path = %path.display(), "Using config file");
    }
    let mut config = match loader.load() {
        Ok(config) => config,
        Err(e) => {
            display::print_error(&e.to_string());
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Watch {
            target,
            debounce_ms,
        } => {
            target.apply(&mut config);
            if let Some(ms) = debounce_ms {
                config.debounce_ms = ms;
            }
            run_watch(&config).await
        }
        Commands::Convert { target } => {
            target.apply(&mut config);
            run_convert(&config).await
        }
        Commands::Check { names, target } => {
            target.apply(&mut config);
            run_check(&config, &names)
        }
    }
}
