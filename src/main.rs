//! Binary entrypoint: loads configuration, opens the primary surface and runs
//! the key loop against snapshot windows.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, fmt};

use meteorite_viewer::io::{FsCodec, LineInput, SnapshotDisplay};
use meteorite_viewer::{Config, Registries, ToggleController};

#[derive(Debug, Parser)]
#[command(
    name = "meteorite-viewer",
    about = "Page through a numbered image sequence with threshold and contour overlays"
)]
struct Cli {
    /// Path to YAML config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Image index to open first
    #[arg(short, long, value_name = "N")]
    start: Option<u32>,

    /// Directory that receives one PNG per open window
    #[arg(short, long, value_name = "DIR", default_value = "windows")]
    out: PathBuf,

    /// Read keys from a file instead of stdin
    #[arg(long, value_name = "FILE")]
    script: Option<PathBuf>,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter =
        EnvFilter::from_default_env().add_directive(format!("meteorite_viewer={level}").parse()?);
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let mut cfg = match &cli.config {
        Some(path) => Config::from_yaml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(start) = cli.start {
        cfg.start_index = start;
    }
    let cfg = cfg.validated().context("validating configuration")?;

    let display = SnapshotDisplay::new(&cli.out)
        .with_context(|| format!("preparing window directory {}", cli.out.display()))?;
    let controller = ToggleController::new(
        cfg.viewer_settings(),
        Registries::default(),
        FsCodec,
        display,
        cfg.start_index,
    )
    .context("opening the first image")?;
    info!(out = %cli.out.display(), "viewer ready");

    let reader: Box<dyn BufRead> = match &cli.script {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("opening script {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };
    let mut input = LineInput::new(reader);
    meteorite_viewer::run(controller, &mut input, &mut io::stdout())?;
    Ok(())
}
