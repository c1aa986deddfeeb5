/*
 * Orbitsync
 *
 * Every running instance opens one window and registers it in a shared
 * surface store. Each window gets a spinning body with a ring of
 * satellites, and all windows look into the same desktop-sized space, so
 * bodies and satellites line up across window borders.
 *
 * Run several instances side by side:
 *   orbitsync --meta name=left
 *   orbitsync --meta name=right
 */

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use env_logger::Env;
use log::{error, info};

use orbitsync::app::{self, Launch};
use orbitsync::{Metadata, SharedFileRegistry, SimulationParams};

#[derive(Parser)]
#[command(name = "orbitsync")]
#[command(about = "Orbiting particles shared across windows")]
struct Cli {
    /// Simulation parameters as JSON; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Shared surface store
    #[arg(short, long, default_value_os_t = default_registry_path())]
    registry: PathBuf,

    /// Remove the shared surface store and exit
    #[arg(long)]
    clear: bool,

    /// Seconds without a heartbeat before another window's surface is dropped
    #[arg(long, default_value_t = 5.0)]
    stale_after: f32,

    /// Write the effective parameters as JSON to this path and exit
    #[arg(long)]
    write_config: Option<PathBuf>,

    /// Seed for the satellite radius jitter
    #[arg(long)]
    seed: Option<u64>,

    /// Metadata attached to this window's surface, as key=value
    #[arg(long = "meta", value_parser = parse_meta)]
    meta: Vec<(String, String)>,
}

fn default_registry_path() -> PathBuf {
    std::env::temp_dir().join("orbitsync-surfaces.json")
}

fn parse_meta(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got `{}`", raw))
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if cli.clear {
        return match SharedFileRegistry::clear(&cli.registry) {
            Ok(()) => {
                info!("cleared surface store {}", cli.registry.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("could not clear {}: {}", cli.registry.display(), e);
                ExitCode::FAILURE
            }
        };
    }

    let params = match &cli.config {
        Some(path) => match SimulationParams::load(path) {
            Ok(params) => params,
            Err(e) => {
                error!("could not load {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => SimulationParams::default(),
    };

    if let Some(path) = &cli.write_config {
        return match params.save(path) {
            Ok(()) => {
                info!("wrote parameters to {}", path.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("could not write {}: {}", path.display(), e);
                ExitCode::FAILURE
            }
        };
    }

    let stale_after = match Duration::try_from_secs_f32(cli.stale_after) {
        Ok(stale_after) if !stale_after.is_zero() => stale_after,
        _ => {
            error!("--stale-after must be a positive number of seconds, got {}", cli.stale_after);
            return ExitCode::FAILURE;
        }
    };

    let registry = match SharedFileRegistry::open(&cli.registry) {
        Ok(registry) => registry.with_stale_after(stale_after),
        Err(e) => {
            error!("could not open surface store {}: {}", cli.registry.display(), e);
            return ExitCode::FAILURE;
        }
    };

    info!("using surface store {}", registry.path().display());

    let metadata: Metadata = cli.meta.into_iter().collect();

    app::launch(Launch {
        params,
        registry: Box::new(registry),
        metadata,
        seed: cli.seed,
    });
    ExitCode::SUCCESS
}
