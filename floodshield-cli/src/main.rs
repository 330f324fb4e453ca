//! FloodShield CLI - rain-adjusted flood risk scoring

#![deny(warnings)]

// Global invariants enforced:
// - Results go to stdout, diagnostics go to stderr
// - Identical input yields byte-for-byte identical output

use anyhow::Context;
use clap::{Parser, Subcommand};
use floodshield_core::config::{self, ResolvedConfig};
use floodshield_core::forecast::group_by_day;
use floodshield_core::rain::RainSignal;
use floodshield_core::report::{self, ForecastReport};
use floodshield_core::session::MapSession;
use floodshield_core::{load_forecast, open_session, HeatmapMode, LatLng};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "floodshield")]
#[command(about = "Rain-adjusted flood risk scoring over terrain rasters")]
#[command(version = env!("FLOODSHIELD_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a single map click
    Probe {
        /// Susceptibility raster (.tif, .tiff or .json)
        #[arg(long)]
        raster: PathBuf,

        /// Latitude of the click
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        /// Longitude of the click
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,

        /// Heatmap mode (overrides config file)
        #[arg(long)]
        mode: Option<ModeArg>,

        /// Open-Meteo forecast document for the live rain signal
        #[arg(long)]
        rain: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Paint the flood overlay for a raster to a PNG
    Render {
        /// Susceptibility raster (.tif, .tiff or .json)
        #[arg(long)]
        raster: PathBuf,

        /// Output PNG path
        #[arg(long)]
        output: PathBuf,

        /// Heatmap mode (overrides config file)
        #[arg(long)]
        mode: Option<ModeArg>,

        /// Open-Meteo forecast document for the live rain signal
        #[arg(long)]
        rain: Option<PathBuf>,

        /// Overlay opacity in [0, 1] (overrides config file)
        #[arg(long)]
        opacity: Option<f64>,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Show today's rain signal from a forecast document
    Rain {
        /// Open-Meteo forecast document
        #[arg(long)]
        forecast: PathBuf,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Daily rain calendar, flood outlook and alerts
    Forecast {
        /// Open-Meteo forecast document
        #[arg(long)]
        forecast: PathBuf,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Print the risk level legend
    Legend,
    /// Print the Open-Meteo query URL for the configured rain point
    Url {
        /// Forecast days to request (overrides config file)
        #[arg(long)]
        days: Option<u32>,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Validate or show configuration
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file
    Validate {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the resolved configuration (merged defaults + config file)
    Show {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum ModeArg {
    Realtime,
    Susceptibility,
}

impl From<ModeArg> for HeatmapMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Realtime => HeatmapMode::Realtime,
            ModeArg::Susceptibility => HeatmapMode::Susceptibility,
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Probe {
            raster,
            lat,
            lng,
            mode,
            rain,
            format,
            config: config_path,
        } => {
            let resolved = load_config(config_path.as_deref())?;
            let mode = mode.map(HeatmapMode::from).unwrap_or(resolved.default_mode);
            let session = open_session(&raster, rain.as_deref(), mode, &resolved);
            if session.raster().is_none() {
                anyhow::bail!("failed to load raster: {}", raster.display());
            }
            log_session(&session);

            let info = session.resolve_click(LatLng::new(lat, lng));
            match format {
                OutputFormat::Text => print!("{}", report::render_click_text(info.as_ref())),
                OutputFormat::Json => println!("{}", report::render_click_json(info.as_ref())),
            }
        }
        Commands::Render {
            raster,
            output,
            mode,
            rain,
            opacity,
            config: config_path,
        } => {
            let resolved = load_config(config_path.as_deref())?;
            let opacity = opacity.unwrap_or(resolved.overlay_opacity);
            if !(0.0..=1.0).contains(&opacity) {
                anyhow::bail!("--opacity must be within [0, 1] (got {})", opacity);
            }
            let mode = mode.map(HeatmapMode::from).unwrap_or(resolved.default_mode);

            let mut session = open_session(&raster, rain.as_deref(), mode, &resolved);
            log_session(&session);
            let overlay = session
                .overlay()
                .with_context(|| format!("failed to load raster: {}", raster.display()))?;
            overlay.save_png(&output, opacity)?;

            println!(
                "{}: {} of {} cells painted ({}x{}, rain factor {:.0}%) -> {}",
                mode.title(),
                overlay.painted_count(),
                overlay.width * overlay.height,
                overlay.width,
                overlay.height,
                session.rain().factor_percent(),
                output.display()
            );
        }
        Commands::Rain {
            forecast,
            format,
            config: config_path,
        } => {
            let resolved = load_config(config_path.as_deref())?;
            let series = load_forecast(&forecast)?;
            warn_if_empty(&forecast, series.is_empty());
            let signal =
                RainSignal::from_hourly_with_policy(&series.first_day(), &resolved.calibration.policy);
            match format {
                OutputFormat::Text => print!("{}", report::render_rain_text(&signal)),
                OutputFormat::Json => println!("{}", report::render_rain_json(&signal)),
            }
        }
        Commands::Forecast { forecast, format } => {
            let series = load_forecast(&forecast)?;
            warn_if_empty(&forecast, series.is_empty());
            let forecast_report = ForecastReport::new(&group_by_day(&series));
            match format {
                OutputFormat::Text => print!("{}", report::render_forecast_text(&forecast_report)),
                OutputFormat::Json => {
                    println!("{}", report::render_forecast_json(&forecast_report))
                }
            }
        }
        Commands::Legend => {
            print!("{}", report::render_legend_text());
        }
        Commands::Url {
            days,
            config: config_path,
        } => {
            let resolved = load_config(config_path.as_deref())?;
            let mut request = resolved.forecast;
            if let Some(days) = days {
                if !(1..=16).contains(&days) {
                    anyhow::bail!("--days must be within 1..=16 (got {})", days);
                }
                request.forecast_days = days;
            }
            println!("{}", request.url());
        }
        Commands::Config { action } => match action {
            ConfigAction::Validate { path } => {
                let project_root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&project_root, path.as_deref());

                match resolved {
                    Ok(config) => {
                        if let Some(ref p) = config.config_path {
                            println!("Config valid: {}", p.display());
                        } else {
                            println!("No config file found. Using defaults.");
                        }
                    }
                    Err(e) => {
                        eprintln!("Config validation failed: {:#}", e);
                        std::process::exit(1);
                    }
                }
            }
            ConfigAction::Show { path } => {
                let project_root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&project_root, path.as_deref())
                    .context("failed to load configuration")?;
                print_config(&resolved);
            }
        },
    }

    Ok(())
}

/// Install the stderr subscriber; `FLOODSHIELD_LOG` takes an env-filter directive
fn init_logging() {
    let filter =
        EnvFilter::try_from_env("FLOODSHIELD_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn log_session(session: &MapSession) {
    tracing::info!(
        mode = session.mode().as_str(),
        rain_factor = session.rain().rain_factor,
        ready = session.is_ready(),
        "session opened"
    );
}

fn warn_if_empty(forecast: &Path, empty: bool) {
    if empty {
        tracing::warn!(
            path = %forecast.display(),
            "forecast document has no hourly readings"
        );
    }
}

fn load_config(config_path: Option<&Path>) -> anyhow::Result<ResolvedConfig> {
    let project_root = std::env::current_dir()?;
    let resolved = config::load_and_resolve(&project_root, config_path)
        .context("failed to load configuration")?;

    if let Some(config_path) = &resolved.config_path {
        eprintln!("Using config: {}", config_path.display());
    }
    Ok(resolved)
}

fn print_config(resolved: &ResolvedConfig) {
    let policy = &resolved.calibration.policy;
    let thresholds = &resolved.calibration.thresholds;

    println!("Configuration:");
    if let Some(ref p) = resolved.config_path {
        println!("  Source: {}", p.display());
    } else {
        println!("  Source: defaults (no config file found)");
    }
    println!();
    println!("Scoring:");
    println!("  rain_floor: {}", policy.rain_floor);
    println!("  rain_cap_mm: {}", policy.rain_cap_mm);
    println!();
    println!("Thresholds:");
    println!("  low: {}", thresholds.low);
    println!("  moderate: {}", thresholds.moderate);
    println!("  high: {}", thresholds.high);
    println!();
    println!("Forecast:");
    println!("  latitude: {}", resolved.forecast.latitude);
    println!("  longitude: {}", resolved.forecast.longitude);
    println!("  forecast_days: {}", resolved.forecast.forecast_days);
    println!();
    println!("Overlay:");
    println!("  opacity: {}", resolved.overlay_opacity);
    println!("  default_mode: {}", resolved.default_mode.as_str());
}
