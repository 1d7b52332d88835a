//! # axiom-bg
//!
//! Sets a solid color background on every output of a layer-shell Wayland
//! compositor. Runs until SIGINT or SIGQUIT.

use std::process::ExitCode;

use clap::Parser;
use log::{debug, error, info, warn};

use axiom_bg::config::{self, AxiomBgConfig};
use axiom_bg::wayland;

#[derive(Parser)]
#[command(name = "axiom-bg")]
#[command(about = "Paints a solid color background on every Wayland output")]
#[command(version)]
struct Cli {
    /// Background color as #RRGGBB
    color: Option<String>,

    /// Path to configuration file
    #[arg(short, long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Configuration is read before logging so `general.debug` can raise the level
    let loaded = AxiomBgConfig::load_or_default(&cli.config);
    let debug_logging = cli.debug
        || loaded
            .as_ref()
            .map(|config| config.general.debug)
            .unwrap_or(false);

    // Initialize logging
    if debug_logging {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    match option_env!("GIT_COMMIT") {
        Some(commit) => info!("axiom-bg v{} ({})", axiom_bg::VERSION, commit),
        None => info!("axiom-bg v{}", axiom_bg::VERSION),
    }
    debug!(
        "built {} for {}",
        env!("BUILD_DATE"),
        env!("TARGET_TRIPLE")
    );

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            error!("❌ Failed to load configuration: {:#}", e);
            info!("📝 Using default configuration");
            AxiomBgConfig::default()
        }
    };

    let settings = config.settings(cli.color.as_deref());
    info!("🎨 Background color {}", settings.color);

    match wayland::run(settings) {
        Ok(shutdown) => {
            debug!("terminated by signal {}", shutdown.signal);
            ExitCode::SUCCESS
        }
        Err(e) if e.is_disconnect() => {
            warn!("{}", e);
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("❌ {:#}", anyhow::Error::from(e));
            ExitCode::FAILURE
        }
    }
}
