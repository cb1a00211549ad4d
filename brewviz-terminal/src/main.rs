//! Brewviz Terminal - Menu and cup preview
//!
//! Controls:
//!   - Tab / 1-9: Browse the menu
//!   - Enter / Esc: Open or close the details drawer
//!   - O: Order the open drink
//!   - Arrow Keys / +-: Orbit and zoom
//!   - Q: Quit

use std::fs;
use std::path::PathBuf;

use brewviz_core::{Catalog, ControlsMode, DeviceProfile, ViewerConfig};
use brewviz_terminal::{TerminalApp, TerminalError};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "brewviz-terminal", version, about = "Preview the drink menu in the terminal")]
struct Args {
    /// Drink to show first (defaults to the featured drink)
    #[arg(long)]
    drink: Option<String>,

    /// Use the reduced star count and twinkle cadence
    #[arg(long)]
    constrained: bool,

    /// Disable orbit controls and use the fixed camera pose
    #[arg(long)]
    static_camera: bool,

    /// Seed for star and vapor placement
    #[arg(long)]
    seed: Option<u64>,

    /// Viewer config as JSON; flags override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Menu catalog as JSON (defaults to the built-in menu)
    #[arg(long, value_name = "FILE")]
    catalog: Option<PathBuf>,
}

impl Args {
    fn viewer_config(&self) -> Result<ViewerConfig, TerminalError> {
        let mut config = match &self.config {
            Some(path) => ViewerConfig::from_json(&fs::read_to_string(path)?)?,
            None => ViewerConfig::default(),
        };
        if self.constrained {
            config.device = DeviceProfile::Constrained;
        }
        if self.static_camera {
            config.controls = ControlsMode::Static;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        Ok(config)
    }

    fn catalog(&self) -> Result<Catalog, TerminalError> {
        Ok(match &self.catalog {
            Some(path) => Catalog::from_json(&fs::read_to_string(path)?)?,
            None => Catalog::embedded()?,
        })
    }
}

fn main() -> Result<(), TerminalError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let config = args.viewer_config()?;
    let catalog = args.catalog()?;
    log::info!("loaded {} drinks", catalog.len());

    let mut app = TerminalApp::new(catalog, config, args.drink.as_deref())?;
    app.run()?;

    println!("Thanks for stopping by!");
    Ok(())
}
