use std::path::PathBuf;

use clap::Parser;
use vista::{ViewerConfig, VistaApp};

/// Vista - interactive OBJ/MTL model viewer
#[derive(Parser, Debug)]
#[command(name = "vista")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Model to load from `<assets>/model/<MODEL>/<MODEL>.{mtl,obj}`
    model: Option<String>,

    /// Lighting and sky preset
    #[arg(short, long, value_enum, default_value = "sky")]
    preset: Preset,

    /// Directory model paths are resolved against
    #[arg(short, long, value_name = "DIR")]
    assets: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum Preset {
    /// Ambient light plus a light riding on the camera
    Studio,
    /// Hemisphere light plus a shadow-casting sun
    Outdoor,
    /// Outdoor lighting under a sky dome
    Sky,
}

impl Cli {
    fn into_config(self) -> ViewerConfig {
        let mut config = match self.preset {
            Preset::Studio => ViewerConfig::studio(),
            Preset::Outdoor => ViewerConfig::outdoor(),
            Preset::Sky => ViewerConfig::outdoor_sky(),
        };
        if let Some(name) = self.model {
            config = config.with_model(&name);
        }
        if let Some(dir) = self.assets {
            config = config.with_asset_root(dir);
        }
        config
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Cli::parse().into_config();
    VistaApp::new(config).run()
}
