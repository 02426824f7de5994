use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use foundation::math::{CoordinateOrder, LatLng, Vec2};
use layers::{LayerKind, LayerOptions};
use tools::{Scenario, View, parse_lng_lat};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless GPU overlay layer runs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a layer, paint one frame and print buffer and draw statistics
    Stats {
        #[command(flatten)]
        layer: LayerArgs,
    },

    /// Print the features under a position
    Pick {
        #[command(flatten)]
        layer: LayerArgs,

        /// Position to pick at: lng,lat
        #[arg(long, value_parser = parse_lng_lat, allow_hyphen_values = true)]
        at: LatLng,

        /// Use hover tolerances instead of click tolerances
        #[arg(long)]
        hover: bool,
    },
}

#[derive(Args, Debug)]
struct LayerArgs {
    /// GeoJSON file, or a JSON array of coordinate pairs
    geojson: PathBuf,

    /// points, lines or shapes
    #[arg(long)]
    kind: LayerKind,

    /// JSON layer options (size, weight, color, border, ...)
    #[arg(long)]
    options: Option<PathBuf>,

    /// Point size, overriding the options file
    #[arg(long)]
    size: Option<f32>,

    #[arg(long, default_value_t = 2.0)]
    zoom: f64,

    /// Map center: lng,lat
    #[arg(long, value_parser = parse_lng_lat, allow_hyphen_values = true)]
    center: Option<LatLng>,

    /// Coordinate pairs in the data are [lat, lng]
    #[arg(long)]
    lat_first: bool,

    #[arg(long, default_value_t = 1024.0)]
    width: f64,

    #[arg(long, default_value_t = 768.0)]
    height: f64,
}

impl LayerArgs {
    fn scenario(&self) -> Result<Scenario, Box<dyn std::error::Error>> {
        let data = formats::load_geojson(&self.geojson)?;
        let mut options = match &self.options {
            Some(path) => formats::load_options(path)?,
            None => LayerOptions::default(),
        };
        if self.size.is_some() {
            options.size = self.size;
        }
        Ok(Scenario {
            kind: self.kind,
            data,
            options,
            view: View {
                size: Vec2::new(self.width, self.height),
                center: self.center.unwrap_or(LatLng::new(0.0, 0.0)),
                zoom: self.zoom,
            },
            order: if self.lat_first {
                CoordinateOrder::LatFirst
            } else {
                CoordinateOrder::LngFirst
            },
        })
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let out = match cli.command {
        Command::Stats { layer } => {
            let scenario = layer.scenario()?;
            info!(kind = scenario.kind.name(), path = %layer.geojson.display(), "stats");
            tools::stats(&scenario)?
        }
        Command::Pick { layer, at, hover } => {
            let scenario = layer.scenario()?;
            info!(kind = scenario.kind.name(), lng = at.lng, lat = at.lat, hover, "pick");
            tools::pick(&scenario, at, hover)?
        }
    };
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
