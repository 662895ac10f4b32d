use anyhow::{Context, Result};
use skydome::{SkyApp, SkyConfig, config::ObserverLocation};
use std::env;

const DEFAULT_CONFIG_PATH: &str = "skydome.ron";

fn main() -> Result<()> {
    env_logger::init();

    log::info!("Starting Skydome...");

    // skydome [latitude longitude] [config.ron]
    let args: Vec<String> = env::args().collect();

    let config_path = args.get(3).map(String::as_str).unwrap_or(DEFAULT_CONFIG_PATH);
    let mut config = SkyConfig::load_or_default(config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    if let (Some(latitude), Some(longitude)) = (args.get(1), args.get(2)) {
        let latitude_deg: f64 = latitude
            .parse()
            .with_context(|| format!("Invalid latitude: {}", latitude))?;
        let longitude_deg: f64 = longitude
            .parse()
            .with_context(|| format!("Invalid longitude: {}", longitude))?;
        config.observer = Some(ObserverLocation {
            latitude_deg,
            longitude_deg,
        });
    }

    match config.observer {
        Some(location) => log::info!(
            "Observer at latitude {:.4}, longitude {:.4}",
            location.latitude_deg,
            location.longitude_deg
        ),
        None => log::info!("No observer location, positions will not be computed"),
    }

    let app = SkyApp::new(config)?;
    app.run()
}
