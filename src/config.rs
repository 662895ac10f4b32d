/// Runtime configuration, stored as RON
use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{SkydomeError, SkydomeResult};

// Smallest tessellations that still close a surface
pub const MIN_SPHERE_BANDS: u32 = 2;
pub const MIN_SPHERE_STEPS: u32 = 3;
pub const MIN_DISC_SEGMENTS: u32 = 3;

/// Fixed observer location used when no external location stream is attached
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObserverLocation {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkyConfig {
    pub star_catalog: String,
    pub asset_dir: String,
    pub skybox_texture: String,
    pub star_texture: String,

    // Render-space radii
    pub star_radius: f64,
    pub planet_radius: f64,
    pub skybox_radius: f32,

    pub star_magnitude_limit: f64,
    pub star_base_scale: f32,

    // Tessellation
    pub sphere_bands: u32,
    pub sphere_steps: u32,
    pub disc_segments: u32,

    pub ephemeris_url: String,
    pub ephemeris_timeout_secs: u64,
    pub planet_refresh_secs: u64,
    pub star_refresh_secs: u64,

    pub field_of_view_deg: f32,
    pub observer: Option<ObserverLocation>,
}

impl Default for SkyConfig {
    fn default() -> Self {
        Self {
            star_catalog: "assets/catalog/hygdata_v3.csv".to_string(),
            asset_dir: "assets/textures".to_string(),
            skybox_texture: "milky_way.jpg".to_string(),
            star_texture: "star_glow.png".to_string(),
            star_radius: 1.0,
            planet_radius: 0.9,
            skybox_radius: 50.0,
            star_magnitude_limit: 6.0,
            star_base_scale: 0.004,
            sphere_bands: 32,
            sphere_steps: 64,
            disc_segments: 16,
            ephemeris_url: "https://ssd.jpl.nasa.gov/api/horizons.api".to_string(),
            ephemeris_timeout_secs: 15,
            planet_refresh_secs: 300,
            star_refresh_secs: 60,
            field_of_view_deg: 60.0,
            observer: Some(ObserverLocation {
                latitude_deg: 46.5185,
                longitude_deg: 6.5619,
            }),
        }
    }
}

impl SkyConfig {
    /// Parse a RON document. Missing fields take their defaults.
    pub fn from_ron(source: &str) -> SkydomeResult<Self> {
        let config: Self = ron::from_str(source)
            .map_err(|e| SkydomeError::Config(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject tessellation counts the mesh generators cannot build from
    pub fn validate(&self) -> SkydomeResult<()> {
        let checks = [
            ("sphere_bands", self.sphere_bands, MIN_SPHERE_BANDS),
            ("sphere_steps", self.sphere_steps, MIN_SPHERE_STEPS),
            ("disc_segments", self.disc_segments, MIN_DISC_SEGMENTS),
        ];
        for (name, value, min) in checks {
            if value < min {
                return Err(SkydomeError::Config(format!(
                    "{} must be at least {}, got {}",
                    name, min, value
                )));
            }
        }
        Ok(())
    }

    pub fn to_ron(&self) -> SkydomeResult<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| SkydomeError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Load a config file, falling back to defaults when it does not exist.
    /// A file that exists but fails to parse is an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> SkydomeResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!(
                "No config at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let source = fs::read_to_string(path)?;
        let config = Self::from_ron(&source)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ron_round_trip() {
        let mut config = SkyConfig::default();
        config.star_magnitude_limit = 4.5;
        config.observer = None;

        let text = config.to_ron().unwrap();
        let parsed = SkyConfig::from_ron(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let parsed = SkyConfig::from_ron("(star_radius: 2.5, disc_segments: 8)").unwrap();
        assert_eq!(parsed.star_radius, 2.5);
        assert_eq!(parsed.disc_segments, 8);
        assert_eq!(parsed.sphere_bands, SkyConfig::default().sphere_bands);
        assert_eq!(parsed.ephemeris_url, SkyConfig::default().ephemeris_url);
    }

    #[test]
    fn test_malformed_document_is_error() {
        assert!(matches!(
            SkyConfig::from_ron("(star_radius: \"wide\")"),
            Err(SkydomeError::Config(_))
        ));
    }

    #[test]
    fn test_default_is_valid() {
        assert!(SkyConfig::default().validate().is_ok());
    }

    #[test]
    fn test_degenerate_tessellation_rejected() {
        for source in [
            "(sphere_bands: 0)",
            "(sphere_bands: 1)",
            "(sphere_steps: 2)",
            "(disc_segments: 0)",
        ] {
            assert!(
                matches!(SkyConfig::from_ron(source), Err(SkydomeError::Config(_))),
                "{source} should be rejected"
            );
        }

        let minimal = SkyConfig::from_ron("(sphere_bands: 2, sphere_steps: 3, disc_segments: 3)");
        assert!(minimal.is_ok());
    }

    #[test]
    fn test_invalid_file_is_error() {
        let path = std::env::temp_dir().join(format!("skydome_bad_config_{}.ron", std::process::id()));
        fs::write(&path, "(disc_segments: 0)").unwrap();
        let result = SkyConfig::load_or_default(&path);
        fs::remove_file(&path).ok();
        assert!(matches!(result, Err(SkydomeError::Config(_))));
    }

    #[test]
    fn test_missing_file_falls_back() {
        let path = std::env::temp_dir().join("skydome_config_that_does_not_exist.ron");
        let config = SkyConfig::load_or_default(&path).unwrap();
        assert_eq!(config, SkyConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("skydome_config_{}.ron", std::process::id()));
        fs::write(&path, "(planet_refresh_secs: 30)").unwrap();
        let config = SkyConfig::load_or_default(&path).unwrap();
        fs::remove_file(&path).ok();
        assert_eq!(config.planet_refresh_secs, 30);
    }
}
