/// Catalog repositories for stars and solar-system bodies
/// Records hold catalog coordinates; derived horizon/render positions are recomputed per observer
pub mod ephemeris;
pub mod planets;
pub mod stars;

pub use ephemeris::{EphemerisError, EphemerisSource, HorizonsClient};
pub use planets::{MOON_NAME, PLANETS, PlanetCatalog, PlanetDefinition};
pub use stars::StarCatalog;

use chrono::{DateTime, Utc};

use crate::math::{
    compute_sidereal_time, equatorial_to_horizon, horizon_to_cartesian, to_render_vec,
};

/// Observer location and instant, immutable snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObserverState {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub timestamp: DateTime<Utc>,
}

impl ObserverState {
    pub fn new(latitude_deg: f64, longitude_deg: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude_deg,
            longitude_deg,
            timestamp,
        }
    }

    pub fn now(latitude_deg: f64, longitude_deg: f64) -> Self {
        Self::new(latitude_deg, longitude_deg, Utc::now())
    }

    pub fn local_sidereal_time(&self) -> f64 {
        compute_sidereal_time(self.longitude_deg, self.timestamp)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedPosition {
    pub azimuth_deg: f64,
    pub altitude_deg: f64,
    pub cartesian: [f32; 3],
}

impl DerivedPosition {
    /// Horizon and render-space position of an equatorial direction
    pub fn compute(ra_deg: f64, dec_deg: f64, latitude_deg: f64, lst_deg: f64, radius: f64) -> Self {
        let horizon = equatorial_to_horizon(ra_deg, dec_deg, latitude_deg, lst_deg);
        let cartesian = horizon_to_cartesian(horizon.azimuth_deg, horizon.altitude_deg, radius);
        Self {
            azimuth_deg: horizon.azimuth_deg,
            altitude_deg: horizon.altitude_deg,
            cartesian: to_render_vec(cartesian).to_array(),
        }
    }

    pub fn is_above_horizon(&self) -> bool {
        self.altitude_deg >= 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CelestialBodyRecord {
    pub name: Option<String>,
    pub right_ascension_deg: f64,
    pub declination_deg: f64,
    pub distance: f64,
    pub apparent_magnitude: f64,
    pub spectral_class: Option<String>,
    pub catalog_cartesian: Option<[f64; 3]>,
    pub position: Option<DerivedPosition>,
}

impl CelestialBodyRecord {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("unnamed")
    }
}

/// Holds catalog records and recomputes their derived positions
pub trait CatalogRepository {
    fn records(&self) -> &[CelestialBodyRecord];

    fn records_mut(&mut self) -> &mut [CelestialBodyRecord];

    /// Render-space radius positions are projected onto
    fn render_radius(&self) -> f64;

    /// Recompute every record's derived position for the observer.
    /// Sidereal time is evaluated once per call so the batch is consistent.
    fn update_positions(&mut self, observer: &ObserverState) {
        let lst = observer.local_sidereal_time();
        let radius = self.render_radius();
        for record in self.records_mut() {
            record.position = Some(DerivedPosition::compute(
                record.right_ascension_deg,
                record.declination_deg,
                observer.latitude_deg,
                lst,
                radius,
            ));
        }
        log::debug!(
            "Updated {} positions for observer ({:.4}, {:.4})",
            self.records().len(),
            observer.latitude_deg,
            observer.longitude_deg
        );
    }
}
