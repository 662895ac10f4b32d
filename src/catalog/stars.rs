/// Star catalog backed by an HYG-layout CSV file
use std::{fs::File, io::Read, path::Path};

use csv::{ReaderBuilder, StringRecord};

use super::{CatalogRepository, CelestialBodyRecord};
use crate::{SkydomeError, SkydomeResult, scene::Renderable};
use glam::Vec3;

// HYG column offsets
const COL_PROPER_NAME: usize = 6;
const COL_RA_HOURS: usize = 7;
const COL_DEC: usize = 8;
const COL_DISTANCE: usize = 9;
const COL_MAGNITUDE: usize = 13;
const COL_SPECTRAL: usize = 15;
const COL_X: usize = 17;
const COL_Y: usize = 18;
const COL_Z: usize = 19;

/// Rows shorter than this lack the spectral class and are dropped
pub const MIN_COLUMNS: usize = COL_SPECTRAL + 1;

const DEGREES_PER_HOUR: f64 = 15.0;

#[derive(Debug, Clone, Default)]
pub struct StarCatalog {
    records: Vec<CelestialBodyRecord>,
    radius: f64,
}

impl StarCatalog {
    pub fn new(records: Vec<CelestialBodyRecord>, radius: f64) -> Self {
        Self { records, radius }
    }

    /// Parse a catalog from any reader. The first row is a header.
    pub fn load<R: Read>(source: R, radius: f64) -> SkydomeResult<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(source);

        let mut records = Vec::new();
        let mut skipped = 0usize;

        for (row, result) in reader.records().enumerate() {
            let raw = match result {
                Ok(raw) => raw,
                Err(e) => {
                    log::debug!("Skipping catalog row {}: {}", row + 1, e);
                    skipped += 1;
                    continue;
                }
            };

            if is_observer_star(&raw) {
                log::debug!("Skipping catalog row {}: the Sun is drawn with the planets", row + 1);
                skipped += 1;
                continue;
            }

            match parse_row(&raw) {
                Some(record) => records.push(record),
                None => {
                    log::debug!(
                        "Skipping catalog row {}: {} columns, need {}",
                        row + 1,
                        raw.len(),
                        MIN_COLUMNS
                    );
                    skipped += 1;
                }
            }
        }

        log::info!(
            "Loaded {} stars ({} rows skipped)",
            records.len(),
            skipped
        );

        Ok(Self::new(records, radius))
    }

    pub fn load_path(path: impl AsRef<Path>, radius: f64) -> SkydomeResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            SkydomeError::Catalog(format!("Cannot open star catalog {}: {}", path.display(), e))
        })?;
        Self::load(file, radius)
    }

    /// Keep only stars at or brighter than the magnitude limit
    pub fn brighter_than(&self, limit: f64) -> Self {
        let records = self
            .records
            .iter()
            .filter(|r| r.apparent_magnitude <= limit)
            .cloned()
            .collect();
        Self::new(records, self.radius)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Billboard renderables for every star with a derived position
    pub fn to_renderables(&self, base_scale: f32, texture: &str) -> Vec<Renderable> {
        self.records
            .iter()
            .filter_map(|record| {
                let position = record.position?;
                Some(Renderable::star(
                    record.display_name(),
                    Vec3::from_array(position.cartesian),
                    record.apparent_magnitude as f32,
                    record.spectral_class.as_deref(),
                    base_scale,
                    texture,
                ))
            })
            .collect()
    }
}

impl CatalogRepository for StarCatalog {
    fn records(&self) -> &[CelestialBodyRecord] {
        &self.records
    }

    fn records_mut(&mut self) -> &mut [CelestialBodyRecord] {
        &mut self.records
    }

    fn render_radius(&self) -> f64 {
        self.radius
    }
}

fn parse_row(raw: &StringRecord) -> Option<CelestialBodyRecord> {
    if raw.len() < MIN_COLUMNS {
        return None;
    }

    let catalog_cartesian = match (field_f64(raw, COL_X), field_f64(raw, COL_Y), field_f64(raw, COL_Z)) {
        (Some(x), Some(y), Some(z)) => Some([x, y, z]),
        _ => None,
    };

    Some(CelestialBodyRecord {
        name: field_str(raw, COL_PROPER_NAME),
        right_ascension_deg: field_f64(raw, COL_RA_HOURS).unwrap_or(0.0) * DEGREES_PER_HOUR,
        declination_deg: field_f64(raw, COL_DEC).unwrap_or(0.0),
        distance: field_f64(raw, COL_DISTANCE).unwrap_or(0.0),
        apparent_magnitude: field_f64(raw, COL_MAGNITUDE).unwrap_or(0.0),
        spectral_class: field_str(raw, COL_SPECTRAL),
        catalog_cartesian,
        position: None,
    })
}

/// HYG lists the Sun first, at distance zero
fn is_observer_star(raw: &StringRecord) -> bool {
    field_f64(raw, COL_DISTANCE).is_some_and(|distance| distance <= 0.0)
}

fn field_str(raw: &StringRecord, index: usize) -> Option<String> {
    raw.get(index)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn field_f64(raw: &StringRecord, index: usize) -> Option<f64> {
    raw.get(index)?.trim().parse().ok()
}
