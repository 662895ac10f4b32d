/// Solar-system bodies whose positions come from a remote ephemeris service
use std::sync::{
    Arc,
    mpsc::{self, Receiver, Sender, TryRecvError},
};

use chrono::NaiveDate;
use glam::Vec3;

use super::{
    CatalogRepository, CelestialBodyRecord, DerivedPosition, ObserverState,
    ephemeris::{EphemerisError, EphemerisSource},
};
use crate::{math::MoonPhase, scene::Renderable};

pub const MOON_NAME: &str = "Moon";

/// Static description of one body: ephemeris identifier and how it is drawn
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanetDefinition {
    pub name: &'static str,
    pub ephemeris_id: &'static str,
    pub scale: f32,
    /// Degrees per second, negative for retrograde spin
    pub rotation_speed: f32,
    pub texture: &'static str,
}

pub const PLANETS: [PlanetDefinition; 9] = [
    PlanetDefinition {
        name: "Sun",
        ephemeris_id: "10",
        scale: 0.05,
        rotation_speed: 2.0,
        texture: "planets/sun.jpg",
    },
    PlanetDefinition {
        name: MOON_NAME,
        ephemeris_id: "301",
        scale: 0.05,
        rotation_speed: 0.5,
        texture: "moon/full.png",
    },
    PlanetDefinition {
        name: "Mercury",
        ephemeris_id: "199",
        scale: 0.01,
        rotation_speed: 1.0,
        texture: "planets/mercury.jpg",
    },
    PlanetDefinition {
        name: "Venus",
        ephemeris_id: "299",
        scale: 0.015,
        rotation_speed: -0.5,
        texture: "planets/venus.jpg",
    },
    PlanetDefinition {
        name: "Mars",
        ephemeris_id: "499",
        scale: 0.012,
        rotation_speed: 6.0,
        texture: "planets/mars.jpg",
    },
    PlanetDefinition {
        name: "Jupiter",
        ephemeris_id: "599",
        scale: 0.03,
        rotation_speed: 15.0,
        texture: "planets/jupiter.jpg",
    },
    PlanetDefinition {
        name: "Saturn",
        ephemeris_id: "699",
        scale: 0.028,
        rotation_speed: 14.0,
        texture: "planets/saturn.jpg",
    },
    PlanetDefinition {
        name: "Uranus",
        ephemeris_id: "799",
        scale: 0.02,
        rotation_speed: -8.0,
        texture: "planets/uranus.jpg",
    },
    PlanetDefinition {
        name: "Neptune",
        ephemeris_id: "899",
        scale: 0.02,
        rotation_speed: 9.0,
        texture: "planets/neptune.jpg",
    },
];

/// Result of one per-body worker
struct PlanetUpdate {
    generation: u64,
    index: usize,
    result: Result<(f64, f64, DerivedPosition), EphemerisError>,
}

pub struct PlanetCatalog {
    definitions: Vec<PlanetDefinition>,
    records: Vec<CelestialBodyRecord>,
    radius: f64,
    sender: Sender<PlanetUpdate>,
    receiver: Receiver<PlanetUpdate>,
    pending: usize,
    /// Bumped by every refresh; results from older refreshes are dropped
    generation: u64,
}

impl PlanetCatalog {
    pub fn new(radius: f64) -> Self {
        Self::with_definitions(PLANETS.to_vec(), radius)
    }

    pub fn with_definitions(definitions: Vec<PlanetDefinition>, radius: f64) -> Self {
        let records = definitions
            .iter()
            .map(|def| CelestialBodyRecord {
                name: Some(def.name.to_string()),
                ..Default::default()
            })
            .collect();
        let (sender, receiver) = mpsc::channel();

        Self {
            definitions,
            records,
            radius,
            sender,
            receiver,
            pending: 0,
            generation: 0,
        }
    }

    pub fn definitions(&self) -> &[PlanetDefinition] {
        &self.definitions
    }

    /// Number of bodies whose fetch has not reported back yet
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Start one background fetch per body. Each body succeeds or fails on
    /// its own; results are applied by `collect_updates`.
    pub fn refresh(&mut self, observer: &ObserverState, source: Arc<dyn EphemerisSource>) {
        let lst = observer.local_sidereal_time();
        self.generation += 1;
        let generation = self.generation;

        for (index, def) in self.definitions.iter().enumerate() {
            let sender = self.sender.clone();
            let source = Arc::clone(&source);
            let observer = *observer;
            let radius = self.radius;
            let id = def.ephemeris_id;

            let spawned = std::thread::Builder::new()
                .name(format!("ephemeris-{}", def.name))
                .spawn(move || {
                    let result = source.fetch(id, &observer).map(|coords| {
                        let position = DerivedPosition::compute(
                            coords.ra_deg,
                            coords.dec_deg,
                            observer.latitude_deg,
                            lst,
                            radius,
                        );
                        (coords.ra_deg, coords.dec_deg, position)
                    });
                    // Receiver gone means the catalog was dropped
                    let _ = sender.send(PlanetUpdate {
                        generation,
                        index,
                        result,
                    });
                });

            match spawned {
                Ok(_) => self.pending += 1,
                Err(e) => log::warn!("Could not start ephemeris fetch for {}: {}", def.name, e),
            }
        }

        log::info!("Refreshing {} planet positions", self.pending);
    }

    /// Apply every finished fetch without blocking. Returns how many bodies moved.
    pub fn collect_updates(&mut self) -> usize {
        let mut applied = 0;

        loop {
            let update = match self.receiver.try_recv() {
                Ok(update) => update,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            };
            self.pending = self.pending.saturating_sub(1);

            let Some(record) = self.records.get_mut(update.index) else {
                continue;
            };
            if update.generation < self.generation {
                log::debug!(
                    "Dropping late ephemeris result for {} from refresh {}",
                    record.display_name(),
                    update.generation
                );
                continue;
            }

            match update.result {
                Ok((ra_deg, dec_deg, position)) => {
                    record.right_ascension_deg = ra_deg;
                    record.declination_deg = dec_deg;
                    record.position = Some(position);
                    applied += 1;
                    log::debug!(
                        "{} at az {:.2} alt {:.2}",
                        record.display_name(),
                        position.azimuth_deg,
                        position.altitude_deg
                    );
                }
                Err(e) => {
                    log::warn!(
                        "Ephemeris update for {} failed, keeping last position: {}",
                        record.display_name(),
                        e
                    );
                }
            }
        }

        applied
    }

    /// Planet and Moon renderables for bodies with a known position. The Moon
    /// texture follows the lunar phase of `date`.
    pub fn to_renderables(&self, date: NaiveDate) -> Vec<Renderable> {
        self.definitions
            .iter()
            .zip(&self.records)
            .filter_map(|(def, record)| {
                let position = Vec3::from_array(record.position?.cartesian);
                Some(if def.name == MOON_NAME {
                    Renderable::moon(
                        def.name,
                        position,
                        def.scale,
                        def.rotation_speed,
                        MoonPhase::for_date(date),
                    )
                } else {
                    Renderable::planet(def.name, position, def.scale, def.rotation_speed, def.texture)
                })
            })
            .collect()
    }
}

impl CatalogRepository for PlanetCatalog {
    fn records(&self) -> &[CelestialBodyRecord] {
        &self.records
    }

    fn records_mut(&mut self) -> &mut [CelestialBodyRecord] {
        &mut self.records
    }

    fn render_radius(&self) -> f64 {
        self.radius
    }

    /// Only bodies that have been fetched at least once are moved
    fn update_positions(&mut self, observer: &ObserverState) {
        let lst = observer.local_sidereal_time();
        let radius = self.radius;
        for record in self.records.iter_mut().filter(|r| r.position.is_some()) {
            record.position = Some(DerivedPosition::compute(
                record.right_ascension_deg,
                record.declination_deg,
                observer.latitude_deg,
                lst,
                radius,
            ));
        }
    }
}
