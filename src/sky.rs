/// Sky data: ties the catalogs to the published scene
/// Positions are recomputed as full batches and swapped into the `SkyScene`.
use std::{
    path::{Path, PathBuf},
    sync::{
        Arc,
        mpsc::{self, Receiver, TryRecvError},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use chrono::NaiveDate;

use crate::{
    SkyConfig, SkydomeError, SkydomeResult,
    catalog::{CatalogRepository, EphemerisSource, ObserverState, PlanetCatalog, StarCatalog},
    scene::{Renderable, SkyScene},
};

pub struct SkyData {
    config: SkyConfig,
    stars: Option<StarCatalog>,
    planets: PlanetCatalog,
    ephemeris: Arc<dyn EphemerisSource>,
    scene: SkyScene,
}

impl SkyData {
    pub fn new(config: &SkyConfig, ephemeris: Arc<dyn EphemerisSource>, scene: SkyScene) -> Self {
        Self {
            planets: PlanetCatalog::new(config.planet_radius),
            config: config.clone(),
            stars: None,
            ephemeris,
            scene,
        }
    }

    pub fn scene(&self) -> &SkyScene {
        &self.scene
    }

    pub fn stars(&self) -> Option<&StarCatalog> {
        self.stars.as_ref()
    }

    pub fn planets(&self) -> &PlanetCatalog {
        &self.planets
    }

    /// Read the configured catalog on the calling thread
    pub fn load_stars(&mut self) -> SkydomeResult<usize> {
        let catalog = load_star_catalog(
            Path::new(&self.config.star_catalog),
            self.config.star_radius,
            self.config.star_magnitude_limit,
        )?;
        Ok(self.set_star_catalog(catalog))
    }

    /// Install a catalog loaded elsewhere. Returns the star count.
    pub fn set_star_catalog(&mut self, catalog: StarCatalog) -> usize {
        let count = catalog.len();
        self.stars = Some(catalog);
        count
    }

    pub fn publish_skybox(&self) {
        self.scene.publish_skybox(Renderable::skybox(
            self.config.skybox_radius,
            &self.config.skybox_texture,
        ));
    }

    /// Recompute every star for the observer and publish the new batch.
    /// Bodies with a fetched position are re-projected at the same instant so
    /// they turn with the stars between ephemeris refreshes.
    pub fn update_star_positions(&mut self, observer: Option<&ObserverState>) {
        let Some(observer) = observer else {
            log::debug!("No observer location yet, star positions unchanged");
            return;
        };
        self.reproject_bodies(observer);

        let Some(stars) = self.stars.as_mut() else {
            log::debug!("Star catalog not loaded yet");
            return;
        };

        stars.update_positions(observer);
        log::debug!(
            "{} stars above the horizon",
            stars
                .records()
                .iter()
                .filter(|r| r.position.is_some_and(|p| p.is_above_horizon()))
                .count()
        );
        self.scene.publish_stars(
            stars.to_renderables(self.config.star_base_scale, &self.config.star_texture),
        );
    }

    fn reproject_bodies(&mut self, observer: &ObserverState) {
        self.planets.update_positions(observer);
        if self.planets.records().iter().any(|r| r.position.is_some()) {
            self.scene
                .publish_bodies(self.map_to_renderable_planets(observer.timestamp.date_naive()));
        }
    }

    /// Start a background ephemeris fetch for every body
    pub fn update_planets_data(&mut self, observer: Option<&ObserverState>) {
        let Some(observer) = observer else {
            log::debug!("No observer location yet, planet refresh skipped");
            return;
        };
        self.planets.refresh(observer, Arc::clone(&self.ephemeris));
    }

    /// Apply finished planet fetches and republish the bodies if any moved
    pub fn collect_planet_updates(&mut self, date: NaiveDate) -> usize {
        let applied = self.planets.collect_updates();
        if applied > 0 {
            self.scene.publish_bodies(self.map_to_renderable_planets(date));
        }
        applied
    }

    pub fn map_to_renderable_planets(&self, date: NaiveDate) -> Vec<Renderable> {
        self.planets.to_renderables(date)
    }
}

fn load_star_catalog(path: &Path, radius: f64, magnitude_limit: f64) -> SkydomeResult<StarCatalog> {
    let catalog = StarCatalog::load_path(path, radius)?;
    let visible = catalog.brighter_than(magnitude_limit);
    log::info!(
        "Keeping {} of {} stars at magnitude {} or brighter",
        visible.len(),
        catalog.len(),
        magnitude_limit
    );
    Ok(visible)
}

/// Loads the star catalog on its own thread and hands it over once
pub struct StarLoader {
    receiver: Receiver<SkydomeResult<StarCatalog>>,
    handle: Option<JoinHandle<()>>,
}

impl StarLoader {
    pub fn spawn(config: &SkyConfig) -> SkydomeResult<Self> {
        let path = PathBuf::from(&config.star_catalog);
        let radius = config.star_radius;
        let limit = config.star_magnitude_limit;
        let (sender, receiver) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("star-loader".to_string())
            .spawn(move || {
                let result = load_star_catalog(&path, radius, limit);
                if sender.send(result).is_err() {
                    log::debug!("Star loader finished after its owner went away");
                }
            })
            .map_err(|e| SkydomeError::Catalog(format!("Failed to start star loader: {}", e)))?;

        Ok(Self {
            receiver,
            handle: Some(handle),
        })
    }

    /// The loaded catalog, once, as soon as it is ready
    pub fn try_take(&mut self) -> Option<SkydomeResult<StarCatalog>> {
        match self.receiver.try_recv() {
            Ok(result) => {
                self.join();
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                if self.handle.is_some() {
                    self.join();
                    Some(Err(SkydomeError::Catalog(
                        "star loader exited without a result".to_string(),
                    )))
                } else {
                    None
                }
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_none()
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.join() {
                log::error!("Failed to join star loader thread: {e:?}");
            }
        }
    }
}

/// Fixed-interval schedule. Due immediately the first time.
#[derive(Debug, Clone)]
pub struct RefreshTimer {
    interval: Duration,
    last: Option<Instant>,
}

impl RefreshTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// True when the interval has elapsed; marks the refresh as done
    pub fn poll(&mut self, now: Instant) -> bool {
        let due = match self.last {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        };
        if due {
            self.last = Some(now);
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ephemeris::{EphemerisError, EquatorialCoordinates};
    use chrono::{TimeZone, Utc};

    const CATALOG: &str = "\
id,hip,hd,hr,gl,bf,proper,ra,dec,dist,pmra,pmdec,rv,mag,absmag,spect,ci,x,y,z
1,,,,,,Bright,6.0,20.0,10.0,0,0,0,1.5,0,A0V,0,0,0,0
2,,,,,,Faint,7.0,-10.0,10.0,0,0,0,9.0,0,G2V,0,0,0,0
3,,,,,,Medium,18.0,45.0,10.0,0,0,0,4.0,0,K1V,0,0,0,0
";

    // One star at the same RA/Dec that SteadySource reports for every body
    const TWIN_CATALOG: &str = "\
id,hip,hd,hr,gl,bf,proper,ra,dec,dist,pmra,pmdec,rv,mag,absmag,spect,ci,x,y,z
1,,,,,,Twin,8.0,15.0,10.0,0,0,0,1.0,0,A0V,0,0,0,0
";

    struct SteadySource;

    impl EphemerisSource for SteadySource {
        fn fetch(
            &self,
            _body_id: &str,
            _observer: &ObserverState,
        ) -> Result<EquatorialCoordinates, EphemerisError> {
            Ok(EquatorialCoordinates {
                ra_deg: 120.0,
                dec_deg: 15.0,
            })
        }
    }

    fn observer() -> ObserverState {
        let t = Utc.with_ymd_and_hms(2026, 10, 18, 21, 0, 0).single().unwrap();
        ObserverState::new(46.5185, 6.5619, t)
    }

    fn write_catalog(name: &str) -> PathBuf {
        write_catalog_text(name, CATALOG)
    }

    fn write_catalog_text(name: &str, text: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("skydome_{}_{}.csv", name, std::process::id()));
        std::fs::write(&path, text).unwrap();
        path
    }

    fn wait_for_planets(sky: &mut SkyData, date: NaiveDate) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while sky.planets().pending() > 0 && Instant::now() < deadline {
            sky.collect_planet_updates(date);
            thread::sleep(Duration::from_millis(5));
        }
        sky.collect_planet_updates(date);
    }

    fn separation_deg(a: glam::Vec3, b: glam::Vec3) -> f32 {
        let (a, b) = (a.normalize(), b.normalize());
        let angle = a.cross(b).length().clamp(0.0, 1.0).asin().to_degrees();
        if a.dot(b) < 0.0 { 180.0 - angle } else { angle }
    }

    fn config_for(path: &Path) -> SkyConfig {
        SkyConfig {
            star_catalog: path.to_string_lossy().into_owned(),
            star_magnitude_limit: 6.0,
            ..SkyConfig::default()
        }
    }

    fn sky(config: &SkyConfig) -> SkyData {
        SkyData::new(config, Arc::new(SteadySource), SkyScene::new())
    }

    #[test]
    fn test_load_and_publish_stars() {
        let path = write_catalog("publish");
        let mut sky = sky(&config_for(&path));

        assert_eq!(sky.load_stars().unwrap(), 2);
        assert!(sky.scene().snapshot().stars.is_empty());

        sky.update_star_positions(Some(&observer()));
        let snapshot = sky.scene().snapshot();
        let mut names: Vec<_> = snapshot.stars.iter().map(|s| s.name.as_str()).collect();
        names.sort();
        assert_eq!(names, ["Bright", "Medium"]);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_observer_is_noop() {
        let path = write_catalog("noop");
        let mut sky = sky(&config_for(&path));
        sky.load_stars().unwrap();

        sky.update_star_positions(None);
        sky.update_planets_data(None);
        assert!(sky.scene().snapshot().is_empty());
        assert_eq!(sky.planets().pending(), 0);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_stars_not_loaded_is_noop() {
        let mut sky = sky(&SkyConfig::default());
        sky.update_star_positions(Some(&observer()));
        assert!(sky.scene().snapshot().stars.is_empty());
    }

    #[test]
    fn test_planet_refresh_publishes_bodies() {
        let mut sky = sky(&SkyConfig::default());
        let date = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        sky.update_planets_data(Some(&observer()));

        let deadline = Instant::now() + Duration::from_secs(5);
        while sky.planets().pending() > 0 && Instant::now() < deadline {
            sky.collect_planet_updates(date);
            thread::sleep(Duration::from_millis(5));
        }
        sky.collect_planet_updates(date);

        let snapshot = sky.scene().snapshot();
        assert_eq!(snapshot.bodies.len(), 9);
        assert_eq!(sky.map_to_renderable_planets(date).len(), 9);
    }

    #[test]
    fn test_bodies_turn_with_stars_between_fetches() {
        let path = write_catalog_text("twin", TWIN_CATALOG);
        let mut sky = sky(&config_for(&path));
        sky.load_stars().unwrap();

        let start = observer();
        let date = start.timestamp.date_naive();
        sky.update_planets_data(Some(&start));
        wait_for_planets(&mut sky, date);
        sky.update_star_positions(Some(&start));
        let jupiter_before = sky
            .scene()
            .snapshot()
            .bodies
            .iter()
            .find(|b| b.name == "Jupiter")
            .unwrap()
            .position;

        let later = ObserverState::new(
            start.latitude_deg,
            start.longitude_deg,
            start.timestamp + chrono::Duration::minutes(4),
        );
        sky.update_star_positions(Some(&later));

        let snapshot = sky.scene().snapshot();
        let star = snapshot.stars.iter().find(|s| s.name == "Twin").unwrap();
        let jupiter = snapshot.bodies.iter().find(|b| b.name == "Jupiter").unwrap();

        assert!(separation_deg(jupiter_before, jupiter.position) > 0.5);
        assert!(separation_deg(star.position, jupiter.position) < 0.01);
        assert_eq!(snapshot.bodies.len(), 9);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_skybox_published_from_config() {
        let config = SkyConfig::default();
        let sky = sky(&config);
        sky.publish_skybox();
        let snapshot = sky.scene().snapshot();
        let skybox = snapshot.skybox.as_ref().unwrap();
        assert_eq!(skybox.scale, config.skybox_radius);
        assert_eq!(skybox.texture, config.skybox_texture);
    }

    #[test]
    fn test_star_loader_hands_over_catalog() {
        let path = write_catalog("loader");
        let mut loader = StarLoader::spawn(&config_for(&path)).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        let result = loop {
            if let Some(result) = loader.try_take() {
                break result;
            }
            assert!(Instant::now() < deadline, "loader timed out");
            thread::sleep(Duration::from_millis(5));
        };

        assert_eq!(result.unwrap().len(), 2);
        assert!(loader.is_finished());
        assert!(loader.try_take().is_none());

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_star_loader_reports_missing_file() {
        let config = SkyConfig {
            star_catalog: "/nonexistent/skydome/catalog.csv".to_string(),
            ..SkyConfig::default()
        };
        let mut loader = StarLoader::spawn(&config).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        let result = loop {
            if let Some(result) = loader.try_take() {
                break result;
            }
            assert!(Instant::now() < deadline, "loader timed out");
            thread::sleep(Duration::from_millis(5));
        };
        assert!(matches!(result, Err(SkydomeError::Catalog(_))));
    }

    #[test]
    fn test_refresh_timer() {
        let start = Instant::now();
        let mut timer = RefreshTimer::new(Duration::from_secs(60));

        assert!(timer.poll(start));
        assert!(!timer.poll(start + Duration::from_secs(30)));
        assert!(timer.poll(start + Duration::from_secs(60)));
        assert!(!timer.poll(start + Duration::from_secs(90)));
    }
}
