/// Published scene: the renderer always reads one complete snapshot
/// Catalog workers build a full batch and swap it in; nothing is patched element by element
pub mod renderable;

pub use renderable::{MeshKind, Renderable, RenderableKind, spectral_color, star_size};

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use crate::renderer::camera::Ray;

#[derive(Debug, Clone, Default)]
pub struct SceneSnapshot {
    pub skybox: Option<Renderable>,
    pub bodies: Vec<Renderable>,
    pub stars: Arc<[Renderable]>,
}

impl SceneSnapshot {
    /// Back to front: sky, then solar-system bodies, then stars
    pub fn draw_order(&self) -> impl Iterator<Item = &Renderable> {
        self.skybox
            .iter()
            .chain(self.bodies.iter())
            .chain(self.stars.iter())
    }

    pub fn len(&self) -> usize {
        self.skybox.iter().count() + self.bodies.len() + self.stars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PickResult {
    pub name: String,
    pub kind: RenderableKind,
    pub distance: f32,
}

/// Shared handle to the current snapshot. Cloning the handle shares the scene.
#[derive(Debug, Clone, Default)]
pub struct SkyScene {
    current: Arc<RwLock<Arc<SceneSnapshot>>>,
}

impl SkyScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Arc<SceneSnapshot> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&*guard)
    }

    fn swap(&self, update: impl FnOnce(&SceneSnapshot) -> SceneSnapshot) {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        let next = update(&**guard);
        *guard = Arc::new(next);
    }

    pub fn publish_skybox(&self, skybox: Renderable) {
        self.swap(|current| SceneSnapshot {
            skybox: Some(skybox),
            ..current.clone()
        });
    }

    pub fn publish_stars(&self, stars: Vec<Renderable>) {
        let count = stars.len();
        let stars: Arc<[Renderable]> = stars.into();
        self.swap(|current| SceneSnapshot {
            stars,
            ..current.clone()
        });
        log::debug!("Published {} stars", count);
    }

    /// Replace the planet/moon batch, keeping each body's spin by name
    pub fn publish_bodies(&self, mut bodies: Vec<Renderable>) {
        self.swap(|current| {
            let angles: HashMap<&str, f32> = current
                .bodies
                .iter()
                .map(|b| (b.name.as_str(), b.rotation_angle))
                .collect();
            for body in &mut bodies {
                if let Some(angle) = angles.get(body.name.as_str()) {
                    body.rotation_angle = *angle;
                }
            }
            SceneSnapshot {
                bodies,
                ..current.clone()
            }
        });
    }

    /// Spin planets and the Moon forward by `dt` seconds
    pub fn advance_rotations(&self, dt: f32) {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        let snapshot = Arc::make_mut(&mut *guard);
        for body in &mut snapshot.bodies {
            body.update_rotation(dt);
        }
    }

    /// Names of every object the ray hits
    pub fn check_hit(&self, ray: &Ray) -> Vec<String> {
        let snapshot = self.snapshot();
        snapshot
            .draw_order()
            .filter(|r| r.check_hit(ray))
            .map(|r| r.name.clone())
            .collect()
    }

    /// Closest object in front of the ray origin
    pub fn pick(&self, ray: &Ray) -> Option<PickResult> {
        let snapshot = self.snapshot();
        snapshot
            .draw_order()
            .filter_map(|r| r.hit_distance(ray).map(|d| (r, d)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(r, distance)| PickResult {
                name: r.name.clone(),
                kind: r.kind,
                distance,
            })
    }
}
