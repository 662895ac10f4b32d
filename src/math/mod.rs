pub mod coordinates;
pub mod lunar;

pub use coordinates::*;
pub use lunar::{MoonPhase, lunation_fraction};

use glam::Vec3;

/// Logistic curve used to map magnitudes onto a bounded size range
#[inline]
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Narrow an f64 render-space point to the f32 vector the GPU consumes
#[inline]
pub fn to_render_vec(point: [f64; 3]) -> Vec3 {
    Vec3::new(point[0] as f32, point[1] as f32, point[2] as f32)
}
