/// Observer camera at the center of the celestial sphere
/// Orientation is kept as an azimuth/altitude look direction in horizon space
use glam::{Mat4, Vec3, Vec4};

use super::uniforms::CameraUniform;
use crate::math::{horizon_to_cartesian, normalize_degrees, to_render_vec};

pub const MAX_ALTITUDE_DEG: f32 = 89.0;
pub const MIN_FOV_DEG: f32 = 10.0;
pub const MAX_FOV_DEG: f32 = 100.0;

/// Ray in horizon space, direction normalized
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

pub struct Camera {
    model: Mat4,
    view: Mat4,
    projection: Mat4,

    azimuth_deg: f32,
    altitude_deg: f32,

    fov_deg: f32,
    aspect_ratio: f32,
    near_plane: f32,
    far_plane: f32,
}

impl Camera {
    pub fn new(fov_deg: f32, width: u32, height: u32) -> Self {
        let mut camera = Self {
            // Horizon space is north/east/up; flip east so the sky is not mirrored
            model: Mat4::from_scale(Vec3::new(1.0, -1.0, 1.0)),
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            azimuth_deg: 180.0,
            altitude_deg: 20.0,
            fov_deg: fov_deg.clamp(MIN_FOV_DEG, MAX_FOV_DEG),
            aspect_ratio: aspect(width, height),
            near_plane: 0.01,
            far_plane: 100.0,
        };
        camera.update_view();
        camera.update_projection();
        camera
    }

    /// Look direction in horizon space
    pub fn forward(&self) -> Vec3 {
        to_render_vec(horizon_to_cartesian(
            self.azimuth_deg as f64,
            self.altitude_deg as f64,
            1.0,
        ))
    }

    fn update_view(&mut self) {
        let target = self.model.transform_vector3(self.forward());
        self.view = Mat4::look_at_rh(Vec3::ZERO, target, Vec3::Z);
    }

    fn update_projection(&mut self) {
        self.projection = Mat4::perspective_rh(
            self.fov_deg.to_radians(),
            self.aspect_ratio,
            self.near_plane,
            self.far_plane,
        );
    }

    /// Rotate around the vertical axis
    pub fn turn(&mut self, delta_deg: f32) {
        self.azimuth_deg = normalize_degrees((self.azimuth_deg + delta_deg) as f64) as f32;
        self.update_view();
    }

    /// Raise or lower the look direction, stopping short of the zenith and nadir
    pub fn tilt(&mut self, delta_deg: f32) {
        self.altitude_deg = (self.altitude_deg + delta_deg).clamp(-MAX_ALTITUDE_DEG, MAX_ALTITUDE_DEG);
        self.update_view();
    }

    /// Narrow (positive) or widen (negative) the field of view
    pub fn zoom(&mut self, delta_deg: f32) {
        self.fov_deg = (self.fov_deg - delta_deg).clamp(MIN_FOV_DEG, MAX_FOV_DEG);
        self.update_projection();
    }

    pub fn look_at_horizon(&mut self, azimuth_deg: f32, altitude_deg: f32) {
        self.azimuth_deg = normalize_degrees(azimuth_deg as f64) as f32;
        self.altitude_deg = altitude_deg.clamp(-MAX_ALTITUDE_DEG, MAX_ALTITUDE_DEG);
        self.update_view();
    }

    /// Viewport resize. Only the projection depends on the surface.
    pub fn on_surface_changed(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.aspect_ratio = aspect(width, height);
        self.update_projection();
        log::debug!("Camera projection updated for {}x{}", width, height);
    }

    pub fn model(&self) -> Mat4 {
        self.model
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    pub fn azimuth(&self) -> f32 {
        self.azimuth_deg
    }

    pub fn altitude(&self) -> f32 {
        self.altitude_deg
    }

    pub fn fov(&self) -> f32 {
        self.fov_deg
    }

    pub fn uniform(&self) -> CameraUniform {
        CameraUniform {
            view_matrix: self.view.to_cols_array_2d(),
            projection_matrix: self.projection.to_cols_array_2d(),
            view_projection_matrix: self.view_projection().to_cols_array_2d(),
        }
    }

    /// Unproject a pixel into a horizon-space ray from the observer
    pub fn pick_ray(&self, x: f32, y: f32, width: u32, height: u32) -> Ray {
        let ndc_x = 2.0 * x / width.max(1) as f32 - 1.0;
        let ndc_y = 1.0 - 2.0 * y / height.max(1) as f32;

        let inverse = (self.projection * self.view * self.model).inverse();
        let unproject = |depth: f32| {
            let point = inverse * Vec4::new(ndc_x, ndc_y, depth, 1.0);
            point.truncate() / point.w
        };

        let near = unproject(0.0);
        let far = unproject(1.0);
        Ray::new(Vec3::ZERO, far - near)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(60.0, 16, 9)
    }
}

fn aspect(width: u32, height: u32) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}
