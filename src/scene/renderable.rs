/// Drawable sky objects
/// One struct for every object; the kind carries shape-specific state
use glam::{Mat4, Quat, Vec3};
use wgpu::RenderPass;

use crate::{
    SkydomeResult,
    math::{MoonPhase, sigmoid},
    renderer::{
        camera::{Camera, Ray},
        scene_renderer::FrameResources,
        shaders::ShaderKind,
        uniforms::{ObjectUniform, buffer_helpers::slot_offset},
    },
};

pub const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshKind {
    Sphere,
    Disc,
}

impl MeshKind {
    /// Radius the shared mesh is generated at, before scaling. Picking uses it
    /// as the hit sphere of every object drawn with this mesh.
    pub fn base_radius(&self) -> f32 {
        1.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderableKind {
    Star { magnitude: f32, color: [f32; 4] },
    Planet { rotation_speed: f32 },
    Moon { phase: MoonPhase, rotation_speed: f32 },
    SkyBox,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Renderable {
    pub name: String,
    pub kind: RenderableKind,
    pub position: Vec3,
    pub scale: f32,
    pub rotation_angle: f32,
    pub mesh: MeshKind,
    pub shader: ShaderKind,
    pub texture: String,
    pub color: [f32; 4],
}

impl Renderable {
    pub fn star(
        name: &str,
        position: Vec3,
        magnitude: f32,
        spectral_class: Option<&str>,
        base_scale: f32,
        texture: &str,
    ) -> Self {
        let color = spectral_color(spectral_class);
        Self {
            name: name.to_string(),
            kind: RenderableKind::Star { magnitude, color },
            position,
            scale: base_scale * star_size(magnitude),
            rotation_angle: 0.0,
            mesh: MeshKind::Disc,
            shader: ShaderKind::Star,
            texture: texture.to_string(),
            color,
        }
    }

    pub fn planet(name: &str, position: Vec3, scale: f32, rotation_speed: f32, texture: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: RenderableKind::Planet { rotation_speed },
            position,
            scale,
            rotation_angle: 0.0,
            mesh: MeshKind::Sphere,
            shader: ShaderKind::Body,
            texture: texture.to_string(),
            color: WHITE,
        }
    }

    /// Moon texture is fixed by the phase at construction
    pub fn moon(name: &str, position: Vec3, scale: f32, rotation_speed: f32, phase: MoonPhase) -> Self {
        Self {
            name: name.to_string(),
            kind: RenderableKind::Moon {
                phase,
                rotation_speed,
            },
            position,
            scale,
            rotation_angle: 0.0,
            mesh: MeshKind::Sphere,
            shader: ShaderKind::Body,
            texture: phase.texture_key(),
            color: WHITE,
        }
    }

    pub fn skybox(radius: f32, texture: &str) -> Self {
        Self {
            name: "SkyBox".to_string(),
            kind: RenderableKind::SkyBox,
            position: Vec3::ZERO,
            scale: radius,
            rotation_angle: 0.0,
            mesh: MeshKind::Sphere,
            shader: ShaderKind::Sky,
            texture: texture.to_string(),
            color: WHITE,
        }
    }

    pub fn is_skybox(&self) -> bool {
        matches!(self.kind, RenderableKind::SkyBox)
    }

    pub fn is_star(&self) -> bool {
        matches!(self.kind, RenderableKind::Star { .. })
    }

    pub fn rotation_speed(&self) -> f32 {
        match self.kind {
            RenderableKind::Planet { rotation_speed } | RenderableKind::Moon { rotation_speed, .. } => {
                rotation_speed
            }
            _ => 0.0,
        }
    }

    /// Advance spin by `dt` seconds; stars and the sky do not rotate
    pub fn update_rotation(&mut self, dt: f32) {
        let speed = self.rotation_speed();
        if speed != 0.0 {
            self.rotation_angle = (self.rotation_angle + speed * dt).rem_euclid(360.0);
        }
    }

    /// Local to horizon space
    pub fn model_matrix(&self) -> Mat4 {
        let scale = Vec3::splat(self.scale);
        match self.kind {
            RenderableKind::SkyBox => Mat4::from_scale(scale),
            RenderableKind::Star { .. } => {
                // Disc faces +Z; turn it toward the observer at the origin
                let facing = Quat::from_rotation_arc(Vec3::Z, -self.position.normalize_or(Vec3::X));
                Mat4::from_scale_rotation_translation(scale, facing, self.position)
            }
            RenderableKind::Planet { .. } | RenderableKind::Moon { .. } => {
                Mat4::from_scale_rotation_translation(
                    scale,
                    Quat::from_rotation_z(self.rotation_angle.to_radians()),
                    self.position,
                )
            }
        }
    }

    pub fn uniform(&self, camera: &Camera) -> ObjectUniform {
        ObjectUniform::new(
            camera.model() * self.model_matrix(),
            camera.view_projection(),
            self.color,
        )
    }

    pub fn bounding_radius(&self) -> f32 {
        self.scale * self.mesh.base_radius()
    }

    /// Ray/bounding-sphere test. Grazing rays and rays starting inside count.
    pub fn check_hit(&self, ray: &Ray) -> bool {
        if self.is_skybox() {
            return false;
        }
        let (b, c) = self.hit_terms(ray);
        b * b - 4.0 * c >= 0.0
    }

    /// Distance along the ray to the nearest intersection in front of the origin
    pub fn hit_distance(&self, ray: &Ray) -> Option<f32> {
        if self.is_skybox() {
            return None;
        }
        let (b, c) = self.hit_terms(ray);
        if c <= 0.0 {
            return Some(0.0);
        }

        let discriminant = b * b - 4.0 * c;
        if discriminant < 0.0 {
            return None;
        }

        let root = discriminant.sqrt();
        let near = (-b - root) / 2.0;
        let far = (-b + root) / 2.0;
        if near >= 0.0 {
            Some(near)
        } else if far >= 0.0 {
            Some(far)
        } else {
            None
        }
    }

    fn hit_terms(&self, ray: &Ray) -> (f32, f32) {
        let oc = ray.origin - self.position;
        let radius = self.bounding_radius();
        let b = 2.0 * ray.direction.dot(oc);
        let c = oc.dot(oc) - radius * radius;
        (b, c)
    }

    /// Record this object's draw using the uniform slot written for this frame
    pub fn draw(
        &self,
        pass: &mut RenderPass<'_>,
        resources: &FrameResources<'_>,
        slot: usize,
    ) -> SkydomeResult<()> {
        resources.program(self.shader)?.activate(pass);
        pass.set_bind_group(1, resources.object_bind_group, &[slot_offset(slot)]);
        pass.set_bind_group(2, resources.texture_bind_group(&self.texture), &[]);

        let mesh = resources.mesh(self.mesh);
        mesh.draw(pass)?;
        mesh.unbind();
        Ok(())
    }
}

/// Billboard size factor: brighter (lower magnitude) stars are larger
pub fn star_size(magnitude: f32) -> f32 {
    sigmoid(-magnitude as f64) as f32 * 2.0 + 0.5
}

/// Approximate color for the first letter of a spectral class
pub fn spectral_color(spectral_class: Option<&str>) -> [f32; 4] {
    match spectral_class.and_then(|s| s.trim().chars().next()) {
        Some('O') => [0.61, 0.69, 1.0, 1.0],
        Some('B') => [0.67, 0.75, 1.0, 1.0],
        Some('A') => [0.80, 0.85, 1.0, 1.0],
        Some('F') => [0.97, 0.97, 1.0, 1.0],
        Some('G') => [1.0, 0.96, 0.91, 1.0],
        Some('K') => [1.0, 0.82, 0.63, 1.0],
        Some('M') => [1.0, 0.73, 0.46, 1.0],
        _ => WHITE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_at(position: Vec3, scale: f32) -> Renderable {
        Renderable::planet("Test", position, scale, 10.0, "test.png")
    }

    #[test]
    fn test_base_radius_matches_generated_meshes() {
        use crate::graphics::geometry::{generate_disc, generate_sphere};

        let sphere = generate_sphere(8, 16);
        assert!((sphere.bounding_radius() - MeshKind::Sphere.base_radius()).abs() < 1e-5);

        let disc = generate_disc(16, MeshKind::Disc.base_radius());
        assert!((disc.bounding_radius() - MeshKind::Disc.base_radius()).abs() < 1e-5);
    }

    #[test]
    fn test_ray_at_center_hits() {
        let body = body_at(Vec3::new(3.0, 4.0, 0.0), 0.5);
        let ray = Ray::new(Vec3::ZERO, body.position);
        assert!(body.check_hit(&ray));
        let distance = body.hit_distance(&ray).unwrap();
        assert!((distance - 4.5).abs() < 1e-5);
    }

    #[test]
    fn test_perpendicular_ray_misses() {
        let body = body_at(Vec3::new(10.0, 0.0, 0.0), 1.0);
        let ray = Ray::new(Vec3::ZERO, Vec3::Y);
        assert!(!body.check_hit(&ray));
        assert_eq!(body.hit_distance(&ray), None);
    }

    #[test]
    fn test_grazing_ray_hits() {
        let body = body_at(Vec3::new(5.0, 1.0, 0.0), 1.0);
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        assert!(body.check_hit(&ray));
        assert!((body.hit_distance(&ray).unwrap() - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_origin_inside_hits() {
        let body = body_at(Vec3::new(0.1, 0.0, 0.0), 1.0);
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        assert!(body.check_hit(&ray));
        assert_eq!(body.hit_distance(&ray), Some(0.0));
    }

    #[test]
    fn test_body_behind_has_no_distance() {
        let body = body_at(Vec3::new(-5.0, 0.0, 0.0), 1.0);
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        assert_eq!(body.hit_distance(&ray), None);
    }

    #[test]
    fn test_skybox_never_hits() {
        let sky = Renderable::skybox(50.0, "sky.jpg");
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        assert!(!sky.check_hit(&ray));
        assert_eq!(sky.hit_distance(&ray), None);
    }

    #[test]
    fn test_update_rotation_wraps() {
        let mut body = body_at(Vec3::X, 0.1);
        body.update_rotation(35.0);
        assert!((body.rotation_angle - 350.0).abs() < 1e-4);
        body.update_rotation(2.0);
        assert!((body.rotation_angle - 10.0).abs() < 1e-3);

        let mut retrograde = Renderable::planet("Venus", Vec3::X, 0.1, -0.5, "venus.jpg");
        retrograde.update_rotation(10.0);
        assert!((retrograde.rotation_angle - 355.0).abs() < 1e-4);
    }

    #[test]
    fn test_stars_do_not_rotate() {
        let mut star = Renderable::star("Vega", Vec3::X, 0.03, Some("A0V"), 0.004, "star.png");
        star.update_rotation(100.0);
        assert_eq!(star.rotation_angle, 0.0);
    }

    #[test]
    fn test_star_size_by_magnitude() {
        assert!((star_size(0.0) - 1.5).abs() < 1e-6);
        assert!(star_size(-1.46) > star_size(1.0));
        assert!(star_size(1.0) > star_size(6.0));
        assert!(star_size(20.0) >= 0.5);
        assert!(star_size(-20.0) <= 2.5);

        let star = Renderable::star("S", Vec3::X, 0.0, None, 0.004, "star.png");
        assert!((star.scale - 0.006).abs() < 1e-7);
        assert_eq!(star.mesh, MeshKind::Disc);
        assert_eq!(star.shader, ShaderKind::Star);
    }

    #[test]
    fn test_spectral_colors() {
        assert_eq!(spectral_color(None), WHITE);
        assert_eq!(spectral_color(Some("")), WHITE);
        assert_eq!(spectral_color(Some("DA2")), WHITE);
        assert_eq!(spectral_color(Some("K1V")), [1.0, 0.82, 0.63, 1.0]);
        assert!(spectral_color(Some("B2"))[2] > spectral_color(Some("M4"))[2]);
    }

    #[test]
    fn test_star_billboard_faces_observer() {
        let position = Vec3::new(0.3, -0.4, 0.866).normalize();
        let star = Renderable::star("S", position, 1.0, None, 0.004, "star.png");
        let normal = star.model_matrix().transform_vector3(Vec3::Z).normalize();
        assert!((normal + position).length() < 1e-4);
        assert!((star.model_matrix().transform_point3(Vec3::ZERO) - position).length() < 1e-6);
    }

    #[test]
    fn test_moon_texture_follows_phase() {
        let moon = Renderable::moon("Moon", Vec3::X, 0.05, 0.5, MoonPhase::WaxingGibbous);
        assert_eq!(moon.texture, "moon/waxing_gibbous.png");
        assert_eq!(moon.rotation_speed(), 0.5);
    }
}
