/// Procedural geometry for sky objects
/// Flat f32 arrays ready to be packed into GPU attribute buffers
use std::f32::consts::PI;

/// Tessellated mesh: xyz position triples, triangle indices, optional uv pairs
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeometryMesh {
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
    pub texcoords: Option<Vec<f32>>,
}

impl GeometryMesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn positions(&self) -> impl Iterator<Item = [f32; 3]> + '_ {
        self.vertices.chunks_exact(3).map(|v| [v[0], v[1], v[2]])
    }

    pub fn uvs(&self) -> impl Iterator<Item = [f32; 2]> + '_ {
        self.texcoords
            .iter()
            .flat_map(|uv| uv.chunks_exact(2).map(|c| [c[0], c[1]]))
    }

    /// Largest vertex distance from the local origin
    pub fn bounding_radius(&self) -> f32 {
        self.positions()
            .map(|[x, y, z]| (x * x + y * y + z * z).sqrt())
            .fold(0.0, f32::max)
    }
}

/// Unit UV sphere around the Z axis.
///
/// `num_bands + 1` rings of `steps_per_band + 1` vertices; the seam column is
/// duplicated so u runs the full 0..1 range.
pub fn generate_sphere(num_bands: u32, steps_per_band: u32) -> GeometryMesh {
    let rings = num_bands as usize + 1;
    let columns = steps_per_band as usize + 1;

    let mut vertices = Vec::with_capacity(rings * columns * 3);
    let mut texcoords = Vec::with_capacity(rings * columns * 2);
    let mut indices = Vec::with_capacity(num_bands as usize * steps_per_band as usize * 6);

    for band in 0..=num_bands {
        let phi = PI * band as f32 / num_bands as f32;
        let (sin_phi, cos_phi) = phi.sin_cos();

        for step in 0..=steps_per_band {
            let theta = 2.0 * PI * step as f32 / steps_per_band as f32;
            let (sin_theta, cos_theta) = theta.sin_cos();

            vertices.extend_from_slice(&[sin_phi * cos_theta, sin_phi * sin_theta, cos_phi]);
            texcoords.extend_from_slice(&[
                step as f32 / steps_per_band as f32,
                band as f32 / num_bands as f32,
            ]);
        }
    }

    for band in 0..num_bands {
        for step in 0..steps_per_band {
            let first = band * (steps_per_band + 1) + step;
            let second = first + steps_per_band + 1;

            indices.extend_from_slice(&[first, second, first + 1]);
            indices.extend_from_slice(&[second, second + 1, first + 1]);
        }
    }

    GeometryMesh {
        vertices,
        indices,
        texcoords: Some(texcoords),
    }
}

/// Flat disc in the XY plane facing +Z: a center vertex plus `segments` rim
/// points, fan-triangulated.
pub fn generate_disc(segments: u32, radius: f32) -> GeometryMesh {
    let count = segments as usize + 1;
    let mut vertices = Vec::with_capacity(count * 3);
    let mut texcoords = Vec::with_capacity(count * 2);
    let mut indices = Vec::with_capacity(segments as usize * 3);

    vertices.extend_from_slice(&[0.0, 0.0, 0.0]);
    texcoords.extend_from_slice(&[0.5, 0.5]);

    for i in 0..segments {
        let angle = 2.0 * PI * i as f32 / segments as f32;
        let (sin, cos) = angle.sin_cos();
        vertices.extend_from_slice(&[radius * cos, radius * sin, 0.0]);
        texcoords.extend_from_slice(&[0.5 + 0.5 * cos, 0.5 - 0.5 * sin]);
    }

    for i in 0..segments {
        let current = i + 1;
        let next = (i + 1) % segments + 1;
        indices.extend_from_slice(&[0, current, next]);
    }

    GeometryMesh {
        vertices,
        indices,
        texcoords: Some(texcoords),
    }
}
