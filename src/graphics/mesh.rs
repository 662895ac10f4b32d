/// GPU buffer set for one shared mesh
use wgpu::{Device, RenderPass};

use super::geometry::GeometryMesh;
use crate::{
    SkydomeResult,
    renderer::buffers::{
        COLOR_SLOT, ColorBuffer, IndexBuffer, POSITION_SLOT, TEXCOORD_SLOT, TextureBuffer,
        VertexBuffer,
    },
};

/// Per-vertex color source for a mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VertexColors {
    Uniform([f32; 4]),
    /// First vertex gets `center`, the rest `rim`. Used for soft star discs.
    Radial { center: [f32; 4], rim: [f32; 4] },
}

pub struct MeshBuffers {
    pub positions: VertexBuffer,
    pub texcoords: TextureBuffer,
    pub colors: ColorBuffer,
    pub indices: IndexBuffer,
}

impl MeshBuffers {
    /// Fill the staging storage of every channel without touching the GPU
    pub fn stage(mesh: &GeometryMesh, colors: VertexColors) -> Self {
        let count = mesh.vertex_count();

        let mut positions = VertexBuffer::vertex("Mesh Positions");
        positions.reset(count);
        positions.extend(mesh.positions());

        let mut texcoords = TextureBuffer::vertex("Mesh Texcoords");
        texcoords.reset(count);
        if mesh.texcoords.is_some() {
            texcoords.extend(mesh.uvs());
        } else {
            texcoords.extend(std::iter::repeat_n([0.0, 0.0], count));
        }

        let mut color_buffer = ColorBuffer::vertex("Mesh Colors");
        color_buffer.reset(count);
        color_buffer.extend((0..count).map(|i| match colors {
            VertexColors::Uniform(color) => color,
            VertexColors::Radial { center, rim } => {
                if i == 0 {
                    center
                } else {
                    rim
                }
            }
        }));

        let mut indices = IndexBuffer::index("Mesh Indices");
        indices.reset(mesh.indices.len());
        indices.extend(mesh.indices.iter().copied());

        Self {
            positions,
            texcoords,
            colors: color_buffer,
            indices,
        }
    }

    pub fn from_mesh(
        device: &Device,
        mesh: &GeometryMesh,
        colors: VertexColors,
    ) -> SkydomeResult<Self> {
        let mut buffers = Self::stage(mesh, colors);
        buffers.upload(device)?;
        Ok(buffers)
    }

    pub fn upload(&mut self, device: &Device) -> SkydomeResult<()> {
        self.positions.upload(device)?;
        self.texcoords.upload(device)?;
        self.colors.upload(device)?;
        self.indices.upload(device)?;
        Ok(())
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Bind every channel and issue one indexed draw
    pub fn draw(&self, pass: &mut RenderPass<'_>) -> SkydomeResult<()> {
        self.positions.bind(pass, POSITION_SLOT)?;
        self.texcoords.bind(pass, TEXCOORD_SLOT)?;
        self.colors.bind(pass, COLOR_SLOT)?;
        self.indices.bind(pass, 0)?;
        pass.draw_indexed(0..self.index_count(), 0, 0..1);
        Ok(())
    }

    pub fn unbind(&self) {
        self.positions.unbind();
        self.texcoords.unbind();
        self.colors.unbind();
        self.indices.unbind();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::geometry::{generate_disc, generate_sphere};

    #[test]
    fn test_stage_sphere_channels() {
        let mesh = generate_sphere(4, 8);
        let buffers = MeshBuffers::stage(&mesh, VertexColors::Uniform([1.0; 4]));

        assert_eq!(buffers.positions.len(), mesh.vertex_count());
        assert_eq!(buffers.texcoords.len(), mesh.vertex_count());
        assert_eq!(buffers.colors.len(), mesh.vertex_count());
        assert_eq!(buffers.index_count() as usize, mesh.indices.len());
        assert_eq!(buffers.positions.as_bytes().len(), mesh.vertices.len() * 4);
    }

    #[test]
    fn test_stage_disc_radial_colors() {
        let mesh = generate_disc(8, 1.0);
        let center = [1.0, 1.0, 1.0, 1.0];
        let rim = [1.0, 1.0, 1.0, 0.0];
        let buffers = MeshBuffers::stage(&mesh, VertexColors::Radial { center, rim });

        let colors: &[[f32; 4]] = bytemuck::cast_slice(buffers.colors.as_bytes());
        assert_eq!(colors[0], center);
        assert!(colors[1..].iter().all(|c| *c == rim));
    }

    #[test]
    fn test_stage_without_texcoords() {
        let mesh = GeometryMesh {
            vertices: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            indices: vec![0, 1, 2],
            texcoords: None,
        };
        let buffers = MeshBuffers::stage(&mesh, VertexColors::Uniform([1.0; 4]));
        assert_eq!(buffers.texcoords.len(), 3);
        assert_eq!(buffers.texcoords.as_bytes(), &[0u8; 24][..]);
    }
}
