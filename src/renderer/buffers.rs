/// Attribute and index buffers with exactly-sized CPU staging storage
use std::cell::Cell;

use bytemuck::Pod;
use wgpu::{Buffer, BufferUsages, Device, RenderPass, util::DeviceExt};

use crate::{SkydomeError, SkydomeResult};

/// Vertex input slots, matching `@location` in the shaders
pub const POSITION_SLOT: u32 = 0;
pub const TEXCOORD_SLOT: u32 = 1;
pub const COLOR_SLOT: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferRole {
    Vertex,
    Index,
}

/// One attribute channel: staging storage, its uploaded GPU copy, and the
/// slot it was last bound to
pub struct GpuBuffer<T: Pod> {
    label: &'static str,
    role: BufferRole,
    data: Vec<T>,
    gpu: Option<Buffer>,
    bound_slot: Cell<Option<u32>>,
}

pub type VertexBuffer = GpuBuffer<[f32; 3]>;
pub type TextureBuffer = GpuBuffer<[f32; 2]>;
pub type ColorBuffer = GpuBuffer<[f32; 4]>;
pub type IndexBuffer = GpuBuffer<u32>;

impl<T: Pod> GpuBuffer<T> {
    pub fn vertex(label: &'static str) -> Self {
        Self::with_role(label, BufferRole::Vertex)
    }

    pub fn index(label: &'static str) -> Self {
        Self::with_role(label, BufferRole::Index)
    }

    fn with_role(label: &'static str, role: BufferRole) -> Self {
        Self {
            label,
            role,
            data: Vec::new(),
            gpu: None,
            bound_slot: Cell::new(None),
        }
    }

    /// Drop previous contents and GPU storage, reserving exactly `count` elements
    pub fn reset(&mut self, count: usize) {
        self.data = Vec::with_capacity(count);
        self.gpu = None;
        self.bound_slot.set(None);
    }

    pub fn add(&mut self, value: T) {
        debug_assert!(
            self.data.len() < self.data.capacity(),
            "{}: add past reset count {}",
            self.label,
            self.data.capacity()
        );
        self.data.push(value);
    }

    pub fn extend(&mut self, values: impl IntoIterator<Item = T>) {
        for value in values {
            self.add(value);
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn reserved(&self) -> usize {
        self.data.capacity()
    }

    pub fn stride() -> usize {
        std::mem::size_of::<T>()
    }

    pub fn role(&self) -> BufferRole {
        self.role
    }

    /// Packed bytes in the layout the GPU reads
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    pub fn upload(&mut self, device: &Device) -> SkydomeResult<()> {
        if self.data.is_empty() {
            return Err(SkydomeError::Graphics(format!(
                "{}: nothing to upload",
                self.label
            )));
        }

        let usage = match self.role {
            BufferRole::Vertex => BufferUsages::VERTEX,
            BufferRole::Index => BufferUsages::INDEX,
        };

        self.gpu = Some(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(self.label),
            contents: self.as_bytes(),
            usage,
        }));
        log::debug!("Uploaded {} ({} bytes)", self.label, self.as_bytes().len());
        Ok(())
    }

    pub fn is_uploaded(&self) -> bool {
        self.gpu.is_some()
    }

    /// Bind for the next draw. Index buffers ignore `slot`.
    pub fn bind(&self, pass: &mut RenderPass<'_>, slot: u32) -> SkydomeResult<()> {
        let buffer = self.gpu.as_ref().ok_or_else(|| {
            SkydomeError::Graphics(format!("{}: bind before upload", self.label))
        })?;

        match self.role {
            BufferRole::Vertex => pass.set_vertex_buffer(slot, buffer.slice(..)),
            BufferRole::Index => pass.set_index_buffer(buffer.slice(..), wgpu::IndexFormat::Uint32),
        }
        self.bound_slot.set(Some(slot));
        Ok(())
    }

    pub fn unbind(&self) {
        self.bound_slot.set(None);
    }

    pub fn bound_slot(&self) -> Option<u32> {
        self.bound_slot.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_reserves_exact_count() {
        let mut buffer = VertexBuffer::vertex("test vertices");
        for count in [1, 7, 33, 1000] {
            buffer.reset(count);
            assert_eq!(buffer.reserved(), count);
            assert!(buffer.is_empty());
        }
    }

    #[test]
    fn test_byte_packing() {
        let mut colors = ColorBuffer::vertex("test colors");
        colors.reset(3);
        colors.add([1.0, 0.0, 0.0, 1.0]);
        colors.add([0.0, 1.0, 0.0, 1.0]);
        colors.add([0.0, 0.0, 1.0, 0.5]);

        let bytes = colors.as_bytes();
        assert_eq!(bytes.len(), 3 * ColorBuffer::stride());
        assert_eq!(ColorBuffer::stride(), 16);
        assert_eq!(&bytes[0..4], &1.0f32.to_ne_bytes());
        assert_eq!(&bytes[44..48], &0.5f32.to_ne_bytes());
        assert_eq!(colors.reserved(), 3);
    }

    #[test]
    fn test_strides() {
        assert_eq!(VertexBuffer::stride(), 12);
        assert_eq!(TextureBuffer::stride(), 8);
        assert_eq!(IndexBuffer::stride(), 4);
    }

    #[test]
    fn test_index_packing() {
        let mut indices = IndexBuffer::index("test indices");
        indices.reset(6);
        indices.extend([0, 1, 2, 2, 3, 0]);
        assert_eq!(indices.len(), 6);
        assert_eq!(indices.as_bytes().len(), 24);
        assert_eq!(indices.role(), BufferRole::Index);
        assert!(!indices.is_uploaded());
    }

    #[test]
    fn test_unbind_clears_slot() {
        let buffer = TextureBuffer::vertex("test uvs");
        buffer.bound_slot.set(Some(TEXCOORD_SLOT));
        assert_eq!(buffer.bound_slot(), Some(TEXCOORD_SLOT));
        buffer.unbind();
        assert_eq!(buffer.bound_slot(), None);
    }
}
