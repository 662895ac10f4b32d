/// Uniform blocks shared by every sky shader
/// Group 0 carries per-frame camera matrices, group 1 a per-object block
/// addressed through dynamic offsets into one buffer.
use std::num::NonZeroU64;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

/// Size of one object slot. Matches the minimum uniform offset alignment.
pub const OBJECT_SLOT_SIZE: u64 = 256;
pub const OBJECT_SLOT_BINDING_SIZE: NonZeroU64 = NonZeroU64::new(OBJECT_SLOT_SIZE).unwrap();

/// Camera/frame uniform, written once per frame
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_matrix: [[f32; 4]; 4],            // 64 bytes
    pub projection_matrix: [[f32; 4]; 4],      // 64 bytes
    pub view_projection_matrix: [[f32; 4]; 4], // 64 bytes
} // Total: 192 bytes

/// Per-object uniform, padded to a full dynamic-offset slot
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct ObjectUniform {
    pub model_matrix: [[f32; 4]; 4], // 64 bytes
    pub mvp_matrix: [[f32; 4]; 4],   // 64 bytes
    pub tint: [f32; 4],              // 16 bytes
    pub _padding: [f32; 28],         // 112 bytes
} // Total: 256 bytes

impl Default for CameraUniform {
    fn default() -> Self {
        Self {
            view_matrix: Mat4::IDENTITY.to_cols_array_2d(),
            projection_matrix: Mat4::IDENTITY.to_cols_array_2d(),
            view_projection_matrix: Mat4::IDENTITY.to_cols_array_2d(),
        }
    }
}

impl ObjectUniform {
    pub fn new(model: Mat4, view_projection: Mat4, tint: [f32; 4]) -> Self {
        Self {
            model_matrix: model.to_cols_array_2d(),
            mvp_matrix: (view_projection * model).to_cols_array_2d(),
            tint,
            _padding: [0.0; 28],
        }
    }
}

impl Default for ObjectUniform {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, Mat4::IDENTITY, [1.0; 4])
    }
}

/// Helper functions for creating the uniform buffers and their bind groups
pub mod buffer_helpers {
    use super::*;
    use wgpu::{BindGroup, BindGroupLayout, Buffer, Device};

    pub fn create_camera_buffer(device: &Device) -> Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Camera Uniform Buffer"),
            size: std::mem::size_of::<CameraUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    pub fn create_camera_bind_group_layout(device: &Device) -> BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Camera Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        })
    }

    pub fn create_camera_bind_group(
        device: &Device,
        layout: &BindGroupLayout,
        buffer: &Buffer,
    ) -> BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        })
    }

    /// Object uniform layout with dynamic offsets, one 256-byte slot per draw
    pub fn create_object_bind_group_layout_dynamic(device: &Device) -> BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Object Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: Some(OBJECT_SLOT_BINDING_SIZE),
                },
                count: None,
            }],
        })
    }

    pub fn create_dynamic_object_buffer(device: &Device, max_objects: u32) -> Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Dynamic Object Uniform Buffer"),
            size: OBJECT_SLOT_SIZE * max_objects.max(1) as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    pub fn create_dynamic_object_bind_group(
        device: &Device,
        layout: &BindGroupLayout,
        buffer: &Buffer,
    ) -> BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Dynamic Object Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer,
                    offset: 0,
                    size: Some(OBJECT_SLOT_BINDING_SIZE),
                }),
            }],
        })
    }

    /// Byte offset of an object's slot
    pub fn slot_offset(slot: usize) -> wgpu::DynamicOffset {
        (slot as u64 * OBJECT_SLOT_SIZE) as wgpu::DynamicOffset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_uniform_sizes() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 192);
        assert_eq!(std::mem::size_of::<ObjectUniform>() as u64, OBJECT_SLOT_SIZE);
    }

    #[test]
    fn test_object_uniform_mvp() {
        let model = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let view_projection = Mat4::from_scale(Vec3::splat(2.0));
        let uniform = ObjectUniform::new(model, view_projection, [1.0, 0.5, 0.25, 1.0]);

        let mvp = Mat4::from_cols_array_2d(&uniform.mvp_matrix);
        let point = mvp.transform_point3(Vec3::ZERO);
        assert!((point - Vec3::new(2.0, 4.0, 6.0)).length() < 1e-6);
        assert_eq!(uniform.tint, [1.0, 0.5, 0.25, 1.0]);
    }

    #[test]
    fn test_slot_offsets() {
        assert_eq!(buffer_helpers::slot_offset(0), 0);
        assert_eq!(buffer_helpers::slot_offset(3), 768);
    }
}
