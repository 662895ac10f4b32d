/// Embedded shader sources and the fixed-function state each one is drawn with
use wgpu::{BlendState, CompareFunction, VertexAttribute, VertexBufferLayout};

use crate::renderer::buffers::{ColorBuffer, TextureBuffer, VertexBuffer};

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderKind {
    Sky,
    Body,
    Star,
}

impl ShaderKind {
    pub const ALL: [ShaderKind; 3] = [ShaderKind::Sky, ShaderKind::Body, ShaderKind::Star];

    pub fn label(&self) -> &'static str {
        match self {
            ShaderKind::Sky => "Sky Shader",
            ShaderKind::Body => "Body Shader",
            ShaderKind::Star => "Star Shader",
        }
    }

    pub fn source(&self) -> &'static str {
        match self {
            ShaderKind::Sky => include_str!("../../shaders/sky.wgsl"),
            ShaderKind::Body => include_str!("../../shaders/body.wgsl"),
            ShaderKind::Star => include_str!("../../shaders/star.wgsl"),
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        match self {
            // Background: never occludes, never occluded
            ShaderKind::Sky => PipelineConfig {
                depth_write: false,
                depth_compare: CompareFunction::Always,
                blend: Some(BlendState::REPLACE),
            },
            ShaderKind::Body => PipelineConfig {
                depth_write: true,
                depth_compare: CompareFunction::Less,
                blend: Some(BlendState::ALPHA_BLENDING),
            },
            ShaderKind::Star => PipelineConfig {
                depth_write: false,
                depth_compare: CompareFunction::Less,
                blend: Some(BlendState::ALPHA_BLENDING),
            },
        }
    }
}

/// Depth and blend state for one pipeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    pub depth_write: bool,
    pub depth_compare: CompareFunction,
    pub blend: Option<BlendState>,
}

impl PipelineConfig {
    pub fn depth_stencil(&self) -> wgpu::DepthStencilState {
        wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: self.depth_write,
            depth_compare: self.depth_compare,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }
    }
}

const POSITION_ATTRIBUTES: [VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];
const TEXCOORD_ATTRIBUTES: [VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x2];
const COLOR_ATTRIBUTES: [VertexAttribute; 1] = wgpu::vertex_attr_array![2 => Float32x4];

/// One buffer per attribute channel, in slot order
pub fn vertex_buffer_layouts() -> [VertexBufferLayout<'static>; 3] {
    [
        VertexBufferLayout {
            array_stride: VertexBuffer::stride() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &POSITION_ATTRIBUTES,
        },
        VertexBufferLayout {
            array_stride: TextureBuffer::stride() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &TEXCOORD_ATTRIBUTES,
        },
        VertexBufferLayout {
            array_stride: ColorBuffer::stride() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &COLOR_ATTRIBUTES,
        },
    ]
}

/// Group 2: diffuse texture and its sampler
pub fn create_texture_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Texture Bind Group Layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_states() {
        let sky = ShaderKind::Sky.pipeline_config();
        assert!(!sky.depth_write);
        assert_eq!(sky.depth_compare, CompareFunction::Always);

        let body = ShaderKind::Body.pipeline_config();
        assert!(body.depth_write);
        assert_eq!(body.depth_compare, CompareFunction::Less);

        let star = ShaderKind::Star.pipeline_config();
        assert!(!star.depth_write);
        assert_eq!(star.depth_stencil().format, DEPTH_FORMAT);
    }

    #[test]
    fn test_vertex_layouts_match_slots() {
        let layouts = vertex_buffer_layouts();
        let locations: Vec<u32> = layouts
            .iter()
            .map(|l| l.attributes[0].shader_location)
            .collect();
        assert_eq!(locations, [0, 1, 2]);
        assert_eq!(layouts[0].array_stride, 12);
        assert_eq!(layouts[1].array_stride, 8);
        assert_eq!(layouts[2].array_stride, 16);
    }

    #[test]
    fn test_sources_declare_entry_points() {
        for kind in ShaderKind::ALL {
            let source = kind.source();
            assert!(source.contains("fn vs_main"), "{}", kind.label());
            assert!(source.contains("fn fs_main"), "{}", kind.label());
        }
    }
}
