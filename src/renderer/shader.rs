/// Shader program: WGSL validated and reflected up front, then linked into a render pipeline
use std::collections::HashMap;

use naga::{
    Binding, ShaderStage, TypeInner,
    valid::{Capabilities, ValidationFlags, Validator},
};
use wgpu::{BindGroupLayout, Device, RenderPass, RenderPipeline, TextureFormat};

use super::shaders::{PipelineConfig, ShaderKind, vertex_buffer_layouts};
use crate::{SkydomeError, SkydomeResult};

pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformLocation {
    pub group: u32,
    pub binding: u32,
}

/// Names the shader declares, resolved to their binding points
#[derive(Debug, Clone, Default)]
pub struct ShaderReflection {
    uniforms: HashMap<String, UniformLocation>,
    attributes: HashMap<String, u32>,
}

impl ShaderReflection {
    /// Parse and validate WGSL, failing if either entry point is missing
    pub fn reflect(label: &str, source: &str) -> SkydomeResult<Self> {
        let compile_error = |message: String| SkydomeError::ShaderCompile {
            label: label.to_string(),
            message,
        };

        let module = naga::front::wgsl::parse_str(source)
            .map_err(|e| compile_error(e.emit_to_string(source)))?;

        Validator::new(ValidationFlags::all(), Capabilities::all())
            .validate(&module)
            .map_err(|e| compile_error(e.emit_to_string(source)))?;

        let vertex = module
            .entry_points
            .iter()
            .find(|ep| ep.name == VERTEX_ENTRY && ep.stage == ShaderStage::Vertex)
            .ok_or_else(|| compile_error(format!("missing @vertex fn {}", VERTEX_ENTRY)))?;

        if !module
            .entry_points
            .iter()
            .any(|ep| ep.name == FRAGMENT_ENTRY && ep.stage == ShaderStage::Fragment)
        {
            return Err(compile_error(format!("missing @fragment fn {}", FRAGMENT_ENTRY)));
        }

        let uniforms = module
            .global_variables
            .iter()
            .filter_map(|(_, var)| {
                let name = var.name.clone()?;
                let binding = var.binding.as_ref()?;
                Some((
                    name,
                    UniformLocation {
                        group: binding.group,
                        binding: binding.binding,
                    },
                ))
            })
            .collect();

        let mut attributes = HashMap::new();
        for argument in &vertex.function.arguments {
            match (&argument.binding, &argument.name) {
                (Some(Binding::Location { location, .. }), Some(name)) => {
                    attributes.insert(name.clone(), *location);
                }
                (None, _) => {
                    if let TypeInner::Struct { members, .. } = &module.types[argument.ty].inner {
                        for member in members {
                            if let (Some(Binding::Location { location, .. }), Some(name)) =
                                (&member.binding, &member.name)
                            {
                                attributes.insert(name.clone(), *location);
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        Ok(Self {
            uniforms,
            attributes,
        })
    }

    pub fn uniform_location(&self, name: &str) -> Option<UniformLocation> {
        self.uniforms.get(name).copied()
    }

    pub fn attribute_location(&self, name: &str) -> Option<u32> {
        self.attributes.get(name).copied()
    }
}

pub struct ShaderProgram {
    label: String,
    pipeline: RenderPipeline,
    reflection: ShaderReflection,
}

impl ShaderProgram {
    pub fn from_kind(
        device: &Device,
        kind: ShaderKind,
        bind_group_layouts: &[&BindGroupLayout],
        color_format: TextureFormat,
    ) -> SkydomeResult<Self> {
        Self::compile(
            device,
            kind.label(),
            kind.source(),
            &kind.pipeline_config(),
            bind_group_layouts,
            color_format,
        )
    }

    /// Validate, reflect and link. Any failure is fatal for this program.
    pub fn compile(
        device: &Device,
        label: &str,
        source: &str,
        config: &PipelineConfig,
        bind_group_layouts: &[&BindGroupLayout],
        color_format: TextureFormat,
    ) -> SkydomeResult<Self> {
        let reflection = ShaderReflection::reflect(label, source)?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts,
            push_constant_ranges: &[],
        });

        let buffers = vertex_buffer_layouts();
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some(VERTEX_ENTRY),
                buffers: &buffers,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some(FRAGMENT_ENTRY),
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_format,
                    blend: config.blend,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(config.depth_stencil()),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        });

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            log::error!("Failed to link {}: {}", label, error);
            return Err(SkydomeError::ShaderCompile {
                label: label.to_string(),
                message: error.to_string(),
            });
        }

        log::info!("Compiled {}", label);

        Ok(Self {
            label: label.to_string(),
            pipeline,
            reflection,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn uniform_location(&self, name: &str) -> Option<UniformLocation> {
        self.reflection.uniform_location(name)
    }

    pub fn attribute_location(&self, name: &str) -> Option<u32> {
        self.reflection.attribute_location(name)
    }

    /// Make this program current for subsequent draws in the pass
    pub fn activate(&self, pass: &mut RenderPass<'_>) {
        pass.set_pipeline(&self.pipeline);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflect_embedded_shaders() {
        for kind in ShaderKind::ALL {
            let reflection = ShaderReflection::reflect(kind.label(), kind.source()).unwrap();

            assert_eq!(
                reflection.uniform_location("camera"),
                Some(UniformLocation { group: 0, binding: 0 })
            );
            assert_eq!(
                reflection.uniform_location("model_data"),
                Some(UniformLocation { group: 1, binding: 0 })
            );
            assert_eq!(
                reflection.uniform_location("t_diffuse"),
                Some(UniformLocation { group: 2, binding: 0 })
            );
            assert_eq!(
                reflection.uniform_location("s_diffuse"),
                Some(UniformLocation { group: 2, binding: 1 })
            );

            assert_eq!(reflection.attribute_location("position"), Some(0));
            assert_eq!(reflection.attribute_location("tex_coord"), Some(1));
            assert_eq!(reflection.attribute_location("color"), Some(2));
            assert_eq!(reflection.attribute_location("normal"), None);
        }
    }

    #[test]
    fn test_reflect_plain_arguments() {
        let source = r#"
            @vertex
            fn vs_main(@location(3) offset: vec2<f32>) -> @builtin(position) vec4<f32> {
                return vec4<f32>(offset, 0.0, 1.0);
            }

            @fragment
            fn fs_main() -> @location(0) vec4<f32> {
                return vec4<f32>(1.0);
            }
        "#;
        let reflection = ShaderReflection::reflect("plain", source).unwrap();
        assert_eq!(reflection.attribute_location("offset"), Some(3));
        assert_eq!(reflection.uniform_location("camera"), None);
    }

    #[test]
    fn test_invalid_wgsl_fails() {
        let result = ShaderReflection::reflect("broken", "fn vs_main( {");
        assert!(matches!(
            result,
            Err(SkydomeError::ShaderCompile { ref label, .. }) if label == "broken"
        ));
    }

    #[test]
    fn test_type_error_fails_validation() {
        let source = r#"
            @vertex
            fn vs_main() -> @builtin(position) vec4<f32> {
                let x: f32 = 1u;
                return vec4<f32>(x);
            }

            @fragment
            fn fs_main() -> @location(0) vec4<f32> {
                return vec4<f32>(1.0);
            }
        "#;
        assert!(ShaderReflection::reflect("typed", source).is_err());
    }

    #[test]
    fn test_missing_entry_point_fails() {
        let source = r#"
            @vertex
            fn vs_main() -> @builtin(position) vec4<f32> {
                return vec4<f32>(0.0, 0.0, 0.0, 1.0);
            }
        "#;
        let error = ShaderReflection::reflect("no fragment", source).unwrap_err();
        assert!(error.to_string().contains(FRAGMENT_ENTRY));
    }
}
