/// Rendering substrate on wgpu: buffers, shaders, textures, camera and the scene renderer
pub mod buffers;
pub mod camera;
pub mod scene_renderer;
pub mod shader;
pub mod shaders;
pub mod textures;
pub mod uniforms;

pub use buffers::{ColorBuffer, GpuBuffer, IndexBuffer, TextureBuffer, VertexBuffer};
pub use camera::{Camera, Ray};
pub use scene_renderer::{FrameResources, RendererState, SceneRenderer};
pub use shader::{ShaderProgram, ShaderReflection};
pub use shaders::ShaderKind;
pub use textures::{TextureAsset, TextureManager};
