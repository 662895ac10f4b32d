pub mod geometry;
pub mod mesh;
/// Procedural geometry and the GPU buffers built from it
pub use geometry::{GeometryMesh, generate_disc, generate_sphere};
pub use mesh::{MeshBuffers, VertexColors};
