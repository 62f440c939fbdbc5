/// GPU resources: buffers, images, meshes and shader binaries

pub mod resource_manager;
pub mod mesh;
pub mod shader;

pub use resource_manager::*;
pub use mesh::*;
pub use shader::*;
