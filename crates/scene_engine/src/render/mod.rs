//! Rendering collaborators
//!
//! Device-free stand-ins for the pieces the scene core depends on: mesh
//! storage, the material registry and the device seam a render group is
//! executed against.

pub mod device;
pub mod material;
pub mod mesh;
pub mod primitives;

pub use device::{DeviceCommand, RecordingDevice, RenderDevice};
pub use material::{
    Material, MaterialCatalog, MaterialError, MaterialId, MaterialPrototype, MaterialRegistry,
    ShaderId, ShaderSet, UniformDesc, UniformKind,
};
pub use mesh::{MeshBuffer, MeshBufferId, MeshError, MeshRef, MeshRegistry, Vertex};
