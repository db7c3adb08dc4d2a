//! Mesh storage and lightweight mesh references
//!
//! All geometry lives in a [`MeshBuffer`]; scene nodes only carry a
//! [`MeshRef`], an index range into that shared buffer. Copying a `MeshRef`
//! never duplicates geometry.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::atomic::{AtomicU32, Ordering};

/// Result type for mesh operations
pub type MeshResult<T> = Result<T, MeshError>;

/// Errors raised by mesh storage
#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    /// A mesh reference points outside its buffer
    #[error("Index range {start}..{end} out of bounds for buffer with {len} indices")]
    IndexOutOfRange {
        /// First index of the requested range
        start: usize,
        /// One past the last index of the requested range
        end: usize,
        /// Number of indices in the buffer
        len: usize,
    },

    /// The reference belongs to another buffer, or to none
    #[error("Mesh reference does not belong to buffer {0:?}")]
    ForeignBuffer(MeshBufferId),

    /// No mesh registered under this name
    #[error("Mesh not found: {0}")]
    NotFound(String),

    /// A mesh with this name already exists
    #[error("Duplicate mesh name: {0}")]
    DuplicateName(String),
}

/// Vertex layout shared by every mesh buffer
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// Object-space position
    pub position: [f32; 3],
    /// Object-space normal
    pub normal: [f32; 3],
    /// Texture coordinates
    pub uv: [f32; 2],
}

impl Vertex {
    /// Create a new vertex
    pub const fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// Identity of a mesh buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshBufferId(pub u32);

static NEXT_BUFFER_ID: AtomicU32 = AtomicU32::new(1);

impl MeshBufferId {
    fn next() -> Self {
        Self(NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Reference to a range of indices in a shared [`MeshBuffer`].
///
/// `index_count == 0` is the "empty" state used for nodes that draw nothing,
/// such as the scene root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MeshRef {
    /// Buffer holding the geometry, `None` for the empty mesh
    pub buffer: Option<MeshBufferId>,
    /// First index of this mesh in the buffer's index list
    pub start_index: u32,
    /// Number of indices to draw
    pub index_count: u32,
    /// Value added to every index before fetching a vertex
    pub base_vertex: u32,
}

impl MeshRef {
    /// The empty mesh
    pub const fn empty() -> Self {
        Self {
            buffer: None,
            start_index: 0,
            index_count: 0,
            base_vertex: 0,
        }
    }

    /// Whether this reference draws nothing
    pub fn is_empty(&self) -> bool {
        self.index_count == 0
    }

    /// Index range covered in the buffer's index list, clamped at `u32::MAX`
    pub fn index_range(&self) -> Range<u32> {
        self.start_index..self.start_index.saturating_add(self.index_count)
    }
}

/// Shared vertex and index storage for many meshes.
///
/// Dirty flags tell the device layer whether its copy is out of date.
#[derive(Debug)]
pub struct MeshBuffer {
    id: MeshBufferId,
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    vertex_dirty: bool,
    index_dirty: bool,
}

impl MeshBuffer {
    /// Create an empty buffer with a fresh identity
    pub fn new() -> Self {
        Self {
            id: MeshBufferId::next(),
            vertices: Vec::new(),
            indices: Vec::new(),
            vertex_dirty: true,
            index_dirty: true,
        }
    }

    /// Buffer identity
    pub fn id(&self) -> MeshBufferId {
        self.id
    }

    /// Append a mesh and return a reference to it.
    ///
    /// Indices stay relative to the mesh's own vertices; the returned
    /// `base_vertex` offsets them into the shared vertex list.
    pub fn add_mesh(&mut self, vertices: &[Vertex], indices: &[u32]) -> MeshRef {
        let mesh = MeshRef {
            buffer: Some(self.id),
            start_index: self.indices.len() as u32,
            index_count: indices.len() as u32,
            base_vertex: self.vertices.len() as u32,
        };

        self.vertices.extend_from_slice(vertices);
        self.indices.extend_from_slice(indices);
        self.vertex_dirty = true;
        self.index_dirty = true;

        mesh
    }

    /// Indices of one mesh
    pub fn indices(&self, mesh: &MeshRef) -> MeshResult<&[u32]> {
        if mesh.buffer != Some(self.id) {
            return Err(MeshError::ForeignBuffer(self.id));
        }
        let range = mesh.index_range();
        let (start, end) = (range.start as usize, range.end as usize);
        self.indices.get(start..end).ok_or(MeshError::IndexOutOfRange {
            start,
            end,
            len: self.indices.len(),
        })
    }

    /// Vertices of one mesh in index order (one entry per index)
    pub fn vertices(&self, mesh: &MeshRef) -> MeshResult<Vec<Vertex>> {
        let indices = self.indices(mesh)?;
        indices
            .iter()
            .map(|&index| {
                let at = (index + mesh.base_vertex) as usize;
                self.vertices
                    .get(at)
                    .copied()
                    .ok_or(MeshError::IndexOutOfRange {
                        start: at,
                        end: at + 1,
                        len: self.vertices.len(),
                    })
            })
            .collect()
    }

    /// Raw vertex bytes for upload
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Raw index bytes for upload
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Whether vertices or indices changed since the last upload
    pub fn is_dirty(&self) -> bool {
        self.vertex_dirty || self.index_dirty
    }

    /// Mark the device copy as current
    pub fn mark_uploaded(&mut self) {
        self.vertex_dirty = false;
        self.index_dirty = false;
    }

    /// Total vertex count
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Total index count
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }
}

impl Default for MeshBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Named meshes packed into one shared buffer
#[derive(Debug, Default)]
pub struct MeshRegistry {
    buffer: MeshBuffer,
    meshes: HashMap<String, MeshRef>,
}

impl MeshRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named mesh
    pub fn add_mesh(
        &mut self,
        name: impl Into<String>,
        vertices: &[Vertex],
        indices: &[u32],
    ) -> MeshResult<MeshRef> {
        let name = name.into();
        if self.meshes.contains_key(&name) {
            return Err(MeshError::DuplicateName(name));
        }

        let mesh = self.buffer.add_mesh(vertices, indices);
        log::debug!(
            "Registered mesh '{}' ({} vertices, {} indices)",
            name,
            vertices.len(),
            indices.len()
        );
        self.meshes.insert(name, mesh);
        Ok(mesh)
    }

    /// Look up a mesh by name
    pub fn get(&self, name: &str) -> MeshResult<MeshRef> {
        self.meshes.get(name).copied().ok_or_else(|| {
            log::warn!("Failed to find mesh: {}", name);
            MeshError::NotFound(name.to_string())
        })
    }

    /// The shared buffer
    pub fn buffer(&self) -> &MeshBuffer {
        &self.buffer
    }

    /// Mutable access to the shared buffer
    pub fn buffer_mut(&mut self) -> &mut MeshBuffer {
        &mut self.buffer
    }

    /// Number of registered meshes
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    /// Whether no mesh is registered
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::primitives;

    #[test]
    fn test_empty_mesh() {
        let mesh = MeshRef::empty();
        assert!(mesh.is_empty());
        assert_eq!(mesh.buffer, None);
        assert_eq!(MeshRef::default(), mesh);
    }

    #[test]
    fn test_index_range_clamps_at_u32_max() {
        let mut buffer = MeshBuffer::new();
        let (vertices, indices) = primitives::quad();
        buffer.add_mesh(&vertices, &indices);

        let mesh = MeshRef {
            buffer: Some(buffer.id()),
            start_index: u32::MAX - 1,
            index_count: 3,
            base_vertex: 0,
        };
        assert_eq!(mesh.index_range(), (u32::MAX - 1)..u32::MAX);
        assert!(matches!(buffer.indices(&mesh), Err(MeshError::IndexOutOfRange { .. })));
    }

    #[test]
    fn test_meshes_share_one_buffer() {
        let mut buffer = MeshBuffer::new();
        let (cube_vertices, cube_indices) = primitives::cube();
        let (quad_vertices, quad_indices) = primitives::quad();

        let cube = buffer.add_mesh(&cube_vertices, &cube_indices);
        let quad = buffer.add_mesh(&quad_vertices, &quad_indices);

        assert_eq!(cube.start_index, 0);
        assert_eq!(cube.base_vertex, 0);
        assert_eq!(quad.start_index, cube.index_count);
        assert_eq!(quad.base_vertex, cube_vertices.len() as u32);
        assert_eq!(buffer.indices(&quad).unwrap(), quad_indices.as_slice());
        assert_eq!(buffer.vertices(&quad).unwrap()[0], quad_vertices[quad_indices[0] as usize]);
    }

    #[test]
    fn test_dirty_tracking_and_bytes() {
        let mut buffer = MeshBuffer::new();
        let (vertices, indices) = primitives::quad();
        buffer.add_mesh(&vertices, &indices);
        assert!(buffer.is_dirty());
        assert_eq!(buffer.vertex_bytes().len(), vertices.len() * std::mem::size_of::<Vertex>());
        assert_eq!(buffer.index_bytes().len(), indices.len() * 4);

        buffer.mark_uploaded();
        assert!(!buffer.is_dirty());
    }

    #[test]
    fn test_foreign_reference_rejected() {
        let mut first = MeshBuffer::new();
        let second = MeshBuffer::new();
        let (vertices, indices) = primitives::quad();
        let mesh = first.add_mesh(&vertices, &indices);

        assert!(matches!(second.indices(&mesh), Err(MeshError::ForeignBuffer(_))));
        assert!(first.indices(&MeshRef::empty()).is_err());
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry = MeshRegistry::new();
        let (vertices, indices) = primitives::cube();
        let cube = registry.add_mesh("cube", &vertices, &indices).unwrap();

        assert_eq!(registry.get("cube").unwrap(), cube);
        assert!(matches!(registry.get("teapot"), Err(MeshError::NotFound(_))));
        assert!(matches!(
            registry.add_mesh("cube", &vertices, &indices),
            Err(MeshError::DuplicateName(_))
        ));
        assert_eq!(registry.len(), 1);
    }
}
