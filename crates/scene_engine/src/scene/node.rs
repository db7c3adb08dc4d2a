//! Scene nodes
//!
//! Nodes live in the arena of a [`SceneGraph`](super::SceneGraph) and refer
//! to each other by [`NodeId`]. Parent and graph links are plain ids, so they
//! never keep anything alive.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::foundation::math::Transform;
use crate::render::material::MaterialId;
use crate::render::mesh::MeshRef;

slotmap::new_key_type! {
    /// Generational handle to a node in a scene graph arena
    pub struct NodeId;
}

/// Process-unique identity of a scene graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GraphId(u64);

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(1);

impl GraphId {
    pub(crate) fn next() -> Self {
        Self(NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A node of the scene tree
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub(crate) id: NodeId,
    pub(crate) transform: Transform,
    pub(crate) mesh: MeshRef,
    pub(crate) material: Option<MaterialId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) graph: Option<GraphId>,
}

impl SceneNode {
    pub(crate) fn new(
        id: NodeId,
        transform: Transform,
        mesh: MeshRef,
        material: Option<MaterialId>,
    ) -> Self {
        Self {
            id,
            transform,
            mesh,
            material,
            children: Vec::new(),
            parent: None,
            graph: None,
        }
    }

    /// This node's handle
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Local transform relative to the parent
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Mesh reference, possibly empty
    pub fn mesh(&self) -> MeshRef {
        self.mesh
    }

    /// Material, if any. Never owned by the node.
    pub fn material(&self) -> Option<MaterialId> {
        self.material
    }

    /// Children in insertion order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Parent node, `None` for the root and for detached subtree roots
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Graph whose tree this node is attached to
    pub fn graph(&self) -> Option<GraphId> {
        self.graph
    }

    /// Whether this node produces a draw: it needs both a material and a
    /// non-empty mesh
    pub fn is_drawable(&self) -> bool {
        self.material.is_some() && !self.mesh.is_empty()
    }
}
