//! # Scene Engine
//!
//! A hierarchical scene graph with a material-batching render-group
//! compiler.
//!
//! ## Features
//!
//! - **Scene Graph**: arena-backed node tree with generational ids and a
//!   traversal engine that reuses preallocated stacks
//! - **Render Groups**: one traversal compiled into `Swap`/`Draw` items so
//!   each material is bound once per frame
//! - **Staleness Tracking**: structural and transform versions let a frame
//!   driver rebuild, refresh or reuse a cached group
//! - **Collaborators**: in-memory mesh storage, material registry with
//!   prototypes, and a device trait to submit against
//!
//! ## Quick Start
//!
//! ```rust
//! use scene_engine::prelude::*;
//!
//! let mut materials = MaterialRegistry::new();
//! let lit = materials
//!     .add_material("lit", Material::new(ShaderSet::new(ShaderId(1), ShaderId(2)), Vec::new()))
//!     .unwrap();
//!
//! let mut meshes = MeshRegistry::new();
//! let (vertices, indices) = primitives::cube();
//! let cube = meshes.add_mesh("cube", &vertices, &indices).unwrap();
//!
//! let mut graph = SceneGraph::new();
//! let node = graph.create_node(Transform::from_position(Vec3::new(1.0, 0.0, 0.0)), cube, Some(lit));
//! graph.add_to_root(node);
//!
//! let group = RenderGroup::build(&mut graph, &materials, &RenderGroupConfig::default());
//! let mut device = RecordingDevice::new();
//! let stats = group.execute(&graph, &mut device);
//! assert_eq!((stats.swaps, stats.draws), (1, 1));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::cast_precision_loss)]

pub mod config;
pub mod core;
pub mod foundation;
pub mod render;
pub mod scene;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::Config,
        core::config::{
            ApplicationConfig, MaterialOrder, NodeCountPolicy, RenderGroupConfig, SceneGraphConfig,
        },
        foundation::math::{Mat4, Transform, Vec3},
        render::{
            primitives, Material, MaterialCatalog, MaterialId, MaterialRegistry, MeshRef,
            MeshRegistry, RecordingDevice, RenderDevice, ShaderId, ShaderSet,
        },
        scene::{
            NodeId, RenderGroup, RenderItem, RenderStats, SceneError, SceneGraph, SceneNode,
            SceneRenderer, Staleness,
        },
    };
}
