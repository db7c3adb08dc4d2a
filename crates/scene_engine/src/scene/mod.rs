//! Scene graph and render-group compilation
//!
//! ## Architecture
//!
//! ```text
//! SceneGraph (arena of SceneNodes, reusable traversal stacks)
//!      ↓ traverse
//! RenderGroup (Swap / Draw items batched by material)
//!      ↓ execute
//! RenderDevice (bind material, draw mesh)
//! ```
//!
//! [`SceneRenderer`] ties the last two steps together per frame and decides
//! when a group has to be rebuilt.

mod error;
mod node;
mod render_group;
mod scene_graph;
mod scene_renderer;

#[cfg(test)]
mod tests;

pub use error::{SceneError, SceneResult};
pub use node::{GraphId, NodeId, SceneNode};
pub use render_group::{
    RenderGroup, RenderGroupError, RenderGroupResult, RenderItem, RenderStats, Staleness,
};
pub use scene_graph::SceneGraph;
pub use scene_renderer::{FrameAction, SceneRenderer};
