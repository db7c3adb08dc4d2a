//! Scene graph errors

use super::node::NodeId;

/// Result type for scene graph operations
pub type SceneResult<T> = Result<T, SceneError>;

/// Misuse of the scene graph API.
///
/// The panicking API (`add_child`, `remove_child`, ...) raises these as
/// fatal assertions; the `try_` variants return them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    /// The id is stale or belongs to another graph
    #[error("Node {0:?} does not exist in this graph")]
    NodeNotFound(NodeId),

    /// The node already has a parent
    #[error("Node {0:?} is already attached")]
    AlreadyAttached(NodeId),

    /// The node is not a direct child of the given parent
    #[error("Node {child:?} is not a child of {parent:?}")]
    NotAChild {
        /// Expected parent
        parent: NodeId,
        /// Node that was not found among its children
        child: NodeId,
    },

    /// The node has no parent
    #[error("Node {0:?} has no parent")]
    NotAttached(NodeId),

    /// The graph root cannot be re-parented, removed or destroyed
    #[error("Operation not allowed on the graph root")]
    RootNode,

    /// The child is an ancestor of the parent
    #[error("Attaching {child:?} under {parent:?} would create a cycle")]
    Cycle {
        /// Requested parent
        parent: NodeId,
        /// Requested child
        child: NodeId,
    },
}
