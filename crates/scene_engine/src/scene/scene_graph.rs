//! Hierarchical scene graph
//!
//! The graph owns every node in a slot-map arena, a root node and three
//! parallel traversal buffers (node, world matrix, depth) that are reused by
//! every traversal so that walking the tree does not allocate.
//!
//! ## Lifecycle of the traversal buffers
//!
//! ```text
//! Clean --(add_child past capacity)--> Dirty --(traverse: regenerate)--> Clean
//! ```
//!
//! The buffers are scratch space. Their contents between traversals mean
//! nothing and are never read.

use std::fmt;

use slotmap::SlotMap;

use super::error::{SceneError, SceneResult};
use super::node::{GraphId, NodeId, SceneNode};
use crate::core::config::{NodeCountPolicy, SceneGraphConfig};
use crate::foundation::math::{Mat4, Transform};
use crate::render::material::MaterialId;
use crate::render::mesh::MeshRef;

/// Flattened copy of a node used while duplicating subtrees
#[derive(Debug, Clone, Copy)]
struct NodeSnapshot {
    /// Index of the parent within the snapshot list
    parent: Option<usize>,
    transform: Transform,
    mesh: MeshRef,
    material: Option<MaterialId>,
}

/// A tree of [`SceneNode`]s with a preallocated traversal engine
#[derive(Debug)]
pub struct SceneGraph {
    id: GraphId,
    nodes: SlotMap<NodeId, SceneNode>,
    root: NodeId,

    /// Nodes attached under `root`, root included
    node_count: usize,

    node_stack: Vec<NodeId>,
    matrix_stack: Vec<Mat4>,
    depth_stack: Vec<u32>,
    stack_capacity: usize,
    /// Set when `node_count` may exceed `stack_capacity`
    is_dirty: bool,

    structure_version: u64,
    transform_version: u64,
    policy: NodeCountPolicy,
}

impl SceneGraph {
    /// Create a graph with the default configuration
    pub fn new() -> Self {
        Self::with_config(&SceneGraphConfig::default())
    }

    /// Create a graph holding only its root: identity transform, empty mesh,
    /// no material
    pub fn with_config(config: &SceneGraphConfig) -> Self {
        let id = GraphId::next();
        let capacity = config.initial_stack_capacity.max(1);

        let mut nodes = SlotMap::with_key();
        let root = nodes.insert_with_key(|key| {
            let mut node = SceneNode::new(key, Transform::identity(), MeshRef::empty(), None);
            node.graph = Some(id);
            node
        });

        log::debug!(
            "Created scene graph {:?} (stack capacity {}, {:?} node counting)",
            id,
            capacity,
            config.node_count_policy
        );

        Self {
            id,
            nodes,
            root,
            node_count: 1,
            node_stack: Vec::with_capacity(capacity),
            matrix_stack: Vec::with_capacity(capacity),
            depth_stack: Vec::with_capacity(capacity),
            stack_capacity: capacity,
            is_dirty: false,
            structure_version: 0,
            transform_version: 0,
            policy: config.node_count_policy,
        }
    }

    /// Build a new graph whose root is a deep copy of `node` from `source`.
    ///
    /// As for any root, the copied root's own transform is not applied
    /// during traversal.
    pub fn from_subtree(
        source: &SceneGraph,
        node: NodeId,
        config: &SceneGraphConfig,
    ) -> SceneResult<Self> {
        let snapshot = source.snapshot(node, true)?;

        let mut graph = Self::with_config(config);
        let placeholder = graph.root;
        graph.nodes.remove(placeholder);
        graph.root = graph.instantiate(&snapshot, Some(graph.id));
        graph.node_count = snapshot.len();
        graph.is_dirty = graph.node_count > graph.stack_capacity;

        Ok(graph)
    }

    /// Identity of this graph
    pub fn id(&self) -> GraphId {
        self.id
    }

    /// The root node
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes attached to the tree, root included
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Entries available in each traversal buffer
    pub fn stack_capacity(&self) -> usize {
        self.stack_capacity
    }

    /// Whether the traversal buffers must be regenerated before the next walk
    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    /// Bumped by every change that alters what a render group would contain:
    /// attach, remove, material or mesh changes on attached nodes
    pub fn structure_version(&self) -> u64 {
        self.structure_version
    }

    /// Bumped by every transform change on an attached node
    pub fn transform_version(&self) -> u64 {
        self.transform_version
    }

    /// Node counting behaviour this graph was created with
    pub fn node_count_policy(&self) -> NodeCountPolicy {
        self.policy
    }

    /// Look up a node
    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    /// Whether `id` refers to a live node, attached or not
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Parent of a node
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(SceneNode::parent)
    }

    /// Children of a node in insertion order
    pub fn children(&self, id: NodeId) -> Option<&[NodeId]> {
        self.nodes.get(id).map(SceneNode::children)
    }

    /// Create a detached node. It is not counted until attached.
    pub fn create_node(
        &mut self,
        transform: Transform,
        mesh: MeshRef,
        material: Option<MaterialId>,
    ) -> NodeId {
        self.nodes
            .insert_with_key(|key| SceneNode::new(key, transform, mesh, material))
    }

    /// Append `child` to `parent`'s children.
    ///
    /// `child` must have no parent. It inherits `parent`'s graph link; when
    /// that makes it part of this graph's tree, `node_count` grows according
    /// to the node counting policy.
    pub fn try_add_child(&mut self, parent: NodeId, child: NodeId) -> SceneResult<()> {
        let parent_graph = self
            .nodes
            .get(parent)
            .ok_or(SceneError::NodeNotFound(parent))?
            .graph;
        let child_node = self.nodes.get(child).ok_or(SceneError::NodeNotFound(child))?;

        if child == self.root {
            return Err(SceneError::RootNode);
        }
        if child_node.parent.is_some() {
            return Err(SceneError::AlreadyAttached(child));
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(SceneError::Cycle { parent, child });
        }
        let reachable = self.is_reachable(parent);

        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.push(child);
        }
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
            node.graph = parent_graph;
        }

        if parent_graph.is_some() {
            let added = match self.policy {
                NodeCountPolicy::SubtreeSize => self.propagate_graph(child, parent_graph),
                NodeCountPolicy::Legacy => 1,
            };
            self.node_count += added;

            if self.node_count > self.stack_capacity && !self.is_dirty {
                log::trace!(
                    "node_count {} exceeds stack capacity {}, marking graph dirty",
                    self.node_count,
                    self.stack_capacity
                );
                self.is_dirty = true;
            }
        }
        if reachable {
            self.structure_version += 1;
        }

        Ok(())
    }

    /// Panicking form of [`try_add_child`](Self::try_add_child)
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        if let Err(err) = self.try_add_child(parent, child) {
            panic!("add_child precondition violated: {err}");
        }
    }

    /// Attach a parentless node directly under the root
    pub fn try_add_to_root(&mut self, node: NodeId) -> SceneResult<()> {
        self.try_add_child(self.root, node)
    }

    /// Panicking form of [`try_add_to_root`](Self::try_add_to_root)
    pub fn add_to_root(&mut self, node: NodeId) {
        if let Err(err) = self.try_add_to_root(node) {
            panic!("add_to_root precondition violated: {err}");
        }
    }

    /// Remove `child` from `parent` and destroy the whole subtree rooted at
    /// `child`. Remaining children keep their relative order.
    ///
    /// Returns the number of nodes destroyed. Every id in that subtree is
    /// stale afterwards.
    pub fn try_remove_child(&mut self, parent: NodeId, child: NodeId) -> SceneResult<usize> {
        if child == self.root {
            return Err(SceneError::RootNode);
        }
        if !self.nodes.contains_key(child) {
            return Err(SceneError::NodeNotFound(child));
        }
        let parent_node = self
            .nodes
            .get(parent)
            .ok_or(SceneError::NodeNotFound(parent))?;
        let position = parent_node
            .children
            .iter()
            .position(|&c| c == child)
            .ok_or(SceneError::NotAChild { parent, child })?;
        let counted = parent_node.graph.is_some();
        let reachable = self.is_reachable(parent);

        let destroyed = self.free_subtree(child);
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.remove(position);
        }

        if counted {
            let removed = match self.policy {
                NodeCountPolicy::SubtreeSize => destroyed,
                NodeCountPolicy::Legacy => 1,
            };
            self.node_count = self.node_count.saturating_sub(removed);
        }
        if reachable {
            self.structure_version += 1;
        }

        log::trace!("Removed {:?} from {:?}, {} nodes destroyed", child, parent, destroyed);
        Ok(destroyed)
    }

    /// Panicking form of [`try_remove_child`](Self::try_remove_child)
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> usize {
        match self.try_remove_child(parent, child) {
            Ok(destroyed) => destroyed,
            Err(err) => panic!("remove_child precondition violated: {err}"),
        }
    }

    /// Remove and destroy a direct child of the root
    pub fn try_remove_from_root(&mut self, node: NodeId) -> SceneResult<usize> {
        if node != self.root && self.parent(node).is_none() {
            return Err(SceneError::NotAttached(node));
        }
        self.try_remove_child(self.root, node)
    }

    /// Panicking form of [`try_remove_from_root`](Self::try_remove_from_root)
    pub fn remove_from_root(&mut self, node: NodeId) -> usize {
        match self.try_remove_from_root(node) {
            Ok(destroyed) => destroyed,
            Err(err) => panic!("remove_from_root precondition violated: {err}"),
        }
    }

    /// Copy a node. A shallow copy carries transform, mesh and material only.
    /// A deep copy also duplicates every descendant, linking the copies to
    /// each other in the same order. The copy is detached either way.
    pub fn copy_node(&mut self, source: NodeId, deep: bool) -> SceneResult<NodeId> {
        let snapshot = self.snapshot(source, deep)?;
        let copy = self.instantiate(&snapshot, None);
        log::trace!("Copied {:?} into {:?} ({} nodes)", source, copy, snapshot.len());
        Ok(copy)
    }

    /// Destroy a detached subtree, returning how many nodes were freed.
    ///
    /// Attached nodes go through [`try_remove_child`](Self::try_remove_child).
    pub fn destroy_node(&mut self, node: NodeId) -> SceneResult<usize> {
        if node == self.root {
            return Err(SceneError::RootNode);
        }
        let target = self.nodes.get(node).ok_or(SceneError::NodeNotFound(node))?;
        if target.parent.is_some() {
            return Err(SceneError::AlreadyAttached(node));
        }
        Ok(self.free_subtree(node))
    }

    /// Replace a node's local transform
    pub fn set_transform(&mut self, id: NodeId, transform: Transform) -> SceneResult<()> {
        let reachable = self.is_reachable(id);
        let node = self.nodes.get_mut(id).ok_or(SceneError::NodeNotFound(id))?;
        node.transform = transform;
        if reachable {
            self.transform_version += 1;
        }
        Ok(())
    }

    /// Replace a node's material
    pub fn set_material(&mut self, id: NodeId, material: Option<MaterialId>) -> SceneResult<()> {
        let reachable = self.is_reachable(id);
        let node = self.nodes.get_mut(id).ok_or(SceneError::NodeNotFound(id))?;
        node.material = material;
        if reachable {
            self.structure_version += 1;
        }
        Ok(())
    }

    /// Replace a node's mesh
    pub fn set_mesh(&mut self, id: NodeId, mesh: MeshRef) -> SceneResult<()> {
        let reachable = self.is_reachable(id);
        let node = self.nodes.get_mut(id).ok_or(SceneError::NodeNotFound(id))?;
        node.mesh = mesh;
        if reachable {
            self.structure_version += 1;
        }
        Ok(())
    }

    /// Depth-first walk of the tree, calling `visit(node, world_matrix, depth)`
    /// once per attached node. Returns the number of nodes visited.
    ///
    /// The walk pops from a stack onto which each node's children are pushed
    /// in insertion order, so siblings are visited last-to-first and each
    /// subtree is finished before its previous sibling starts. For
    /// root -> A -> {B, C}, B -> {D} the order is root, A, C, B, D.
    ///
    /// The root is visited with the identity matrix; every other node with
    /// `parent_world * node.transform.to_matrix()`.
    pub fn traverse<F>(&mut self, mut visit: F) -> usize
    where
        F: FnMut(&SceneNode, &Mat4, u32),
    {
        if self.is_dirty {
            self.regen_stacks();
        }

        let mut node_stack = std::mem::take(&mut self.node_stack);
        let mut matrix_stack = std::mem::take(&mut self.matrix_stack);
        let mut depth_stack = std::mem::take(&mut self.depth_stack);
        node_stack.clear();
        matrix_stack.clear();
        depth_stack.clear();

        node_stack.push(self.root);
        matrix_stack.push(Mat4::identity());
        depth_stack.push(0);

        let mut visited = 0;
        let mut peak = node_stack.len();

        while let (Some(id), Some(world), Some(depth)) =
            (node_stack.pop(), matrix_stack.pop(), depth_stack.pop())
        {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };

            visit(node, &world, depth);
            visited += 1;

            for &child_id in &node.children {
                if let Some(child) = self.nodes.get(child_id) {
                    node_stack.push(child_id);
                    matrix_stack.push(world * child.transform.to_matrix());
                    depth_stack.push(depth + 1);
                }
            }
            peak = peak.max(node_stack.len());
        }

        if peak > self.stack_capacity {
            log::warn!(
                "Traversal needed {} stack entries but capacity is {} (node_count {} is out of sync with the tree)",
                peak,
                self.stack_capacity,
                self.node_count
            );
        }

        self.node_stack = node_stack;
        self.matrix_stack = matrix_stack;
        self.depth_stack = depth_stack;

        visited
    }

    /// Count attached nodes by walking the tree
    pub fn count_reachable(&mut self) -> usize {
        self.traverse(|_, _, _| {})
    }

    /// Write one line per node, indented by depth
    pub fn print<W: fmt::Write>(&mut self, out: &mut W) -> fmt::Result {
        let mut result = Ok(());
        self.traverse(|node, _, depth| {
            if result.is_err() {
                return;
            }
            let range = node.mesh.index_range();
            result = writeln!(
                out,
                "{:indent$}Node: {:?}, depth: {}, mesh: {}-{}, parent: {:?}",
                "",
                node.id,
                depth,
                range.start,
                range.end,
                node.parent,
                indent = depth as usize * 2
            );
        });
        result
    }

    /// [`print`](Self::print) into a new string
    pub fn dump(&mut self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = self.print(&mut out);
        out
    }

    /// Tear the graph down, freeing every node reached by a traversal.
    /// Returns how many attached nodes were freed.
    pub fn destroy(mut self) -> usize {
        let mut reachable = Vec::with_capacity(self.node_count);
        self.traverse(|node, _, _| reachable.push(node.id));

        for id in &reachable {
            self.nodes.remove(*id);
        }

        log::debug!(
            "Destroyed scene graph {:?}: {} nodes freed, {} detached nodes dropped",
            self.id,
            reachable.len(),
            self.nodes.len()
        );
        reachable.len()
    }

    /// Grow the traversal buffers if `node_count` outgrew them
    fn regen_stacks(&mut self) {
        if self.node_count <= self.stack_capacity {
            self.is_dirty = false;
            return;
        }

        let new_capacity = self.node_count.max(self.stack_capacity * 2);
        log::debug!(
            "Regenerating traversal stacks: {} -> {} entries ({} nodes)",
            self.stack_capacity,
            new_capacity,
            self.node_count
        );

        self.node_stack = Vec::with_capacity(new_capacity);
        self.matrix_stack = Vec::with_capacity(new_capacity);
        self.depth_stack = Vec::with_capacity(new_capacity);
        self.stack_capacity = new_capacity;
        self.is_dirty = false;
    }

    /// Whether `id` hangs under the root through its parent links. Under
    /// [`NodeCountPolicy::Legacy`] this can hold while the graph link is unset.
    fn is_reachable(&self, id: NodeId) -> bool {
        self.is_ancestor_or_self(self.root, id)
    }

    fn is_ancestor_or_self(&self, candidate: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            if id == candidate {
                return true;
            }
            cursor = self.nodes.get(id).and_then(SceneNode::parent);
        }
        false
    }

    /// Set the graph link on a whole subtree, returning its size
    fn propagate_graph(&mut self, top: NodeId, graph: Option<GraphId>) -> usize {
        let mut count = 0;
        let mut stack = vec![top];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(id) {
                node.graph = graph;
                count += 1;
                stack.extend_from_slice(&node.children);
            }
        }
        count
    }

    /// Free a subtree from the arena, returning its size
    fn free_subtree(&mut self, top: NodeId) -> usize {
        let mut count = 0;
        let mut stack = vec![top];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.remove(id) {
                count += 1;
                stack.extend(node.children);
            }
        }
        count
    }

    /// Pre-order copy of a subtree; children keep insertion order
    fn snapshot(&self, top: NodeId, deep: bool) -> SceneResult<Vec<NodeSnapshot>> {
        if !self.nodes.contains_key(top) {
            return Err(SceneError::NodeNotFound(top));
        }

        let mut out = Vec::new();
        let mut stack = vec![(top, None)];
        while let Some((id, parent)) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            let index = out.len();
            out.push(NodeSnapshot {
                parent,
                transform: node.transform,
                mesh: node.mesh,
                material: node.material,
            });
            if deep {
                for &child in node.children.iter().rev() {
                    stack.push((child, Some(index)));
                }
            }
        }
        Ok(out)
    }

    /// Insert a snapshot into this arena, returning the new top node
    fn instantiate(&mut self, snapshot: &[NodeSnapshot], graph: Option<GraphId>) -> NodeId {
        let mut ids: Vec<NodeId> = Vec::with_capacity(snapshot.len());
        for entry in snapshot {
            let parent = entry.parent.map(|index| ids[index]);
            let id = self.nodes.insert_with_key(|key| {
                let mut node = SceneNode::new(key, entry.transform, entry.mesh, entry.material);
                node.parent = parent;
                node.graph = graph;
                node
            });
            if let Some(parent_node) = parent.and_then(|p| self.nodes.get_mut(p)) {
                parent_node.children.push(id);
            }
            ids.push(id);
        }
        ids[0]
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}
