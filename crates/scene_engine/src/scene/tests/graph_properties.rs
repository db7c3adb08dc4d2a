//! Scene graph behaviour: node counting, traversal order, world matrices,
//! teardown and stack regeneration

use crate::core::config::{NodeCountPolicy, SceneGraphConfig, DEFAULT_STACK_CAPACITY};
use crate::foundation::math::{Mat4, Point3, Quat, Transform, Vec3};
use crate::render::mesh::MeshRef;
use crate::scene::{NodeId, SceneGraph};
use approx::assert_relative_eq;

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-6;

    fn node_at(graph: &mut SceneGraph, x: f32, y: f32, z: f32) -> NodeId {
        graph.create_node(
            Transform::from_position(Vec3::new(x, y, z)),
            MeshRef::empty(),
            None,
        )
    }

    fn visit_order(graph: &mut SceneGraph) -> Vec<NodeId> {
        let mut order = Vec::new();
        graph.traverse(|node, _, _| order.push(node.id()));
        order
    }

    /// root -> A -> {B, C}, B -> {D}
    fn reference_tree(graph: &mut SceneGraph) -> [NodeId; 4] {
        let a = node_at(graph, 0.0, 0.0, 0.0);
        let b = node_at(graph, 0.0, 0.0, 0.0);
        let c = node_at(graph, 0.0, 0.0, 0.0);
        let d = node_at(graph, 0.0, 0.0, 0.0);
        graph.add_to_root(a);
        graph.add_child(a, b);
        graph.add_child(a, c);
        graph.add_child(b, d);
        [a, b, c, d]
    }

    #[test]
    fn test_node_count_matches_reachable_after_every_add() {
        let mut graph = SceneGraph::new();
        let mut parents = vec![graph.root()];

        for i in 0..40 {
            let node = node_at(&mut graph, i as f32, 0.0, 0.0);
            let parent = parents[i % parents.len()];
            graph.add_child(parent, node);
            parents.push(node);

            assert_eq!(graph.node_count(), graph.count_reachable());
        }
        assert_eq!(graph.node_count(), 41);
    }

    #[test]
    fn test_node_count_matches_reachable_after_subtree_attach() {
        let mut graph = SceneGraph::new();
        let top = node_at(&mut graph, 0.0, 0.0, 0.0);
        let mut cursor = top;
        for _ in 0..5 {
            let next = node_at(&mut graph, 0.0, 0.0, 0.0);
            graph.add_child(cursor, next);
            cursor = next;
        }
        assert_eq!(graph.node_count(), 1);

        graph.add_to_root(top);
        assert_eq!(graph.node_count(), 7);
        assert_eq!(graph.count_reachable(), 7);
    }

    #[test]
    fn test_removing_non_leaf_subtracts_subtree_size() {
        let mut graph = SceneGraph::new();
        let [a, b, _, _] = reference_tree(&mut graph);
        assert_eq!(graph.node_count(), 5);

        // B and D
        assert_eq!(graph.remove_child(a, b), 2);
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.count_reachable(), 3);
    }

    #[test]
    fn test_legacy_count_drifts_on_non_leaf_removal() {
        let config = SceneGraphConfig::default().with_node_count_policy(NodeCountPolicy::Legacy);
        let mut graph = SceneGraph::with_config(&config);
        let [a, b, _, _] = reference_tree(&mut graph);
        assert_eq!(graph.node_count(), 5);

        assert_eq!(graph.remove_child(a, b), 2);
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.count_reachable(), 3);
    }

    #[test]
    fn test_traversal_order_is_reverse_child_dfs() {
        let mut graph = SceneGraph::new();
        let [a, b, c, d] = reference_tree(&mut graph);

        assert_eq!(visit_order(&mut graph), vec![graph.root(), a, c, b, d]);
        // Stable across repeated walks
        assert_eq!(visit_order(&mut graph), vec![graph.root(), a, c, b, d]);
    }

    #[test]
    fn test_traversal_depths() {
        let mut graph = SceneGraph::new();
        let [a, b, c, d] = reference_tree(&mut graph);
        let root = graph.root();

        let mut depths = Vec::new();
        graph.traverse(|node, _, depth| depths.push((node.id(), depth)));
        assert_eq!(depths, vec![(root, 0), (a, 1), (c, 2), (b, 2), (d, 3)]);
    }

    #[test]
    fn test_world_matrix_composes_translations() {
        let mut graph = SceneGraph::new();
        let a = node_at(&mut graph, 1.0, 0.0, 0.0);
        let b = node_at(&mut graph, 0.0, 1.0, 0.0);
        graph.add_to_root(a);
        graph.add_child(a, b);

        let mut world_b = None;
        graph.traverse(|node, world, _| {
            if node.id() == b {
                world_b = Some(*world);
            }
        });
        let world_b = world_b.unwrap();

        assert_relative_eq!(world_b[(0, 3)], 1.0, epsilon = EPSILON);
        assert_relative_eq!(world_b[(1, 3)], 1.0, epsilon = EPSILON);
        assert_relative_eq!(world_b[(2, 3)], 0.0, epsilon = EPSILON);

        let origin = world_b.transform_point(&Point3::origin());
        assert_relative_eq!(origin.coords, Vec3::new(1.0, 1.0, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn test_world_matrix_applies_parent_rotation_and_scale() {
        let mut graph = SceneGraph::new();
        let parent = graph.create_node(
            Transform::identity()
                .with_scale(Vec3::new(2.0, 2.0, 2.0))
                .with_rotation(Quat::from_axis_angle(
                    &Vec3::z_axis(),
                    std::f32::consts::FRAC_PI_2,
                )),
            MeshRef::empty(),
            None,
        );
        let child = node_at(&mut graph, 1.0, 0.0, 0.0);
        graph.add_to_root(parent);
        graph.add_child(parent, child);

        let mut world_child = None;
        graph.traverse(|node, world, _| {
            if node.id() == child {
                world_child = Some(*world);
            }
        });

        // (1, 0, 0) scaled by 2 then rotated a quarter turn about z
        let origin = world_child
            .unwrap()
            .transform_point(&Point3::origin());
        assert_relative_eq!(origin.coords, Vec3::new(0.0, 2.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_root_transform_is_not_applied() {
        let mut graph = SceneGraph::new();
        let root = graph.root();
        graph
            .set_transform(root, Transform::from_position(Vec3::new(5.0, 5.0, 5.0)))
            .unwrap();
        let a = node_at(&mut graph, 1.0, 0.0, 0.0);
        graph.add_to_root(a);

        let mut worlds = Vec::new();
        graph.traverse(|_, world, _| worlds.push(*world));
        assert_relative_eq!(worlds[0], Mat4::identity(), epsilon = EPSILON);
        assert_relative_eq!(worlds[1][(0, 3)], 1.0, epsilon = EPSILON);
    }

    #[test]
    fn test_destroy_frees_every_attached_node_once() {
        let mut graph = SceneGraph::new();
        reference_tree(&mut graph);
        let extra = node_at(&mut graph, 0.0, 0.0, 0.0);
        graph.add_to_root(extra);

        assert_eq!(graph.destroy(), 6);
    }

    #[test]
    fn test_destroy_deep_chain() {
        let mut graph = SceneGraph::new();
        let mut parent = graph.root();
        for _ in 0..2_000 {
            let node = node_at(&mut graph, 0.0, 0.0, 0.0);
            graph.add_child(parent, node);
            parent = node;
        }
        assert_eq!(graph.count_reachable(), 2_001);
        assert_eq!(graph.destroy(), 2_001);
    }

    #[test]
    fn test_capacity_regeneration_past_default() {
        let mut graph = SceneGraph::new();
        assert_eq!(graph.stack_capacity(), DEFAULT_STACK_CAPACITY);

        let mut added = Vec::new();
        for _ in 0..DEFAULT_STACK_CAPACITY {
            let node = node_at(&mut graph, 0.0, 0.0, 0.0);
            graph.add_to_root(node);
            added.push(node);
        }
        assert!(graph.is_dirty());
        assert_eq!(graph.node_count(), DEFAULT_STACK_CAPACITY + 1);

        let order = visit_order(&mut graph);
        assert_eq!(order.len(), DEFAULT_STACK_CAPACITY + 1);
        assert!(!graph.is_dirty());
        assert_eq!(graph.stack_capacity(), DEFAULT_STACK_CAPACITY * 2);

        // Each node exactly once; siblings last-to-first
        let mut expected = vec![graph.root()];
        expected.extend(added.iter().rev());
        assert_eq!(order, expected);
    }

    #[test]
    fn test_dirty_cleared_without_growth_after_removals() {
        let config = SceneGraphConfig::default().with_initial_stack_capacity(2);
        let mut graph = SceneGraph::with_config(&config);
        let a = node_at(&mut graph, 0.0, 0.0, 0.0);
        let b = node_at(&mut graph, 0.0, 0.0, 0.0);
        graph.add_to_root(a);
        graph.add_to_root(b);
        assert!(graph.is_dirty());

        graph.remove_from_root(b);
        assert_eq!(graph.count_reachable(), 2);
        assert!(!graph.is_dirty());
        assert_eq!(graph.stack_capacity(), 2);
    }

    #[test]
    fn test_copy_keeps_traversal_order() {
        let mut graph = SceneGraph::new();
        let [a, ..] = reference_tree(&mut graph);
        let mut copy = SceneGraph::from_subtree(&graph, a, &SceneGraphConfig::default()).unwrap();

        let depths: Vec<u32> = {
            let mut depths = Vec::new();
            copy.traverse(|_, _, depth| depths.push(depth));
            depths
        };
        assert_eq!(depths, vec![0, 1, 1, 2]);
    }
}
