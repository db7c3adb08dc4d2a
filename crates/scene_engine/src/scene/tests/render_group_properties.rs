//! Render group behaviour: skip rule, material grouping, end-to-end submit

use crate::core::config::RenderGroupConfig;
use crate::foundation::math::{Transform, Vec3};
use crate::render::device::{DeviceCommand, RecordingDevice};
use crate::render::material::{Material, MaterialId, MaterialRegistry, ShaderId, ShaderSet};
use crate::render::mesh::{MeshRef, MeshRegistry};
use crate::render::primitives;
use crate::scene::{NodeId, RenderGroup, RenderItem, SceneGraph};
use approx::assert_relative_eq;

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        graph: SceneGraph,
        materials: MaterialRegistry,
        cube: MeshRef,
        quad: MeshRef,
    }

    impl Fixture {
        fn new() -> Self {
            let mut meshes = MeshRegistry::new();
            let (vertices, indices) = primitives::cube();
            let cube = meshes.add_mesh("cube", &vertices, &indices).unwrap();
            let (vertices, indices) = primitives::quad();
            let quad = meshes.add_mesh("quad", &vertices, &indices).unwrap();

            Self {
                graph: SceneGraph::new(),
                materials: MaterialRegistry::new(),
                cube,
                quad,
            }
        }

        fn material(&mut self, name: &str, vertex: u32, fragment: u32) -> MaterialId {
            let shaders = ShaderSet::new(ShaderId(vertex), ShaderId(fragment));
            self.materials
                .add_material(name, Material::new(shaders, Vec::new()))
                .unwrap()
        }

        fn node(&mut self, mesh: MeshRef, material: Option<MaterialId>, x: f32) -> NodeId {
            self.graph.create_node(
                Transform::from_position(Vec3::new(x, 0.0, 0.0)),
                mesh,
                material,
            )
        }

        fn build(&mut self) -> RenderGroup {
            RenderGroup::build(&mut self.graph, &self.materials, &RenderGroupConfig::default())
        }
    }

    #[test]
    fn test_null_material_contributes_nothing() {
        let mut fx = Fixture::new();
        let material = fx.material("lit", 1, 1);
        let bare = fx.node(fx.cube, None, 0.0);
        let drawn = fx.node(fx.cube, Some(material), 1.0);
        fx.graph.add_to_root(bare);
        fx.graph.add_to_root(drawn);

        let group = fx.build();
        assert_eq!(group.len(), 2);
        assert_eq!(group.items()[0], RenderItem::Swap { material });
        assert!(matches!(group.items()[1], RenderItem::Draw { node, .. } if node == drawn));
    }

    #[test]
    fn test_shared_material_is_contiguous() {
        let mut fx = Fixture::new();
        let shared = fx.material("shared", 1, 1);
        let other = fx.material("other", 2, 2);

        // shared nodes far apart in the tree
        let branch = fx.node(MeshRef::empty(), None, 0.0);
        let deep = fx.node(fx.cube, Some(shared), 1.0);
        let middle = fx.node(fx.quad, Some(other), 2.0);
        let shallow = fx.node(fx.quad, Some(shared), 3.0);
        fx.graph.add_to_root(shallow);
        fx.graph.add_to_root(middle);
        fx.graph.add_to_root(branch);
        fx.graph.add_child(branch, deep);

        let group = fx.build();
        let nodes: Vec<_> = group
            .iter()
            .map(|item| match item {
                RenderItem::Swap { material } => Err(*material),
                RenderItem::Draw { node, .. } => Ok(*node),
            })
            .collect();

        // Visit order: root, branch, deep, middle, shallow
        assert_eq!(
            nodes,
            vec![Err(shared), Ok(deep), Ok(shallow), Err(other), Ok(middle)]
        );
    }

    #[test]
    fn test_every_material_appears_once_with_draws() {
        let mut fx = Fixture::new();
        let used = fx.material("used", 1, 2);
        let _unused = fx.material("unused", 0, 0);
        for i in 0..5 {
            let node = fx.node(fx.cube, Some(used), i as f32);
            fx.graph.add_to_root(node);
        }

        let group = fx.build();
        assert_eq!(group.swap_count(), 1);
        assert_eq!(group.draw_count(), 5);
        assert_eq!(group.len(), 6);
    }

    #[test]
    fn test_draw_carries_world_matrix() {
        let mut fx = Fixture::new();
        let material = fx.material("lit", 1, 1);
        let parent = fx.node(MeshRef::empty(), None, 1.0);
        let child = fx.graph.create_node(
            Transform::from_position(Vec3::new(0.0, 1.0, 0.0)),
            fx.cube,
            Some(material),
        );
        fx.graph.add_to_root(parent);
        fx.graph.add_child(parent, child);

        let group = fx.build();
        let RenderItem::Draw { world_matrix, .. } = &group.items()[1] else {
            panic!("expected a draw after the swap");
        };
        assert_relative_eq!(world_matrix[(0, 3)], 1.0);
        assert_relative_eq!(world_matrix[(1, 3)], 1.0);
    }

    #[test]
    fn test_dropping_group_leaves_graph_and_materials() {
        let mut fx = Fixture::new();
        let material = fx.material("lit", 1, 1);
        let node = fx.node(fx.cube, Some(material), 0.0);
        fx.graph.add_to_root(node);

        let group = fx.build();
        drop(group);

        assert!(fx.graph.contains(node));
        assert!(fx.materials.get(material).is_some());
    }

    #[test]
    fn test_end_to_end_submission() {
        let mut fx = Fixture::new();
        let lit = fx.material("lit", 1, 1);
        let flat = fx.material("flat", 2, 1);
        for i in 0..3 {
            let node = fx.node(fx.cube, Some(lit), i as f32);
            fx.graph.add_to_root(node);
            let node = fx.node(fx.quad, Some(flat), i as f32);
            fx.graph.add_to_root(node);
        }

        let group = fx.build();
        let mut device = RecordingDevice::new();
        let stats = group.execute(&fx.graph, &mut device);

        assert_eq!(stats.swaps, 2);
        assert_eq!(stats.draws, 6);
        assert_eq!(device.bind_count(), 2);

        let commands = device.commands();
        assert_eq!(commands[0], DeviceCommand::Bind(lit));
        assert!(commands[1..4]
            .iter()
            .all(|c| matches!(c, DeviceCommand::Draw { mesh, .. } if mesh.index_count == 36)));
        assert_eq!(commands[4], DeviceCommand::Bind(flat));
        assert!(commands[5..]
            .iter()
            .all(|c| matches!(c, DeviceCommand::Draw { mesh, .. } if mesh.index_count == 6)));
    }
}
