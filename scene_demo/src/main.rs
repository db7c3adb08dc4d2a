//! Scene demo application
//!
//! Builds a small fleet of ships out of shared meshes and materials, prints
//! the scene tree, then runs a few frames through the scene renderer against
//! a device that logs what it is asked to do.
//!
//! Usage: `scene_demo [config.toml | config.ron]`

use scene_engine::config::Config;
use scene_engine::core::config::ApplicationConfig;
use scene_engine::foundation::logging;
use scene_engine::foundation::math::constants::HALF_PI;
use scene_engine::foundation::math::{Mat4, Quat, Transform, Vec3};
use scene_engine::render::{
    primitives, MaterialId, MaterialPrototype, MaterialRegistry, MeshRef, MeshRegistry,
    RenderDevice, ShaderId, ShaderSet, UniformDesc, UniformKind,
};
use scene_engine::scene::{NodeId, SceneGraph, SceneRenderer};

/// Device that logs every call and keeps simple counters
#[derive(Default)]
struct LogDevice {
    binds: usize,
    draws: usize,
    indices: u64,
}

impl RenderDevice for LogDevice {
    fn bind_material(&mut self, material: MaterialId) {
        log::debug!("bind {:?}", material);
        self.binds += 1;
    }

    fn draw_mesh(&mut self, mesh: &MeshRef, world_matrix: &Mat4) {
        log::debug!(
            "draw indices {:?} at ({:.2}, {:.2}, {:.2})",
            mesh.index_range(),
            world_matrix[(0, 3)],
            world_matrix[(1, 3)],
            world_matrix[(2, 3)]
        );
        self.draws += 1;
        self.indices += u64::from(mesh.index_count);
    }
}

/// Demo state: registries, the scene and the renderer driving it
struct DemoApp {
    config: ApplicationConfig,
    meshes: MeshRegistry,
    materials: MaterialRegistry,
    graph: SceneGraph,
    renderer: SceneRenderer,
    ships: Vec<NodeId>,
}

impl DemoApp {
    fn new(config: ApplicationConfig) -> Self {
        Self {
            graph: SceneGraph::with_config(&config.scene),
            renderer: SceneRenderer::new(config.render.clone()),
            config,
            meshes: MeshRegistry::new(),
            materials: MaterialRegistry::new(),
            ships: Vec::new(),
        }
    }

    fn initialize(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        log::info!("Registering meshes...");
        let (vertices, indices) = primitives::cube();
        let hull = self.meshes.add_mesh("hull", &vertices, &indices)?;
        let (vertices, indices) = primitives::quad();
        let wing = self.meshes.add_mesh("wing", &vertices, &indices)?;
        log::info!(
            "Mesh buffer holds {} vertices, {} indices ({} bytes)",
            self.meshes.buffer().vertex_count(),
            self.meshes.buffer().index_count(),
            self.meshes.buffer().vertex_bytes().len() + self.meshes.buffer().index_bytes().len()
        );
        self.meshes.buffer_mut().mark_uploaded();

        log::info!("Registering materials...");
        let lit = ShaderSet::new(ShaderId(1), ShaderId(10));
        self.materials.add_prototype(
            "lit",
            MaterialPrototype::new(
                lit,
                vec![
                    UniformDesc::new("u_color", UniformKind::Vec4),
                    UniformDesc::new("u_shininess", UniformKind::Float),
                ],
            ),
        )?;
        let hull_material = self.materials.create_from_prototype("hull", "lit", &[])?;
        let wing_material = self.materials.create_from_prototype(
            "wing",
            "lit",
            &[UniformDesc::new("u_emissive", UniformKind::Vec3)],
        )?;

        if let Some(material) = self.materials.get_mut(hull_material) {
            material.add_binding("u_color", bytemuck::cast_slice(&[0.6_f32, 0.6, 0.7, 1.0]))?;
            material.add_binding("u_shininess", bytemuck::bytes_of(&32.0_f32))?;
        }
        if let Some(material) = self.materials.get_mut(wing_material) {
            material.add_binding("u_color", bytemuck::cast_slice(&[0.9_f32, 0.2, 0.2, 1.0]))?;
            material.add_binding("u_emissive", bytemuck::cast_slice(&[0.3_f32, 0.0, 0.0]))?;
        }

        log::info!("Building scene...");
        let ship = self.graph.create_node(Transform::identity(), MeshRef::empty(), None);
        let body = self.graph.create_node(Transform::identity(), hull, Some(hull_material));
        self.graph.add_child(ship, body);
        for side in [-1.0_f32, 1.0] {
            let wing_node = self.graph.create_node(
                Transform::from_position(Vec3::new(side * 1.5, 0.0, 0.0))
                    .with_scale(Vec3::new(1.0, 0.2, 1.0))
                    .with_rotation(Quat::from_axis_angle(&Vec3::x_axis(), HALF_PI)),
                wing,
                Some(wing_material),
            );
            self.graph.add_child(ship, wing_node);
        }

        for i in 0..3 {
            let copy = self.graph.copy_node(ship, true)?;
            self.graph.set_transform(
                copy,
                Transform::from_position(Vec3::new(i as f32 * 5.0, 0.0, -10.0)),
            )?;
            self.graph.try_add_to_root(copy)?;
            self.ships.push(copy);
        }
        let freed = self.graph.destroy_node(ship)?;
        log::debug!("Dropped ship template ({} nodes)", freed);

        log::info!(
            "Scene holds {} nodes (traversal stack capacity {})",
            self.graph.node_count(),
            self.graph.stack_capacity()
        );
        for line in self.graph.dump().lines() {
            log::info!("{}", line);
        }

        Ok(())
    }

    fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let mut device = LogDevice::default();

        for frame in 0..4 {
            match frame {
                1 => {
                    // Transform-only change: matrices refreshed in place
                    if let Some(&ship) = self.ships.first() {
                        self.graph.set_transform(
                            ship,
                            Transform::from_position(Vec3::new(0.0, 2.0, -10.0)),
                        )?;
                    }
                }
                2 => {
                    // Structural change: group rebuilt
                    if let Some(ship) = self.ships.pop() {
                        let removed = self.graph.try_remove_from_root(ship)?;
                        log::info!("Removed a ship ({} nodes)", removed);
                    }
                }
                _ => {}
            }

            let stats = self
                .renderer
                .render_frame(&mut self.graph, &self.materials, &mut device);
            log::info!(
                "Frame {}: {:?} - {} swaps, {} draws, {:.1} draws/swap, {}us",
                frame,
                self.renderer.last_action(),
                stats.swaps,
                stats.draws,
                stats.avg_draws_per_swap(),
                stats.total_time_us()
            );
        }

        log::info!(
            "Device totals: {} binds, {} draws, {} indices",
            device.binds,
            device.draws,
            device.indices
        );
        Ok(())
    }

    fn shutdown(self) {
        let material_order = self.config.render.material_order;
        let freed = self.graph.destroy();
        log::info!(
            "Shut down ({:?} ordering): {} scene nodes freed, {} materials released",
            material_order,
            freed,
            self.materials.material_count()
        );
    }
}

fn load_config() -> Result<ApplicationConfig, Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => ApplicationConfig::load_from_file(&path)?,
        None => ApplicationConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    logging::init_with_level(&config.engine.log_level);

    log::info!("Starting scene demo");
    let mut app = DemoApp::new(config);
    app.initialize()?;
    app.run()?;
    app.shutdown();

    Ok(())
}
