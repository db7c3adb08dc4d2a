//! Device seam for executing render groups
//!
//! The core never talks to a graphics API. A rendering loop hands a
//! [`RenderDevice`] to `RenderGroup::execute`, which calls it strictly in
//! item order.

use crate::foundation::math::Mat4;
use crate::render::material::MaterialId;
use crate::render::mesh::MeshRef;

/// Sink for the two instructions a render group contains
pub trait RenderDevice {
    /// Make `material` the active material (shaders + uniforms)
    fn bind_material(&mut self, material: MaterialId);

    /// Draw `mesh` with the given world matrix using the active material
    fn draw_mesh(&mut self, mesh: &MeshRef, world_matrix: &Mat4);
}

/// One recorded device call
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    /// `bind_material` was called
    Bind(MaterialId),
    /// `draw_mesh` was called
    Draw {
        /// Mesh drawn
        mesh: MeshRef,
        /// World matrix used
        world_matrix: Mat4,
    },
}

/// Device that records every call, for tests and headless runs
#[derive(Debug, Default)]
pub struct RecordingDevice {
    commands: Vec<DeviceCommand>,
}

impl RecordingDevice {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls recorded so far, in order
    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    /// Number of `bind_material` calls recorded
    pub fn bind_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DeviceCommand::Bind(_)))
            .count()
    }

    /// Forget recorded calls
    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl RenderDevice for RecordingDevice {
    fn bind_material(&mut self, material: MaterialId) {
        self.commands.push(DeviceCommand::Bind(material));
    }

    fn draw_mesh(&mut self, mesh: &MeshRef, world_matrix: &Mat4) {
        self.commands.push(DeviceCommand::Draw {
            mesh: *mesh,
            world_matrix: *world_matrix,
        });
    }
}
