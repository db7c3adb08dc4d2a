//! Materials and the material registry
//!
//! Scene nodes never own materials. They hold a [`MaterialId`] issued by a
//! [`MaterialRegistry`], and batching compares those ids for identity: two
//! materials with identical contents are still two different materials.

use std::collections::HashMap;

use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Identity of a registered material
    pub struct MaterialId;
}

/// Result type for material operations
pub type MaterialResult<T> = Result<T, MaterialError>;

/// Errors raised by the material registry
#[derive(Debug, thiserror::Error)]
pub enum MaterialError {
    /// The material declares no uniforms at all
    #[error("Material has no uniforms, cannot bind '{0}'")]
    NoUniforms(String),

    /// The material has no uniform with this name
    #[error("Uniform not found: {0}")]
    UnknownUniform(String),

    /// Nothing registered under this name or id
    #[error("Material not found: {0}")]
    NotFound(String),

    /// Name already taken
    #[error("Duplicate name: {0}")]
    DuplicateName(String),
}

/// Identity of a compiled shader stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShaderId(pub u32);

/// The pair of shaders a material renders with.
///
/// Ordering is lexicographic on `(vertex, fragment)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShaderSet {
    /// Vertex stage
    pub vertex: ShaderId,
    /// Fragment stage
    pub fragment: ShaderId,
}

impl ShaderSet {
    /// Create a shader set
    pub const fn new(vertex: ShaderId, fragment: ShaderId) -> Self {
        Self { vertex, fragment }
    }
}

/// Data type of a uniform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    /// Single float
    Float,
    /// Two floats
    Vec2,
    /// Three floats
    Vec3,
    /// Four floats
    Vec4,
    /// Column-major 4x4 matrix
    Mat4,
    /// Signed integer
    Int,
    /// Texture sampler slot
    Sampler2D,
}

/// Description of one uniform a material exposes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformDesc {
    /// Name as used in shader source
    pub name: String,
    /// Data type
    pub kind: UniformKind,
}

impl UniformDesc {
    /// Create a uniform description
    pub fn new(name: impl Into<String>, kind: UniformKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// A uniform plus the bytes currently bound to it
#[derive(Debug, Clone, PartialEq)]
pub struct UniformBinding {
    /// What the uniform is
    pub desc: UniformDesc,
    /// Owned copy of the bound data, if any
    pub data: Option<Vec<u8>>,
}

/// Template for materials sharing a shader set and uniform layout
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialPrototype {
    /// Shaders used by every material built from this prototype
    pub shader_set: ShaderSet,
    /// Uniform layout
    pub uniforms: Vec<UniformDesc>,
}

impl MaterialPrototype {
    /// Create a prototype
    pub fn new(shader_set: ShaderSet, uniforms: Vec<UniformDesc>) -> Self {
        Self {
            shader_set,
            uniforms,
        }
    }
}

/// A material: a shader set and its uniform bindings
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Optional name for debugging
    pub name: Option<String>,
    shader_set: ShaderSet,
    bindings: Vec<UniformBinding>,
}

impl Material {
    /// Create a material with unbound uniforms
    pub fn new(shader_set: ShaderSet, uniforms: Vec<UniformDesc>) -> Self {
        Self {
            name: None,
            shader_set,
            bindings: uniforms
                .into_iter()
                .map(|desc| UniformBinding { desc, data: None })
                .collect(),
        }
    }

    /// Build a material from a prototype.
    ///
    /// Overrides whose name already exists in the prototype keep the
    /// prototype's description; the others are appended after it.
    pub fn from_prototype(prototype: &MaterialPrototype, overrides: &[UniformDesc]) -> Self {
        let mut uniforms = prototype.uniforms.clone();
        for extra in overrides {
            if !prototype.uniforms.iter().any(|u| u.name == extra.name) {
                uniforms.push(extra.clone());
            }
        }
        Self::new(prototype.shader_set, uniforms)
    }

    /// Set the material name for debugging
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Shaders this material renders with
    pub fn shader_set(&self) -> ShaderSet {
        self.shader_set
    }

    /// All uniforms with their bound data
    pub fn bindings(&self) -> &[UniformBinding] {
        &self.bindings
    }

    /// Position of a uniform in the binding list
    pub fn uniform_index(&self, name: &str) -> Option<usize> {
        self.bindings.iter().position(|b| b.desc.name == name)
    }

    /// Whether the material declares this uniform
    pub fn has_uniform(&self, name: &str) -> bool {
        self.uniform_index(name).is_some()
    }

    /// Copy `data` into the binding for `name`, replacing earlier data
    pub fn add_binding(&mut self, name: &str, data: &[u8]) -> MaterialResult<()> {
        if self.bindings.is_empty() {
            log::debug!("Material has no uniforms, cannot add binding '{}'", name);
            return Err(MaterialError::NoUniforms(name.to_string()));
        }

        let index = self.uniform_index(name).ok_or_else(|| {
            log::debug!("Uniform not found: {}, cannot add binding", name);
            MaterialError::UnknownUniform(name.to_string())
        })?;

        log::trace!("Binding {} to index {} ({} bytes)", name, index, data.len());
        self.bindings[index].data = Some(data.to_vec());
        Ok(())
    }

    /// Bytes currently bound to `name`
    pub fn binding_data(&self, name: &str) -> Option<&[u8]> {
        self.bindings
            .iter()
            .find(|b| b.desc.name == name)
            .and_then(|b| b.data.as_deref())
    }
}

/// Read-only view of materials needed to order render-group buckets
pub trait MaterialCatalog {
    /// Shader set of a material, `None` if unknown
    fn shader_set(&self, material: MaterialId) -> Option<ShaderSet>;
}

/// Owner of every material and prototype
#[derive(Debug, Default)]
pub struct MaterialRegistry {
    materials: SlotMap<MaterialId, Material>,
    names: HashMap<String, MaterialId>,
    prototypes: HashMap<String, MaterialPrototype>,
}

impl MaterialRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a material under a unique name
    pub fn add_material(
        &mut self,
        name: impl Into<String>,
        material: Material,
    ) -> MaterialResult<MaterialId> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(MaterialError::DuplicateName(name));
        }

        let id = self.materials.insert(material);
        log::debug!("Registered material '{}' as {:?}", name, id);
        self.names.insert(name, id);
        Ok(id)
    }

    /// Register a material built from a named prototype
    pub fn create_from_prototype(
        &mut self,
        name: impl Into<String>,
        prototype_name: &str,
        overrides: &[UniformDesc],
    ) -> MaterialResult<MaterialId> {
        let name = name.into();
        let material = Material::from_prototype(self.prototype(prototype_name)?, overrides)
            .with_name(name.clone());
        self.add_material(name, material)
    }

    /// Look up a material by id
    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id)
    }

    /// Mutable access to a material, e.g. to update bindings
    pub fn get_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id)
    }

    /// Look up a material id by name
    pub fn find(&self, name: &str) -> MaterialResult<MaterialId> {
        self.names.get(name).copied().ok_or_else(|| {
            log::warn!("Failed to find material: {}", name);
            MaterialError::NotFound(name.to_string())
        })
    }

    /// Register a named prototype
    pub fn add_prototype(
        &mut self,
        name: impl Into<String>,
        prototype: MaterialPrototype,
    ) -> MaterialResult<()> {
        let name = name.into();
        if self.prototypes.contains_key(&name) {
            return Err(MaterialError::DuplicateName(name));
        }
        self.prototypes.insert(name, prototype);
        Ok(())
    }

    /// Look up a prototype by name
    pub fn prototype(&self, name: &str) -> MaterialResult<&MaterialPrototype> {
        self.prototypes.get(name).ok_or_else(|| {
            log::warn!("Failed to find prototype: {}", name);
            MaterialError::NotFound(name.to_string())
        })
    }

    /// Number of registered materials
    pub fn material_count(&self) -> usize {
        self.materials.len()
    }
}

impl MaterialCatalog for MaterialRegistry {
    fn shader_set(&self, material: MaterialId) -> Option<ShaderSet> {
        self.materials.get(material).map(Material::shader_set)
    }
}
