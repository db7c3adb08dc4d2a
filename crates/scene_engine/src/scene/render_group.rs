//! # Render Groups
//!
//! A render group is a flat, material-batched list of instructions compiled
//! from one traversal of a [`SceneGraph`]:
//!
//! ```text
//! Swap(m1) Draw Draw Draw Swap(m2) Draw Swap(m3) Draw Draw
//! ```
//!
//! Every drawable node sharing a material lands behind a single `Swap`, so a
//! renderer binds each material once per frame. Items must be submitted in
//! order.
//!
//! A group is a snapshot. It stamps the graph identity and both graph
//! versions when built, and [`RenderGroup::staleness`] compares them with the
//! graph's current state.

use std::collections::HashMap;
use std::time::Instant;

use super::node::{GraphId, NodeId};
use super::scene_graph::SceneGraph;
use crate::core::config::{MaterialOrder, RenderGroupConfig};
use crate::foundation::math::Mat4;
use crate::render::device::RenderDevice;
use crate::render::material::{MaterialCatalog, MaterialId};

/// Result type for render group operations
pub type RenderGroupResult<T> = Result<T, RenderGroupError>;

/// Errors from reusing a render group
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderGroupError {
    /// The graph changed in a way that needs a full rebuild
    #[error("Render group must be rebuilt: {0:?}")]
    NeedsRebuild(Staleness),
}

bitflags::bitflags! {
    /// Ways a render group can be out of date with respect to a graph
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Staleness: u8 {
        /// Nodes were attached or removed, or a material or mesh changed
        const STRUCTURE = 1 << 0;
        /// A transform changed; world matrices are outdated
        const TRANSFORMS = 1 << 1;
        /// The group was built from a different graph
        const FOREIGN_GRAPH = 1 << 2;
    }
}

impl Staleness {
    /// Whether the group has to be rebuilt rather than refreshed
    pub fn needs_rebuild(self) -> bool {
        self.intersects(Self::STRUCTURE | Self::FOREIGN_GRAPH)
    }
}

/// One instruction of a render group
#[derive(Debug, Clone, PartialEq)]
pub enum RenderItem {
    /// Make `material` active for the following draws
    Swap {
        /// Material to bind
        material: MaterialId,
    },
    /// Draw a node's mesh with the active material
    Draw {
        /// World matrix captured at build (or refresh) time
        world_matrix: Mat4,
        /// Node to draw
        node: NodeId,
    },
}

/// Per-execution statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Materials bound
    pub swaps: usize,

    /// Meshes drawn
    pub draws: usize,

    /// Draw items dropped because their node no longer exists
    pub skipped: usize,

    /// Time spent building the group (microseconds)
    pub build_time_us: u64,

    /// Time spent submitting to the device (microseconds)
    pub submit_time_us: u64,
}

impl RenderStats {
    /// Average number of draws per bound material
    pub fn avg_draws_per_swap(&self) -> f32 {
        if self.swaps == 0 {
            0.0
        } else {
            self.draws as f32 / self.swaps as f32
        }
    }

    /// Build plus submit time in microseconds
    pub fn total_time_us(&self) -> u64 {
        self.build_time_us + self.submit_time_us
    }
}

/// Material-batched draw list compiled from a scene graph
#[derive(Debug, Clone)]
pub struct RenderGroup {
    items: Vec<RenderItem>,

    /// Item index of every draw, in traversal order
    draw_slots: Vec<usize>,

    graph_id: GraphId,
    structure_version: u64,
    transform_version: u64,

    swap_count: usize,
    build_time_us: u64,
}

impl RenderGroup {
    /// Compile a render group from one traversal of `graph`.
    ///
    /// Nodes without a material or with an empty mesh produce nothing.
    /// Drawable nodes are bucketed by material identity, keeping traversal
    /// order within each bucket, and every bucket is emitted as one `Swap`
    /// followed by its draws. Buckets are ordered by `config.material_order`.
    pub fn build<C>(graph: &mut SceneGraph, catalog: &C, config: &RenderGroupConfig) -> Self
    where
        C: MaterialCatalog + ?Sized,
    {
        let start_time = Instant::now();

        let mut materials: Vec<MaterialId> = Vec::new();
        let mut slots: HashMap<MaterialId, usize> = HashMap::new();
        let mut buckets: Vec<Vec<(Mat4, NodeId)>> = Vec::new();
        // (bucket, position in bucket) per drawable node in traversal order
        let mut visits: Vec<(usize, usize)> = Vec::new();

        let visited = graph.traverse(|node, world, _depth| {
            if !node.is_drawable() {
                return;
            }
            let Some(material) = node.material() else {
                return;
            };

            let slot = *slots.entry(material).or_insert_with(|| {
                materials.push(material);
                buckets.push(Vec::new());
                buckets.len() - 1
            });
            visits.push((slot, buckets[slot].len()));
            buckets[slot].push((*world, node.id()));

            log::trace!("Bucketed {:?} under material {:?}", node.id(), material);
        });

        let order = Self::bucket_order(&materials, catalog, config.material_order);

        let draw_count = visits.len();
        let mut items = Vec::with_capacity(config.expected_items.max(draw_count + materials.len()));
        let mut first_draw = vec![0; buckets.len()];

        for &slot in &order {
            items.push(RenderItem::Swap {
                material: materials[slot],
            });
            first_draw[slot] = items.len();
            items.extend(
                buckets[slot]
                    .iter()
                    .map(|&(world_matrix, node)| RenderItem::Draw { world_matrix, node }),
            );
        }

        let draw_slots = visits
            .iter()
            .map(|&(slot, position)| first_draw[slot] + position)
            .collect();

        let build_time_us = start_time.elapsed().as_micros() as u64;
        log::debug!(
            "Built render group: {} materials, {} draws from {} visited nodes in {}us",
            materials.len(),
            draw_count,
            visited,
            build_time_us
        );

        Self {
            items,
            draw_slots,
            graph_id: graph.id(),
            structure_version: graph.structure_version(),
            transform_version: graph.transform_version(),
            swap_count: materials.len(),
            build_time_us,
        }
    }

    /// Bucket indices in emission order
    fn bucket_order<C>(materials: &[MaterialId], catalog: &C, order: MaterialOrder) -> Vec<usize>
    where
        C: MaterialCatalog + ?Sized,
    {
        let mut ranked: Vec<usize> = (0..materials.len()).collect();
        if order == MaterialOrder::FirstSeen {
            return ranked;
        }

        let keys: Vec<_> = materials
            .iter()
            .map(|&material| {
                let shader_set = catalog.shader_set(material);
                if shader_set.is_none() {
                    log::warn!("Material {:?} is not in the catalog, ordering it last", material);
                }
                // Known materials first, then by shader identity
                (shader_set.is_none(), shader_set)
            })
            .collect();

        // Stable: equal shader sets keep first-seen order
        ranked.sort_by_key(|&slot| keys[slot]);
        ranked
    }

    /// Compare the build stamps with the graph's current state
    pub fn staleness(&self, graph: &SceneGraph) -> Staleness {
        if graph.id() != self.graph_id {
            return Staleness::FOREIGN_GRAPH;
        }

        let mut staleness = Staleness::empty();
        if graph.structure_version() != self.structure_version {
            staleness |= Staleness::STRUCTURE;
        }
        if graph.transform_version() != self.transform_version {
            staleness |= Staleness::TRANSFORMS;
        }
        staleness
    }

    /// Rewrite the world matrix of every draw from a fresh traversal, keeping
    /// the buckets. Returns the number of draws updated.
    ///
    /// Only valid while the graph's structure is unchanged since the build.
    pub fn refresh_world_matrices(&mut self, graph: &mut SceneGraph) -> RenderGroupResult<usize> {
        let staleness = self.staleness(graph);
        if staleness.needs_rebuild() {
            return Err(RenderGroupError::NeedsRebuild(staleness));
        }

        let draw_slots = &self.draw_slots;
        let items = &mut self.items;
        let mut cursor = 0;
        let mut updated = 0;

        graph.traverse(|node, world, _depth| {
            if !node.is_drawable() {
                return;
            }
            if let Some(RenderItem::Draw { world_matrix, node: id }) =
                draw_slots.get(cursor).and_then(|&index| items.get_mut(index))
            {
                if *id == node.id() {
                    *world_matrix = *world;
                    updated += 1;
                }
            }
            cursor += 1;
        });

        self.transform_version = graph.transform_version();
        log::trace!("Refreshed {} world matrices", updated);
        Ok(updated)
    }

    /// Submit every item to `device`, strictly in order.
    ///
    /// Draws whose node has been removed from the graph are skipped. A
    /// group built from another graph submits nothing.
    pub fn execute<D>(&self, graph: &SceneGraph, device: &mut D) -> RenderStats
    where
        D: RenderDevice + ?Sized,
    {
        let start_time = Instant::now();
        let mut stats = RenderStats {
            build_time_us: self.build_time_us,
            ..RenderStats::default()
        };

        if graph.id() != self.graph_id {
            log::warn!(
                "Render group built for {:?} executed against {:?}, nothing submitted",
                self.graph_id,
                graph.id()
            );
            stats.skipped = self.draw_count();
            return stats;
        }

        for item in &self.items {
            match item {
                RenderItem::Swap { material } => {
                    device.bind_material(*material);
                    stats.swaps += 1;
                }
                RenderItem::Draw { world_matrix, node } => match graph.node(*node) {
                    Some(scene_node) => {
                        device.draw_mesh(&scene_node.mesh(), world_matrix);
                        stats.draws += 1;
                    }
                    None => {
                        log::warn!("Skipping draw of removed node {:?}", node);
                        stats.skipped += 1;
                    }
                },
            }
        }

        stats.submit_time_us = start_time.elapsed().as_micros() as u64;
        stats
    }

    /// All items in submission order
    pub fn items(&self) -> &[RenderItem] {
        &self.items
    }

    /// Iterate items in submission order
    pub fn iter(&self) -> std::slice::Iter<'_, RenderItem> {
        self.items.iter()
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the group contains nothing to draw
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of `Swap` items, one per distinct material
    pub fn swap_count(&self) -> usize {
        self.swap_count
    }

    /// Number of `Draw` items
    pub fn draw_count(&self) -> usize {
        self.draw_slots.len()
    }

    /// Graph this group was built from
    pub fn graph_id(&self) -> GraphId {
        self.graph_id
    }

    /// Graph structure version at build time
    pub fn structure_version(&self) -> u64 {
        self.structure_version
    }

    /// Graph transform version at build (or last refresh) time
    pub fn transform_version(&self) -> u64 {
        self.transform_version
    }

    /// Time the build took in microseconds
    pub fn build_time_us(&self) -> u64 {
        self.build_time_us
    }
}

impl<'a> IntoIterator for &'a RenderGroup {
    type Item = &'a RenderItem;
    type IntoIter = std::slice::Iter<'a, RenderItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
