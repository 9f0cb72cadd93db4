//! Per-object acceleration trees, built lazily and kept across queries.
//!
//! Entries are keyed by object and stamped with the generation of the
//! geometry they were built from; a stale stamp drops every tree of the
//! entry so it rebuilds on demand.

use std::fmt;

use log::{debug, warn};
use slotmap::SecondaryMap;
use vcad_kernel_bvh::{Bvh, BvhParams};
use vcad_kernel_math::{Aabb3, Point3};
use vcad_kernel_scene::{EditEdge, EditFace, EditMesh, EditVert, Mesh, ObjectId};

use crate::geometry::SnapGeometry;
use crate::settings::{SnapSettings, TreeSettings};

/// Keeps an edit-mode vertex in the vertex tree when it returns true.
pub type VertFilter = Box<dyn Fn(&EditVert) -> bool + Send + Sync>;
/// Keeps an edit-mode edge in the edge tree when it returns true.
pub type EdgeFilter = Box<dyn Fn(&EditEdge) -> bool + Send + Sync>;
/// Keeps an edit-mode face's triangles in the triangle tree when it
/// returns true.
pub type FaceFilter = Box<dyn Fn(&EditFace) -> bool + Send + Sync>;

/// Element filters applied when edit-mode trees are built.
///
/// A missing filter keeps every element.
#[derive(Default)]
pub struct EditMeshFilters {
    /// Vertex filter.
    pub vert: Option<VertFilter>,
    /// Edge filter.
    pub edge: Option<EdgeFilter>,
    /// Face filter.
    pub face: Option<FaceFilter>,
}

impl fmt::Debug for EditMeshFilters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditMeshFilters")
            .field("vert", &self.vert.is_some())
            .field("edge", &self.edge.is_some())
            .field("face", &self.face.is_some())
            .finish()
    }
}

/// A tree that may not have been built yet.
#[derive(Debug, Default)]
pub(crate) enum TreeSlot {
    #[default]
    Unbuilt,
    /// Built, but nothing qualified.
    Empty,
    Built(Bvh),
}

impl TreeSlot {
    /// Build on first use; `None` when the tree has no primitives.
    pub(crate) fn ensure(&mut self, build: impl FnOnce() -> Bvh) -> Option<&Bvh> {
        if matches!(self, TreeSlot::Unbuilt) {
            let tree = build();
            *self = if tree.is_empty() {
                TreeSlot::Empty
            } else {
                TreeSlot::Built(tree)
            };
        }
        self.get()
    }

    pub(crate) fn get(&self) -> Option<&Bvh> {
        match self {
            TreeSlot::Built(tree) => Some(tree),
            TreeSlot::Unbuilt | TreeSlot::Empty => None,
        }
    }
}

/// Trees over an evaluated mesh.
#[derive(Debug, Default)]
pub(crate) struct MeshTrees {
    generation: u64,
    pub looptris: TreeSlot,
    pub loose_verts: TreeSlot,
    pub loose_edges: TreeSlot,
}

/// Trees over an edit cage.
#[derive(Debug, Default)]
pub(crate) struct EditMeshTrees {
    generation: u64,
    pub tris: TreeSlot,
    pub edges: TreeSlot,
    pub verts: TreeSlot,
}

/// What is cached for one object.
#[derive(Debug)]
pub(crate) enum SnapObjectData {
    Mesh(MeshTrees),
    EditMesh(EditMeshTrees),
}

/// Owner of every cached tree of a snap context.
#[derive(Debug, Default)]
pub(crate) struct TreeCache {
    objects: SecondaryMap<ObjectId, SnapObjectData>,
    settings: SnapSettings,
    filters: EditMeshFilters,
}

impl TreeCache {
    pub(crate) fn new(settings: SnapSettings) -> Self {
        Self {
            objects: SecondaryMap::new(),
            settings,
            filters: EditMeshFilters::default(),
        }
    }

    pub(crate) fn settings(&self) -> &SnapSettings {
        &self.settings
    }

    /// Swap the tunables; every tree is dropped when a tree shape changed.
    pub(crate) fn set_settings(&mut self, settings: SnapSettings) {
        let reshaped = settings.triangle_tree != self.settings.triangle_tree
            || settings.vert_tree != self.settings.vert_tree
            || settings.edge_tree != self.settings.edge_tree;
        self.settings = settings;
        if reshaped {
            debug!("tree settings changed, dropped {} cached objects", self.objects.len());
            self.objects.clear();
        }
    }

    #[cfg(test)]
    pub(crate) fn filters(&self) -> &EditMeshFilters {
        &self.filters
    }

    /// Swap the edit-mode filters; edit-mode trees built with the old
    /// ones are dropped.
    pub(crate) fn set_filters(&mut self, filters: EditMeshFilters) {
        self.filters = filters;
        let before = self.objects.len();
        self.objects
            .retain(|_, data| !matches!(data, SnapObjectData::EditMesh(_)));
        debug!(
            "edit mesh filters changed, dropped {} cached cages",
            before - self.objects.len()
        );
    }

    pub(crate) fn len(&self) -> usize {
        self.objects.len()
    }

    pub(crate) fn clear(&mut self) {
        self.objects.clear();
    }

    /// Trees of a mesh object, reset when `mesh` changed since they were
    /// built. `None` when the object key is no longer valid.
    pub(crate) fn mesh_trees(&mut self, id: ObjectId, mesh: &Mesh) -> Option<&mut MeshTrees> {
        let generation = mesh.generation();
        let data = self
            .objects
            .entry(id)?
            .or_insert_with(|| SnapObjectData::Mesh(MeshTrees::default()));
        let stale = match data {
            SnapObjectData::Mesh(trees) => trees.generation != generation,
            SnapObjectData::EditMesh(_) => {
                warn!("cached edit cage trees replaced by mesh trees for {id:?}");
                true
            }
        };
        if stale {
            *data = SnapObjectData::Mesh(MeshTrees {
                generation,
                ..MeshTrees::default()
            });
        }
        let SnapObjectData::Mesh(trees) = data else {
            return None;
        };
        Some(trees)
    }

    /// Trees of an object's edit cage along with the filters they are
    /// built with; see [`TreeCache::mesh_trees`].
    pub(crate) fn edit_mesh_trees(
        &mut self,
        id: ObjectId,
        em: &EditMesh,
    ) -> Option<(&mut EditMeshTrees, &EditMeshFilters)> {
        let generation = em.generation();
        let data = self
            .objects
            .entry(id)?
            .or_insert_with(|| SnapObjectData::EditMesh(EditMeshTrees::default()));
        let stale = match data {
            SnapObjectData::EditMesh(trees) => trees.generation != generation,
            SnapObjectData::Mesh(_) => {
                warn!("cached mesh trees replaced by edit cage trees for {id:?}");
                true
            }
        };
        if stale {
            *data = SnapObjectData::EditMesh(EditMeshTrees {
                generation,
                ..EditMeshTrees::default()
            });
        }
        let SnapObjectData::EditMesh(trees) = data else {
            return None;
        };
        Some((trees, &self.filters))
    }
}

fn params(settings: &TreeSettings) -> BvhParams {
    BvhParams {
        arity: settings.arity,
        leaf_size: settings.leaf_size,
    }
}

fn point_aabb(p: Point3) -> Aabb3 {
    Aabb3::new(p, p)
}

fn tri_aabb<G: SnapGeometry>(geom: &G, tri: usize) -> Aabb3 {
    let mut aabb = Aabb3::empty();
    for v in geom.tri_verts(tri) {
        aabb.include_point(&geom.vert_co(v));
    }
    aabb
}

fn edge_aabb<G: SnapGeometry>(geom: &G, edge: usize) -> Aabb3 {
    let [a, b] = geom.edge_verts(edge);
    let mut aabb = point_aabb(geom.vert_co(a));
    aabb.include_point(&geom.vert_co(b));
    aabb
}

pub(crate) fn build_mesh_looptris(mesh: &Mesh, settings: &SnapSettings) -> Bvh {
    let items = (0..mesh.looptris().len()).map(|t| (t, tri_aabb(mesh, t)));
    Bvh::build(items, params(&settings.triangle_tree))
}

/// Vertices used by no edge.
pub(crate) fn build_mesh_loose_verts(mesh: &Mesh, settings: &SnapSettings) -> Bvh {
    let mut used = vec![false; mesh.verts().len()];
    for edge in mesh.edges() {
        used[edge.v[0]] = true;
        used[edge.v[1]] = true;
    }
    let items = mesh
        .verts()
        .iter()
        .enumerate()
        .filter(|(i, _)| !used[*i])
        .map(|(i, v)| (i, point_aabb(v.co)));
    Bvh::build(items, params(&settings.vert_tree))
}

/// Edges used by no polygon.
pub(crate) fn build_mesh_loose_edges(mesh: &Mesh, settings: &SnapSettings) -> Bvh {
    let items = mesh
        .edges()
        .iter()
        .enumerate()
        .filter(|(_, e)| e.loose)
        .map(|(i, _)| (i, edge_aabb(mesh, i)));
    Bvh::build(items, params(&settings.edge_tree))
}

pub(crate) fn build_edit_tris(em: &EditMesh, settings: &SnapSettings, filters: &EditMeshFilters) -> Bvh {
    let faces = em.faces();
    let items = em
        .looptris()
        .iter()
        .enumerate()
        .filter(|(_, lt)| filters.face.as_ref().map_or(true, |keep| keep(&faces[lt.face])))
        .map(|(i, _)| (i, tri_aabb(em, i)));
    Bvh::build(items, params(&settings.triangle_tree))
}

pub(crate) fn build_edit_edges(em: &EditMesh, settings: &SnapSettings, filters: &EditMeshFilters) -> Bvh {
    let items = em
        .edges()
        .iter()
        .enumerate()
        .filter(|(_, e)| filters.edge.as_ref().map_or(true, |keep| keep(e)))
        .map(|(i, _)| (i, edge_aabb(em, i)));
    Bvh::build(items, params(&settings.edge_tree))
}

pub(crate) fn build_edit_verts(em: &EditMesh, settings: &SnapSettings, filters: &EditMeshFilters) -> Bvh {
    let items = em
        .verts()
        .iter()
        .enumerate()
        .filter(|(_, v)| filters.vert.as_ref().map_or(true, |keep| keep(v)))
        .map(|(i, v)| (i, point_aabb(v.co)));
    Bvh::build(items, params(&settings.vert_tree))
}
