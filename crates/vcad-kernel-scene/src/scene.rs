//! Read access to a scene for snapping, and an owned scene implementing it.

use slotmap::{SecondaryMap, SlotMap};

use crate::edit_mesh::EditMesh;
use crate::mesh::Mesh;
use crate::object::{Base, BaseFlags, DupliInstance, Object, ObjectData, ObjectMode};
use crate::{MeshId, ObjectId, Result, SceneError};

/// What a snap query needs to read from a scene.
pub trait SnapScene {
    /// Bases in iteration order.
    fn bases(&self) -> &[Base];

    /// Look up an object.
    fn object(&self, id: ObjectId) -> Option<&Object>;

    /// The active object.
    fn active_object(&self) -> Option<ObjectId>;

    /// The object in edit mode, if any.
    fn edit_object(&self) -> Option<ObjectId>;

    /// Evaluated mesh of a mesh object.
    fn derived_mesh(&self, id: ObjectId) -> Option<&Mesh>;

    /// Edit cage of a mesh object in edit mode.
    fn edit_mesh(&self, id: ObjectId) -> Option<&EditMesh>;

    /// Instances generated by a duplicator object.
    fn dupli_instances(&self, id: ObjectId) -> Vec<DupliInstance>;
}

#[derive(Debug, Clone)]
struct MeshData {
    mesh: Mesh,
    edit: Option<EditMesh>,
}

/// An owned scene.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    objects: SlotMap<ObjectId, Object>,
    meshes: SlotMap<MeshId, MeshData>,
    bases: Vec<Base>,
    duplis: SecondaryMap<ObjectId, Vec<DupliInstance>>,
    active: Option<ObjectId>,
    edit_object: Option<ObjectId>,
}

impl Scene {
    /// An empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register mesh data, shareable between objects.
    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        self.meshes.insert(MeshData { mesh, edit: None })
    }

    /// Mesh data by id.
    pub fn mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(id).map(|m| &m.mesh)
    }

    /// Mutable mesh data by id.
    pub fn mesh_mut(&mut self, id: MeshId) -> Option<&mut Mesh> {
        self.meshes.get_mut(id).map(|m| &mut m.mesh)
    }

    /// Add an object with a visible, unselected base.
    pub fn add_object(&mut self, object: Object) -> ObjectId {
        let id = self.objects.insert(object);
        self.bases.push(Base {
            object: id,
            flags: BaseFlags::VISIBLE,
        });
        id
    }

    /// Add an object that exists only as an instance source and has no base.
    pub fn add_instance_source(&mut self, object: Object) -> ObjectId {
        self.objects.insert(object)
    }

    /// Remove an object and its base.
    pub fn remove_object(&mut self, id: ObjectId) -> Option<Object> {
        self.bases.retain(|b| b.object != id);
        self.duplis.remove(id);
        if self.active == Some(id) {
            self.active = None;
        }
        if self.edit_object == Some(id) {
            self.edit_object = None;
        }
        self.objects.remove(id)
    }

    /// Mutable object access.
    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.objects.get_mut(id)
    }

    /// Replace the state bits of an object's base.
    pub fn set_base_flags(&mut self, id: ObjectId, flags: BaseFlags) -> Result<()> {
        let base = self
            .bases
            .iter_mut()
            .find(|b| b.object == id)
            .ok_or(SceneError::UnknownObject)?;
        base.flags = flags;
        Ok(())
    }

    /// Make an object active.
    pub fn set_active(&mut self, id: Option<ObjectId>) {
        self.active = id;
    }

    /// Turn `id` into a duplicator generating `instances`.
    pub fn set_dupli_instances(&mut self, id: ObjectId, instances: Vec<DupliInstance>) -> Result<()> {
        let object = self.objects.get_mut(id).ok_or(SceneError::UnknownObject)?;
        object.duplicator = !instances.is_empty();
        self.duplis.insert(id, instances);
        Ok(())
    }

    /// Enter edit mode on a mesh object, building its edit cage.
    ///
    /// Any other object in edit mode leaves it first.
    pub fn enter_edit_mode(&mut self, id: ObjectId) -> Result<()> {
        let object = self.objects.get(id).ok_or(SceneError::UnknownObject)?;
        let mesh_id = object
            .data
            .mesh_id()
            .ok_or_else(|| SceneError::NotAMesh(object.name.clone()))?;
        let data = self.meshes.get(mesh_id).ok_or(SceneError::UnknownObject)?;
        let edit = EditMesh::from_mesh(&data.mesh)?;

        self.exit_edit_mode();
        if let Some(data) = self.meshes.get_mut(mesh_id) {
            data.edit = Some(edit);
        }
        if let Some(object) = self.objects.get_mut(id) {
            object.mode = ObjectMode::Edit;
        }
        self.edit_object = Some(id);
        Ok(())
    }

    /// Leave edit mode, dropping the edit cage.
    pub fn exit_edit_mode(&mut self) {
        let Some(id) = self.edit_object.take() else {
            return;
        };
        if let Some(object) = self.objects.get_mut(id) {
            object.mode = ObjectMode::Object;
            if let Some(data) = object.data.mesh_id().and_then(|m| self.meshes.get_mut(m)) {
                data.edit = None;
            }
        }
    }

    /// Mutable edit cage of the object in edit mode.
    pub fn edit_mesh_mut(&mut self, id: ObjectId) -> Option<&mut EditMesh> {
        let mesh_id = self.objects.get(id)?.data.mesh_id()?;
        self.meshes.get_mut(mesh_id)?.edit.as_mut()
    }

    fn mesh_data(&self, id: ObjectId) -> Option<&MeshData> {
        match &self.objects.get(id)?.data {
            ObjectData::Mesh(mesh_id) => self.meshes.get(*mesh_id),
            _ => None,
        }
    }
}

impl SnapScene for Scene {
    fn bases(&self) -> &[Base] {
        &self.bases
    }

    fn object(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(id)
    }

    fn active_object(&self) -> Option<ObjectId> {
        self.active
    }

    fn edit_object(&self) -> Option<ObjectId> {
        self.edit_object
    }

    fn derived_mesh(&self, id: ObjectId) -> Option<&Mesh> {
        self.mesh_data(id).map(|m| &m.mesh)
    }

    fn edit_mesh(&self, id: ObjectId) -> Option<&EditMesh> {
        self.mesh_data(id)?.edit.as_ref()
    }

    fn dupli_instances(&self, id: ObjectId) -> Vec<DupliInstance> {
        self.duplis.get(id).cloned().unwrap_or_default()
    }
}
