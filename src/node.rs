use cgmath::{Matrix4, SquareMatrix};

use crate::{camera::Camera, model::MeshHandle};

/// Index of a node inside its owning [`Scene`](crate::scene::Scene).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub color: [f32; 4],
    pub highlighted: bool,
}

impl Material {
    pub fn new(color: [f32; 4]) -> Self {
        Self {
            color,
            highlighted: false,
        }
    }

    pub fn toggle_highlight(&mut self) {
        self.highlighted = !self.highlighted;
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new([1.0, 1.0, 1.0, 1.0])
    }
}

/// Picking volume. The centre is always the node's world-space origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub radius: f32,
}

pub struct Node {
    pub name: String,
    pub transform: Matrix4<f32>,
    pub mesh: Option<MeshHandle>,
    pub material: Option<Material>,
    pub camera: Option<Camera>,
    pub bounding_sphere: Option<BoundingSphere>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Matrix4::identity(),
            mesh: None,
            material: None,
            camera: None,
            bounding_sphere: None,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn with_transform(mut self, transform: Matrix4<f32>) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_mesh(mut self, mesh: MeshHandle) -> Self {
        self.mesh = Some(mesh);
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = Some(material);
        self
    }

    pub fn with_camera(mut self, camera: Camera) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn with_bounding_radius(mut self, radius: f32) -> Self {
        self.bounding_sphere = Some(BoundingSphere { radius });
        self
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in insertion order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Whether the renderer emits a draw call for this node.
    pub fn is_drawable(&self) -> bool {
        self.mesh.is_some() && self.camera.is_none()
    }

    /// Flips the highlight flag. Returns the new state, or `None` without a material.
    pub fn toggle_highlight(&mut self) -> Option<bool> {
        let material = self.material.as_mut()?;
        material.toggle_highlight();
        Some(material.highlighted)
    }

    pub fn is_highlighted(&self) -> bool {
        self.material.map_or(false, |material| material.highlighted)
    }
}
