//! Scene graph: an arena of [`Node`]s forming a strict tree under one root.
//!
//! Nodes are only ever appended beneath an existing parent, so the graph is
//! acyclic by construction. Traversal is pre-order, depth-first, children in
//! insertion order. Constant-buffer offsets are assigned in that order, so it
//! must stay deterministic.

use std::convert::Infallible;

use cgmath::{Matrix4, SquareMatrix};
use serde::Deserialize;

use crate::{
    camera::Camera,
    error::SceneError,
    math,
    model::MeshHandle,
    node::{Material, Node, NodeId},
};

pub struct Scene {
    nodes: Vec<Node>,
    root: NodeId,
    point_of_view: Option<NodeId>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new("root")],
            root: NodeId(0),
            point_of_view: None,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        // The root always exists
        false
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    pub fn root_node(&self) -> &Node {
        &self.nodes[self.root.0]
    }

    /// Appends `node` as the last child of `parent`.
    pub fn add_child(&mut self, parent: NodeId, mut node: Node) -> Result<NodeId, SceneError> {
        if parent.0 >= self.nodes.len() {
            return Err(SceneError::UnknownNode(parent));
        }
        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        // Children handed in by the caller are not part of this arena
        node.children.clear();
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    pub fn point_of_view(&self) -> Option<NodeId> {
        self.point_of_view
    }

    /// Selects the camera-bearing node used for rendering and picking.
    pub fn set_point_of_view(&mut self, id: NodeId) -> Result<(), SceneError> {
        let node = self.node(id).ok_or(SceneError::UnknownNode(id))?;
        if node.camera.is_none() {
            return Err(SceneError::NotACamera(id));
        }
        self.point_of_view = Some(id);
        Ok(())
    }

    /// The active camera together with its node's world transform.
    pub fn active_camera(&self) -> Option<(Camera, Matrix4<f32>)> {
        let id = self.point_of_view?;
        let camera = self.node(id)?.camera?;
        Some((camera, self.world_transform(id)?))
    }

    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        let mut found = None;
        self.traverse(|id, node, _| {
            if found.is_none() && node.name == name {
                found = Some(id);
            }
        });
        found
    }

    /// Product of the ancestors' local transforms and the node's own, root first.
    pub fn world_transform(&self, id: NodeId) -> Option<Matrix4<f32>> {
        let mut node = self.node(id)?;
        let mut world = node.transform;
        while let Some(parent) = node.parent {
            node = self.node(parent)?;
            world = node.transform * world;
        }
        Some(world)
    }

    /// Visits every node pre-order with its world transform.
    pub fn traverse<F>(&self, mut visit: F)
    where
        F: FnMut(NodeId, &Node, &Matrix4<f32>),
    {
        let result = self.try_traverse(|id, node, world| {
            visit(id, node, world);
            Ok::<(), Infallible>(())
        });
        match result {
            Ok(()) => {}
            Err(never) => match never {},
        }
    }

    /// Like [`Scene::traverse`], stopping at the first error.
    pub fn try_traverse<E, F>(&self, mut visit: F) -> Result<(), E>
    where
        F: FnMut(NodeId, &Node, &Matrix4<f32>) -> Result<(), E>,
    {
        self.traverse_node(self.root, &Matrix4::identity(), &mut visit)
    }

    fn traverse_node<E, F>(
        &self,
        id: NodeId,
        parent_world: &Matrix4<f32>,
        visit: &mut F,
    ) -> Result<(), E>
    where
        F: FnMut(NodeId, &Node, &Matrix4<f32>) -> Result<(), E>,
    {
        let node = &self.nodes[id.0];
        let world = parent_world * node.transform;
        visit(id, node, &world)?;
        for &child in &node.children {
            self.traverse_node(child, &world, visit)?;
        }
        Ok(())
    }

    /// Adds a camera node under the root looking down -Z from `position`,
    /// and makes it the point of view.
    pub fn add_camera(&mut self, config: &crate::camera::CameraConfig) -> NodeId {
        let [x, y, z] = config.position;
        let node = Node::new("camera")
            .with_transform(math::translation(x, y, z))
            .with_camera(config.camera());
        let id = self.push_under_root(node);
        self.point_of_view = Some(id);
        id
    }

    /// Adds a group node holding a grid of spheres and returns the group.
    ///
    /// Sphere `(i, j, k)` sits at x = (i - (nx-1)/2) * spacing,
    /// y = (j - (ny-1)/2) * spacing and z = ((nz-1)/2 - k) * spacing, so layer
    /// `k = 0` is the one closest to a camera on +Z. Spheres are appended with
    /// `k` varying fastest.
    pub fn add_sphere_grid(&mut self, grid: &GridConfig, mesh: Option<MeshHandle>) -> NodeId {
        let group = self.push_under_root(Node::new("sphere_grid"));
        let [nx, ny, nz] = grid.dimensions;

        for i in 0..nx {
            for j in 0..ny {
                for k in 0..nz {
                    let x = grid.spacing * (i as f32 - (nx as f32 - 1.0) / 2.0);
                    let y = grid.spacing * (j as f32 - (ny as f32 - 1.0) / 2.0);
                    let z = grid.spacing * ((nz as f32 - 1.0) / 2.0 - k as f32);

                    let color = [
                        (i + 1) as f32 / nx as f32,
                        (j + 1) as f32 / ny as f32,
                        (k + 1) as f32 / nz as f32,
                        1.0,
                    ];

                    let mut sphere = Node::new(GridConfig::sphere_name(i, j, k))
                        .with_transform(math::translation(x, y, z))
                        .with_material(Material::new(color))
                        .with_bounding_radius(grid.radius);
                    sphere.mesh = mesh;
                    self.push_under(group, sphere);
                }
            }
        }

        log::debug!("built {}x{}x{} sphere grid", nx, ny, nz);
        group
    }

    fn push_under_root(&mut self, node: Node) -> NodeId {
        self.push_under(self.root, node)
    }

    fn push_under(&mut self, parent: NodeId, node: Node) -> NodeId {
        match self.add_child(parent, node) {
            Ok(id) => id,
            // Callers only pass ids minted by this scene
            Err(err) => unreachable!("{}", err),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub dimensions: [u32; 3],
    /// Centre-to-centre distance between neighbouring spheres
    pub spacing: f32,
    pub radius: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            dimensions: [2, 4, 3],
            spacing: 3.0,
            radius: 1.0,
        }
    }
}

impl GridConfig {
    pub fn sphere_name(i: u32, j: u32, k: u32) -> String {
        format!("sphere_{}_{}_{}", i, j, k)
    }

    pub fn sphere_count(&self) -> usize {
        self.dimensions.iter().map(|&d| d as usize).product()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cgmath::Deg;

    fn chain_scene() -> (Scene, NodeId, NodeId, NodeId) {
        let mut scene = Scene::new();
        let root = scene.root();
        scene.node_mut(root).unwrap().transform = math::translation(1.0, 0.0, 0.0);
        let a = scene
            .add_child(root, Node::new("a").with_transform(Matrix4::from_angle_z(Deg(90.0))))
            .unwrap();
        let b = scene
            .add_child(a, Node::new("b").with_transform(math::translation(0.0, 2.0, 0.0)))
            .unwrap();
        let c = scene
            .add_child(root, Node::new("c").with_transform(Matrix4::from_scale(2.0)))
            .unwrap();
        (scene, a, b, c)
    }

    #[test]
    fn world_transform_composes_root_to_leaf() {
        let (scene, a, b, _) = chain_scene();
        let root = scene.root_node().transform;

        assert_relative_eq!(scene.world_transform(scene.root()).unwrap(), root);

        let a_world = scene.world_transform(a).unwrap();
        let b_world = scene.world_transform(b).unwrap();
        assert_relative_eq!(a_world, root * scene.node(a).unwrap().transform);
        assert_relative_eq!(b_world, a_world * scene.node(b).unwrap().transform);

        // Rotated 90 degrees about Z, so the +Y offset lands on -X
        let origin = math::origin_of(&b_world);
        assert_relative_eq!(origin.x, -1.0, epsilon = 1e-5);
        assert_relative_eq!(origin.y, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn traversal_world_transforms_match_world_transform() {
        let (scene, ..) = chain_scene();
        scene.traverse(|id, _, world| {
            assert_relative_eq!(*world, scene.world_transform(id).unwrap());
        });
    }

    #[test]
    fn traversal_is_preorder_in_insertion_order() {
        let (scene, a, b, c) = chain_scene();
        let mut visited = Vec::new();
        scene.traverse(|id, _, _| visited.push(id));
        assert_eq!(visited, vec![scene.root(), a, b, c]);

        let mut again = Vec::new();
        scene.traverse(|id, _, _| again.push(id));
        assert_eq!(visited, again);
    }

    #[test]
    fn try_traverse_stops_at_first_error() {
        let (scene, a, ..) = chain_scene();
        let mut seen = 0;
        let result = scene.try_traverse(|id, _, _| {
            seen += 1;
            if id == a {
                Err(id)
            } else {
                Ok(())
            }
        });
        assert_eq!(result, Err(a));
        assert_eq!(seen, 2);
    }

    #[test]
    fn add_child_rejects_unknown_parent() {
        let mut scene = Scene::new();
        let bogus = NodeId(42);
        assert_eq!(
            scene.add_child(bogus, Node::new("orphan")).unwrap_err(),
            SceneError::UnknownNode(bogus)
        );
    }

    #[test]
    fn point_of_view_must_carry_a_camera() {
        let mut scene = Scene::new();
        let plain = scene.add_child(scene.root(), Node::new("plain")).unwrap();
        assert_eq!(
            scene.set_point_of_view(plain),
            Err(SceneError::NotACamera(plain))
        );
        assert!(scene.active_camera().is_none());

        let camera = scene.add_camera(&crate::camera::CameraConfig::default());
        assert_eq!(scene.point_of_view(), Some(camera));
        let (_, world) = scene.active_camera().unwrap();
        assert_relative_eq!(math::origin_of(&world).z, 15.0);
    }

    #[test]
    fn sphere_grid_layout() {
        let mut scene = Scene::new();
        let grid = GridConfig::default();
        let group = scene.add_sphere_grid(&grid, Some(MeshHandle(0)));

        assert_eq!(scene.node(group).unwrap().children().len(), grid.sphere_count());

        let first = scene.find_by_name("sphere_0_0_0").unwrap();
        let origin = math::origin_of(&scene.world_transform(first).unwrap());
        assert_relative_eq!(origin.x, -1.5);
        assert_relative_eq!(origin.y, -4.5);
        assert_relative_eq!(origin.z, 3.0);

        let last = scene.find_by_name("sphere_1_3_2").unwrap();
        let origin = math::origin_of(&scene.world_transform(last).unwrap());
        assert_relative_eq!(origin.x, 1.5);
        assert_relative_eq!(origin.y, 4.5);
        assert_relative_eq!(origin.z, -3.0);
    }
}
