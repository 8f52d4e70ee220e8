//! Ray picking against node bounding spheres.
//!
//! Every node's sphere is tested independently. A parent's sphere does not
//! bound its children, so there is no hierarchical pruning.

use cgmath::{InnerSpace, Matrix4, Point3, SquareMatrix, Vector3};

use crate::{
    input::{ScreenPoint, ViewportSize},
    math,
    node::NodeId,
    scene::Scene,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point3<f32>,
    /// Always normalized
    pub direction: Vector3<f32>,
}

impl Ray {
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    pub fn point_at(&self, t: f32) -> Point3<f32> {
        self.origin + self.direction * t
    }

    /// Unprojects a screen point into a world-space ray starting on the near plane.
    pub fn from_screen(
        viewport: ViewportSize,
        point: ScreenPoint,
        view: &Matrix4<f32>,
        projection: &Matrix4<f32>,
    ) -> Option<Ray> {
        if viewport.is_empty() {
            return None;
        }
        let inverse = (projection * view).invert()?;
        let (ndc_x, ndc_y) = math::screen_to_ndc(viewport, point);
        let near = math::unproject(&inverse, ndc_x, ndc_y, 0.0)?;
        let far = math::unproject(&inverse, ndc_x, ndc_y, 1.0)?;
        let direction = far - near;
        if direction.magnitude2() <= f32::EPSILON {
            return None;
        }
        Some(Ray::new(near, direction))
    }

    /// Nearest non-negative `t` at which the ray meets the sphere.
    ///
    /// A ray starting inside the sphere reports the exit point. Tangent rays
    /// count as hits.
    pub fn intersect_sphere(&self, center: Point3<f32>, radius: f32) -> Option<f32> {
        // Solve |origin + t*direction - center|^2 = radius^2 with |direction| = 1
        let oc = self.origin - center;
        let b = oc.dot(self.direction);
        let c = oc.magnitude2() - radius * radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }

        let root = discriminant.sqrt();
        let t_near = -b - root;
        let t_far = -b + root;
        if t_near >= 0.0 {
            Some(t_near)
        } else if t_far >= 0.0 {
            Some(t_far)
        } else {
            None
        }
    }
}

/// Result of a pick. Produced per query, never stored in the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitResult {
    pub node: NodeId,
    pub point: Point3<f32>,
    /// Ray parameter of the intersection
    pub distance: f32,
}

impl Scene {
    /// Closest intersection along `ray` among all nodes with a bounding sphere.
    ///
    /// Equal distances resolve to the node visited first in traversal order.
    pub fn hit_test(&self, ray: &Ray) -> Option<HitResult> {
        let mut best = None;
        self.traverse(|id, node, world| {
            let sphere = match node.bounding_sphere {
                Some(sphere) => sphere,
                None => return,
            };
            let center = math::origin_of(world);
            let radius = sphere.radius * math::max_scale(world);
            let t = match ray.intersect_sphere(center, radius) {
                Some(t) => t,
                None => return,
            };
            let closer = match &best {
                Some(HitResult { distance, .. }) => t < *distance,
                None => true,
            };
            if closer {
                best = Some(HitResult {
                    node: id,
                    point: ray.point_at(t),
                    distance: t,
                });
            }
        });
        best
    }

    /// Picks the node under `point` as seen from the scene's point of view.
    ///
    /// Returns `None` when there is no camera, the viewport is empty, or
    /// nothing is hit.
    pub fn pick(&self, viewport: ViewportSize, point: ScreenPoint) -> Option<HitResult> {
        if viewport.is_empty() {
            return None;
        }
        let (camera, camera_world) = self.active_camera()?;
        let view = camera_world.invert()?;
        let projection = camera.projection_matrix(viewport.aspect_ratio());
        let ray = Ray::from_screen(viewport, point, &view, &projection)?;
        let hit = self.hit_test(&ray);
        if let Some(hit) = &hit {
            log::debug!(
                "picked {:?} at t = {:.3}",
                self.node(hit.node).map(|node| node.name.as_str()),
                hit.distance
            );
        }
        hit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use approx::assert_relative_eq;

    fn ray_down_z() -> Ray {
        Ray::new(Point3::new(0.0, 0.0, 10.0), Vector3::new(0.0, 0.0, -1.0))
    }

    fn sphere_at(scene: &mut Scene, name: &str, z: f32) -> NodeId {
        scene
            .add_child(
                scene.root(),
                Node::new(name)
                    .with_transform(math::translation(0.0, 0.0, z))
                    .with_bounding_radius(1.0),
            )
            .unwrap()
    }

    #[test]
    fn ray_sphere_intersection() {
        let ray = ray_down_z();
        assert_relative_eq!(ray.intersect_sphere(Point3::new(0.0, 0.0, 0.0), 1.0).unwrap(), 9.0);
        assert_eq!(ray.intersect_sphere(Point3::new(5.0, 0.0, 0.0), 1.0), None);
        // Behind the origin
        assert_eq!(ray.intersect_sphere(Point3::new(0.0, 0.0, 20.0), 1.0), None);
        // Origin inside the sphere reports the exit
        assert_relative_eq!(ray.intersect_sphere(Point3::new(0.0, 0.0, 10.0), 2.0).unwrap(), 2.0);
    }

    #[test]
    fn tangent_ray_hits() {
        let ray = ray_down_z();
        let t = ray.intersect_sphere(Point3::new(1.0, 0.0, 0.0), 1.0).unwrap();
        assert_relative_eq!(t, 10.0);
    }

    #[test]
    fn closest_sphere_wins_regardless_of_order() {
        let mut scene = Scene::new();
        let far = sphere_at(&mut scene, "far", -5.0);
        let near = sphere_at(&mut scene, "near", 2.0);

        let hit = scene.hit_test(&ray_down_z()).unwrap();
        assert_eq!(hit.node, near);
        assert_relative_eq!(hit.distance, 7.0);
        assert_relative_eq!(hit.point.z, 3.0);
        assert_ne!(hit.node, far);
    }

    #[test]
    fn miss_returns_none() {
        let mut scene = Scene::new();
        sphere_at(&mut scene, "a", 0.0);
        let ray = Ray::new(Point3::new(5.0, 5.0, 10.0), Vector3::new(0.0, 0.0, -1.0));
        assert_eq!(scene.hit_test(&ray), None);
    }

    #[test]
    fn equal_distance_resolves_to_first_visited() {
        let mut scene = Scene::new();
        let first = sphere_at(&mut scene, "first", 0.0);
        let _second = sphere_at(&mut scene, "second", 0.0);
        assert_eq!(scene.hit_test(&ray_down_z()).unwrap().node, first);
    }

    #[test]
    fn children_are_tested_without_parent_bounds() {
        let mut scene = Scene::new();
        // Parent has no sphere and sits off the ray; its child is on it
        let parent = scene
            .add_child(
                scene.root(),
                Node::new("group").with_transform(math::translation(10.0, 0.0, 0.0)),
            )
            .unwrap();
        let child = scene
            .add_child(
                parent,
                Node::new("child")
                    .with_transform(math::translation(-10.0, 0.0, 0.0))
                    .with_bounding_radius(1.0),
            )
            .unwrap();
        assert_eq!(scene.hit_test(&ray_down_z()).unwrap().node, child);
    }

    #[test]
    fn scaled_nodes_scale_their_sphere() {
        let mut scene = Scene::new();
        let big = scene
            .add_child(
                scene.root(),
                Node::new("big")
                    .with_transform(Matrix4::from_scale(3.0))
                    .with_bounding_radius(1.0),
            )
            .unwrap();
        let ray = Ray::new(Point3::new(2.5, 0.0, 10.0), Vector3::new(0.0, 0.0, -1.0));
        assert_eq!(scene.hit_test(&ray).unwrap().node, big);
    }

    #[test]
    fn pick_without_camera_is_no_hit() {
        let mut scene = Scene::new();
        sphere_at(&mut scene, "a", 0.0);
        let viewport = ViewportSize::new(100.0, 100.0);
        assert_eq!(scene.pick(viewport, ScreenPoint::new(50.0, 50.0)), None);
    }

    #[test]
    fn pick_through_screen_center() {
        let mut scene = Scene::new();
        scene.add_camera(&crate::camera::CameraConfig::default());
        let target = sphere_at(&mut scene, "target", 0.0);
        let viewport = ViewportSize::new(640.0, 480.0);

        let hit = scene.pick(viewport, ScreenPoint::new(320.0, 240.0)).unwrap();
        assert_eq!(hit.node, target);
        assert_relative_eq!(hit.point.z, 1.0, epsilon = 1e-3);

        let empty = ViewportSize::new(0.0, 480.0);
        assert_eq!(scene.pick(empty, ScreenPoint::new(0.0, 0.0)), None);
    }
}
