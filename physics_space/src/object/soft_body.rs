//! Mass-spring soft bodies solved with position-based link constraints

use super::SpaceObject;
use crate::collision::narrow_phase::{self, PlacedShape};
use crate::collision::{ContactManifold, Shape, AABB};
use crate::math::Transform;
use glam::Vec3;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoftNode {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Zero for pinned nodes
    pub inv_mass: f32,
    predicted: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoftLink {
    pub a: usize,
    pub b: usize,
    pub rest_length: f32,
}

/// A body shape a soft body collides with during the current step
#[derive(Debug, Clone, Copy)]
pub(crate) struct SoftCollider {
    pub shape: Shape,
    pub transform: Transform,
}

#[derive(Debug, Clone)]
pub struct SoftBody {
    nodes: Vec<SoftNode>,
    links: Vec<SoftLink>,
    /// Link stiffness in `0..=1`
    pub stiffness: f32,
    pub damping: f32,
    /// Constraint iterations per step
    pub iterations: u32,
    /// Collision radius of every node
    pub node_radius: f32,
    pub(crate) colliders: Vec<SoftCollider>,
}

impl SoftBody {
    /// Build a soft body from node positions and links; out-of-range links are dropped.
    pub fn new(positions: &[Vec3], links: &[(usize, usize)], total_mass: f32) -> Self {
        let inv_mass = if positions.is_empty() || total_mass <= 0.0 {
            0.0
        } else {
            positions.len() as f32 / total_mass
        };

        let nodes: Vec<SoftNode> = positions
            .iter()
            .map(|&position| SoftNode {
                position,
                velocity: Vec3::ZERO,
                inv_mass,
                predicted: position,
            })
            .collect();

        let mut soft_links = Vec::with_capacity(links.len());
        for &(a, b) in links {
            if a >= nodes.len() || b >= nodes.len() || a == b {
                warn!(a, b, nodes = nodes.len(), "Soft body link out of range dropped");
                continue;
            }
            soft_links.push(SoftLink {
                a,
                b,
                rest_length: nodes[a].position.distance(nodes[b].position),
            });
        }

        Self {
            nodes,
            links: soft_links,
            stiffness: 0.9,
            damping: 0.01,
            iterations: 5,
            node_radius: 0.05,
            colliders: Vec::new(),
        }
    }

    /// A chain of `segments` links between `start` and `end`
    pub fn rope(start: Vec3, end: Vec3, segments: usize, total_mass: f32) -> Self {
        let segments = segments.max(1);
        let positions: Vec<Vec3> = (0..=segments)
            .map(|i| start.lerp(end, i as f32 / segments as f32))
            .collect();
        let links: Vec<(usize, usize)> = (0..segments).map(|i| (i, i + 1)).collect();
        Self::new(&positions, &links, total_mass)
    }

    pub fn nodes(&self) -> &[SoftNode] {
        &self.nodes
    }

    pub fn links(&self) -> &[SoftLink] {
        &self.links
    }

    /// Pin a node in place
    pub fn pin_node(&mut self, index: usize) {
        if let Some(node) = self.nodes.get_mut(index) {
            node.inv_mass = 0.0;
            node.velocity = Vec3::ZERO;
        }
    }

    pub fn aabb(&self) -> AABB {
        let mut aabb = AABB::EMPTY;
        for node in &self.nodes {
            aabb.expand_to_include(node.position);
        }
        if self.nodes.is_empty() {
            return AABB::from_center_half_extents(Vec3::ZERO, Vec3::ZERO);
        }
        aabb.grown(self.node_radius)
    }

    pub(crate) fn integrate_forces(&mut self, dt: f32, gravity: Vec3, linear_damp: f32) {
        let damp = (1.0 - dt * (linear_damp + self.damping)).max(0.0);
        for node in self.nodes.iter_mut().filter(|node| node.inv_mass > 0.0) {
            node.velocity = (node.velocity + gravity * dt) * damp;
        }
    }

    /// Predict positions, then enforce links and push nodes out of colliders
    pub(crate) fn solve(&mut self, dt: f32) {
        for node in &mut self.nodes {
            node.predicted = node.position + node.velocity * dt;
        }

        let stiffness = self.stiffness.clamp(0.0, 1.0);
        let mut manifold = ContactManifold::new();
        let node_shape = Shape::Sphere {
            radius: self.node_radius,
        };

        for _ in 0..self.iterations.max(1) {
            for link in &self.links {
                let a = self.nodes[link.a];
                let b = self.nodes[link.b];
                let w = a.inv_mass + b.inv_mass;
                if w <= 0.0 {
                    continue;
                }
                let delta = b.predicted - a.predicted;
                let length = delta.length();
                if length <= f32::EPSILON {
                    continue;
                }
                let correction = delta * ((length - link.rest_length) / (length * w)) * stiffness;
                self.nodes[link.a].predicted += correction * a.inv_mass;
                self.nodes[link.b].predicted -= correction * b.inv_mass;
            }

            for collider in &self.colliders {
                let obstacle = PlacedShape::new(&collider.shape, collider.transform);
                for node in self.nodes.iter_mut().filter(|node| node.inv_mass > 0.0) {
                    let node_sphere =
                        PlacedShape::new(&node_shape, Transform::from_position(node.predicted));
                    if narrow_phase::collide(&node_sphere, &obstacle, 0.0, &mut manifold) {
                        if let Some(contact) = manifold.deepest() {
                            node.predicted -= contact.normal * contact.depth;
                        }
                    }
                }
            }
        }
    }

    pub(crate) fn integrate_velocities(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        for node in &mut self.nodes {
            if !node.predicted.is_finite() {
                warn!(position = ?node.position, "Non-finite soft body node reset");
                node.predicted = node.position;
                node.velocity = Vec3::ZERO;
                continue;
            }
            node.velocity = (node.predicted - node.position) / dt;
            node.position = node.predicted;
        }
    }
}

impl SpaceObject for SoftBody {
    fn is_static(&self) -> bool {
        false
    }

    fn is_active(&self) -> bool {
        true
    }

    /// Velocity of the node nearest to `point`
    fn velocity_at(&self, point: Vec3, _origin: Vec3) -> Vec3 {
        self.nodes
            .iter()
            .min_by(|a, b| {
                a.position
                    .distance_squared(point)
                    .total_cmp(&b.position.distance_squared(point))
            })
            .map(|node| node.velocity)
            .unwrap_or(Vec3::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rope_keeps_link_lengths() {
        let mut rope = SoftBody::rope(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), 4, 1.0);
        rope.pin_node(0);
        rope.stiffness = 1.0;
        rope.iterations = 20;
        for _ in 0..30 {
            rope.integrate_forces(1.0 / 60.0, Vec3::new(0.0, -9.8, 0.0), 0.0);
            rope.solve(1.0 / 60.0);
            rope.integrate_velocities(1.0 / 60.0);
        }

        assert_eq!(rope.nodes()[0].position, Vec3::ZERO);
        for link in rope.links() {
            let length = rope.nodes()[link.a].position.distance(rope.nodes()[link.b].position);
            assert!((length - link.rest_length).abs() < 0.05, "link stretched to {length}");
        }
        assert!(rope.nodes()[4].position.y < 0.0, "free end should fall");
    }

    #[test]
    fn test_nodes_rest_on_collider() {
        let mut sheet = SoftBody::new(&[Vec3::new(0.0, 0.5, 0.0)], &[], 1.0);
        sheet.colliders.push(SoftCollider {
            shape: Shape::WorldBoundary {
                normal: Vec3::Y,
                distance: 0.0,
            },
            transform: Transform::IDENTITY,
        });
        for _ in 0..120 {
            sheet.integrate_forces(1.0 / 60.0, Vec3::new(0.0, -9.8, 0.0), 0.0);
            sheet.solve(1.0 / 60.0);
            sheet.integrate_velocities(1.0 / 60.0);
        }
        let y = sheet.nodes()[0].position.y;
        assert!(y >= sheet.node_radius - 1e-3, "node sank to {y}");
    }

    #[test]
    fn test_out_of_range_links_dropped() {
        let soft = SoftBody::new(&[Vec3::ZERO, Vec3::X], &[(0, 1), (0, 7), (1, 1)], 1.0);
        assert_eq!(soft.links().len(), 1);
    }
}
