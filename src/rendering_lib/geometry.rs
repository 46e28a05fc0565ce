// src/rendering_lib/geometry.rs

use glam::{Mat4, Vec2, Vec3};

use super::vertex::Vertex;

/// Indexed triangle list in world space (or in a unit frame that a model
/// matrix places, for portal quads).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

// (outward normal, u axis, v axis) with u x v == normal, so each face winds
// counter-clockwise seen from outside.
const CUBOID_FACES: [(Vec3, Vec3, Vec3); 6] = [
    (Vec3::X, Vec3::NEG_Z, Vec3::Y),
    (Vec3::NEG_X, Vec3::Z, Vec3::Y),
    (Vec3::Y, Vec3::X, Vec3::NEG_Z),
    (Vec3::NEG_Y, Vec3::X, Vec3::Z),
    (Vec3::Z, Vec3::X, Vec3::Y),
    (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
];

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Axis-aligned box centred on `center`.
    pub fn cuboid(center: Vec3, size: Vec3) -> Self {
        let half = size * 0.5;
        let mut mesh = Self::new();
        for (normal, u, v) in CUBOID_FACES {
            mesh.push_quad(center + normal * half, u * half, v * half);
        }
        mesh
    }

    pub fn cube(size: f32) -> Self {
        Self::cuboid(Vec3::ZERO, Vec3::splat(size))
    }

    /// Horizontal plane facing +Y, `size` spanning x and z.
    pub fn plane(origin: Vec3, size: Vec2) -> Self {
        let mut mesh = Self::new();
        mesh.push_quad(
            origin,
            Vec3::X * (size.x * 0.5),
            Vec3::NEG_Z * (size.y * 0.5),
        );
        mesh
    }

    /// Unit quad in the XY plane facing +Z, spanning [-0.5, 0.5].
    pub fn unit_quad() -> Self {
        let mut mesh = Self::new();
        mesh.push_quad(Vec3::ZERO, Vec3::X * 0.5, Vec3::Y * 0.5);
        mesh
    }

    pub fn append(&mut self, other: &Mesh) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.indices.extend(other.indices.iter().map(|index| index + base));
    }

    pub fn transformed(&self, transform: Mat4) -> Self {
        let vertices = self
            .vertices
            .iter()
            .map(|vertex| {
                let position = transform.transform_point3(Vec3::from(vertex.position));
                Vertex::new(position.to_array(), vertex.uv)
            })
            .collect();
        Self {
            vertices,
            indices: self.indices.clone(),
        }
    }

    /// Min/max corners, or `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut positions = self.vertices.iter().map(|vertex| Vec3::from(vertex.position));
        let first = positions.next()?;
        Some(positions.fold((first, first), |(min, max), p| (min.min(p), max.max(p))))
    }

    fn push_quad(&mut self, center: Vec3, half_u: Vec3, half_v: Vec3) {
        let base = self.vertices.len() as u32;
        let corners = [
            (center - half_u - half_v, [0.0, 1.0]),
            (center + half_u - half_v, [1.0, 1.0]),
            (center + half_u + half_v, [1.0, 0.0]),
            (center - half_u + half_v, [0.0, 0.0]),
        ];
        for (position, uv) in corners {
            self.vertices.push(Vertex::new(position.to_array(), uv));
        }
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
}
