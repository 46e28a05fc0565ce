// src/engine_lib/tunnel.rs

use glam::Vec3;

use crate::engine_lib::frame::FrameRecorder;
use crate::engine_lib::portal::Facing;
use crate::engine_lib::scene_types::{BatchId, Material, SceneResources, TextureId};
use crate::rendering_lib::geometry::Mesh;

const UNTEXTURED_COLOR: [f32; 4] = [1.0, 0.0, 0.0, 1.0];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TunnelSegment {
    pub origin: Vec3,
    pub batch: BatchId,
}

/// A straight shaft of box-shell segments running from `position` (centre
/// of the entry opening) along the opposite of `face`.
#[derive(Clone, Debug)]
pub struct Tunnel {
    position: Vec3,
    face: Facing,
    count: usize,
    width: f32,
    height: f32,
    thickness: f32,
    length: f32,
    texture: Option<TextureId>,
    segments: Vec<TunnelSegment>,
    walls: Vec<BatchId>,
}

impl Default for Tunnel {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            face: Facing::Z,
            count: 1,
            width: 6.0,
            height: 4.5,
            thickness: 1.0,
            length: 6.0,
            texture: None,
            segments: Vec::new(),
            walls: Vec::new(),
        }
    }
}

impl Tunnel {
    pub fn new(position: Vec3, count: i32) -> Self {
        let mut tunnel = Self {
            position,
            ..Self::default()
        };
        tunnel.set_count(count);
        tunnel
    }

    pub fn set_count(&mut self, count: i32) {
        if count < 0 {
            log::warn!("tunnel segment count {count} is negative; using 0");
        }
        self.count = count.max(0) as usize;
    }

    pub fn set_face(&mut self, face: Facing) {
        self.face = face;
    }

    pub fn set_texture(&mut self, texture: TextureId) {
        self.texture = Some(texture);
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn length(&self) -> f32 {
        self.length
    }

    pub fn segments(&self) -> &[TunnelSegment] {
        &self.segments
    }

    pub fn walls(&self) -> &[BatchId] {
        &self.walls
    }

    /// Centre of the exit opening.
    pub fn far_end(&self) -> Vec3 {
        self.position - self.face.normal() * (self.count as f32 * self.length)
    }

    fn material(&self) -> Material {
        match self.texture {
            Some(texture) => Material::Textured(texture),
            None => Material::Flat(UNTEXTURED_COLOR),
        }
    }

    fn segment_mesh(&self, origin: Vec3) -> Mesh {
        let (w, h, t, l) = (self.width, self.height, self.thickness, self.length);
        let center = origin - self.face.normal() * (l * 0.5);
        let side = Vec3::new(t, h + 2.0 * t, l);
        let cap = Vec3::new(w, t, l);
        // Box extents are axis aligned; facing only flips along z.
        let side_offset = Vec3::X * (w + t) * 0.5;
        let cap_offset = Vec3::Y * (h + t) * 0.5;

        let mut mesh = Mesh::cuboid(center - side_offset, side);
        mesh.append(&Mesh::cuboid(center + side_offset, side));
        mesh.append(&Mesh::cuboid(center + cap_offset, cap));
        mesh.append(&Mesh::cuboid(center - cap_offset, cap));
        mesh
    }

    /// Builds the shaft, replacing any segments from an earlier call.
    pub fn setup_tunnel(&mut self, resources: &mut SceneResources) {
        self.segments.clear();
        let material = self.material();
        for i in 0..self.count {
            let origin = self.position - self.face.normal() * (i as f32 * self.length);
            let batch = resources.add_batch(self.segment_mesh(origin), material.clone());
            self.segments.push(TunnelSegment { origin, batch });
        }
        log::debug!("tunnel at {} built with {} segments", self.position, self.count);
    }

    fn push_wall(&mut self, resources: &mut SceneResources, width: f32) {
        let t = self.thickness;
        let center = self.far_end() - self.face.normal() * (t * 0.5);
        let size = Vec3::new(width, self.height + 2.0 * t, t);
        let batch = resources.add_batch(Mesh::cuboid(center, size), self.material());
        self.walls.push(batch);
    }

    /// Wide panel behind the far end, like a cliff the tunnel runs into.
    pub fn setup_side_wall(&mut self, resources: &mut SceneResources) {
        let width = 3.0 * (self.width + 2.0 * self.thickness);
        self.push_wall(resources, width);
    }

    /// Plug closing the far end, flush with the shaft.
    pub fn setup_front_wall(&mut self, resources: &mut SceneResources) {
        let width = self.width + 2.0 * self.thickness;
        self.push_wall(resources, width);
    }

    pub fn draw(&self, frame: &mut FrameRecorder) {
        for segment in &self.segments {
            frame.draw(segment.batch);
        }
        for &wall in &self.walls {
            frame.draw(wall);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_lib::frame::RenderCommand;

    fn built(position: Vec3, count: i32) -> (Tunnel, SceneResources) {
        let mut resources = SceneResources::default();
        let mut tunnel = Tunnel::new(position, count);
        tunnel.setup_tunnel(&mut resources);
        (tunnel, resources)
    }

    #[test]
    fn segments_are_spaced_along_negative_face() {
        let (tunnel, _) = built(Vec3::new(10.0, 3.0, -5.0), 6);
        assert_eq!(tunnel.segments().len(), 6);
        for (i, segment) in tunnel.segments().iter().enumerate() {
            assert_eq!(segment.origin, Vec3::new(10.0, 3.0, -5.0 - 6.0 * i as f32));
        }
        assert_eq!(tunnel.far_end(), Vec3::new(10.0, 3.0, -41.0));
    }

    #[test]
    fn facing_negative_z_runs_toward_positive_z() {
        let mut resources = SceneResources::default();
        let mut tunnel = Tunnel::new(Vec3::ZERO, 2);
        tunnel.set_face(Facing::NegZ);
        tunnel.setup_tunnel(&mut resources);
        assert_eq!(tunnel.segments()[1].origin, Vec3::new(0.0, 0.0, 6.0));
        assert_eq!(tunnel.far_end(), Vec3::new(0.0, 0.0, 12.0));
    }

    #[test]
    fn segment_leaves_opening_clear() {
        let (tunnel, resources) = built(Vec3::new(-10.0, 3.0, -5.0), 1);
        let mesh = &resources.batch(tunnel.segments()[0].batch).unwrap().mesh;
        let (min, max) = mesh.bounds().unwrap();
        assert_eq!(min, Vec3::new(-14.0, -0.25, -11.0));
        assert_eq!(max, Vec3::new(-6.0, 6.25, -5.0));

        // Centre line of the shaft is outside every slab.
        for slab in mesh.vertices.chunks(24) {
            let xs = slab.iter().map(|v| v.position[0]);
            let ys = slab.iter().map(|v| v.position[1]);
            let (x_lo, x_hi) = xs.fold((f32::MAX, f32::MIN), |(lo, hi), x| (lo.min(x), hi.max(x)));
            let (y_lo, y_hi) = ys.fold((f32::MAX, f32::MIN), |(lo, hi), y| (lo.min(y), hi.max(y)));
            let inside = (x_lo..=x_hi).contains(&-10.0) && (y_lo..=y_hi).contains(&3.0);
            assert!(!inside);
        }
    }

    #[test]
    fn zero_and_negative_counts_build_no_shaft() {
        let (empty, resources) = built(Vec3::ZERO, 0);
        assert!(empty.segments().is_empty());
        assert!(resources.batches().is_empty());

        let (negative, _) = built(Vec3::ZERO, -3);
        assert_eq!(negative.count(), 0);
        assert!(negative.segments().is_empty());
    }

    #[test]
    fn walls_cap_the_far_end() {
        let mut resources = SceneResources::default();
        let mut tunnel = Tunnel::new(Vec3::new(10.0, 3.0, -5.0), 6);
        tunnel.setup_tunnel(&mut resources);
        tunnel.setup_front_wall(&mut resources);
        tunnel.setup_side_wall(&mut resources);

        let front = resources.batch(tunnel.walls()[0]).unwrap().mesh.bounds().unwrap();
        assert_eq!(front, (Vec3::new(6.0, -0.25, -42.0), Vec3::new(14.0, 6.25, -41.0)));
        let side = resources.batch(tunnel.walls()[1]).unwrap().mesh.bounds().unwrap();
        assert_eq!(side.1.x - side.0.x, 24.0);
    }

    #[test]
    fn walls_without_shaft_still_emitted() {
        let mut resources = SceneResources::default();
        let mut tunnel = Tunnel::new(Vec3::ZERO, 0);
        tunnel.setup_tunnel(&mut resources);
        tunnel.setup_side_wall(&mut resources);
        assert_eq!(tunnel.walls().len(), 1);
    }

    #[test]
    fn draw_records_shaft_then_walls() {
        let mut resources = SceneResources::default();
        let mut tunnel = Tunnel::new(Vec3::ZERO, 2);
        tunnel.set_texture(0);
        tunnel.setup_tunnel(&mut resources);
        tunnel.setup_front_wall(&mut resources);

        let mut frame = FrameRecorder::new();
        tunnel.draw(&mut frame);
        let batches: Vec<_> = frame
            .commands()
            .iter()
            .filter_map(|c| match c {
                RenderCommand::Draw { batch, .. } => Some(*batch),
                _ => None,
            })
            .collect();
        assert_eq!(batches, vec![0, 1, 2]);
        assert_eq!(resources.batch(0).unwrap().material, Material::Textured(0));
    }

    #[test]
    fn setup_twice_rebuilds_instead_of_duplicating() {
        let mut resources = SceneResources::default();
        let mut tunnel = Tunnel::new(Vec3::ZERO, 3);
        tunnel.setup_tunnel(&mut resources);
        tunnel.setup_tunnel(&mut resources);
        assert_eq!(tunnel.segments().len(), 3);
    }
}
