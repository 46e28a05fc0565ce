// src/engine_lib/portal.rs

use std::f32::consts::PI;

use glam::{Mat4, Quat, Vec2, Vec3, Vec4, Vec4Swizzles};

use crate::engine_lib::camera::CameraPose;
use crate::engine_lib::error::PortalError;
use crate::engine_lib::frame::FrameRecorder;
use crate::engine_lib::scene_types::{BatchId, Material, SceneResources};
use crate::rendering_lib::geometry::Mesh;

/// Pushes the clip plane slightly toward the virtual eye so geometry flush
/// with the exit portal survives.
pub const PORTAL_CLIP_BIAS: f32 = 0.01;
const CLIP_EPSILON: f32 = 1e-4;
const PORTAL_COLOR: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Facing {
    Z,
    NegZ,
}

impl Facing {
    pub fn normal(self) -> Vec3 {
        match self {
            Facing::Z => Vec3::Z,
            Facing::NegZ => Vec3::NEG_Z,
        }
    }

    pub fn rotation(self) -> Quat {
        match self {
            Facing::Z => Quat::IDENTITY,
            Facing::NegZ => Quat::from_rotation_y(PI),
        }
    }
}

/// An axis-aligned rectangular portal. Geometrically it is the unit quad
/// (XY plane, [-0.5, 0.5]) placed by its model matrix.
#[derive(Clone, Debug)]
pub struct Portal {
    anchor: Vec3,
    facing: Facing,
    size: Vec2,
    linked: Option<usize>,
    batch: Option<BatchId>,
    consumed: Option<(Vec3, Vec3)>,
    model: Mat4,
}

impl Portal {
    pub fn new(anchor: Vec3, facing: Facing) -> Self {
        let mut portal = Self {
            anchor,
            facing,
            size: Vec2::ONE,
            linked: None,
            batch: None,
            consumed: None,
            model: Mat4::IDENTITY,
        };
        portal.update();
        portal
    }

    pub fn with_size(mut self, size: Vec2) -> Self {
        self.set_size(size);
        self
    }

    pub fn set_size(&mut self, size: Vec2) {
        self.size = size;
        self.update();
    }

    pub fn anchor(&self) -> Vec3 {
        self.anchor
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn normal(&self) -> Vec3 {
        self.facing.normal()
    }

    pub fn linked(&self) -> Option<usize> {
        self.linked
    }

    pub fn batch(&self) -> Option<BatchId> {
        self.batch
    }

    /// Recomputes the cached model matrix.
    pub fn update(&mut self) {
        self.model = Mat4::from_scale_rotation_translation(
            self.size.extend(1.0),
            self.facing.rotation(),
            self.anchor,
        );
    }

    pub fn model_matrix(&self) -> Mat4 {
        self.model
    }

    /// The frame a traveller leaves through: this portal turned around.
    pub fn exit_matrix(&self) -> Mat4 {
        self.model * Mat4::from_rotation_y(PI)
    }

    /// Registers the portal quad as a static batch.
    pub fn setup(&mut self, resources: &mut SceneResources) {
        let mesh = Mesh::unit_quad().transformed(self.model);
        self.batch = Some(resources.add_batch(mesh, Material::Flat(PORTAL_COLOR)));
    }

    pub fn draw(&self, frame: &mut FrameRecorder) {
        if let Some(batch) = self.batch {
            frame.draw(batch);
        }
    }

    /// Whether the segment `prev -> curr` passes through the rectangle, from
    /// either side. A crossing is reported once: re-testing the segment that
    /// just hit returns false.
    pub fn is_intersect(&mut self, prev: Vec3, curr: Vec3) -> bool {
        if self.consumed == Some((prev, curr)) {
            return false;
        }
        let hit = self.crosses(prev, curr);
        self.consumed = hit.then_some((prev, curr));
        hit
    }

    fn crosses(&self, prev: Vec3, curr: Vec3) -> bool {
        if self.size.x <= 0.0 || self.size.y <= 0.0 {
            return false;
        }
        let normal = self.normal();
        let d_prev = (prev - self.anchor).dot(normal);
        let d_curr = (curr - self.anchor).dot(normal);
        // On-plane points count as the front side.
        if (d_prev >= 0.0) == (d_curr >= 0.0) {
            return false;
        }
        let hit = prev.lerp(curr, d_prev / (d_prev - d_curr));
        let local = self.model.inverse().transform_point3(hit);
        local.x.abs() <= 0.5 && local.y.abs() <= 0.5
    }

    /// Render-only remap: the view seen through a portal whose model matrix
    /// is `entered`, emerging from the frame `linked`. Equal frames leave
    /// `view` untouched.
    pub fn new_view_matrix(view: Mat4, entered: Mat4, linked: Mat4) -> Mat4 {
        view * entered * linked.inverse()
    }
}

/// Replaces the near plane of `projection` with `plane` (view space,
/// kept side positive), keeping depth in 0..1. Points on the plane land at
/// depth 0.
pub fn oblique_projection(projection: Mat4, plane: Vec4) -> Mat4 {
    let inverse = projection.inverse();
    let clip_plane = inverse.transpose() * plane;
    let corner = Vec4::new(sign(clip_plane.x), sign(clip_plane.y), 1.0, 1.0);
    let q = inverse * corner;
    let row = plane * (1.0 / plane.dot(q));

    let mut cols = projection.to_cols_array_2d();
    for (i, col) in cols.iter_mut().enumerate() {
        col[2] = row[i];
    }
    Mat4::from_cols_array_2d(&cols)
}

fn sign(value: f32) -> f32 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Owns every portal of a scene; links are indices into it.
#[derive(Clone, Debug, Default)]
pub struct PortalSet {
    portals: Vec<Portal>,
}

impl PortalSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, portal: Portal) -> usize {
        self.portals.push(portal);
        self.portals.len() - 1
    }

    pub fn len(&self) -> usize {
        self.portals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.portals.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Portal> {
        self.portals.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Portal> {
        self.portals.iter()
    }

    /// Pairs `a` and `b` symmetrically. A previous partner of either side
    /// is left unlinked.
    pub fn link(&mut self, a: usize, b: usize) -> Result<(), PortalError> {
        let len = self.portals.len();
        for index in [a, b] {
            if index >= len {
                return Err(PortalError::OutOfRange { index, len });
            }
        }
        if a == b {
            return Err(PortalError::SelfLink(a));
        }
        for index in [a, b] {
            if let Some(old) = self.portals[index].linked.take() {
                self.portals[old].linked = None;
            }
        }
        self.portals[a].linked = Some(b);
        self.portals[b].linked = Some(a);
        Ok(())
    }

    /// Links (0, 1), (2, 3), ...
    pub fn link_consecutive_pairs(&mut self) -> Result<(), PortalError> {
        for a in (0..self.portals.len().saturating_sub(1)).step_by(2) {
            self.link(a, a + 1)?;
        }
        Ok(())
    }

    pub fn update_all(&mut self) {
        for portal in &mut self.portals {
            portal.update();
        }
    }

    pub fn setup(&mut self, resources: &mut SceneResources) {
        for portal in &mut self.portals {
            portal.setup(resources);
        }
    }

    pub fn draw_all(&self, frame: &mut FrameRecorder) {
        for portal in &self.portals {
            portal.draw(frame);
        }
    }

    fn portal(&self, index: usize) -> Result<&Portal, PortalError> {
        self.portals.get(index).ok_or(PortalError::OutOfRange {
            index,
            len: self.portals.len(),
        })
    }

    fn partner(&self, index: usize) -> Result<&Portal, PortalError> {
        let linked = self.portal(index)?.linked.ok_or(PortalError::Unlinked(index))?;
        self.portal(linked)
    }

    /// Exit frame of `index`'s partner.
    pub fn exit_model(&self, index: usize) -> Result<Mat4, PortalError> {
        Ok(self.partner(index)?.exit_matrix())
    }

    pub fn view_through(&self, index: usize, view: Mat4) -> Result<Mat4, PortalError> {
        let entered = self.portal(index)?.model_matrix();
        Ok(Portal::new_view_matrix(view, entered, self.exit_model(index)?))
    }

    /// The partner's plane in the space of `view_through`, oriented so the
    /// side holding the virtual eye is negative. `None` when the eye is on
    /// or too close to the plane for an oblique near plane.
    pub fn clip_plane(&self, index: usize, view_through: Mat4) -> Result<Option<Vec4>, PortalError> {
        let partner = self.partner(index)?;
        let virtual_eye = view_through.inverse().w_axis.xyz();
        let anchor = partner.anchor();
        let mut normal = partner.normal();
        if (virtual_eye - anchor).dot(normal) > 0.0 {
            normal = -normal;
        }
        let world_plane = normal.extend(-normal.dot(anchor) + PORTAL_CLIP_BIAS);
        let view_plane = view_through.inverse().transpose() * world_plane;
        if view_plane.w >= -CLIP_EPSILON {
            return Ok(None);
        }
        Ok(Some(view_plane))
    }

    /// Moves the camera from portal `index` to its partner, keeping its pose
    /// relative to the portal. Returns the camera's new world matrix.
    pub fn warp(&self, index: usize, camera: &mut dyn CameraPose) -> Result<Mat4, PortalError> {
        let transform = self.exit_model(index)? * self.portal(index)?.model_matrix().inverse();
        let eye = transform.transform_point3(camera.eye());
        let forward = transform.transform_vector3(camera.forward()).normalize_or_zero();
        camera.set_pose(eye, forward);
        log::info!("warped through portal {index} to {eye}");
        Ok(camera.world_matrix())
    }

    /// Tests portals in order and warps through the first one crossed.
    pub fn process_crossing(
        &mut self,
        prev: Vec3,
        curr: Vec3,
        camera: &mut dyn CameraPose,
    ) -> Result<Option<usize>, PortalError> {
        for index in 0..self.portals.len() {
            if self.portals[index].is_intersect(prev, curr) {
                self.warp(index, camera)?;
                return Ok(Some(index));
            }
        }
        Ok(None)
    }
}
