// src/scenes/tunnel_portal.rs

use std::rc::Rc;

use glam::{Vec2, Vec3};

use super::common::{
    handle_camera_toggle, init_camera, load_shared_assets, poll_movement, FrameClock, MouseTracker, CLEAR_COLOR,
};
use super::{Scene, SceneContext};
use crate::engine_lib::camera::CameraPose;
use crate::engine_lib::controller::CameraController;
use crate::engine_lib::error::SceneError;
use crate::engine_lib::frame::{FrameRecorder, StencilMode};
use crate::engine_lib::input::{HostInput, Key};
use crate::engine_lib::portal::{oblique_projection, Facing, Portal, PortalSet};
use crate::engine_lib::scene_types::{AssetMap, BatchId, Material, SceneResources};
use crate::engine_lib::tunnel::Tunnel;
use crate::rendering_lib::geometry::Mesh;

pub const PORTAL_SIZE: Vec2 = Vec2::new(6.0, 4.5);

/// A short and a long tunnel whose insides are swapped: the short one
/// opens onto a long shaft hidden below the floor, and the long one onto a
/// single segment further down.
pub struct TunnelPortalScene {
    input: Rc<dyn HostInput>,
    controller: CameraController,
    resources: SceneResources,
    clock: FrameClock,
    mouse: MouseTracker,
    last_eye: Vec3,
    warps: usize,
    skybox: Option<BatchId>,
    floors: Vec<BatchId>,
    short_tunnel: Tunnel,
    long_tunnel: Tunnel,
    illusion_short_tunnel: Tunnel,
    illusion_long_tunnel: Tunnel,
    portals: PortalSet,
}

impl TunnelPortalScene {
    pub fn new(context: &SceneContext) -> Self {
        let controller = context.controller();
        Self {
            input: context.input.clone(),
            last_eye: controller.eye(),
            controller,
            resources: SceneResources::default(),
            clock: FrameClock::default(),
            mouse: MouseTracker::default(),
            warps: 0,
            skybox: None,
            floors: Vec::new(),
            short_tunnel: Tunnel::new(Vec3::new(-10.0, 3.0, -5.0), 1),
            long_tunnel: Tunnel::new(Vec3::new(10.0, 3.0, -5.0), 6),
            illusion_short_tunnel: Tunnel::new(Vec3::new(-10.0, -27.0, -5.0), 6),
            illusion_long_tunnel: Tunnel::new(Vec3::new(10.0, -97.0, -5.0), 1),
            portals: PortalSet::new(),
        }
    }

    pub fn portals(&self) -> &PortalSet {
        &self.portals
    }

    fn tunnels(&self) -> [&Tunnel; 4] {
        [
            &self.short_tunnel,
            &self.long_tunnel,
            &self.illusion_short_tunnel,
            &self.illusion_long_tunnel,
        ]
    }

    fn setup_portals(&mut self) -> Result<(), SceneError> {
        let (short, long) = (&self.short_tunnel, &self.long_tunnel);
        let (illusion_short, illusion_long) = (&self.illusion_short_tunnel, &self.illusion_long_tunnel);
        // Consecutive entries are partners.
        let placements = [
            (short.position(), Facing::Z),
            (illusion_short.position(), Facing::NegZ),
            (illusion_short.far_end(), Facing::Z),
            (short.far_end(), Facing::NegZ),
            (long.position(), Facing::Z),
            (illusion_long.position(), Facing::NegZ),
            (illusion_long.far_end(), Facing::Z),
            (long.far_end(), Facing::NegZ),
        ];
        for (anchor, facing) in placements {
            self.portals.add(Portal::new(anchor, facing).with_size(PORTAL_SIZE));
        }
        self.portals.link_consecutive_pairs()?;
        self.portals.setup(&mut self.resources);
        Ok(())
    }

    fn draw_scene_objects(&self, frame: &mut FrameRecorder) {
        if let Some(skybox) = self.skybox {
            frame.draw(skybox);
        }
        for &floor in &self.floors {
            frame.draw(floor);
        }
        for tunnel in self.tunnels() {
            tunnel.draw(frame);
        }
    }

    /// Renders the world as seen through portal `index`, masked to the
    /// portal's silhouette.
    fn draw_portal_view(&self, index: usize, frame: &mut FrameRecorder) {
        frame.color_mask(false);
        frame.depth_mask(false);
        frame.set_stencil_mode(StencilMode::Increment);
        frame.clear_stencil();
        if let Some(portal) = self.portals.get(index) {
            portal.draw(frame);
        }

        frame.color_mask(true);
        frame.depth_mask(true);
        frame.set_stencil_mode(StencilMode::Inside { reference: 1 });
        frame.push_view_matrix();
        frame.push_projection_matrix();

        let view = frame.view_matrix();
        match self.portals.view_through(index, view) {
            Ok(through) => {
                frame.set_view_matrix(through);
                match self.portals.clip_plane(index, through) {
                    Ok(Some(plane)) => {
                        let projection = frame.projection_matrix();
                        frame.set_projection_matrix(oblique_projection(projection, plane));
                    }
                    Ok(None) => {}
                    Err(err) => log::error!("portal {index}: {err}"),
                }
                self.draw_scene_objects(frame);
            }
            Err(err) => log::error!("portal {index}: {err}"),
        }

        frame.pop_projection_matrix();
        frame.pop_view_matrix();
    }
}

impl Scene for TunnelPortalScene {
    fn name(&self) -> &'static str {
        "Tunnel + Portal"
    }

    fn setup(&mut self, assets: &AssetMap) -> Result<(), SceneError> {
        let shared = load_shared_assets(assets, &mut self.resources)?;
        self.skybox = Some(shared.skybox);

        let floor = Material::Textured(shared.floor_texture);
        let floors = [
            Mesh::plane(Vec3::ZERO, Vec2::splat(100.0)),
            Mesh::plane(Vec3::new(0.0, -30.001, 0.0), Vec2::new(100.0, 300.0)),
            Mesh::plane(Vec3::new(0.0, -100.0, 0.0), Vec2::new(100.0, 100.0 / 3.0)),
        ];
        for mesh in floors {
            let batch = self.resources.add_batch(mesh, floor.clone());
            self.floors.push(batch);
        }

        for tunnel in [
            &mut self.short_tunnel,
            &mut self.long_tunnel,
            &mut self.illusion_short_tunnel,
            &mut self.illusion_long_tunnel,
        ] {
            tunnel.set_texture(shared.tunnel_texture);
            tunnel.setup_tunnel(&mut self.resources);
        }

        self.setup_portals()?;

        self.input.set_cursor_captured(true);
        init_camera(&mut self.controller);
        self.last_eye = self.controller.eye();
        log::info!(
            "tunnel portal scene set up with {} portals and {} batches",
            self.portals.len(),
            self.resources.batches().len()
        );
        Ok(())
    }

    fn update(&mut self, elapsed: f64) {
        let dt = self.clock.tick(elapsed);
        self.portals.update_all();

        let eye = self.controller.eye();
        match self.portals.process_crossing(self.last_eye, eye, &mut self.controller) {
            Ok(Some(_)) => self.warps += 1,
            Ok(None) => {}
            Err(err) => log::error!("portal crossing failed: {err}"),
        }
        self.last_eye = self.controller.eye();

        poll_movement(&mut self.controller, self.input.as_ref(), dt);
    }

    fn draw(&self, frame: &mut FrameRecorder) {
        frame.clear(CLEAR_COLOR);
        frame.depth_mask(true);
        frame.set_matrices(&self.controller);

        frame.enable_stencil_test();
        for index in 0..self.portals.len() {
            self.draw_portal_view(index, frame);
        }
        frame.disable_stencil_test();

        // Portal quads go into depth only, so the direct pass cannot paint
        // over what was drawn through them.
        frame.clear_depth();
        frame.color_mask(false);
        frame.set_matrices(&self.controller);
        self.portals.draw_all(frame);
        frame.color_mask(true);

        self.draw_scene_objects(frame);
    }

    fn handle_mouse_move(&mut self, position: Vec2) {
        if let Some(delta) = self.mouse.delta(position) {
            self.controller.process_mouse(delta.x, delta.y);
        }
    }

    fn handle_key_down(&mut self, key: Key) {
        handle_camera_toggle(&mut self.controller, key);
    }

    fn camera(&self) -> &CameraController {
        &self.controller
    }

    fn camera_mut(&mut self) -> &mut CameraController {
        &mut self.controller
    }

    fn resources(&self) -> &SceneResources {
        &self.resources
    }

    fn warp_count(&self) -> usize {
        self.warps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_lib::frame::{RenderCommand, RenderState};
    use crate::scenes::test_support::{assets, context};

    fn ready() -> TunnelPortalScene {
        let (context, _) = context();
        let mut scene = TunnelPortalScene::new(&context);
        scene.setup(&assets()).unwrap();
        scene
    }

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-3
    }

    #[test]
    fn setup_places_and_pairs_eight_portals() {
        let scene = ready();
        let portals = scene.portals();
        assert_eq!(portals.len(), 8);
        for index in 0..8 {
            let partner = portals.get(index).unwrap().linked().unwrap();
            assert_eq!(partner, index ^ 1);
            assert_eq!(portals.get(partner).unwrap().linked(), Some(index));
            assert_eq!(portals.get(index).unwrap().size(), PORTAL_SIZE);
        }
        assert_eq!(portals.get(2).unwrap().anchor(), Vec3::new(-10.0, -27.0, -41.0));
        assert_eq!(portals.get(3).unwrap().anchor(), Vec3::new(-10.0, 3.0, -11.0));
        assert_eq!(portals.get(7).unwrap().facing(), Facing::NegZ);
    }

    #[test]
    fn walking_into_short_tunnel_warps_once_into_illusion() {
        let mut scene = ready();
        let forward = scene.camera().forward();
        scene.camera_mut().set_pose(Vec3::new(-10.0, 3.0, -4.0), forward);
        scene.update(0.0);
        assert_eq!(scene.warp_count(), 0);

        // This step crosses the entry and the short tunnel's far end; only
        // the first portal in order applies.
        scene.camera_mut().set_pose(Vec3::new(-10.0, 3.0, -12.0), forward);
        scene.update(0.1);
        assert_eq!(scene.warp_count(), 1);
        assert!(close(scene.camera().eye(), Vec3::new(-10.0, -27.0, -12.0)));

        scene.update(0.2);
        assert_eq!(scene.warp_count(), 1);
    }

    #[test]
    fn walking_past_portals_does_not_warp() {
        let mut scene = ready();
        let forward = scene.camera().forward();
        scene.camera_mut().set_pose(Vec3::new(0.0, 3.0, -20.0), forward);
        scene.update(0.0);
        assert_eq!(scene.warp_count(), 0);
    }

    #[test]
    fn draw_follows_stencil_protocol() {
        let scene = ready();
        let mut frame = FrameRecorder::new();
        scene.draw(&mut frame);
        let commands = frame.commands();
        let view = scene.camera().view_matrix();
        let portal_batch = |i: usize| scene.portals().get(i).unwrap().batch().unwrap();

        assert!(matches!(commands[0], RenderCommand::Clear { color: Some(_), depth: true, stencil: true }));
        assert_eq!(commands[1], RenderCommand::Clear { color: None, depth: false, stencil: true });
        match &commands[2] {
            RenderCommand::Draw { batch, state, .. } => {
                assert_eq!(*batch, portal_batch(0));
                assert_eq!(
                    *state,
                    RenderState {
                        color_write: false,
                        depth_write: false,
                        depth_test: true,
                        stencil: StencilMode::Increment,
                    }
                );
            }
            other => panic!("expected portal mask draw, got {other:?}"),
        }
        let through = scene.portals().view_through(0, view).unwrap();
        match &commands[3] {
            RenderCommand::Draw { view: drawn_view, state, .. } => {
                assert!(drawn_view.abs_diff_eq(through, 1e-4));
                assert_eq!(state.stencil, StencilMode::Inside { reference: 1 });
                assert!(state.color_write && state.depth_write);
            }
            other => panic!("expected masked scene draw, got {other:?}"),
        }

        let stencil_clears = commands
            .iter()
            .filter(|c| matches!(c, RenderCommand::Clear { stencil: true, depth: false, .. }))
            .count();
        assert_eq!(stencil_clears, 8);

        // Tail: depth clear, eight depth-only portal quads, then the world.
        let depth_clear = commands
            .iter()
            .rposition(|c| matches!(c, RenderCommand::Clear { depth: true, stencil: false, .. }))
            .unwrap();
        let tail = &commands[depth_clear + 1..];
        for (i, command) in tail[..8].iter().enumerate() {
            match command {
                RenderCommand::Draw { batch, view: drawn_view, state, .. } => {
                    assert_eq!(*batch, portal_batch(i));
                    assert_eq!(*drawn_view, view);
                    assert!(!state.color_write && state.depth_write);
                    assert_eq!(state.stencil, StencilMode::Disabled);
                }
                other => panic!("unexpected {other:?}"),
            }
        }
        assert!(tail[8..].iter().all(|c| matches!(
            c,
            RenderCommand::Draw { state, .. } if *state == RenderState::default()
        )));
    }
}
