// src/scenes/tunnel.rs

use std::rc::Rc;

use glam::{Vec2, Vec3};

use super::common::{
    handle_camera_toggle, init_camera, load_shared_assets, poll_movement, FrameClock, MouseTracker, CLEAR_COLOR,
};
use super::{Scene, SceneContext};
use crate::engine_lib::controller::CameraController;
use crate::engine_lib::error::SceneError;
use crate::engine_lib::frame::FrameRecorder;
use crate::engine_lib::input::{HostInput, Key, Movement};
use crate::engine_lib::scene_types::{AssetMap, BatchId, Material, SceneResources};
use crate::engine_lib::tunnel::Tunnel;
use crate::rendering_lib::geometry::Mesh;

/// Two tunnels side by side on a floor: one ending in a cliff face, one
/// closed with a plug.
pub struct TunnelScene {
    input: Rc<dyn HostInput>,
    controller: CameraController,
    resources: SceneResources,
    clock: FrameClock,
    mouse: MouseTracker,
    last_dt: f64,
    skybox: Option<BatchId>,
    floor: Option<BatchId>,
    short_tunnel: Tunnel,
    long_tunnel: Tunnel,
}

impl TunnelScene {
    pub fn new(context: &SceneContext) -> Self {
        Self {
            input: context.input.clone(),
            controller: context.controller(),
            resources: SceneResources::default(),
            clock: FrameClock::default(),
            mouse: MouseTracker::default(),
            last_dt: 0.0,
            skybox: None,
            floor: None,
            short_tunnel: Tunnel::new(Vec3::new(-10.0, 3.0, -5.0), 6),
            long_tunnel: Tunnel::new(Vec3::new(10.0, 3.0, -5.0), 6),
        }
    }
}

impl Scene for TunnelScene {
    fn name(&self) -> &'static str {
        "Tunnel"
    }

    fn setup(&mut self, assets: &AssetMap) -> Result<(), SceneError> {
        let shared = load_shared_assets(assets, &mut self.resources)?;
        self.skybox = Some(shared.skybox);

        let floor = Mesh::plane(Vec3::ZERO, Vec2::splat(100.0));
        self.floor = Some(self.resources.add_batch(floor, Material::Textured(shared.floor_texture)));

        self.short_tunnel.set_texture(shared.tunnel_texture);
        self.short_tunnel.setup_tunnel(&mut self.resources);
        self.short_tunnel.setup_side_wall(&mut self.resources);

        self.long_tunnel.set_texture(shared.tunnel_texture);
        self.long_tunnel.setup_tunnel(&mut self.resources);
        self.long_tunnel.setup_front_wall(&mut self.resources);

        self.input.set_cursor_captured(true);
        init_camera(&mut self.controller);
        log::info!("tunnel scene set up with {} batches", self.resources.batches().len());
        Ok(())
    }

    fn update(&mut self, elapsed: f64) {
        self.last_dt = self.clock.tick(elapsed);
        poll_movement(&mut self.controller, self.input.as_ref(), self.last_dt);
    }

    fn draw(&self, frame: &mut FrameRecorder) {
        frame.clear(CLEAR_COLOR);
        frame.depth_mask(true);
        frame.set_matrices(&self.controller);

        for batch in [self.skybox, self.floor].into_iter().flatten() {
            frame.draw(batch);
        }
        self.short_tunnel.draw(frame);
        self.long_tunnel.draw(frame);
    }

    fn handle_mouse_move(&mut self, position: Vec2) {
        if let Some(delta) = self.mouse.delta(position) {
            self.controller.process_mouse(delta.x, delta.y);
        }
    }

    fn handle_key_down(&mut self, key: Key) {
        if handle_camera_toggle(&mut self.controller, key) {
            return;
        }
        // Single-step nudges for checking movement without holding keys.
        let nudge = match key {
            Key::I => Movement::Forward,
            Key::K => Movement::Backward,
            Key::J => Movement::Left,
            Key::L => Movement::Right,
            _ => return,
        };
        self.controller.move_in(nudge, self.last_dt);
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_lib::camera::CameraPose;
    use crate::engine_lib::frame::RenderCommand;
    use crate::scenes::test_support::{assets, context};

    fn ready() -> (TunnelScene, Rc<crate::engine_lib::input::fake::FakeInput>) {
        let (context, input) = context();
        let mut scene = TunnelScene::new(&context);
        scene.setup(&assets()).unwrap();
        (scene, input)
    }

    #[test]
    fn setup_builds_floor_skybox_and_both_tunnels() {
        let (scene, input) = ready();
        // skybox + floor + 6 + 1 side wall + 6 + 1 front wall
        assert_eq!(scene.resources().batches().len(), 16);
        assert_eq!(scene.camera().eye(), Vec3::new(0.0, 3.0, 0.0));
        assert!(!scene.camera().is_floating());
        assert_eq!(*input.capture_calls.borrow(), vec![true]);
    }

    #[test]
    fn draw_clears_then_draws_every_batch_once() {
        let (scene, _) = ready();
        let mut frame = FrameRecorder::new();
        scene.draw(&mut frame);

        let commands = frame.commands();
        assert!(matches!(commands[0], RenderCommand::Clear { color: Some(_), depth: true, stencil: true }));
        let batches: Vec<_> = commands[1..]
            .iter()
            .map(|c| match c {
                RenderCommand::Draw { batch, view, .. } => {
                    assert_eq!(*view, scene.camera().view_matrix());
                    *batch
                }
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(batches, (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn keys_toggle_and_nudge() {
        let (mut scene, _) = ready();
        scene.update(1.0);
        scene.update(1.5);
        let start = scene.camera().eye();
        scene.handle_key_down(Key::I);
        assert!(((scene.camera().eye() - start).length() - 3.5).abs() < 1e-4);

        scene.handle_key_down(Key::F);
        assert!(scene.camera().is_frozen());
        scene.handle_key_down(Key::L);
        assert!(((scene.camera().eye() - start).length() - 3.5).abs() < 1e-4);

        scene.handle_key_down(Key::T);
        assert!(scene.camera().is_floating());
    }

    #[test]
    fn first_mouse_event_only_seeds() {
        let (mut scene, _) = ready();
        let yaw = scene.camera().yaw();
        scene.handle_mouse_move(Vec2::new(400.0, 300.0));
        assert_eq!(scene.camera().yaw(), yaw);
        scene.handle_mouse_move(Vec2::new(410.0, 300.0));
        assert!((scene.camera().yaw() - (yaw + 2.0)).abs() < 1e-4);
    }
}
