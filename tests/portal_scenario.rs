// tests/portal_scenario.rs

use std::cell::RefCell;
use std::collections::HashSet;
use std::path::Path;
use std::rc::Rc;

use glam::{Mat4, Vec2, Vec3};
use portal_tunnels::assets::load_asset_map;
use portal_tunnels::engine_lib::camera::{Camera, CameraPose};
use portal_tunnels::engine_lib::controller::ControllerSettings;
use portal_tunnels::engine_lib::error::{PortalError, SceneError};
use portal_tunnels::engine_lib::frame::{FrameRecorder, RenderCommand};
use portal_tunnels::engine_lib::input::{HostInput, Key};
use portal_tunnels::engine_lib::portal::{Facing, Portal, PortalSet};
use portal_tunnels::scenes::common::ROCK_TUNNEL;
use portal_tunnels::scenes::{Scene, SceneContext, SceneKind, SceneSlot};

const SIZE: Vec2 = Vec2::new(6.0, 4.5);

#[derive(Default)]
struct NoInput {
    held: RefCell<HashSet<Key>>,
}

impl HostInput for NoInput {
    fn is_key_down(&self, key: Key) -> bool {
        self.held.borrow().contains(&key)
    }

    fn set_cursor_captured(&self, _captured: bool) {}

    fn is_cursor_captured(&self) -> bool {
        true
    }
}

fn close(a: Vec3, b: Vec3) -> bool {
    (a - b).length() < 1e-3
}

fn linked_pair() -> PortalSet {
    let mut set = PortalSet::new();
    set.add(Portal::new(Vec3::new(0.0, 3.0, 5.0), Facing::Z).with_size(SIZE));
    set.add(Portal::new(Vec3::new(10.0, 3.0, -20.0), Facing::NegZ).with_size(SIZE));
    set.link_consecutive_pairs().unwrap();
    set
}

fn stencil_clears(commands: &[RenderCommand]) -> usize {
    commands
        .iter()
        .filter(|c| matches!(c, RenderCommand::Clear { color: None, depth: false, stencil: true }))
        .count()
}

#[test]
fn walking_through_a_portal_lands_behind_its_partner() {
    let mut set = linked_pair();
    let mut camera = Camera::default();
    let prev = Vec3::new(0.0, 3.0, 6.0);
    let curr = Vec3::new(0.0, 3.0, 4.0);
    camera.set_pose(curr, Vec3::NEG_Z);

    assert_eq!(set.process_crossing(prev, curr, &mut camera), Ok(Some(0)));
    assert!(close(camera.eye(), Vec3::new(10.0, 3.0, -21.0)));
    assert!(close(camera.forward(), Vec3::NEG_Z));

    // The same segment is not consumed twice.
    assert_eq!(set.process_crossing(prev, curr, &mut camera), Ok(None));
}

#[test]
fn warping_there_and_back_restores_the_pose() {
    let set = linked_pair();
    let mut camera = Camera::default();
    let start = Vec3::new(1.0, 2.5, 4.0);
    let forward = Vec3::new(0.3, 0.1, -1.0).normalize();
    camera.set_pose(start, forward);

    set.warp(0, &mut camera).unwrap();
    set.warp(1, &mut camera).unwrap();
    assert!(close(camera.eye(), start));
    assert!(close(camera.forward(), forward));
}

#[test]
fn portal_linked_to_its_own_frame_keeps_the_view() {
    let view = Mat4::look_at_rh(Vec3::new(2.0, 3.0, 9.0), Vec3::new(0.0, 3.0, 0.0), Vec3::Y);
    let model = Portal::new(Vec3::new(0.0, 3.0, 5.0), Facing::Z).with_size(SIZE).model_matrix();
    let remapped = Portal::new_view_matrix(view, model, model);
    assert!(remapped.abs_diff_eq(view, 1e-4));
}

#[test]
fn unlinked_portal_cannot_be_looked_through() {
    let mut set = PortalSet::new();
    set.add(Portal::new(Vec3::ZERO, Facing::Z));
    assert_eq!(set.view_through(0, Mat4::IDENTITY), Err(PortalError::Unlinked(0)));
}

#[test]
fn switching_scenes_swaps_the_draw_protocol() {
    let assets = load_asset_map(Path::new("/nonexistent/portal_tunnels_assets"));
    let input: Rc<dyn HostInput> = Rc::new(NoInput::default());
    let context = SceneContext {
        input,
        camera: Camera::default(),
        controller: ControllerSettings::default(),
    };
    let mut slot = SceneSlot::new(SceneKind::TunnelPortal, context, &assets).unwrap();

    let mut frame = FrameRecorder::new();
    slot.scene().draw(&mut frame);
    assert_eq!(stencil_clears(frame.commands()), 8);

    slot.switch_to(SceneKind::Tunnel, &assets).unwrap();
    assert_eq!(slot.kind(), SceneKind::Tunnel);
    let mut frame = FrameRecorder::new();
    slot.scene().draw(&mut frame);
    assert_eq!(stencil_clears(frame.commands()), 0);
    assert!(close(slot.scene().camera().eye(), Vec3::new(0.0, 3.0, 0.0)));
}

#[test]
fn failed_switch_keeps_the_running_scene() {
    let mut assets = load_asset_map(Path::new("/nonexistent/portal_tunnels_assets"));
    let input: Rc<dyn HostInput> = Rc::new(NoInput::default());
    let context = SceneContext {
        input,
        camera: Camera::default(),
        controller: ControllerSettings::default(),
    };
    let mut slot = SceneSlot::new(SceneKind::Tunnel, context, &assets).unwrap();

    assets.remove(ROCK_TUNNEL);
    let err = slot.switch_to(SceneKind::TunnelPortal, &assets).unwrap_err();
    assert!(matches!(err, SceneError::MissingAsset(name) if name == ROCK_TUNNEL));
    assert_eq!(slot.kind(), SceneKind::Tunnel);
}
