// src/engine_lib/frame.rs

use glam::Mat4;

use crate::engine_lib::camera::CameraPose;
use crate::engine_lib::scene_types::BatchId;

/// How a draw tests and updates the stencil buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StencilMode {
    #[default]
    Disabled,
    /// Never passes; every covered fragment increments the stored value.
    /// Used to mark a portal's silhouette without touching colour or depth.
    Increment,
    /// Passes where `reference <= stored`, leaves the buffer untouched.
    Inside { reference: u32 },
}

/// Fixed-function state captured with every draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RenderState {
    pub color_write: bool,
    pub depth_write: bool,
    pub depth_test: bool,
    pub stencil: StencilMode,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            color_write: true,
            depth_write: true,
            depth_test: true,
            stencil: StencilMode::Disabled,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum RenderCommand {
    Clear {
        color: Option<[f32; 4]>,
        depth: bool,
        stencil: bool,
    },
    Draw {
        batch: BatchId,
        view: Mat4,
        projection: Mat4,
        state: RenderState,
    },
}

/// Records one frame of state changes and draws. Scenes write into it, the
/// renderer replays it.
#[derive(Debug, Default)]
pub struct FrameRecorder {
    commands: Vec<RenderCommand>,
    state: RenderState,
    stencil_mode: StencilMode,
    stencil_enabled: bool,
    view: Mat4,
    projection: Mat4,
    view_stack: Vec<Mat4>,
    projection_stack: Vec<Mat4>,
}

impl FrameRecorder {
    pub fn new() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            ..Self::default()
        }
    }

    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<RenderCommand> {
        self.commands
    }

    pub fn clear(&mut self, color: [f32; 4]) {
        self.commands.push(RenderCommand::Clear {
            color: Some(color),
            depth: true,
            stencil: true,
        });
    }

    pub fn clear_depth(&mut self) {
        self.commands.push(RenderCommand::Clear {
            color: None,
            depth: true,
            stencil: false,
        });
    }

    pub fn clear_stencil(&mut self) {
        self.commands.push(RenderCommand::Clear {
            color: None,
            depth: false,
            stencil: true,
        });
    }

    pub fn color_mask(&mut self, enabled: bool) {
        self.state.color_write = enabled;
    }

    pub fn depth_mask(&mut self, enabled: bool) {
        self.state.depth_write = enabled;
    }

    pub fn enable_stencil_test(&mut self) {
        self.stencil_enabled = true;
        self.state.stencil = self.stencil_mode;
    }

    pub fn disable_stencil_test(&mut self) {
        self.stencil_enabled = false;
        self.state.stencil = StencilMode::Disabled;
    }

    /// Takes effect only while the stencil test is enabled.
    pub fn set_stencil_mode(&mut self, mode: StencilMode) {
        self.stencil_mode = mode;
        if self.stencil_enabled {
            self.state.stencil = mode;
        }
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    pub fn set_matrices(&mut self, camera: &dyn CameraPose) {
        self.view = camera.view_matrix();
        self.projection = camera.projection_matrix();
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    pub fn set_view_matrix(&mut self, view: Mat4) {
        self.view = view;
    }

    pub fn set_projection_matrix(&mut self, projection: Mat4) {
        self.projection = projection;
    }

    pub fn push_view_matrix(&mut self) {
        self.view_stack.push(self.view);
    }

    pub fn pop_view_matrix(&mut self) {
        match self.view_stack.pop() {
            Some(view) => self.view = view,
            None => log::warn!("pop_view_matrix on an empty stack ignored"),
        }
    }

    pub fn push_projection_matrix(&mut self) {
        self.projection_stack.push(self.projection);
    }

    pub fn pop_projection_matrix(&mut self) {
        match self.projection_stack.pop() {
            Some(projection) => self.projection = projection,
            None => log::warn!("pop_projection_matrix on an empty stack ignored"),
        }
    }

    pub fn draw(&mut self, batch: BatchId) {
        self.commands.push(RenderCommand::Draw {
            batch,
            view: self.view,
            projection: self.projection,
            state: self.state,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn draw_state(command: &RenderCommand) -> RenderState {
        match command {
            RenderCommand::Draw { state, .. } => *state,
            other => panic!("expected a draw, got {other:?}"),
        }
    }

    #[test]
    fn stencil_mode_only_applies_while_enabled() {
        let mut frame = FrameRecorder::new();
        frame.set_stencil_mode(StencilMode::Increment);
        frame.draw(0);
        frame.enable_stencil_test();
        frame.draw(1);
        frame.set_stencil_mode(StencilMode::Inside { reference: 1 });
        frame.draw(2);
        frame.disable_stencil_test();
        frame.draw(3);

        let stencils: Vec<_> = frame.commands().iter().map(|c| draw_state(c).stencil).collect();
        assert_eq!(
            stencils,
            vec![
                StencilMode::Disabled,
                StencilMode::Increment,
                StencilMode::Inside { reference: 1 },
                StencilMode::Disabled,
            ]
        );
    }

    #[test]
    fn masks_are_captured_per_draw() {
        let mut frame = FrameRecorder::new();
        frame.color_mask(false);
        frame.depth_mask(false);
        frame.draw(0);
        frame.color_mask(true);
        frame.draw(1);

        let first = draw_state(&frame.commands()[0]);
        let second = draw_state(&frame.commands()[1]);
        assert!(!first.color_write && !first.depth_write);
        assert!(second.color_write && !second.depth_write);
    }

    #[test]
    fn view_stack_restores_pushed_matrix() {
        let mut frame = FrameRecorder::new();
        let outer = Mat4::from_translation(Vec3::X);
        frame.set_view_matrix(outer);
        frame.push_view_matrix();
        frame.set_view_matrix(Mat4::from_translation(Vec3::Y));
        frame.draw(7);
        frame.pop_view_matrix();
        frame.draw(8);

        match &frame.commands()[0] {
            RenderCommand::Draw { view, .. } => assert_eq!(*view, Mat4::from_translation(Vec3::Y)),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(frame.view_matrix(), outer);
    }

    #[test]
    fn popping_empty_stacks_is_harmless() {
        let mut frame = FrameRecorder::new();
        let view = Mat4::from_translation(Vec3::Z);
        frame.set_view_matrix(view);
        frame.pop_view_matrix();
        frame.pop_projection_matrix();
        assert_eq!(frame.view_matrix(), view);
        assert_eq!(frame.projection_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn clears_record_their_targets() {
        let mut frame = FrameRecorder::new();
        frame.clear([0.2, 0.2, 0.2, 1.0]);
        frame.clear_stencil();
        frame.clear_depth();
        assert_eq!(
            frame.into_commands(),
            vec![
                RenderCommand::Clear { color: Some([0.2, 0.2, 0.2, 1.0]), depth: true, stencil: true },
                RenderCommand::Clear { color: None, depth: false, stencil: true },
                RenderCommand::Clear { color: None, depth: true, stencil: false },
            ]
        );
    }
}
