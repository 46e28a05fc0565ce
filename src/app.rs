// src/app.rs

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use glam::Vec2;
use thiserror::Error;
use winit::{
    event::{DeviceEvent, ElementState, KeyEvent, MouseButton, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorGrabMode, Window},
};

use crate::assets::load_asset_map;
use crate::config::AppConfig;
use crate::engine_lib::camera::CameraPose;
use crate::engine_lib::error::SceneError;
use crate::engine_lib::frame::FrameRecorder;
use crate::engine_lib::input::{HostInput, Key};
use crate::engine_lib::scene_types::AssetMap;
use crate::rendering_lib::renderer::Renderer;
use crate::scenes::{Scene, SceneContext, SceneKind, SceneSlot};
use crate::ui::{build_ui, OverlayInfo};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no compatible GPU adapter found")]
    Adapter,
    #[error("failed to acquire device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
}

pub fn map_key(code: KeyCode) -> Option<Key> {
    let key = match code {
        KeyCode::KeyW => Key::W,
        KeyCode::KeyA => Key::A,
        KeyCode::KeyS => Key::S,
        KeyCode::KeyD => Key::D,
        KeyCode::Space => Key::Space,
        KeyCode::ControlLeft => Key::LeftControl,
        KeyCode::KeyF => Key::F,
        KeyCode::KeyT => Key::T,
        KeyCode::KeyI => Key::I,
        KeyCode::KeyJ => Key::J,
        KeyCode::KeyK => Key::K,
        KeyCode::KeyL => Key::L,
        KeyCode::Digit1 => Key::Digit1,
        KeyCode::Digit2 => Key::Digit2,
        KeyCode::Escape => Key::Escape,
        _ => return None,
    };
    Some(key)
}

/// Held keys and cursor capture for the scenes, backed by the window.
pub struct WindowInput {
    window: Arc<Window>,
    keys: RefCell<HashSet<Key>>,
    captured: Cell<bool>,
}

impl WindowInput {
    pub fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            keys: RefCell::new(HashSet::new()),
            captured: Cell::new(false),
        }
    }

    pub fn press(&self, key: Key) {
        self.keys.borrow_mut().insert(key);
    }

    pub fn release(&self, key: Key) {
        self.keys.borrow_mut().remove(&key);
    }

    pub fn release_all(&self) {
        self.keys.borrow_mut().clear();
    }
}

impl HostInput for WindowInput {
    fn is_key_down(&self, key: Key) -> bool {
        self.keys.borrow().contains(&key)
    }

    fn set_cursor_captured(&self, captured: bool) {
        self.captured.set(captured);
        if captured {
            if self
                .window
                .set_cursor_grab(CursorGrabMode::Confined)
                .or_else(|_e| self.window.set_cursor_grab(CursorGrabMode::Locked))
                .is_ok()
            {
                self.window.set_cursor_visible(false);
            } else {
                log::warn!("Could not grab cursor.");
            }
        } else {
            if let Err(err) = self.window.set_cursor_grab(CursorGrabMode::None) {
                log::warn!("Could not release cursor: {err}");
            }
            self.window.set_cursor_visible(true);
        }
    }

    fn is_cursor_captured(&self) -> bool {
        self.captured.get()
    }
}

pub struct PortalApp {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: winit::dpi::PhysicalSize<u32>,
    renderer: Renderer,
    scenes: SceneSlot,
    assets: AssetMap,
    input: Rc<WindowInput>,
    cursor_position: Vec2,
    start: Instant,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
    is_focused: bool,
    exit_requested: bool,
}

impl PortalApp {
    pub async fn new(window: Arc<Window>, app_config: &AppConfig) -> Result<Self, AppError> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let surface = instance.create_surface(window.clone())?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(AppError::Adapter)?;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    label: None,
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps.formats.iter().copied()
            .find(|f| f.is_srgb()).unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let mut renderer = Renderer::new(&device, config.format, config.width, config.height);

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(), egui::ViewportId::ROOT, &window,
            Some(window.scale_factor() as f32),
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(
            &device, config.format, None, 1,
        );

        let assets = load_asset_map(&app_config.assets.directory);
        let input = Rc::new(WindowInput::new(window.clone()));
        let host_input: Rc<dyn HostInput> = input.clone();
        let context = SceneContext {
            input: host_input,
            camera: app_config.camera.camera(),
            controller: app_config.camera.controller_settings(),
        };
        let mut scenes = SceneSlot::new(app_config.start_scene, context, &assets)?;
        scenes.scene_mut().set_aspect(config.width as f32 / config.height as f32);
        renderer.load_scene(&device, &queue, scenes.scene().resources());

        let is_focused = window.has_focus();
        scenes.scene_mut().camera_mut().set_focused(is_focused);

        Ok(Self {
            surface, device, queue, config, size,
            renderer, scenes, assets, input,
            cursor_position: Vec2::ZERO,
            start: Instant::now(),
            egui_ctx, egui_state, egui_renderer,
            is_focused,
            exit_requested: false,
        })
    }

    pub fn get_size(&self) -> winit::dpi::PhysicalSize<u32> { self.size }

    pub fn wants_exit(&self) -> bool {
        self.exit_requested
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.renderer.resize(&self.device, new_size.width, new_size.height);
            self.scenes
                .scene_mut()
                .set_aspect(new_size.width as f32 / new_size.height as f32);
        }
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.is_focused = focused;
        if !focused {
            self.input.release_all();
        }
        self.scenes.scene_mut().camera_mut().set_focused(focused);
    }

    pub fn update(&mut self) {
        let elapsed = self.start.elapsed().as_secs_f64();
        self.scenes.scene_mut().update(elapsed);
    }

    pub fn render(&mut self, window: &Window) -> Result<(), wgpu::SurfaceError> {
        let output_texture = self.surface.get_current_texture()?;
        let view = output_texture.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Main Command Encoder"),
        });

        let mut frame = FrameRecorder::new();
        self.scenes.scene().draw(&mut frame);
        self.renderer.render_frame(&self.device, &self.queue, &mut encoder, &view, frame.commands());

        let scene = self.scenes.scene();
        let controller = scene.camera();
        let info = OverlayInfo {
            scene_name: scene.name(),
            elapsed: self.start.elapsed().as_secs_f64(),
            eye: controller.eye(),
            yaw: controller.yaw(),
            pitch: controller.pitch(),
            frozen: controller.is_frozen(),
            floating: controller.is_floating(),
            warps: scene.warp_count(),
        };

        let raw_input = self.egui_state.take_egui_input(window);
        let full_output = self.egui_ctx.run(raw_input, |ctx| { build_ui(ctx, &info); });
        self.egui_state.handle_platform_output(window, full_output.platform_output);
        let tris = self.egui_ctx.tessellate(full_output.shapes, self.egui_ctx.pixels_per_point());
        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer.update_texture(&self.device, &self.queue, *id, image_delta);
        }
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: window.scale_factor() as f32,
        };
        self.egui_renderer.update_buffers(&self.device, &self.queue, &mut encoder, &tris, &screen_descriptor);
        {
            let mut gui_render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("GUI Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view, resolve_target: None,
                    ops: wgpu::Operations { load: wgpu::LoadOp::Load, store: wgpu::StoreOp::Store },
                })],
                depth_stencil_attachment: None, occlusion_query_set: None, timestamp_writes: None,
            });
            self.egui_renderer.render(&mut gui_render_pass, &tris, &screen_descriptor);
        }
        for tex_id in &full_output.textures_delta.free { self.egui_renderer.free_texture(tex_id); }

        self.queue.submit(std::iter::once(encoder.finish()));
        output_texture.present();
        Ok(())
    }

    pub fn handle_window_event(&mut self, event: &WindowEvent, window: &Window) -> bool {
        if self.egui_state.on_window_event(window, event).consumed { return true; }
        match event {
            WindowEvent::KeyboardInput {
                event: KeyEvent { physical_key: PhysicalKey::Code(code), state, repeat, .. },
                ..
            } => {
                let Some(key) = map_key(*code) else { return false };
                match state {
                    ElementState::Pressed => {
                        self.input.press(key);
                        if !*repeat {
                            self.handle_key_down(key);
                        }
                    }
                    ElementState::Released => self.input.release(key),
                }
                true
            }
            WindowEvent::MouseInput { state: ElementState::Pressed, button: MouseButton::Left, .. }
                if !self.input.is_cursor_captured() =>
            {
                self.scenes.scene_mut().camera_mut().recapture();
                true
            }
            WindowEvent::Focused(focused) => { self.set_focused(*focused); false }
            _ => false,
        }
    }

    fn handle_key_down(&mut self, key: Key) {
        if key == Key::Escape {
            self.exit_requested = true;
            return;
        }
        if let Some(kind) = SceneKind::from_key(key) {
            self.switch_scene(kind);
        }
        self.scenes.scene_mut().handle_key_down(key);
    }

    fn switch_scene(&mut self, kind: SceneKind) {
        match self.scenes.switch_to(kind, &self.assets) {
            Ok(()) => {
                self.renderer.load_scene(&self.device, &self.queue, self.scenes.scene().resources());
            }
            Err(err) => log::error!("could not switch to {kind:?}: {err}"),
        }
    }

    pub fn handle_device_event(&mut self, event: &DeviceEvent, _window: &Window) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            if !self.is_focused || !self.input.is_cursor_captured() {
                return;
            }
            self.cursor_position += Vec2::new(*dx as f32, *dy as f32);
            self.scenes.scene_mut().handle_mouse_move(self.cursor_position);
        }
    }
}
