// src/ui.rs
use egui;
use glam::Vec3;

/// Snapshot of what the debug panel shows for one frame.
pub struct OverlayInfo<'a> {
    pub scene_name: &'a str,
    pub elapsed: f64,
    pub eye: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub frozen: bool,
    pub floating: bool,
    pub warps: usize,
}

const KEY_BINDINGS: [&str; 12] = [
    "W - Move forward",
    "A - Move left",
    "S - Move backward",
    "D - Move right",
    "Ctrl - Move downward",
    "Space - Move upward",
    "F - Freeze the camera",
    "T - Toggle floating camera",
    "I/J/K/L - Nudge the camera (Tunnel scene)",
    "1 - Tunnel scene",
    "2 - Tunnel + Portal scene",
    "Esc - Close application",
];

pub fn build_ui(ctx: &egui::Context, info: &OverlayInfo) {
    egui::Window::new("Debug panel")
        .anchor(egui::Align2::LEFT_TOP, egui::vec2(10.0, 10.0))
        .resizable(false)
        .show(ctx, |ui| {
            ui.vertical(|ui| {
                ui.label(format!("Scene: {}", info.scene_name));
                ui.label(format!("Elapsed time: {:.1} second", info.elapsed));
                ui.separator();
                ui.label(format!("Eye: ({:.2}, {:.2}, {:.2})", info.eye.x, info.eye.y, info.eye.z));
                ui.label(format!("Yaw {:.1}°, pitch {:.1}°", info.yaw, info.pitch));
                ui.label(format!(
                    "Frozen: {}  Floating: {}",
                    if info.frozen { "yes" } else { "no" },
                    if info.floating { "yes" } else { "no" },
                ));
                ui.label(format!("Portal warps: {}", info.warps));
            });
        });

    egui::Window::new("Key binding")
        .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-10.0, 10.0))
        .resizable(false)
        .show(ctx, |ui| {
            for binding in KEY_BINDINGS {
                ui.label(binding);
            }
        });
}
