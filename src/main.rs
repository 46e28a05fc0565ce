// src/main.rs

use winit::{
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoopWindowTarget, EventLoop},
    window::WindowBuilder,
};
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

use portal_tunnels::app::PortalApp;
use portal_tunnels::config::AppConfig;

#[cfg_attr(target_arch = "wasm32", wasm_bindgen(start))]
pub async fn run() {
    cfg_if::cfg_if! {
        if #[cfg(target_arch = "wasm32")] {
            std::panic::set_hook(Box::new(console_error_panic_hook::hook));
            console_log::init_with_level(log::Level::Warn).expect("Couldn't initialize logger");
        } else {
            env_logger::init();
        }
    }

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            log::error!("{err}");
            return;
        }
    };

    let event_loop = EventLoop::new().unwrap();
    let window = std::sync::Arc::new(
        WindowBuilder::new()
            .with_title(config.window.title.as_str())
            .with_inner_size(winit::dpi::LogicalSize::new(config.window.width, config.window.height))
            .build(&event_loop)
            .unwrap(),
    );

    #[cfg(target_arch = "wasm32")]
    {
        use winit::platform::web::WindowExtWebSys;
        web_sys::window()
            .and_then(|win| win.document())
            .and_then(|doc| {
                let dst = doc.get_element_by_id("wasm-viewport")?;
                let canvas = web_sys::Element::from(window.canvas()?);
                dst.append_child(&canvas).ok()?;
                Some(())
            })
            .expect("Couldn't append canvas to document body.");
    }

    let mut app_state = match PortalApp::new(window.clone(), &config).await {
        Ok(app) => app,
        Err(err) => {
            log::error!("failed to start: {err}");
            return;
        }
    };

    event_loop
        .run(move |event, target: &EventLoopWindowTarget<()>| {
            target.set_control_flow(ControlFlow::Poll);

            match event {
                Event::WindowEvent {
                    ref event,
                    window_id,
                } if window_id == window.id() => {
                    if !app_state.handle_window_event(event, &window) {
                        match event {
                            WindowEvent::CloseRequested => {
                                target.exit();
                            }
                            WindowEvent::Resized(physical_size) => {
                                app_state.resize(*physical_size);
                            }
                            WindowEvent::RedrawRequested => { /* In AboutToWait */ }
                            _ => {}
                        }
                    }
                }
                Event::DeviceEvent { event: device_event, .. } => {
                    app_state.handle_device_event(&device_event, &window);
                }
                Event::AboutToWait => {
                    app_state.update();
                    if app_state.wants_exit() {
                        target.exit();
                        return;
                    }
                    match app_state.render(&window) {
                        Ok(_) => {}
                        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                            app_state.resize(app_state.get_size());
                        }
                        Err(wgpu::SurfaceError::OutOfMemory) => {
                            log::error!("WGPU Out Of Memory! Exiting.");
                            target.exit();
                        }
                        Err(e) => log::warn!("Surface error: {:?}", e),
                    }

                    if !target.exiting() {
                        window.request_redraw();
                    }
                }
                _ => {}
            }
        })
        .unwrap();
}

#[tokio::main]
async fn main() {
    run().await;
}
