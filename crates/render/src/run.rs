//! Windowed event loop.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{info, warn};
use winit::event::{DeviceEvent, ElementState, Event, WindowEvent};
use winit::event_loop::EventLoop;
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use crate::state::{RendererConfig, State};

/// Run the interactive renderer until the window closes or ESC is pressed.
/// A performance report is written next to the working directory on exit.
pub fn run(config: RendererConfig) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to create event loop")?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Adaptive Voxel Marcher - WASD move, Space/Shift up/down, ESC exit")
            .build(&event_loop)
            .context("failed to create window")?,
    );

    let mut state = pollster::block_on(State::new(window.clone(), config))?;

    if window
        .set_cursor_grab(winit::window::CursorGrabMode::Confined)
        .is_ok()
    {
        window.set_cursor_visible(false);
    }

    let mut last_update = Instant::now();

    event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { ref event, window_id } if window_id == state.window().id() => {
            if !state.input(event) {
                match event {
                    WindowEvent::CloseRequested => {
                        save_report(&state);
                        elwt.exit();
                    }
                    WindowEvent::KeyboardInput {
                        event:
                            winit::event::KeyEvent {
                                physical_key: PhysicalKey::Code(KeyCode::Escape),
                                state: ElementState::Pressed,
                                ..
                            },
                        ..
                    } => {
                        save_report(&state);
                        elwt.exit();
                    }
                    WindowEvent::Resized(physical_size) => {
                        state.resize(*physical_size);
                    }
                    WindowEvent::RedrawRequested => {
                        let now = Instant::now();
                        let dt = now.duration_since(last_update).as_secs_f32();
                        last_update = now;

                        state.update(dt);
                        match state.render() {
                            Ok(()) => {}
                            // Reconfigure the surface if lost
                            Err(wgpu::SurfaceError::Lost) => state.resize(state.window.inner_size()),
                            Err(wgpu::SurfaceError::OutOfMemory) => elwt.exit(),
                            // Outdated/Timeout resolve themselves next frame
                            Err(e) => warn!("surface error: {e:?}"),
                        }
                    }
                    _ => {}
                }
            }
        }
        Event::DeviceEvent {
            event: DeviceEvent::MouseMotion { delta },
            ..
        } => {
            state.mouse_motion(delta.0, delta.1);
        }
        Event::AboutToWait => {
            state.window().request_redraw();
        }
        _ => {}
    })?;
    Ok(())
}

fn save_report(state: &State) {
    let filename = PathBuf::from(format!(
        "performance_report_{}.md",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    ));
    match state.monitor.write_report(&filename) {
        Ok(()) => info!("performance report saved to {}", filename.display()),
        Err(e) => warn!("failed to save performance report: {e}"),
    }
}
