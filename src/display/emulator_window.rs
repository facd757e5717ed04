/*
 *  display/emulator_window.rs
 *
 *  vumeter - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Emulator window management
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use log::{error, info};
use pixels::{Pixels, SurfaceTexture};
use winit::{
    dpi::PhysicalSize,
    event::{Event, VirtualKeyCode},
    event_loop::{ControlFlow, EventLoop},
    platform::run_return::EventLoopExtRunReturn,
    window::WindowBuilder,
};
use winit_input_helper::WinitInputHelper;

use crate::display::drivers::emulator::{EmulatorState, lock_state};
use crate::display::error::DisplayError;
use crate::stop::StopFlag;

use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Emulator window configuration
#[derive(Debug, Clone)]
pub struct EmulatorWindowConfig {
    /// Pixel scale factor (meter pixel → screen pixels)
    pub scale: u32,

    /// Base window title
    pub title: String,

    /// Shown until the first frame arrives [R, G, B, A]
    pub bg_color: [u8; 4],
}

impl Default for EmulatorWindowConfig {
    fn default() -> Self {
        Self {
            scale: 1,
            title: env!("CARGO_PKG_NAME").to_string(),
            bg_color: [20, 20, 20, 255],
        }
    }
}

/// Emulator window manager
pub struct EmulatorWindow {
    state: Arc<Mutex<EmulatorState>>,
    stop: StopFlag,
    config: EmulatorWindowConfig,
    fps_counter: FpsCounter,
}

struct FpsCounter {
    last_update: Instant,
    frame_count: u32,
    current_fps: f32,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            last_update: Instant::now(),
            frame_count: 0,
            current_fps: 0.0,
        }
    }

    fn tick(&mut self) -> f32 {
        self.frame_count += 1;
        let elapsed = self.last_update.elapsed();

        if elapsed.as_secs_f32() >= 1.0 {
            self.current_fps = self.frame_count as f32 / elapsed.as_secs_f32();
            self.frame_count = 0;
            self.last_update = Instant::now();
        }

        self.current_fps
    }
}

impl EmulatorWindow {
    pub fn new(state: Arc<Mutex<EmulatorState>>, stop: StopFlag, config: EmulatorWindowConfig) -> Self {
        Self {
            state,
            stop,
            config,
            fps_counter: FpsCounter::new(),
        }
    }

    /// Run the window event loop on the calling thread until the window is
    /// closed or the stop flag is raised elsewhere.
    pub fn run(mut self) -> Result<(), DisplayError> {
        let (width, height) = {
            let state = lock_state(&self.state);
            (state.width, state.height)
        };

        let mut event_loop = EventLoop::new();
        let mut input = WinitInputHelper::new();

        let window = WindowBuilder::new()
            .with_title(&self.config.title)
            .with_inner_size(PhysicalSize::new(width * self.config.scale, height * self.config.scale))
            .with_resizable(false)
            .build(&event_loop)
            .map_err(|e| DisplayError::InitializationFailed(e.to_string()))?;

        let window_size = window.inner_size();
        let surface_texture = SurfaceTexture::new(window_size.width, window_size.height, &window);
        let mut pixels = Pixels::new(width, height, surface_texture)
            .map_err(|e| DisplayError::InitializationFailed(e.to_string()))?;

        info!("window {}x{} scale {}, Esc or Q to quit", width, height, self.config.scale);

        let mut result = Ok(());
        event_loop.run_return(|event, _, control_flow| {
            *control_flow = ControlFlow::Poll;

            if self.stop.is_raised() {
                *control_flow = ControlFlow::Exit;
                return;
            }

            if let Event::RedrawRequested(_) = event {
                self.render(pixels.frame_mut());

                if let Err(err) = pixels.render() {
                    error!("pixels.render() failed: {}", err);
                    result = Err(DisplayError::Other(err.to_string()));
                    self.close();
                    *control_flow = ControlFlow::Exit;
                    return;
                }

                let fps = self.fps_counter.tick();
                if fps > 0.0 {
                    window.set_title(&format!("{} - {:.1} FPS", self.config.title, fps));
                }
            }

            if input.update(&event) {
                if input.close_requested()
                    || input.key_pressed(VirtualKeyCode::Escape)
                    || input.key_pressed(VirtualKeyCode::Q)
                {
                    info!("window closed");
                    self.close();
                    *control_flow = ControlFlow::Exit;
                    return;
                }
                window.request_redraw();
            }
        });

        self.close();
        result
    }

    fn close(&self) {
        lock_state(&self.state).closed = true;
        self.stop.raise();
    }

    fn render(&self, frame: &mut [u8]) {
        let state = lock_state(&self.state);
        if state.frame_count > 0 && frame.len() == state.rgba.len() {
            frame.copy_from_slice(&state.rgba);
        } else {
            for pixel in frame.chunks_exact_mut(4) {
                pixel.copy_from_slice(&self.config.bg_color);
            }
        }
    }
}
