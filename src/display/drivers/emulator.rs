/*
 *  display/drivers/emulator.rs
 *
 *  vumeter - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Desktop window sink, render thread side
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

use embedded_graphics::pixelcolor::Rgb888;

use crate::display::error::DisplayError;
use crate::display::traits::{FrameSink, SinkCapabilities, check_frame_size};
use crate::framebuf::FrameBuffer;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Shared emulator state (for window access)
#[derive(Debug)]
pub struct EmulatorState {
    /// Latest frame as RGBA8, ready for the pixels surface
    pub rgba: Vec<u8>,

    /// Display dimensions
    pub width: u32,
    pub height: u32,

    /// Frame counter
    pub frame_count: u64,

    /// Set by the window when it goes away
    pub closed: bool,
}

pub(crate) fn lock_state(state: &Mutex<EmulatorState>) -> MutexGuard<'_, EmulatorState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Emulator sink
///
/// Frames are copied into shared state; the window, running on the main
/// thread as winit requires, picks the latest one up on each redraw.
pub struct EmulatorSink {
    capabilities: SinkCapabilities,
    state: Arc<Mutex<EmulatorState>>,
}

impl EmulatorSink {
    pub fn new(width: u32, height: u32) -> Self {
        let capabilities = SinkCapabilities { width, height, max_fps: 120, name: "emulator" };
        let state = Arc::new(Mutex::new(EmulatorState {
            rgba: vec![0; (width * height * 4) as usize],
            width,
            height,
            frame_count: 0,
            closed: false,
        }));
        Self { capabilities, state }
    }

    /// Get shared state for window rendering
    pub fn state(&self) -> Arc<Mutex<EmulatorState>> {
        Arc::clone(&self.state)
    }
}

impl FrameSink for EmulatorSink {
    fn capabilities(&self) -> &SinkCapabilities {
        &self.capabilities
    }

    fn present(&mut self, frame: &FrameBuffer<Rgb888>) -> Result<(), DisplayError> {
        check_frame_size(&self.capabilities, frame)?;
        let mut state = lock_state(&self.state);
        if state.closed {
            return Err(DisplayError::Closed);
        }
        frame.copy_rgba(&mut state.rgba);
        state.frame_count += 1;
        Ok(())
    }
}
