/*
 *  display/drivers/mock.rs
 *
 *  vumeter - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Mock frame sink for testing without a window
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
use embedded_graphics::prelude::*;

use crate::display::error::DisplayError;
use crate::display::traits::{FrameSink, SinkCapabilities, check_frame_size};
use crate::framebuf::FrameBuffer;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Mock sink for testing
///
/// Records every presented frame count and keeps the most recent frame so
/// tests can inspect pixels. The state is shared, so a test keeps a handle
/// after the sink has moved into the render thread.
#[derive(Debug, Clone)]
pub struct MockSink {
    capabilities: SinkCapabilities,
    state: Arc<Mutex<MockSinkState>>,
}

/// Internal state for the mock sink (shared for inspection in tests)
#[derive(Debug, Default)]
pub struct MockSinkState {
    /// Number of frames accepted
    pub present_count: usize,

    /// Number of present() calls that failed
    pub failure_count: usize,

    /// Most recent accepted frame
    pub last_frame: Option<FrameBuffer<Rgb888>>,

    /// Whether close() was called
    pub closed: bool,

    /// Simulate failures (for error testing)
    pub simulate_present_failure: bool,

    /// Report the sink as closed after this many frames
    pub close_after: Option<usize>,
}

impl MockSink {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            capabilities: SinkCapabilities { width, height, max_fps: 1000, name: "mock" },
            state: Arc::new(Mutex::new(MockSinkState::default())),
        }
    }

    /// Get a handle on the state for inspection in tests
    pub fn state(&self) -> Arc<Mutex<MockSinkState>> {
        Arc::clone(&self.state)
    }

    fn lock(&self) -> MutexGuard<'_, MockSinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn present_count(&self) -> usize {
        self.lock().present_count
    }

    /// Pixel of the last presented frame
    pub fn pixel(&self, x: i32, y: i32) -> Option<Rgb888> {
        self.lock().last_frame.as_ref().and_then(|f| f.pixel(Point::new(x, y)))
    }
}

impl FrameSink for MockSink {
    fn capabilities(&self) -> &SinkCapabilities {
        &self.capabilities
    }

    fn present(&mut self, frame: &FrameBuffer<Rgb888>) -> Result<(), DisplayError> {
        check_frame_size(&self.capabilities, frame)?;
        let mut state = self.lock();

        if state.close_after.is_some_and(|n| state.present_count >= n) {
            return Err(DisplayError::Closed);
        }
        if state.simulate_present_failure {
            state.failure_count += 1;
            return Err(DisplayError::Other("Simulated present failure".to_string()));
        }

        state.present_count += 1;
        state.last_frame = Some(frame.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<(), DisplayError> {
        self.lock().closed = true;
        Ok(())
    }
}
