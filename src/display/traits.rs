/*
 *  display/traits.rs
 *
 *  vumeter - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Core trait definitions for frame sinks
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
use crate::framebuf::FrameBuffer;

/// Sink capabilities and metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkCapabilities {
    /// Frame width in pixels
    pub width: u32,

    /// Frame height in pixels
    pub height: u32,

    /// Maximum useful frame rate
    pub max_fps: u32,

    /// Short name for logs and window titles
    pub name: &'static str,
}

/// Where finished frames go.
///
/// The render loop draws each frame into its own `FrameBuffer` and hands it
/// over here, so sinks never see the meter lock.
pub trait FrameSink: Send {
    /// Returns the capabilities of this sink
    fn capabilities(&self) -> &SinkCapabilities;

    /// Returns the sink dimensions as (width, height)
    fn dimensions(&self) -> (u32, u32) {
        let caps = self.capabilities();
        (caps.width, caps.height)
    }

    /// Present one complete frame.
    fn present(&mut self, frame: &FrameBuffer<Rgb888>) -> Result<(), DisplayError>;

    /// Called once when the render loop ends.
    fn close(&mut self) -> Result<(), DisplayError> {
        Ok(())
    }
}

impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn capabilities(&self) -> &SinkCapabilities {
        (**self).capabilities()
    }

    fn present(&mut self, frame: &FrameBuffer<Rgb888>) -> Result<(), DisplayError> {
        (**self).present(frame)
    }

    fn close(&mut self) -> Result<(), DisplayError> {
        (**self).close()
    }
}

/// Reject frames whose size differs from the sink's.
pub fn check_frame_size(caps: &SinkCapabilities, frame: &FrameBuffer<Rgb888>) -> Result<(), DisplayError> {
    let Size { width, height } = frame.size();
    if (width, height) != (caps.width, caps.height) {
        return Err(DisplayError::FrameSizeMismatch {
            expected: (caps.width, caps.height),
            actual: (width, height),
        });
    }
    Ok(())
}
