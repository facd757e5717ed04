/*
 *  display/drivers/headless.rs
 *
 *  vumeter - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Windowless sink, optional PPM snapshots
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

use std::path::PathBuf;

use embedded_graphics::pixelcolor::Rgb888;
use log::{debug, info};

use crate::display::error::DisplayError;
use crate::display::traits::{FrameSink, SinkCapabilities, check_frame_size};
use crate::framebuf::FrameBuffer;

/// Discards frames, writing every `every`th one to `path` when configured.
#[derive(Debug)]
pub struct HeadlessSink {
    capabilities: SinkCapabilities,
    snapshot: Option<(PathBuf, u64)>,
    frame_count: u64,
    snapshots_written: u64,
}

impl HeadlessSink {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            capabilities: SinkCapabilities { width, height, max_fps: 1000, name: "headless" },
            snapshot: None,
            frame_count: 0,
            snapshots_written: 0,
        }
    }

    /// Write a PPM snapshot to `path` every `every` frames (0 disables).
    pub fn with_snapshots(mut self, path: PathBuf, every: u64) -> Self {
        self.snapshot = (every > 0).then_some((path, every));
        self
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn snapshots_written(&self) -> u64 {
        self.snapshots_written
    }
}

impl FrameSink for HeadlessSink {
    fn capabilities(&self) -> &SinkCapabilities {
        &self.capabilities
    }

    fn present(&mut self, frame: &FrameBuffer<Rgb888>) -> Result<(), DisplayError> {
        check_frame_size(&self.capabilities, frame)?;
        self.frame_count += 1;

        if let Some((path, every)) = &self.snapshot {
            if self.frame_count % every == 0 {
                frame.write_ppm(path)?;
                self.snapshots_written += 1;
                debug!("snapshot {} written to {}", self.frame_count, path.display());
            }
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), DisplayError> {
        info!(
            "headless sink closed after {} frames, {} snapshots",
            self.frame_count, self.snapshots_written
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::prelude::*;

    #[test]
    fn test_counts_frames() {
        let mut sink = HeadlessSink::new(8, 2);
        let frame = FrameBuffer::new(8, 2, Rgb888::BLACK);
        for _ in 0..5 {
            sink.present(&frame).unwrap();
        }
        assert_eq!(sink.frame_count(), 5);
        assert_eq!(sink.snapshots_written(), 0);
    }

    #[test]
    fn test_zero_interval_disables_snapshots() {
        let path = std::env::temp_dir().join("vumeter-never.ppm");
        let sink = HeadlessSink::new(8, 2).with_snapshots(path, 0);
        assert!(sink.snapshot.is_none());
    }

    #[test]
    fn test_snapshot_every_n() {
        let path = std::env::temp_dir().join(format!("vumeter-headless-{}.ppm", std::process::id()));
        let mut sink = HeadlessSink::new(8, 2).with_snapshots(path.clone(), 3);
        let frame = FrameBuffer::new(8, 2, Rgb888::new(1, 2, 3));
        for _ in 0..7 {
            sink.present(&frame).unwrap();
        }
        assert_eq!(sink.snapshots_written(), 2);
        assert_eq!(std::fs::read(&path).unwrap(), frame.to_ppm());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_rejects_wrong_size() {
        let mut sink = HeadlessSink::new(8, 2);
        let frame = FrameBuffer::new(8, 3, Rgb888::BLACK);
        assert!(sink.present(&frame).is_err());
        assert_eq!(sink.frame_count(), 0);
    }
}
