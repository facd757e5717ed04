/*
 *  render.rs
 *
 *  vumeter - worth the squeeze
 *	(c) 2020-26 Stuart Hunter
 *
 *	Consumer thread: tick, advance the needles, present the frame
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use log::{debug, error, info, warn};

use crate::display::{DisplayError, FrameSink};
use crate::framebuf::FrameBuffer;
use crate::func_timer::FunctionTimer;
use crate::meter::LevelMeter;
use crate::stop::StopFlag;

/// Render until `stop` is raised or the sink closes; returns frames presented.
///
/// The flag is checked once per iteration, before the sleep, so a raised flag
/// lets at most one more frame through.
pub fn run_render<S>(meter: &LevelMeter, sink: &mut S, stop: &StopFlag) -> u64
where
    S: FrameSink + ?Sized,
{
    let Size { width, height } = meter.frame_size();
    let mut frame = FrameBuffer::new(width, height, Rgb888::BLACK);
    let period = meter.update_period();
    let mut frames = 0u64;
    let mut failures = 0u64;

    meter.reset_clock(Instant::now());

    while !stop.is_raised() {
        thread::sleep(period);

        let _timer = FunctionTimer::new("frame");
        let deflection = match meter.advance_and_render(&mut frame) {
            Ok(d) => d,
            Err(e) => match e {},
        };

        match sink.present(&frame) {
            Ok(()) => {
                frames += 1;
                if failures > 0 {
                    info!("{} recovered after {} failed frames", sink.capabilities().name, failures);
                    failures = 0;
                }
            }
            Err(e) if e.is_fatal() => {
                info!("{}: {}, render loop ending", sink.capabilities().name, e);
                stop.raise();
                break;
            }
            Err(e) => {
                failures += 1;
                if failures == 1 {
                    warn!("present failed: {}", e);
                } else {
                    debug!("present failed ({}): {}", failures, e);
                }
            }
        }

        if frames % 1000 == 0 && frames > 0 {
            debug!("frame {} needles {:.3} / {:.3}", frames, deflection.left, deflection.right);
        }
    }

    if let Err(e) = sink.close() {
        warn!("closing {} failed: {}", sink.capabilities().name, e);
    }
    frames
}

/// Owns the render thread.
pub struct RenderHandle {
    stop: StopFlag,
    handle: JoinHandle<u64>,
}

impl RenderHandle {
    /// Ask the loop to finish its current frame and exit.
    pub fn stop(&self) {
        self.stop.raise();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the loop to exit and return the frames it presented.
    pub fn join(self) -> u64 {
        match self.handle.join() {
            Ok(frames) => frames,
            Err(_) => {
                error!("render thread panicked");
                0
            }
        }
    }
}

/// Start the render loop on its own named thread.
pub fn spawn_render<S>(meter: Arc<LevelMeter>, mut sink: S, stop: StopFlag) -> Result<RenderHandle, DisplayError>
where
    S: FrameSink + 'static,
{
    let size = meter.frame_size();
    let caps = sink.capabilities().clone();
    if (caps.width, caps.height) != (size.width, size.height) {
        return Err(DisplayError::FrameSizeMismatch {
            expected: (caps.width, caps.height),
            actual: (size.width, size.height),
        });
    }

    let thread_stop = stop.clone();
    let handle = thread::Builder::new()
        .name("render".into())
        .spawn(move || {
            info!(
                "rendering {}x{} to {} every {} ms",
                caps.width, caps.height, caps.name, meter.update_millis()
            );
            let frames = run_render(&meter, &mut sink, &thread_stop);
            info!("render loop stopped after {} frames", frames);
            frames
        })?;

    Ok(RenderHandle { stop, handle })
}
