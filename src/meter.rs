/*
 *  meter.rs
 *
 *  vumeter - worth the squeeze
 *	(c) 2020-26 Stuart Hunter
 *
 *	Stereo level meter: two sprung needles sharing one drive state
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

//! The sampling thread writes forces with [`LevelMeter::set_force`]; the
//! render thread advances both needles by the wall-clock time since its last
//! tick and draws them. Forces, deflections and both needle models sit behind
//! a single mutex so a frame never mixes the left result of one force pair with
//! the right result of another. Drawing happens after the lock is released.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use embedded_graphics::{pixelcolor::Rgb888, prelude::*};
use log::debug;

use crate::face::{MeterColours, MeterFace};
use crate::physics::OscillatorModel;

/// Needle stops, as deflection.
pub const DEFLECTION_MIN: f64 = 0.0;
pub const DEFLECTION_MAX: f64 = 1.0;

/// Needle positions, 0 at rest and 1 at full scale.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Deflection {
    pub left: f64,
    pub right: f64,
}

/// Forces and deflections read together under the lock.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Reading {
    pub left_force: f64,
    pub right_force: f64,
    pub deflection: Deflection,
}

/// State shared by the sampling and render threads.
#[derive(Debug)]
pub struct DriveState {
    pub left_force: f64,
    pub right_force: f64,
    pub left_deflection: f64,
    pub right_deflection: f64,
    /// Wall-clock time the needles have been simulated up to.
    pub last_update: Instant,
}

#[derive(Debug)]
struct MeterState {
    drive: DriveState,
    left: OscillatorModel,
    right: OscillatorModel,
}

impl MeterState {
    fn integrate(&mut self, millis: u32) -> Deflection {
        let drive = &mut self.drive;
        drive.left_deflection = self.left.integrate_bounded(
            drive.left_force,
            DEFLECTION_MIN,
            DEFLECTION_MAX,
            millis,
        );
        drive.right_deflection = self.right.integrate_bounded(
            drive.right_force,
            DEFLECTION_MIN,
            DEFLECTION_MAX,
            millis,
        );
        Deflection {
            left: drive.left_deflection,
            right: drive.right_deflection,
        }
    }
}

pub struct LevelMeter {
    width: u32,
    update_millis: u32,
    face: MeterFace,
    state: Mutex<MeterState>,
}

impl LevelMeter {
    /// `width` is the full stereo width in pixels (the frame is width × width/4),
    /// `hz` the render rate.
    pub fn new(width: u32, colours: MeterColours, hz: u32) -> Self {
        let update_millis = (1000.0 / hz.max(1) as f64).round() as u32;
        let left = OscillatorModel::needle();
        debug!(
            "meter {}x{} @ {} Hz ({} ms), needle critical damping {:.3}",
            width, width / 4, hz, update_millis, left.critical_damping()
        );
        Self {
            width,
            update_millis,
            face: MeterFace::new(width, colours),
            state: Mutex::new(MeterState {
                drive: DriveState {
                    left_force: 0.0,
                    right_force: 0.0,
                    left_deflection: 0.0,
                    right_deflection: 0.0,
                    last_update: Instant::now(),
                },
                right: left.clone(),
                left,
            }),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn frame_size(&self) -> Size {
        self.face.frame_size()
    }

    pub fn update_millis(&self) -> u32 {
        self.update_millis
    }

    pub fn update_period(&self) -> Duration {
        Duration::from_millis(self.update_millis as u64)
    }

    // The guarded state is plain numbers, a panicked holder cannot leave it
    // in a state worse than a stale frame.
    fn lock(&self) -> MutexGuard<'_, MeterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Latest drive for both needles. Values are not range checked.
    pub fn set_force(&self, left: f64, right: f64) {
        let mut state = self.lock();
        state.drive.left_force = left;
        state.drive.right_force = right;
    }

    /// Restart the simulation clock, e.g. when the render loop starts.
    pub fn reset_clock(&self, now: Instant) {
        self.lock().drive.last_update = now;
    }

    /// Advance both needles to the current wall-clock time.
    pub fn advance(&self) -> Deflection {
        self.advance_at(Instant::now())
    }

    /// Advance both needles to `now` in whole milliseconds.
    ///
    /// The clock moves on by exactly the milliseconds simulated, so the
    /// fractional remainder is carried into the next call. A late tick
    /// simulates correspondingly more steps; an instant before the clock
    /// simulates none.
    pub fn advance_at(&self, now: Instant) -> Deflection {
        let mut state = self.lock();
        let elapsed = now.saturating_duration_since(state.drive.last_update);
        let millis = elapsed.as_millis().min(u32::MAX as u128) as u32;
        state.drive.last_update += Duration::from_millis(millis as u64);
        state.integrate(millis)
    }

    /// Advance both needles by an explicit number of milliseconds, leaving
    /// the clock alone.
    pub fn advance_by(&self, millis: u32) -> Deflection {
        self.lock().integrate(millis)
    }

    pub fn deflection(&self) -> Deflection {
        let state = self.lock();
        Deflection {
            left: state.drive.left_deflection,
            right: state.drive.right_deflection,
        }
    }

    pub fn reading(&self) -> Reading {
        let state = self.lock();
        Reading {
            left_force: state.drive.left_force,
            right_force: state.drive.right_force,
            deflection: Deflection {
                left: state.drive.left_deflection,
                right: state.drive.right_deflection,
            },
        }
    }

    /// Draw both faces and needles at `deflection`.
    pub fn render<D>(&self, target: &mut D, deflection: Deflection) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb888>,
    {
        self.face.render(target, deflection.left, deflection.right)
    }

    /// One render tick: advance under the lock, then draw without it.
    pub fn advance_and_render<D>(&self, target: &mut D) -> Result<Deflection, D::Error>
    where
        D: DrawTarget<Color = Rgb888>,
    {
        let deflection = self.advance();
        self.render(target, deflection)?;
        Ok(deflection)
    }
}
