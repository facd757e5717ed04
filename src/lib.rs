/*
 *  lib.rs
 *
 *  vumeter - worth the squeeze
 *	(c) 2020-26 Stuart Hunter
 *
 *	Stereo analogue VU meter: sprung needles driven by audio peaks
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

//! Audio buffer → per-channel peak → log force → damped spring needle →
//! pixels. A sampling thread publishes forces, a render thread integrates and
//! draws; [`meter::LevelMeter`] is the one lock between them.

pub mod capture;
pub mod config;
pub mod dbfs;
pub mod display;
pub mod draw;
pub mod face;
pub mod framebuf;
pub mod func_timer;
pub mod meter;
pub mod physics;
pub mod render;
pub mod sampler;
pub mod samples;
pub mod stop;

pub use meter::{Deflection, LevelMeter, Reading};
pub use physics::OscillatorModel;
pub use stop::StopFlag;
