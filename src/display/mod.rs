/*
 *  display/mod.rs
 *
 *  vumeter - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display subsystem - frame sinks the render loop presents to
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

// Core trait definitions
pub mod traits;
pub mod error;

// Sink implementations
pub mod drivers;

// Emulator window (only with emulator feature)
#[cfg(feature = "emulator")]
pub mod emulator_window;

// Re-exports for convenience
pub use traits::{FrameSink, SinkCapabilities};
pub use error::DisplayError;
pub use drivers::headless::HeadlessSink;
pub use drivers::mock::MockSink;

#[cfg(feature = "emulator")]
pub use drivers::emulator::EmulatorSink;
