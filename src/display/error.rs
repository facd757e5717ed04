/*
 *  display/error.rs
 *
 *  vumeter - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Error type for frame presentation
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

use std::io;
use thiserror::Error;

/// Unified error type for all sink operations
#[derive(Debug, Error)]
pub enum DisplayError {
    /// The sink has gone away (window closed); the render loop ends cleanly
    #[error("Display closed")]
    Closed,

    /// Sink initialisation failed
    #[error("Display initialization failed: {0}")]
    InitializationFailed(String),

    /// Frame does not match the sink geometry
    #[error("Frame size mismatch: expected {expected:?}, got {actual:?}")]
    FrameSizeMismatch { expected: (u32, u32), actual: (u32, u32) },

    /// Snapshot or other file output failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl DisplayError {
    /// Whether the render loop should stop rather than retry next tick.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DisplayError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_closed_is_fatal() {
        assert!(DisplayError::Closed.is_fatal());
        assert!(!DisplayError::Other("glitch".into()).is_fatal());
        let io = DisplayError::from(io::Error::new(io::ErrorKind::Other, "disk full"));
        assert!(!io.is_fatal());
        assert_eq!(io.to_string(), "I/O error: disk full");
    }

    #[test]
    fn test_mismatch_message() {
        let e = DisplayError::FrameSizeMismatch { expected: (800, 200), actual: (400, 100) };
        assert_eq!(e.to_string(), "Frame size mismatch: expected (800, 200), got (400, 100)");
    }
}
