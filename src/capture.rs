/*
 *  capture.rs
 *
 *  vumeter - worth the squeeze
 *	(c) 2020-26 Stuart Hunter
 *
 *	Audio sources: raw S16_BE stereo streams and a built-in test tone
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

use std::f64::consts::TAU;
use std::fs::File;
use std::io::{self, BufReader, ErrorKind, Read, Stdin};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::dbfs::FLOOR_AMPLITUDE;
use crate::samples::{FRAME_BYTES, encode_frame};

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("cannot open {path}: {source}")]
    Open { path: PathBuf, source: io::Error },
    #[error("capture buffer of {0} bytes cannot hold a stereo frame")]
    Misaligned(usize),
}

/// Blocking supplier of interleaved S16_BE stereo frames.
pub trait SampleSource: Send {
    /// Fill the front of `buf` with whole frames and return the byte count.
    /// `Ok(0)` means end of stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, CaptureError>;

    /// Short description for logs.
    fn describe(&self) -> String;
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, CaptureError> {
        (**self).read(buf)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

fn whole_frames(len: usize) -> Result<usize, CaptureError> {
    match len - len % FRAME_BYTES {
        0 => Err(CaptureError::Misaligned(len)),
        n => Ok(n),
    }
}

/// Raw capture piped in from elsewhere, e.g.
/// `arecord -f S16_BE -c 2 -r 44100 | vumeter`.
pub struct StreamSource<R> {
    inner: R,
    name: String,
}

impl StreamSource<Stdin> {
    pub fn stdin() -> Self {
        Self::new(io::stdin(), "stdin")
    }
}

impl StreamSource<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, CaptureError> {
        let file = File::open(path).map_err(|source| CaptureError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(BufReader::new(file), &path.display().to_string()))
    }
}

impl<R: Read> StreamSource<R> {
    pub fn new(inner: R, name: &str) -> Self {
        Self { inner, name: name.to_string() }
    }

    fn read_some(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.inner.read(buf) {
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                other => return other,
            }
        }
    }
}

impl<R: Read + Send> SampleSource for StreamSource<R> {
    /// One read like a capture device, topped up to a frame boundary. A
    /// partial frame left at end of stream is dropped.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, CaptureError> {
        let want = whole_frames(buf.len())?;
        let mut filled = self.read_some(&mut buf[..want])?;
        while filled % FRAME_BYTES != 0 {
            match self.read_some(&mut buf[filled..want])? {
                0 => return Ok(filled - filled % FRAME_BYTES),
                n => filled += n,
            }
        }
        Ok(filled)
    }

    fn describe(&self) -> String {
        format!("S16_BE stereo from {}", self.name)
    }
}

/// Seconds for one rise and fall across the scale.
pub const TONE_SWEEP_SECS: f64 = 8.0;

/// Sine tone whose level sweeps up and down the meter scale. The right
/// channel runs a quarter sweep ahead of the left.
pub struct ToneSource {
    sample_rate: u32,
    tone_hz: f64,
    noise: f64,
    rng: StdRng,
    frame: u64,
    paced_from: Option<Instant>,
    paced: bool,
}

impl ToneSource {
    pub fn new(sample_rate: u32, tone_hz: f64, noise: f64) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            tone_hz,
            noise: noise.clamp(0.0, 1.0),
            rng: StdRng::from_os_rng(),
            frame: 0,
            paced_from: None,
            paced: true,
        }
    }

    /// Deterministic noise.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Generate as fast as asked instead of in real time.
    pub fn unpaced(mut self) -> Self {
        self.paced = false;
        self
    }

    /// Peak level of a channel `offset` sweeps ahead, at time `t` seconds.
    pub fn level_at(t: f64, offset: f64) -> f64 {
        let pos = (t / TONE_SWEEP_SECS + offset).rem_euclid(1.0);
        let tri = 1.0 - (2.0 * pos - 1.0).abs();
        // bottom of the sweep sits on the meter floor
        FLOOR_AMPLITUDE.powf(1.0 - tri)
    }

    fn sample(&mut self, t: f64, offset: f64) -> i16 {
        let mut x = Self::level_at(t, offset) * (TAU * self.tone_hz * t).sin();
        if self.noise > 0.0 {
            x += self.noise * self.rng.random_range(-1.0..=1.0);
        }
        (x.clamp(-1.0, 1.0) * i16::MAX as f64) as i16
    }

    fn pace(&mut self) {
        let start = *self.paced_from.get_or_insert_with(Instant::now);
        let due = start + Duration::from_secs_f64(self.frame as f64 / self.sample_rate as f64);
        let now = Instant::now();
        if due > now {
            thread::sleep(due - now);
        }
    }
}

impl SampleSource for ToneSource {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, CaptureError> {
        let len = whole_frames(buf.len())?;
        for chunk in buf[..len].chunks_exact_mut(FRAME_BYTES) {
            let t = self.frame as f64 / self.sample_rate as f64;
            let left = self.sample(t, 0.0);
            let right = self.sample(t, 0.25);
            chunk.copy_from_slice(&encode_frame(left, right));
            self.frame += 1;
        }
        if self.paced {
            self.pace();
        }
        Ok(len)
    }

    fn describe(&self) -> String {
        format!("{} Hz test tone at {} Hz, noise {:.2}", self.tone_hz, self.sample_rate, self.noise)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::samples::peak_amplitudes;
    use std::io::Cursor;

    /// Hands out its data a few bytes at a time.
    struct Dribble {
        data: Vec<u8>,
        pos: usize,
        step: usize,
    }

    impl Read for Dribble {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn test_stream_reads_whole_frames() {
        let data: Vec<u8> = (0..40u8).collect();
        let mut src = StreamSource::new(Dribble { data, pos: 0, step: 3 }, "dribble");
        let mut buf = [0u8; 16];
        let n = src.read(&mut buf).unwrap();
        assert_eq!(n % FRAME_BYTES, 0);
        assert_eq!(&buf[..n], &(0..n as u8).collect::<Vec<_>>()[..]);
    }

    #[test]
    fn test_stream_eof_drops_partial_frame() {
        let mut src = StreamSource::new(Cursor::new(vec![1u8; 10]), "cursor");
        let mut buf = [0u8; 64];
        assert_eq!(src.read(&mut buf).unwrap(), 8);
        assert_eq!(src.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_buffer_too_small() {
        let mut src = StreamSource::new(Cursor::new(vec![0u8; 8]), "cursor");
        assert!(matches!(src.read(&mut [0u8; 3]), Err(CaptureError::Misaligned(3))));
        // odd sized buffers use the whole-frame prefix
        assert_eq!(src.read(&mut [0u8; 7]).unwrap(), 4);
    }

    #[test]
    fn test_open_missing_file() {
        let err = StreamSource::open(Path::new("/nonexistent/vumeter.raw")).err().unwrap();
        assert!(matches!(err, CaptureError::Open { .. }));
        assert!(err.to_string().contains("/nonexistent/vumeter.raw"));
    }

    #[test]
    fn test_tone_level_sweep() {
        assert!((ToneSource::level_at(0.0, 0.0) - FLOOR_AMPLITUDE).abs() < 1e-12);
        assert!((ToneSource::level_at(TONE_SWEEP_SECS / 2.0, 0.0) - 1.0).abs() < 1e-12);
        // quarter sweep ahead
        assert_eq!(
            ToneSource::level_at(0.0, 0.25),
            ToneSource::level_at(TONE_SWEEP_SECS / 4.0, 0.0)
        );
    }

    #[test]
    fn test_tone_peaks_follow_level() {
        let mut tone = ToneSource::new(8000, 440.0, 0.0).unpaced();
        let mut buf = vec![0u8; 800 * FRAME_BYTES];
        assert_eq!(tone.read(&mut buf).unwrap(), buf.len());
        let (l, r) = peak_amplitudes(&buf);
        // left starts at the floor, right a quarter sweep in
        assert!(l < 0.01, "left {l}");
        assert!(r > 0.05 && r < 0.2, "right {r}");
    }

    #[test]
    fn test_tone_noise_is_seeded() {
        let mut a = ToneSource::new(8000, 440.0, 0.1).with_seed(7).unpaced();
        let mut b = ToneSource::new(8000, 440.0, 0.1).with_seed(7).unpaced();
        let mut ba = [0u8; 256];
        let mut bb = [0u8; 256];
        a.read(&mut ba).unwrap();
        b.read(&mut bb).unwrap();
        assert_eq!(ba, bb);
        assert!(a.describe().contains("440"));
    }

    #[test]
    fn test_tone_paced_in_real_time() {
        let mut tone = ToneSource::new(1000, 100.0, 0.0);
        let mut buf = [0u8; 50 * FRAME_BYTES];
        let start = Instant::now();
        tone.read(&mut buf).unwrap();
        tone.read(&mut buf).unwrap();
        // 100 frames at 1 kHz
        assert!(start.elapsed() >= Duration::from_millis(95));
    }
}
