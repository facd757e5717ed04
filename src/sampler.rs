/*
 *  sampler.rs
 *
 *  vumeter - worth the squeeze
 *	(c) 2020-26 Stuart Hunter
 *
 *	Producer thread: capture buffer → peaks → forces
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

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error, info, trace};

use crate::capture::{CaptureError, SampleSource};
use crate::dbfs::{ForceCurve, dbfs};
use crate::meter::LevelMeter;
use crate::samples::peak_amplitudes;
use crate::stop::StopFlag;

/// Granularity of the stop check while the startup sweep holds.
const SWEEP_POLL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Bytes per read, a multiple of 4.
    pub buffer_bytes: usize,
    pub curve: ForceCurve,
    /// Hold both needles at full scale this long before sampling.
    pub startup_sweep: Option<Duration>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            buffer_bytes: 2048,
            curve: ForceCurve::Log,
            startup_sweep: Some(Duration::from_secs(1)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SamplerStats {
    pub buffers: u64,
    pub bytes: u64,
    /// Loudest peak seen, (left, right).
    pub max_peak: (f64, f64),
}

/// Drive both needles to full scale as a power-on check. The forces stay
/// there until the first buffer replaces them.
fn startup_sweep(meter: &LevelMeter, hold: Duration, stop: &StopFlag) {
    debug!("startup sweep for {:?}", hold);
    meter.set_force(1.0, 1.0);
    let until = Instant::now() + hold;
    while !stop.is_raised() {
        let now = Instant::now();
        if now >= until {
            break;
        }
        thread::sleep(SWEEP_POLL.min(until - now));
    }
}

/// Read, scan and publish until end of stream, a read error or `stop`.
///
/// Reads block outside the meter lock; only the two forces are written under
/// it. The stop flag is raised on the way out so the render loop winds down
/// with the source.
pub fn run_sampler<S>(
    meter: &LevelMeter,
    source: &mut S,
    config: &SamplerConfig,
    stop: &StopFlag,
) -> Result<SamplerStats, CaptureError>
where
    S: SampleSource + ?Sized,
{
    let result = sample_loop(meter, source, config, stop);
    stop.raise();
    result
}

fn sample_loop<S>(
    meter: &LevelMeter,
    source: &mut S,
    config: &SamplerConfig,
    stop: &StopFlag,
) -> Result<SamplerStats, CaptureError>
where
    S: SampleSource + ?Sized,
{
    if let Some(hold) = config.startup_sweep {
        startup_sweep(meter, hold, stop);
    }

    let mut buf = vec![0u8; config.buffer_bytes];
    let mut stats = SamplerStats::default();

    while !stop.is_raised() {
        let n = source.read(&mut buf)?;
        if n == 0 {
            info!("end of stream from {}", source.describe());
            break;
        }
        let (left, right) = peak_amplitudes(&buf[..n]);
        meter.set_force(config.curve.force(left), config.curve.force(right));

        stats.buffers += 1;
        stats.bytes += n as u64;
        stats.max_peak.0 = stats.max_peak.0.max(left);
        stats.max_peak.1 = stats.max_peak.1.max(right);
        trace!("peaks {:.1} / {:.1} dBFS", dbfs(left), dbfs(right));
    }
    Ok(stats)
}

/// Run the sampler on its own named thread.
pub fn spawn_sampler<S>(
    meter: Arc<LevelMeter>,
    mut source: S,
    config: SamplerConfig,
    stop: StopFlag,
) -> io::Result<JoinHandle<Result<SamplerStats, CaptureError>>>
where
    S: SampleSource + 'static,
{
    thread::Builder::new()
        .name("sampler".into())
        .spawn(move || {
            info!("sampling {}", source.describe());
            let result = run_sampler(&meter, &mut source, &config, &stop);
            match &result {
                Ok(stats) => info!(
                    "sampler stopped after {} buffers, peak {:.1} / {:.1} dBFS",
                    stats.buffers, dbfs(stats.max_peak.0), dbfs(stats.max_peak.1)
                ),
                Err(e) => error!("sampler failed: {}", e),
            }
            result
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbfs::force_from_amplitude;
    use crate::face::MeterColours;
    use crate::samples::encode_frame;
    use std::collections::VecDeque;

    /// Hands out prepared buffers, then end of stream.
    struct Script {
        buffers: VecDeque<Vec<u8>>,
        seen: Arc<std::sync::Mutex<Vec<(f64, f64)>>>,
        meter: Option<Arc<LevelMeter>>,
    }

    impl SampleSource for Script {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize, CaptureError> {
            if let Some(m) = &self.meter {
                let r = m.reading();
                self.seen.lock().unwrap().push((r.left_force, r.right_force));
            }
            match self.buffers.pop_front() {
                Some(b) => {
                    buf[..b.len()].copy_from_slice(&b);
                    Ok(b.len())
                }
                None => Ok(0),
            }
        }

        fn describe(&self) -> String {
            "script".into()
        }
    }

    struct Broken;

    impl SampleSource for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> Result<usize, CaptureError> {
            Err(CaptureError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "gone")))
        }

        fn describe(&self) -> String {
            "broken".into()
        }
    }

    fn frames(pairs: &[(i16, i16)]) -> Vec<u8> {
        pairs.iter().flat_map(|&(l, r)| encode_frame(l, r)).collect()
    }

    fn no_sweep() -> SamplerConfig {
        SamplerConfig { startup_sweep: None, ..SamplerConfig::default() }
    }

    fn meter() -> Arc<LevelMeter> {
        Arc::new(LevelMeter::new(64, MeterColours::default(), 85))
    }

    #[test]
    fn test_forces_follow_buffers() {
        let m = meter();
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut src = Script {
            buffers: VecDeque::from([frames(&[(16384, 0), (-3, 8192)]), frames(&[(i16::MIN, 4)])]),
            seen: Arc::clone(&seen),
            meter: Some(Arc::clone(&m)),
        };
        let stop = StopFlag::new();
        let stats = run_sampler(&m, &mut src, &no_sweep(), &stop).unwrap();

        assert_eq!(stats.buffers, 2);
        assert_eq!(stats.bytes, 12);
        assert_eq!(stats.max_peak, (1.0, 0.25));

        // forces as seen at the start of each read
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0], (0.0, 0.0));
        assert_eq!(seen[1], (force_from_amplitude(0.5), force_from_amplitude(0.25)));
        assert_eq!(seen[2], (1.0, force_from_amplitude(4.0 / 32768.0)));

        // end of stream stops the render side too
        assert!(stop.is_raised());
    }

    #[test]
    fn test_curve_selection() {
        let m = meter();
        let mut src = Script {
            buffers: VecDeque::from([frames(&[(8192, 8192)])]),
            seen: Arc::default(),
            meter: None,
        };
        let config = SamplerConfig { curve: ForceCurve::StraightRuler, ..no_sweep() };
        run_sampler(&m, &mut src, &config, &StopFlag::new()).unwrap();
        let r = m.reading();
        assert_eq!(r.left_force, ForceCurve::StraightRuler.force(0.25));
    }

    #[test]
    fn test_read_error_raises_stop() {
        let m = meter();
        let stop = StopFlag::new();
        assert!(run_sampler(&m, &mut Broken, &no_sweep(), &stop).is_err());
        assert!(stop.is_raised());
    }

    #[test]
    fn test_raised_stop_skips_reading() {
        let m = meter();
        let stop = StopFlag::new();
        stop.raise();
        let stats = run_sampler(&m, &mut Broken, &no_sweep(), &stop).unwrap();
        assert_eq!(stats.buffers, 0);
    }

    #[test]
    fn test_startup_sweep_drives_full_scale() {
        let m = meter();
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut src = Script { buffers: VecDeque::new(), seen: Arc::clone(&seen), meter: Some(Arc::clone(&m)) };
        let config = SamplerConfig { startup_sweep: Some(Duration::from_millis(30)), ..no_sweep() };

        let sweeper = {
            let m = Arc::clone(&m);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                m.reading().left_force
            })
        };
        let start = Instant::now();
        run_sampler(&m, &mut src, &config, &StopFlag::new()).unwrap();

        assert!(start.elapsed() >= Duration::from_millis(30));
        assert_eq!(sweeper.join().unwrap(), 1.0);
        // still held at full scale when the first read starts
        assert_eq!(seen.lock().unwrap()[0], (1.0, 1.0));
    }

    #[test]
    fn test_first_buffer_replaces_sweep_forces() {
        let m = meter();
        let mut src = Script {
            buffers: VecDeque::from([frames(&[(8192, 0)])]),
            seen: Arc::default(),
            meter: None,
        };
        let config = SamplerConfig { startup_sweep: Some(Duration::from_millis(5)), ..no_sweep() };
        run_sampler(&m, &mut src, &config, &StopFlag::new()).unwrap();
        let r = m.reading();
        assert_eq!((r.left_force, r.right_force), (force_from_amplitude(0.25), 0.0));
    }

    #[test]
    fn test_spawned_sampler_joins() {
        let m = meter();
        let src = Script { buffers: VecDeque::from([frames(&[(100, 100)])]), seen: Arc::default(), meter: None };
        let stop = StopFlag::new();
        let handle = spawn_sampler(Arc::clone(&m), src, no_sweep(), stop.clone()).unwrap();
        let stats = handle.join().unwrap().unwrap();
        assert_eq!(stats.buffers, 1);
        assert!(stop.is_raised());
    }
}
