/*
 *  dbfs.rs
 *
 *  vumeter - worth the squeeze
 *	(c) 2020-26 Stuart Hunter
 *
 *	Amplitude to needle drive conversion
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

use serde::{Deserialize, Serialize};

/// log(10^0.3): one ruler step, ≈ +6 dB in amplitude.
const LN_SIX_DBA: f64 = 0.3 * std::f64::consts::LN_10;

/// Number of 6 dB steps spanned by the log scale (48 dB).
pub const METER_STEPS: f64 = 8.0;

/// Steps on the evenly spaced ruler variant.
pub const RULER_STEPS: f64 = 7.0;

/// Quietest amplitude that still produces drive: 10^(-0.3 * 8).
pub const FLOOR_AMPLITUDE: f64 = 0.003981071705534973;

/// Map a linear amplitude in (0, 1] to a drive force in [0, 1].
///
/// 8 steps of 6 dB each across the 0..1 force axis. Anything at or below
/// −48 dBFS, including silence, gives no drive.
#[inline]
pub fn force_from_amplitude(amplitude: f64) -> f64 {
    // ln(0) is -inf; NaN compares false, so catch both here
    if !(amplitude > 0.0) {
        return 0.0;
    }
    let force = amplitude.ln() / LN_SIX_DBA + METER_STEPS;
    force.max(0.0) / METER_STEPS
}

/// Drive for a ruler with evenly spaced marks.
///
/// A 7 step (42 dB) log scale, bent through an arctangent so the visible
/// needle travel per 6 dB is constant. Still 0 at the floor and 1 at full
/// scale.
#[inline]
pub fn force_from_amplitude_straight(amplitude: f64) -> f64 {
    if !(amplitude > 0.0) {
        return 0.0;
    }
    let force = ((amplitude.ln() / LN_SIX_DBA + RULER_STEPS) / RULER_STEPS).max(0.0);
    ((force * 2.0 - 1.0).atan() * std::f64::consts::FRAC_1_PI * 4.0 + 1.0) / 2.0
}

/// Amplitude to dBFS, clamped at the bottom for logging.
#[inline]
pub fn dbfs(amplitude: f64) -> f64 {
    if amplitude > 0.0 {
        (20.0 * amplitude.log10()).max(-120.0)
    } else {
        -120.0
    }
}

/// Selectable amplitude → force curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForceCurve {
    /// 8 × 6 dB log scale.
    #[default]
    Log,
    /// 7 × 6 dB log scale corrected for a straight ruler.
    StraightRuler,
}

impl ForceCurve {
    #[inline]
    pub fn force(self, amplitude: f64) -> f64 {
        match self {
            ForceCurve::Log => force_from_amplitude(amplitude),
            ForceCurve::StraightRuler => force_from_amplitude_straight(amplitude),
        }
    }
}

impl std::str::FromStr for ForceCurve {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "log" => Ok(ForceCurve::Log),
            "straight_ruler" | "straight" => Ok(ForceCurve::StraightRuler),
            other => Err(format!("unknown force curve '{other}' (log|straight_ruler)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_scale_is_one() {
        assert_eq!(force_from_amplitude(1.0), 1.0);
        assert_eq!(force_from_amplitude_straight(1.0), 1.0);
    }

    #[test]
    fn test_silence_is_zero() {
        assert_eq!(force_from_amplitude(0.0), 0.0);
        assert_eq!(force_from_amplitude(-0.5), 0.0);
        assert_eq!(force_from_amplitude(f64::NAN), 0.0);
        assert_eq!(force_from_amplitude_straight(0.0), 0.0);
    }

    #[test]
    fn test_floor() {
        assert!((FLOOR_AMPLITUDE - 10f64.powf(-2.4)).abs() < 1e-15);
        assert!(force_from_amplitude(FLOOR_AMPLITUDE).abs() < 1e-12);
        for a in [0.003, 0.001, 1e-6, 1.0 / 32768.0] {
            assert_eq!(force_from_amplitude(a), 0.0, "amplitude {a}");
        }
        // just above the floor there is drive
        assert!(force_from_amplitude(0.005) > 0.0);
    }

    #[test]
    fn test_six_db_per_step() {
        // halving the amplitude drops the force by ≈ one step of 1/8
        let drop = force_from_amplitude(1.0) - force_from_amplitude(0.5);
        assert!((drop - 0.125).abs() < 1e-3, "drop = {drop}");
        assert!((force_from_amplitude(0.25) - 0.7491416702800157).abs() < 1e-12);
    }

    #[test]
    fn test_monotonic() {
        let mut last = 0.0;
        for i in 1..=10_000 {
            let a = i as f64 / 10_000.0;
            let f = force_from_amplitude(a);
            assert!(f >= last, "not monotonic at {a}");
            assert!((0.0..=1.0).contains(&f));
            last = f;
        }

        let mut last = 0.0;
        for i in 1..=10_000 {
            let a = i as f64 / 10_000.0;
            let f = force_from_amplitude_straight(a);
            assert!(f >= last, "straight ruler not monotonic at {a}");
            last = f;
        }
    }

    #[test]
    fn test_straight_ruler_midpoint() {
        // -21 dB (3.5 steps) sits at the centre of the bend
        let a = 10f64.powf(-0.3 * 3.5);
        assert!((force_from_amplitude_straight(a) - 0.5).abs() < 1e-9);
        assert!((force_from_amplitude_straight(0.5) - 0.8944493803461417).abs() < 1e-9);
    }

    #[test]
    fn test_curve_selection() {
        assert_eq!(ForceCurve::default(), ForceCurve::Log);
        assert_eq!(ForceCurve::Log.force(0.25), force_from_amplitude(0.25));
        assert_eq!(
            ForceCurve::StraightRuler.force(0.25),
            force_from_amplitude_straight(0.25)
        );
    }

    #[test]
    fn test_curve_from_str() {
        assert_eq!("log".parse(), Ok(ForceCurve::Log));
        assert_eq!("Straight-Ruler".parse(), Ok(ForceCurve::StraightRuler));
        assert!("linear".parse::<ForceCurve>().is_err());
    }

    #[test]
    fn test_dbfs() {
        assert_eq!(dbfs(1.0), 0.0);
        assert!((dbfs(0.5) + 6.0206).abs() < 1e-3);
        assert_eq!(dbfs(0.0), -120.0);
    }
}
