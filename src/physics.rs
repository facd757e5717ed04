// physics.rs

/// Fixed integration step: one millisecond, in seconds.
pub const STEP_SECS: f64 = 0.001;

/// Needle mass used by the meter.
pub const NEEDLE_MASS: f64 = 0.005;
/// Needle spring constant used by the meter.
pub const NEEDLE_SPRING: f64 = 1.0;
/// Needle damping used by the meter; below critical (≈0.141) so it overshoots.
pub const NEEDLE_DAMPING: f64 = 0.08;

/// Classic 2nd-order needle: m ẍ + d ẋ + k x = F
///
/// Explicit Euler with a fixed 1 ms step, so identical (force, millis)
/// sequences always give bit-identical trajectories.
///
/// `mass` must be > 0. A zero or negative mass is not checked and yields
/// non-finite positions; the step loop stays branch-free.
#[derive(Debug, Clone, PartialEq)]
pub struct OscillatorModel {
    // state
    position: f64,
    velocity: f64,
    // params
    mass: f64,
    spring: f64,
    damping: f64,
}

impl OscillatorModel {
    pub fn new(mass: f64, spring: f64, damping: f64) -> Self {
        Self {
            position: 0.0,
            velocity: 0.0,
            mass,
            spring,
            damping,
        }
    }

    /// The model both meter channels use.
    pub fn needle() -> Self {
        Self::new(NEEDLE_MASS, NEEDLE_SPRING, NEEDLE_DAMPING)
    }

    /// Drive with a constant `force` for `millis` steps, returns the new extension.
    pub fn integrate(&mut self, force: f64, millis: u32) -> f64 {
        for _ in 0..millis {
            self.step(force);
        }
        self.position
    }

    /// As [`integrate`](Self::integrate), with stops at `lower` and `upper`.
    ///
    /// Before every step a position beyond a stop is snapped onto it and the
    /// velocity reversed (elastic bounce). The check runs once per millisecond,
    /// so the extension can pass a stop by up to one step's travel before it
    /// is reflected. The returned extension is clamped to the stops; the
    /// internal state is left as integrated.
    pub fn integrate_bounded(&mut self, force: f64, lower: f64, upper: f64, millis: u32) -> f64 {
        for _ in 0..millis {
            if self.position > upper {
                self.position = upper;
                self.velocity = -self.velocity;
            }
            if self.position < lower {
                self.position = lower;
                self.velocity = -self.velocity;
            }
            self.step(force);
        }
        self.position.clamp(lower, upper)
    }

    #[inline]
    fn step(&mut self, force: f64) {
        let a = (force - self.spring * self.position - self.damping * self.velocity) / self.mass;
        self.velocity += a * STEP_SECS;
        self.position += self.velocity * STEP_SECS;
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    /// Damping at which the needle returns without overshoot: 2·√(m·k).
    pub fn critical_damping(&self) -> f64 {
        2.0 * (self.mass * self.spring).sqrt()
    }

    pub fn is_underdamped(&self) -> bool {
        self.damping < self.critical_damping()
    }
}
