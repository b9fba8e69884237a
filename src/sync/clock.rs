//! Fixed-step accumulator

use std::time::Duration;

/// Converts variable wall-clock time into whole fixed simulation steps
#[derive(Debug, Clone)]
pub struct FixedStep {
    dt: f64,
    accumulator: f64,
    /// Upper bound on steps per `advance`, drops the excess when far behind
    max_steps: u32,
}

impl FixedStep {
    pub fn new(dt: f64) -> Self {
        Self {
            dt,
            accumulator: 0.0,
            max_steps: 8,
        }
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Add elapsed seconds, returns how many steps are due
    pub fn advance(&mut self, elapsed: f64) -> u32 {
        if self.dt <= 0.0 {
            return 0;
        }
        self.accumulator += elapsed.max(0.0);
        let mut steps = 0;
        while self.accumulator >= self.dt && steps < self.max_steps {
            self.accumulator -= self.dt;
            steps += 1;
        }
        if steps == self.max_steps {
            self.accumulator = self.accumulator.min(self.dt);
        }
        steps
    }

    /// Fraction of a step accumulated, for interpolation
    pub fn alpha(&self) -> f64 {
        if self.dt <= 0.0 {
            0.0
        } else {
            (self.accumulator / self.dt).clamp(0.0, 1.0)
        }
    }

    /// Wall time until the next step is due
    pub fn until_next(&self) -> Duration {
        Duration::from_secs_f64((self.dt - self.accumulator).max(0.0))
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulates_partial_steps() {
        let mut clock = FixedStep::new(0.1);
        assert_eq!(clock.advance(0.05), 0);
        assert!((clock.alpha() - 0.5).abs() < 1e-9);
        assert_eq!(clock.advance(0.06), 1);
        assert_eq!(clock.advance(0.25), 2);
    }

    #[test]
    fn test_caps_catch_up() {
        let mut clock = FixedStep::new(0.1).with_max_steps(3);
        assert_eq!(clock.advance(10.0), 3);
        assert!(clock.alpha() <= 1.0);
        assert!(clock.advance(0.0) <= 1);
    }
}
