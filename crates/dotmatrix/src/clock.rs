use std::time::Instant;

/// Abstraction over where frame times originate from.
pub trait TimeSource: Send {
    /// Restarts the source at zero.
    fn reset(&mut self);
    /// Seconds elapsed since the source started.
    fn seconds(&mut self) -> f32;
}

/// Time source backed by the system monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl TimeSource for SystemClock {
    fn reset(&mut self) {
        self.origin = Instant::now();
    }

    fn seconds(&mut self) -> f32 {
        self.origin.elapsed().as_secs_f32()
    }
}

/// Time source that always reports the same timestamp; used for stills.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    time: f32,
}

impl FixedClock {
    pub fn new(time: f32) -> Self {
        Self { time }
    }
}

impl TimeSource for FixedClock {
    fn reset(&mut self) {}

    fn seconds(&mut self) -> f32 {
        self.time
    }
}

pub type BoxedTimeSource = Box<dyn TimeSource + Send>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_monotonic() {
        let mut clock = SystemClock::new();
        let first = clock.seconds();
        let second = clock.seconds();
        assert!(first >= 0.0);
        assert!(second >= first);
    }

    #[test]
    fn fixed_clock_ignores_reset() {
        let mut clock = FixedClock::new(2.5);
        clock.reset();
        assert_eq!(clock.seconds(), 2.5);
        assert_eq!(clock.seconds(), 2.5);
    }
}
