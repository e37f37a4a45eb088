use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared slot holding the `elapsed_time` uniform of one session.
///
/// The session keeps one end and the [`FrameDriver`] the other; the driver
/// never sees the rest of the session.
#[derive(Debug, Clone, Default)]
pub struct TimeBinding(Arc<AtomicU32>);

impl TimeBinding {
    pub fn new(seconds: f32) -> Self {
        Self(Arc::new(AtomicU32::new(seconds.to_bits())))
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub(crate) fn set(&self, seconds: f32) {
        self.0.store(seconds.to_bits(), Ordering::Relaxed);
    }
}

/// Per-frame hook invoked by the host's display loop.
#[derive(Debug, Clone)]
pub struct FrameDriver {
    time: TimeBinding,
}

impl FrameDriver {
    pub(crate) fn new(time: TimeBinding) -> Self {
        Self { time }
    }

    /// Overwrites the time uniform with the host clock.
    pub fn on_frame(&self, clock_seconds: f32) {
        self.time.set(clock_seconds);
    }

    pub fn elapsed_time(&self) -> f32 {
        self.time.get()
    }
}

/// Decides when the host should request the next redraw.
///
/// Without a cap every display callback renders. With a cap, frames closer
/// together than `1 / max_fps` are not requested.
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    interval: Option<Duration>,
    last_rendered: Option<Instant>,
}

impl FrameScheduler {
    pub fn new(max_fps: Option<f32>) -> Self {
        let interval = max_fps
            .filter(|fps| fps.is_finite() && *fps > 0.0)
            .map(|fps| Duration::from_secs_f64(1.0 / f64::from(fps)));
        Self {
            interval,
            last_rendered: None,
        }
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    pub fn ready_for_frame(&self, now: Instant) -> bool {
        match (self.interval, self.last_rendered) {
            (Some(interval), Some(last)) => now.saturating_duration_since(last) >= interval,
            _ => true,
        }
    }

    /// Earliest instant at which the next frame may be requested.
    pub fn next_deadline(&self) -> Option<Instant> {
        let interval = self.interval?;
        self.last_rendered.map(|last| last + interval)
    }

    pub fn mark_rendered(&mut self) {
        self.mark_rendered_at(Instant::now());
    }

    pub fn mark_rendered_at(&mut self, now: Instant) {
        self.last_rendered = Some(now);
    }

    pub fn reset(&mut self) {
        self.last_rendered = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_overwrites_shared_time() {
        let binding = TimeBinding::new(0.0);
        let driver = FrameDriver::new(binding.clone());
        driver.on_frame(1.5);
        assert_eq!(binding.get(), 1.5);
        driver.on_frame(1.25);
        assert_eq!(driver.elapsed_time(), 1.25);
    }

    #[test]
    fn uncapped_scheduler_is_always_ready() {
        let mut scheduler = FrameScheduler::new(None);
        let now = Instant::now();
        scheduler.mark_rendered_at(now);
        assert!(scheduler.ready_for_frame(now));
        assert_eq!(scheduler.next_deadline(), None);
    }

    #[test]
    fn capped_scheduler_waits_for_interval() {
        let mut scheduler = FrameScheduler::new(Some(50.0));
        let start = Instant::now();
        assert!(scheduler.ready_for_frame(start));
        scheduler.mark_rendered_at(start);
        assert!(!scheduler.ready_for_frame(start + Duration::from_millis(10)));
        assert!(scheduler.ready_for_frame(start + Duration::from_millis(20)));
        assert_eq!(
            scheduler.next_deadline(),
            Some(start + Duration::from_millis(20))
        );
        scheduler.reset();
        assert!(scheduler.ready_for_frame(start));
    }

    #[test]
    fn non_positive_cap_is_uncapped() {
        assert_eq!(FrameScheduler::new(Some(0.0)).interval(), None);
        assert_eq!(FrameScheduler::new(Some(-5.0)).interval(), None);
        assert_eq!(FrameScheduler::new(Some(f32::NAN)).interval(), None);
    }
}
