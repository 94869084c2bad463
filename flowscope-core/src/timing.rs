use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{FlowscopeError, FlowscopeResult};

pub const MIN_SPEED: f64 = 0.5;
pub const MAX_SPEED: f64 = 3.0;
pub const SPEED_STEP: f64 = 0.25;
pub const DEFAULT_SPEED: f64 = 1.0;

/// Scales a nominal delay by the speed multiplier: `ms / speed`.
pub fn scale(ms: u64, speed: f64) -> Duration {
    if speed <= 0.0 || !speed.is_finite() {
        return Duration::from_millis(ms);
    }
    Duration::from_secs_f64(ms as f64 / speed / 1000.0)
}

/// Waits `ms / speed` milliseconds.
pub async fn scaled_delay(ms: u64, speed: f64) {
    tokio::time::sleep(scale(ms, speed)).await;
}

/// Shared speed multiplier for one pattern instance.
///
/// Cloning shares the value: every delay reads it fresh, so a change applies
/// to the next delay and never to one already in flight.
#[derive(Debug, Clone)]
pub struct SpeedControl {
    bits: Arc<AtomicU64>,
}

impl SpeedControl {
    pub fn new(speed: f64) -> FlowscopeResult<Self> {
        let control = Self::default();
        control.set(speed)?;
        Ok(control)
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }

    /// Sets the multiplier, snapped to the nearest 0.25 step.
    pub fn set(&self, speed: f64) -> FlowscopeResult<()> {
        if !speed.is_finite() || speed < MIN_SPEED || speed > MAX_SPEED {
            return Err(FlowscopeError::InvalidSpeed(speed));
        }
        let snapped = (speed / SPEED_STEP).round() * SPEED_STEP;
        self.bits
            .store(snapped.clamp(MIN_SPEED, MAX_SPEED).to_bits(), Ordering::SeqCst);
        Ok(())
    }

    pub fn faster(&self) -> f64 {
        let next = (self.get() + SPEED_STEP).min(MAX_SPEED);
        self.bits.store(next.to_bits(), Ordering::SeqCst);
        next
    }

    pub fn slower(&self) -> f64 {
        let next = (self.get() - SPEED_STEP).max(MIN_SPEED);
        self.bits.store(next.to_bits(), Ordering::SeqCst);
        next
    }

    pub fn label(&self) -> String {
        format!("{:.2}x", self.get())
    }
}

impl Default for SpeedControl {
    fn default() -> Self {
        Self {
            bits: Arc::new(AtomicU64::new(DEFAULT_SPEED.to_bits())),
        }
    }
}

/// The delay function handed to every step action.
#[derive(Debug, Clone, Default)]
pub struct Pacer {
    speed: SpeedControl,
    instant: bool,
}

impl Pacer {
    pub fn new(speed: SpeedControl) -> Self {
        Self {
            speed,
            instant: false,
        }
    }

    /// A pacer that never sleeps. Used for headless runs.
    pub fn instant() -> Self {
        Self {
            speed: SpeedControl::default(),
            instant: true,
        }
    }

    pub fn speed(&self) -> &SpeedControl {
        &self.speed
    }

    pub fn is_instant(&self) -> bool {
        self.instant
    }

    pub fn scaled(&self, ms: u64) -> Duration {
        if self.instant {
            Duration::ZERO
        } else {
            scale(ms, self.speed.get())
        }
    }

    pub async fn delay(&self, ms: u64) {
        if self.instant {
            return;
        }
        scaled_delay(ms, self.speed.get()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[test]
    fn test_scale() {
        assert_eq!(scale(1000, 2.0), Duration::from_millis(500));
        assert_eq!(scale(1000, 0.5), Duration::from_millis(2000));
        assert_eq!(scale(1000, 1.0), Duration::from_millis(1000));
        assert_eq!(scale(1000, 0.0), Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scaled_delay_double_speed() {
        let start = Instant::now();
        scaled_delay(1000, 2.0).await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(500));
        assert!(elapsed < Duration::from_millis(510));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scaled_delay_half_speed() {
        let start = Instant::now();
        scaled_delay(1000, 0.5).await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(2000));
        assert!(elapsed < Duration::from_millis(2010));
    }

    #[test]
    fn test_speed_control_range() {
        let speed = SpeedControl::default();
        assert_eq!(speed.get(), 1.0);

        assert!(speed.set(2.5).is_ok());
        assert_eq!(speed.get(), 2.5);

        assert!(speed.set(0.25).is_err());
        assert!(speed.set(3.5).is_err());
        assert!(speed.set(f64::NAN).is_err());
        assert_eq!(speed.get(), 2.5);
    }

    #[test]
    fn test_speed_control_snaps_to_step() {
        let speed = SpeedControl::new(1.1).unwrap();
        assert_eq!(speed.get(), 1.0);

        speed.set(1.2).unwrap();
        assert_eq!(speed.get(), 1.25);
    }

    #[test]
    fn test_speed_control_stepping() {
        let speed = SpeedControl::new(2.75).unwrap();
        assert_eq!(speed.faster(), 3.0);
        assert_eq!(speed.faster(), 3.0);

        let speed = SpeedControl::new(0.75).unwrap();
        assert_eq!(speed.slower(), 0.5);
        assert_eq!(speed.slower(), 0.5);
        assert_eq!(speed.label(), "0.50x");
    }

    #[test]
    fn test_clones_share_speed() {
        let speed = SpeedControl::default();
        let pacer = Pacer::new(speed.clone());

        speed.set(2.0).unwrap();
        assert_eq!(pacer.scaled(1000), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_instant_pacer_does_not_sleep() {
        let pacer = Pacer::instant();
        let start = Instant::now();
        pacer.delay(5000).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(pacer.scaled(5000), Duration::ZERO);
    }
}
