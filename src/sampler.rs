//! Frame sampler: edge-triggered, fixed-cadence capture of the data line
//!
//! The edge event source only raises a [`DataReady`] flag. The main loop
//! notices the flag, samples the line 41 times at the sensor's bit period,
//! and clears the flag once the capture has settled. A trigger arriving
//! while the flag is raised is dropped, so at most one frame is in flight.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::{Duration, Instant};

use tracing::trace;

use crate::config::StationConfig;
use crate::error::{Result, WindError};
use crate::frame::RawFrame;
use crate::tx20;

/// Synchronous read of the data line level
pub trait SignalLine {
    /// `true` when the line is high
    fn is_high(&mut self) -> bool;
}

impl<F: FnMut() -> bool> SignalLine for F {
    fn is_high(&mut self) -> bool {
        self()
    }
}

/// Blocking microsecond delay
pub trait DelayUs {
    fn delay_us(&mut self, us: u32);
}

/// Busy-wait delay on the monotonic clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SpinDelay;

impl DelayUs for SpinDelay {
    fn delay_us(&mut self, us: u32) {
        let deadline = Instant::now() + Duration::from_micros(u64::from(us));
        while Instant::now() < deadline {
            std::hint::spin_loop();
        }
    }
}

/// Single-slot handoff between the edge event source and the main loop
#[derive(Debug, Default)]
pub struct DataReady {
    pending: AtomicBool,
    dropped: AtomicU32,
}

impl DataReady {
    pub const fn new() -> Self {
        DataReady {
            pending: AtomicBool::new(false),
            dropped: AtomicU32::new(0),
        }
    }

    /// Edge event entry point; a trigger while a capture is pending is dropped
    pub fn signal(&self) {
        if self.try_signal().is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Raise the flag, failing if a capture is already pending
    pub fn try_signal(&self) -> Result<()> {
        if self.pending.swap(true, Ordering::AcqRel) {
            return Err(WindError::capture_busy("frame capture already in progress"));
        }
        Ok(())
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Release the slot so the next edge can trigger a capture
    pub fn clear(&self) {
        self.pending.store(false, Ordering::Release);
    }

    /// Triggers dropped because a capture was in flight
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Samples one frame from the data line at a fixed cadence
pub struct Sampler<L, D> {
    line: L,
    delay: D,
    bit_period_us: u32,
    settle_delay_us: u32,
}

impl<L: SignalLine, D: DelayUs> Sampler<L, D> {
    /// Create a sampler with the sensor's default timing
    pub fn new(line: L, delay: D) -> Self {
        Sampler {
            line,
            delay,
            bit_period_us: tx20::BIT_PERIOD_US,
            settle_delay_us: tx20::SETTLE_DELAY_US,
        }
    }

    /// Create a sampler with the timing of a station configuration
    pub fn with_config(line: L, delay: D, config: &StationConfig) -> Self {
        Sampler {
            line,
            delay,
            bit_period_us: config.bit_period_us,
            settle_delay_us: config.settle_delay_us,
        }
    }

    /// Capture one frame if a trigger is pending, then release the trigger
    pub fn poll(&mut self, ready: &DataReady) -> Option<RawFrame> {
        if !ready.is_pending() {
            return None;
        }

        let frame = self.capture();
        ready.clear();
        Some(frame)
    }

    /// Sample the line 41 times, one bit period apart, then wait for the line to settle
    ///
    /// Blocks for the whole capture (about 50 ms at the default cadence).
    pub fn capture(&mut self) -> RawFrame {
        let mut levels = 0u64;
        for bit in 0..tx20::FRAME_BITS {
            if self.line.is_high() {
                levels |= 1u64 << bit;
            }
            self.delay.delay_us(self.bit_period_us);
        }
        self.delay.delay_us(self.settle_delay_us);

        let frame = RawFrame::from_bits(levels);
        trace!(%frame, "captured TX20 frame");
        frame
    }

    pub fn bit_period_us(&self) -> u32 {
        self.bit_period_us
    }

    /// Release the line and delay
    pub fn into_parts(self) -> (L, D) {
        (self.line, self.delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Direction, Speed};
    use crate::frame::FrameEncoder;

    #[derive(Default)]
    struct RecordingDelay {
        calls: Vec<u32>,
    }

    impl DelayUs for RecordingDelay {
        fn delay_us(&mut self, us: u32) {
            self.calls.push(us);
        }
    }

    #[test]
    fn test_data_ready_drops_second_trigger() {
        let ready = DataReady::new();
        ready.signal();
        assert!(ready.is_pending());

        ready.signal();
        assert_eq!(ready.dropped(), 1);
        assert!(matches!(ready.try_signal(), Err(WindError::CaptureBusy(_))));

        ready.clear();
        assert!(!ready.is_pending());
        assert!(ready.try_signal().is_ok());
    }

    #[test]
    fn test_capture_timing() {
        let mut sampler = Sampler::new(|| false, RecordingDelay::default());
        sampler.capture();
        let (_, delay) = sampler.into_parts();

        assert_eq!(delay.calls.len(), tx20::FRAME_BITS + 1);
        assert!(delay.calls[..tx20::FRAME_BITS]
            .iter()
            .all(|&us| us == tx20::BIT_PERIOD_US));
        assert_eq!(delay.calls[tx20::FRAME_BITS], tx20::SETTLE_DELAY_US);
    }

    #[test]
    fn test_capture_reads_levels_in_order() -> Result<()> {
        let expected = FrameEncoder::encode(Direction::new(5)?, Speed::new(88)?);
        let mut levels = expected.levels().collect::<Vec<_>>().into_iter();
        let mut sampler = Sampler::new(
            move || levels.next().unwrap_or(false),
            RecordingDelay::default(),
        );

        assert_eq!(sampler.capture(), expected);
        Ok(())
    }

    #[test]
    fn test_poll_requires_trigger() {
        let ready = DataReady::new();
        let mut sampler = Sampler::new(|| true, RecordingDelay::default());
        assert!(sampler.poll(&ready).is_none());

        ready.signal();
        let frame = sampler.poll(&ready);
        assert_eq!(frame.map(|f| f.bits()), Some(RawFrame::MASK));
        assert!(!ready.is_pending());
    }

    #[test]
    fn test_with_config_timing() -> Result<()> {
        let config = StationConfig::builder().with_bit_period_us(1000).build()?;
        let sampler = Sampler::with_config(|| true, RecordingDelay::default(), &config);
        assert_eq!(sampler.bit_period_us(), 1000);
        Ok(())
    }

    #[test]
    fn test_spin_delay_waits() {
        let start = Instant::now();
        SpinDelay.delay_us(200);
        assert!(start.elapsed() >= Duration::from_micros(200));
    }
}
