//! Main-loop driver: trigger → sampler → decoder → aggregator → publisher

use std::sync::Arc;

use tracing::debug;

use crate::aggregator::{Aggregator, WindowStatistics};
use crate::config::StationConfig;
use crate::decoder::Decoder;
use crate::error::Result;
use crate::sampler::{DataReady, DelayUs, Sampler, SignalLine};

/// Sink for completed windows
///
/// Transport, retries and formatting belong to the implementor; the station
/// hands each window over once and does not look back.
pub trait Publisher {
    fn publish(&mut self, stats: &WindowStatistics);
}

impl Publisher for Vec<WindowStatistics> {
    fn publish(&mut self, stats: &WindowStatistics) {
        self.push(*stats);
    }
}

impl<P: Publisher + ?Sized> Publisher for &mut P {
    fn publish(&mut self, stats: &WindowStatistics) {
        (**self).publish(stats);
    }
}

/// Counters kept by a station since construction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StationStats {
    pub frames_captured: u64,
    pub frames_valid: u64,
    pub frames_invalid: u64,
    pub triggers_dropped: u32,
    pub windows_published: u64,
}

impl StationStats {
    /// Share of captured frames that failed validation (0.0 to 1.0)
    pub fn invalid_rate(&self) -> f32 {
        if self.frames_captured == 0 {
            0.0
        } else {
            self.frames_invalid as f32 / self.frames_captured as f32
        }
    }
}

/// A TX20 weather station loop
pub struct Station<L, D, P> {
    sampler: Sampler<L, D>,
    aggregator: Aggregator,
    publisher: P,
    ready: Arc<DataReady>,
    stats: StationStats,
    data_pin: u8,
}

impl<L: SignalLine, D: DelayUs, P: Publisher> Station<L, D, P> {
    /// Create a station from a validated configuration
    pub fn new(config: &StationConfig, line: L, delay: D, publisher: P) -> Result<Self> {
        let aggregator = Aggregator::from_config(config)?;
        debug!(
            pin = config.data_pin,
            window = config.window_size,
            wind_min = config.wind_min,
            "TX20 station ready"
        );

        Ok(Station {
            sampler: Sampler::with_config(line, delay, config),
            aggregator,
            publisher,
            ready: Arc::new(DataReady::new()),
            stats: StationStats::default(),
            data_pin: config.data_pin,
        })
    }

    /// Flag to hand to the rising-edge event source
    pub fn data_ready(&self) -> Arc<DataReady> {
        Arc::clone(&self.ready)
    }

    /// Run one loop iteration
    ///
    /// Captures and decodes a frame when a trigger is pending, and publishes
    /// the window statistics when the frame completes a window.
    pub fn poll(&mut self) -> Result<Option<WindowStatistics>> {
        let Some(frame) = self.sampler.poll(&self.ready) else {
            return Ok(None);
        };
        self.stats.frames_captured += 1;

        let dropped = self.ready.dropped();
        if dropped > self.stats.triggers_dropped {
            debug!(
                dropped = dropped - self.stats.triggers_dropped,
                "triggers dropped during capture"
            );
            self.stats.triggers_dropped = dropped;
        }

        let sample = Decoder::decode(&frame);
        if sample.is_valid() {
            self.stats.frames_valid += 1;
        } else {
            self.stats.frames_invalid += 1;
        }

        let published = self.aggregator.accept(sample)?;
        if let Some(stats) = &published {
            self.publisher.publish(stats);
            self.stats.windows_published += 1;
        }
        Ok(published)
    }

    /// Poll until `stop` returns true
    pub fn run(&mut self, mut stop: impl FnMut(&StationStats) -> bool) -> Result<()> {
        while !stop(&self.stats) {
            if self.poll()?.is_none() && !self.ready.is_pending() {
                std::hint::spin_loop();
            }
        }
        Ok(())
    }

    pub fn stats(&self) -> StationStats {
        self.stats
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn data_pin(&self) -> u8 {
        self.data_pin
    }

    /// Tear down the station, returning the publisher
    pub fn into_publisher(self) -> P {
        self.publisher
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Direction, Speed};
    use crate::frame::{FrameEncoder, RawFrame};
    use std::collections::VecDeque;
    use std::sync::OnceLock;

    struct NoDelay;

    impl DelayUs for NoDelay {
        fn delay_us(&mut self, _us: u32) {}
    }

    type TestStation<L> = Station<L, NoDelay, Vec<WindowStatistics>>;

    fn line_for(frames: &[RawFrame]) -> impl FnMut() -> bool {
        let mut levels: VecDeque<bool> = frames.iter().flat_map(|f| f.levels()).collect();
        move || levels.pop_front().unwrap_or(false)
    }

    fn station_for(
        config: &StationConfig,
        frames: &[RawFrame],
    ) -> Result<TestStation<impl FnMut() -> bool>> {
        Station::new(config, line_for(frames), NoDelay, Vec::new())
    }

    #[test]
    fn test_poll_without_trigger() -> Result<()> {
        let config = StationConfig::builder().with_window_size(1).build()?;
        let mut station: TestStation<_> = Station::new(&config, || true, NoDelay, Vec::new())?;
        assert_eq!(station.poll()?, None);
        assert_eq!(station.stats().frames_captured, 0);
        Ok(())
    }

    #[test]
    fn test_publishes_each_window() -> Result<()> {
        let frames = [
            FrameEncoder::encode(Direction::new(4)?, Speed::new(30)?),
            FrameEncoder::encode(Direction::new(4)?, Speed::new(50)?),
        ];
        let config = StationConfig::builder().with_window_size(2).build()?;
        let mut station = station_for(&config, &frames)?;
        let ready = station.data_ready();

        ready.signal();
        assert_eq!(station.poll()?, None);
        ready.signal();
        let stats = station.poll()?;

        assert!(stats.is_some());
        assert_eq!(station.publisher().len(), 1);
        assert_eq!(station.publisher()[0].dominant_direction_degrees(), Some(90.0));
        assert_eq!(station.stats().windows_published, 1);
        Ok(())
    }

    #[test]
    fn test_counts_invalid_frames() -> Result<()> {
        let frames = [RawFrame::from_bits(0)];
        let config = StationConfig::builder().with_window_size(1).build()?;
        let mut station = station_for(&config, &frames)?;

        station.data_ready().signal();
        assert_eq!(station.poll()?, None);

        let stats = station.stats();
        assert_eq!(stats.frames_captured, 1);
        assert_eq!(stats.frames_invalid, 1);
        assert_eq!(stats.invalid_rate(), 1.0);
        assert!(station.publisher().is_empty());
        Ok(())
    }

    #[test]
    fn test_run_until_windows_published() -> Result<()> {
        let frame = FrameEncoder::encode(Direction::new(1)?, Speed::new(25)?);
        let config = StationConfig::builder().with_window_size(1).build()?;
        let mut station = station_for(&config, &[frame, frame, frame])?;
        let ready = station.data_ready();

        station.run(|stats| {
            if stats.windows_published >= 3 {
                return true;
            }
            ready.signal();
            false
        })?;

        assert_eq!(station.into_publisher().len(), 3);
        Ok(())
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = StationConfig {
            window_size: 0,
            ..StationConfig::default()
        };
        let station: Result<TestStation<_>> = Station::new(&config, || true, NoDelay, Vec::new());
        assert!(station.is_err());
    }

    #[test]
    fn test_counts_triggers_dropped_during_capture() -> Result<()> {
        let frame = FrameEncoder::encode(Direction::new(7)?, Speed::new(64)?);
        let mut levels: VecDeque<bool> = frame.levels().collect();

        // the line raises another edge on every read of the capture
        let slot: Arc<OnceLock<Arc<DataReady>>> = Arc::new(OnceLock::new());
        let edge = Arc::clone(&slot);
        let line = move || {
            if let Some(ready) = edge.get() {
                ready.signal();
            }
            levels.pop_front().unwrap_or(false)
        };

        let config = StationConfig::builder().with_window_size(2).build()?;
        let mut station: TestStation<_> = Station::new(&config, line, NoDelay, Vec::new())?;
        let ready = station.data_ready();
        let _ = slot.set(Arc::clone(&ready));

        ready.signal();
        assert_eq!(station.poll()?, None);
        assert_eq!(station.stats().frames_valid, 1);
        assert_eq!(station.stats().triggers_dropped, 41);
        assert!(!ready.is_pending());

        // nothing pending: the counter holds
        assert_eq!(station.poll()?, None);
        assert_eq!(station.stats().triggers_dropped, 41);
        Ok(())
    }

    #[test]
    fn test_reports_configured_data_pin() -> Result<()> {
        let config = StationConfig::builder().with_data_pin(4).build()?;
        let station = station_for(&config, &[])?;
        assert_eq!(station.data_pin(), 4);

        let station = station_for(&StationConfig::default(), &[])?;
        assert_eq!(station.data_pin(), StationConfig::DEFAULT_DATA_PIN);
        Ok(())
    }
}
