//! Windowed wind statistics over successive valid samples

use tracing::{debug, info};

use crate::config::StationConfig;
use crate::core::{Direction, Speed};
use crate::decoder::{DecodedSample, Reading};
use crate::error::{Result, WindError};
use crate::tx20;

/// Running accumulators for one publication window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationWindow {
    sample_count: u32,
    speed_sum: u64,
    speed_min: u16,
    speed_max: u16,
    direction_histogram: [u32; tx20::DIRECTION_COUNT],
    valid_direction_count: u32,
}

impl AggregationWindow {
    /// Seed for the running minimum; any 12-bit speed is below it
    pub const SPEED_MIN_SENTINEL: u16 = u16::MAX;

    /// An empty window
    pub fn new() -> Self {
        AggregationWindow {
            sample_count: 0,
            speed_sum: 0,
            speed_min: Self::SPEED_MIN_SENTINEL,
            speed_max: 0,
            direction_histogram: [0; tx20::DIRECTION_COUNT],
            valid_direction_count: 0,
        }
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Sum of accepted speeds in tenths of m/s
    pub fn speed_sum(&self) -> u64 {
        self.speed_sum
    }

    pub fn speed_min(&self) -> u16 {
        self.speed_min
    }

    pub fn speed_max(&self) -> u16 {
        self.speed_max
    }

    pub fn direction_histogram(&self) -> &[u32; tx20::DIRECTION_COUNT] {
        &self.direction_histogram
    }

    /// Samples fast enough for their direction to count
    pub fn valid_direction_count(&self) -> u32 {
        self.valid_direction_count
    }

    pub fn is_empty(&self) -> bool {
        self.sample_count == 0
    }

    /// Fold one reading into the window
    ///
    /// Readings at or below `wind_min` update the speed figures only.
    pub fn record(&mut self, reading: Reading, wind_min: u16) {
        let speed = reading.speed.tenths();
        self.speed_sum += u64::from(speed);
        self.speed_max = self.speed_max.max(speed);
        self.speed_min = self.speed_min.min(speed);

        if speed > wind_min {
            self.direction_histogram[usize::from(reading.direction.code())] += 1;
            self.valid_direction_count += 1;
        }

        self.sample_count += 1;
    }

    /// Most frequent direction bucket; the lowest index wins ties
    pub fn dominant_direction(&self) -> Option<Direction> {
        if self.valid_direction_count == 0 {
            return None;
        }

        let mut best = 0;
        for (index, &count) in self.direction_histogram.iter().enumerate() {
            if count > self.direction_histogram[best] {
                best = index;
            }
        }
        Some(Direction::from_nibble(best as u8))
    }

    /// Compute the window's statistics
    pub fn statistics(&self) -> Result<WindowStatistics> {
        if self.is_empty() {
            return Err(WindError::empty_window("no samples accumulated"));
        }

        let count = self.sample_count as f32;
        Ok(WindowStatistics {
            sample_count: self.sample_count,
            mean_speed: self.speed_sum as f32 / count / tx20::TENTHS_PER_MPS,
            max_speed: Speed::from_field(self.speed_max).meters_per_second(),
            min_speed: Speed::from_field(self.speed_min).meters_per_second(),
            dominant_direction: self.dominant_direction(),
        })
    }
}

impl Default for AggregationWindow {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics published at the end of a window
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WindowStatistics {
    /// Samples the window held
    pub sample_count: u32,
    /// Mean speed in m/s
    pub mean_speed: f32,
    /// Gust: highest speed in m/s
    pub max_speed: f32,
    /// Lowest speed in m/s
    pub min_speed: f32,
    /// Most frequent direction, absent when every sample was calm
    pub dominant_direction: Option<Direction>,
}

impl WindowStatistics {
    pub fn gust(&self) -> f32 {
        self.max_speed
    }

    pub fn dominant_direction_degrees(&self) -> Option<f32> {
        self.dominant_direction.map(|d| d.degrees())
    }

    pub fn dominant_compass_point(&self) -> Option<&'static str> {
        self.dominant_direction.map(|d| d.compass_point())
    }
}

impl std::fmt::Display for WindowStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "mean={:.2} m/s gust={:.1} m/s min={:.1} m/s",
            self.mean_speed, self.max_speed, self.min_speed
        )?;
        match self.dominant_direction {
            Some(direction) => write!(f, " dir={}", direction),
            None => write!(f, " dir=calm"),
        }
    }
}

/// Aggregator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregatorState {
    /// Window not yet full
    Accumulating,
    /// Window full, statistics due
    Flushing,
}

/// Accumulates valid samples and flushes statistics every `window_size` samples
#[derive(Debug, Clone)]
pub struct Aggregator {
    window: AggregationWindow,
    window_size: u32,
    wind_min: u16,
}

impl Aggregator {
    /// Create an aggregator; `window_size` must be at least 1
    pub fn new(window_size: u32, wind_min: u16) -> Result<Self> {
        if window_size == 0 {
            return Err(WindError::invalid_config(
                "window_size must be at least 1".to_string(),
            ));
        }

        Ok(Aggregator {
            window: AggregationWindow::new(),
            window_size,
            wind_min,
        })
    }

    pub fn from_config(config: &StationConfig) -> Result<Self> {
        config.validate()?;
        Self::new(config.window_size, config.wind_min)
    }

    pub fn state(&self) -> AggregatorState {
        if self.window.sample_count() >= self.window_size {
            AggregatorState::Flushing
        } else {
            AggregatorState::Accumulating
        }
    }

    /// The window being accumulated
    pub fn window(&self) -> &AggregationWindow {
        &self.window
    }

    pub fn window_size(&self) -> u32 {
        self.window_size
    }

    /// Feed one decoded sample; returns the window statistics when it completes a window
    ///
    /// Invalid samples are ignored.
    pub fn accept(&mut self, sample: DecodedSample) -> Result<Option<WindowStatistics>> {
        let Some(reading) = sample.reading() else {
            return Ok(None);
        };

        self.window.record(reading, self.wind_min);
        debug!(
            direction = reading.direction.code(),
            speed = reading.speed.tenths(),
            count = self.window.sample_count(),
            "accepted TX20 sample"
        );

        match self.state() {
            AggregatorState::Accumulating => Ok(None),
            AggregatorState::Flushing => {
                debug_assert!(!self.window.is_empty());
                self.flush().map(Some)
            }
        }
    }

    /// Compute the statistics of the current window and start a new one
    ///
    /// Fails on an empty window; the window is left untouched in that case.
    pub fn flush(&mut self) -> Result<WindowStatistics> {
        let stats = self.window.statistics()?;
        self.window = AggregationWindow::new();
        info!(
            samples = stats.sample_count,
            mean = stats.mean_speed,
            gust = stats.max_speed,
            min = stats.min_speed,
            direction = ?stats.dominant_direction_degrees(),
            "wind window complete"
        );
        Ok(stats)
    }
}
