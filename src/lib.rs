//! # TX20 Anemometer Decoder
//!
//! Decoding and windowed aggregation for the La Crosse TX20 single-wire
//! anemometer protocol.
//!
//! The TX20 transmits a self-clocked 41-bit frame on a single data line,
//! starting with a rising edge. This library provides:
//!
//! - Edge-triggered, fixed-cadence frame capture
//! - Frame decoding with start-marker, redundancy and checksum validation
//! - Windowed wind statistics (mean, gust, minimum, dominant direction)
//! - A main-loop driver handing completed windows to a publisher
//!
//! ## Features
//!
//! - `serde`: Enable serialization/deserialization support and JSON configuration
//!
//! ## Example
//!
//! ```
//! use tx20_wind::{Decoder, Direction, FrameEncoder, Speed};
//!
//! let frame = FrameEncoder::encode(Direction::new(4)?, Speed::new(123)?);
//! let sample = Decoder::decode(&frame);
//! assert!(sample.is_valid());
//! assert_eq!(sample.speed_raw(), 123);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod aggregator;
pub mod config;
pub mod core;
pub mod decoder;
pub mod error;
pub mod frame;
pub mod sampler;
pub mod station;

pub use self::core::{Direction, Speed};
pub use aggregator::{AggregationWindow, Aggregator, AggregatorState, WindowStatistics};
pub use config::{StationConfig, StationConfigBuilder};
pub use decoder::{DecodedSample, Decoder, FrameFault, Reading};
pub use error::{Result, WindError};
pub use frame::{FrameEncoder, FrameFields, RawFrame};
pub use sampler::{DataReady, DelayUs, Sampler, SignalLine, SpinDelay};
pub use station::{Publisher, Station, StationStats};

/// TX20 protocol constants
pub mod tx20 {
    /// Bits per frame
    pub const FRAME_BITS: usize = 41;

    /// Sensor bit period in microseconds
    pub const BIT_PERIOD_US: u32 = 1220;

    /// Guard delay after the last bit of a frame, in microseconds
    pub const SETTLE_DELAY_US: u32 = 2000;

    /// Value of the start marker field in a valid frame
    pub const START_MARKER: u8 = 4;

    /// Number of direction buckets
    pub const DIRECTION_COUNT: usize = 16;

    /// Angular width of one direction bucket
    pub const DEGREES_PER_BUCKET: f32 = 22.5;

    /// Raw speed units per m/s
    pub const TENTHS_PER_MPS: f32 = 10.0;
}
