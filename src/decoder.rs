//! Frame decoder: turns a captured frame into a validated wind sample

use tracing::debug;

use crate::core::{Direction, Speed};
use crate::error::{Result, WindError};
use crate::frame::{checksum, FrameFields, RawFrame};
use crate::tx20;

/// Consistency check a frame can fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFault {
    /// Start marker did not decode to 4
    StartMarker { found: u8 },
    /// The two direction copies disagree
    DirectionMismatch { primary: u8, copy: u8 },
    /// The two speed copies disagree
    SpeedMismatch { primary: u16, copy: u16 },
    /// Checksum field does not match direction and speed
    Checksum { expected: u8, found: u8 },
}

impl std::fmt::Display for FrameFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameFault::StartMarker { found } => {
                write!(f, "start marker {} (expected {})", found, tx20::START_MARKER)
            }
            FrameFault::DirectionMismatch { primary, copy } => {
                write!(f, "direction copies differ ({} vs {})", primary, copy)
            }
            FrameFault::SpeedMismatch { primary, copy } => {
                write!(f, "speed copies differ ({} vs {})", primary, copy)
            }
            FrameFault::Checksum { expected, found } => {
                write!(f, "checksum {:#x} (expected {:#x})", found, expected)
            }
        }
    }
}

/// A validated reading: direction bucket and speed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Reading {
    pub direction: Direction,
    pub speed: Speed,
}

/// Result of decoding one frame
///
/// Invalid samples carry no reading; their fields are zeroed and never
/// exposed through [`DecodedSample::reading`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedSample {
    reading: Option<Reading>,
}

impl DecodedSample {
    /// A sample that passed all checks
    pub fn valid(direction: Direction, speed: Speed) -> Self {
        DecodedSample {
            reading: Some(Reading { direction, speed }),
        }
    }

    /// A sample that failed a check
    pub fn invalid() -> Self {
        DecodedSample { reading: None }
    }

    pub fn is_valid(&self) -> bool {
        self.reading.is_some()
    }

    /// The reading, if the frame was valid
    pub fn reading(&self) -> Option<Reading> {
        self.reading
    }

    /// Direction code (0 for invalid samples)
    pub fn direction_code(&self) -> u8 {
        self.reading.map_or(0, |r| r.direction.code())
    }

    /// Speed in tenths of m/s (0 for invalid samples)
    pub fn speed_raw(&self) -> u16 {
        self.reading.map_or(0, |r| r.speed.tenths())
    }
}

impl From<Reading> for DecodedSample {
    fn from(reading: Reading) -> Self {
        DecodedSample {
            reading: Some(reading),
        }
    }
}

/// Stateless TX20 frame decoder
pub struct Decoder;

impl Decoder {
    /// Run the four consistency checks over extracted fields
    ///
    /// Checks run in a fixed order; the first failure is reported.
    pub fn check(fields: &FrameFields) -> std::result::Result<Reading, FrameFault> {
        if fields.start_marker != tx20::START_MARKER {
            return Err(FrameFault::StartMarker {
                found: fields.start_marker,
            });
        }

        if fields.direction_a != fields.direction_b {
            return Err(FrameFault::DirectionMismatch {
                primary: fields.direction_a,
                copy: fields.direction_b,
            });
        }

        if fields.speed_a != fields.speed_b {
            return Err(FrameFault::SpeedMismatch {
                primary: fields.speed_a,
                copy: fields.speed_b,
            });
        }

        let direction = Direction::from_nibble(fields.direction_a);
        let speed = Speed::from_field(fields.speed_a);
        let expected = checksum(direction, speed);
        if fields.checksum != expected {
            return Err(FrameFault::Checksum {
                expected,
                found: fields.checksum,
            });
        }

        Ok(Reading { direction, speed })
    }

    /// Decode a frame, reporting which check failed
    pub fn parse(frame: &RawFrame) -> Result<Reading> {
        match Self::check(&frame.fields()) {
            Ok(reading) => Ok(reading),
            Err(fault) => Err(WindError::frame_invalid(fault.to_string())),
        }
    }

    /// Decode a frame; total over every bit pattern
    pub fn decode(frame: &RawFrame) -> DecodedSample {
        match Self::check(&frame.fields()) {
            Ok(reading) => reading.into(),
            Err(fault) => {
                debug!(%frame, %fault, "rejected TX20 frame");
                DecodedSample::invalid()
            }
        }
    }
}
