//! Core value types for the TX20 protocol

use crate::error::{Result, WindError};
use crate::tx20;

/// 16-point compass labels, indexed by direction code
const COMPASS_POINTS: [&str; tx20::DIRECTION_COUNT] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// Wind direction bucket (0-15), each bucket spanning 22.5 degrees clockwise from north
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Direction(u8);

impl Direction {
    /// Largest direction code (NNW)
    pub const MAX: u8 = 15;

    /// Create a new direction, validating it's within range [0, 15]
    pub fn new(code: u8) -> Result<Self> {
        if code > Self::MAX {
            return Err(WindError::invalid_direction(format!(
                "Direction code {} out of range [0, {}]",
                code,
                Self::MAX
            )));
        }
        Ok(Direction(code))
    }

    /// Build a direction from the low nibble of a decoded field
    pub(crate) fn from_nibble(nibble: u8) -> Self {
        Direction(nibble & 0x0F)
    }

    /// Get the raw direction code
    pub fn code(&self) -> u8 {
        self.0
    }

    /// Bucket index converted to degrees
    pub fn degrees(&self) -> f32 {
        f32::from(self.0) * tx20::DEGREES_PER_BUCKET
    }

    /// 16-point compass label ("N", "NNE", ...)
    pub fn compass_point(&self) -> &'static str {
        COMPASS_POINTS[usize::from(self.0)]
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:.1}°)", self.compass_point(), self.degrees())
    }
}

/// Wind speed in tenths of a metre per second, as carried by the 12-bit speed field
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Speed(u16);

impl Speed {
    /// Largest value the 12-bit field can carry
    pub const MAX: u16 = 0x0FFF;

    /// Create a new speed, validating it fits the 12-bit field
    pub fn new(tenths: u16) -> Result<Self> {
        if tenths > Self::MAX {
            return Err(WindError::invalid_speed(format!(
                "Speed {} exceeds 12-bit maximum {}",
                tenths,
                Self::MAX
            )));
        }
        Ok(Speed(tenths))
    }

    /// Build a speed from the low 12 bits of a decoded field
    pub(crate) fn from_field(raw: u16) -> Self {
        Speed(raw & Self::MAX)
    }

    /// Raw value in tenths of m/s
    pub fn tenths(&self) -> u16 {
        self.0
    }

    /// Speed in m/s
    pub fn meters_per_second(&self) -> f32 {
        f32::from(self.0) / tx20::TENTHS_PER_MPS
    }

    /// The three 4-bit groups of the speed field, least significant first
    pub fn nibbles(&self) -> [u8; 3] {
        [
            (self.0 & 0xF) as u8,
            ((self.0 >> 4) & 0xF) as u8,
            ((self.0 >> 8) & 0xF) as u8,
        ]
    }
}

impl std::fmt::Display for Speed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1} m/s", self.meters_per_second())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_creation() {
        assert!(Direction::new(0).is_ok());
        assert!(Direction::new(15).is_ok());
        assert!(Direction::new(16).is_err());
    }

    #[test]
    fn test_direction_degrees() -> Result<()> {
        assert_eq!(Direction::new(0)?.degrees(), 0.0);
        assert_eq!(Direction::new(4)?.degrees(), 90.0);
        assert_eq!(Direction::new(15)?.degrees(), 337.5);
        Ok(())
    }

    #[test]
    fn test_compass_points() -> Result<()> {
        assert_eq!(Direction::new(0)?.compass_point(), "N");
        assert_eq!(Direction::new(8)?.compass_point(), "S");
        assert_eq!(Direction::new(11)?.compass_point(), "WSW");
        assert_eq!(Direction::new(15)?.compass_point(), "NNW");
        Ok(())
    }

    #[test]
    fn test_speed_creation() {
        assert!(Speed::new(0).is_ok());
        assert!(Speed::new(4095).is_ok());
        assert!(Speed::new(4096).is_err());
    }

    #[test]
    fn test_speed_conversion() -> Result<()> {
        let speed = Speed::new(123)?;
        assert!((speed.meters_per_second() - 12.3).abs() < 1e-4);
        assert_eq!(speed.to_string(), "12.3 m/s");
        Ok(())
    }

    #[test]
    fn test_speed_nibbles() -> Result<()> {
        assert_eq!(Speed::new(0xABC)?.nibbles(), [0xC, 0xB, 0xA]);
        Ok(())
    }

    #[test]
    fn test_direction_display() -> Result<()> {
        assert_eq!(Direction::new(2)?.to_string(), "NE (45.0°)");
        Ok(())
    }
}
