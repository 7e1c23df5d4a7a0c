//! Station configuration

use crate::core::Speed;
use crate::error::{Result, WindError};
use crate::tx20;

/// Configuration constants supplied to the station
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StationConfig {
    /// Accepted samples per publication window
    pub window_size: u32,
    /// Minimum speed (tenths of m/s) above which a direction reading counts
    pub wind_min: u16,
    /// Identity of the pin the data line is wired to
    pub data_pin: u8,
    /// Delay between two line samples
    pub bit_period_us: u32,
    /// Guard delay after the last bit of a frame
    pub settle_delay_us: u32,
}

impl StationConfig {
    /// Samples per window used by the reference station
    pub const DEFAULT_WINDOW_SIZE: u32 = 60;
    /// Calm-wind threshold used by the reference station (1 m/s)
    pub const DEFAULT_WIND_MIN: u16 = 10;
    /// GPIO13 (D7 on the reference board)
    pub const DEFAULT_DATA_PIN: u8 = 13;

    pub fn builder() -> StationConfigBuilder {
        StationConfigBuilder::new()
    }

    /// Check the configuration can drive a station
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(WindError::invalid_config(
                "window_size must be at least 1".to_string(),
            ));
        }

        if self.bit_period_us == 0 {
            return Err(WindError::invalid_config(
                "bit_period_us must be non-zero".to_string(),
            ));
        }

        if self.wind_min > Speed::MAX {
            return Err(WindError::invalid_config(format!(
                "wind_min {} exceeds 12-bit speed maximum {}",
                self.wind_min,
                Speed::MAX
            )));
        }

        Ok(())
    }

    /// Parse and validate a JSON configuration; missing keys take their defaults
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self> {
        let config: StationConfig = serde_json::from_str(json)
            .map_err(|e| WindError::config_parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for StationConfig {
    fn default() -> Self {
        StationConfig {
            window_size: Self::DEFAULT_WINDOW_SIZE,
            wind_min: Self::DEFAULT_WIND_MIN,
            data_pin: Self::DEFAULT_DATA_PIN,
            bit_period_us: tx20::BIT_PERIOD_US,
            settle_delay_us: tx20::SETTLE_DELAY_US,
        }
    }
}

/// Builder for [`StationConfig`]
pub struct StationConfigBuilder {
    config: StationConfig,
}

impl StationConfigBuilder {
    /// Create a new builder holding the default configuration
    pub fn new() -> Self {
        StationConfigBuilder {
            config: StationConfig::default(),
        }
    }

    /// Set the number of samples per window
    pub fn with_window_size(mut self, window_size: u32) -> Self {
        self.config.window_size = window_size;
        self
    }

    /// Set the calm-wind threshold in tenths of m/s
    pub fn with_wind_min(mut self, wind_min: u16) -> Self {
        self.config.wind_min = wind_min;
        self
    }

    pub fn with_data_pin(mut self, data_pin: u8) -> Self {
        self.config.data_pin = data_pin;
        self
    }

    pub fn with_bit_period_us(mut self, bit_period_us: u32) -> Self {
        self.config.bit_period_us = bit_period_us;
        self
    }

    pub fn with_settle_delay_us(mut self, settle_delay_us: u32) -> Self {
        self.config.settle_delay_us = settle_delay_us;
        self
    }

    /// Validate and build the configuration
    pub fn build(self) -> Result<StationConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for StationConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() -> Result<()> {
        let config = StationConfig::default();
        assert_eq!(config.window_size, 60);
        assert_eq!(config.wind_min, 10);
        assert_eq!(config.bit_period_us, 1220);
        assert_eq!(config.settle_delay_us, 2000);
        config.validate()
    }

    #[test]
    fn test_builder() -> Result<()> {
        let config = StationConfig::builder()
            .with_window_size(3)
            .with_wind_min(25)
            .with_data_pin(4)
            .build()?;
        assert_eq!(config.window_size, 3);
        assert_eq!(config.wind_min, 25);
        assert_eq!(config.data_pin, 4);
        Ok(())
    }

    #[test]
    fn test_rejects_empty_window() {
        let result = StationConfig::builder().with_window_size(0).build();
        assert!(matches!(result, Err(WindError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_zero_bit_period() {
        let result = StationConfig::builder().with_bit_period_us(0).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_wide_wind_min() -> Result<()> {
        let too_wide = StationConfig::builder().with_wind_min(4096).build();
        assert!(matches!(too_wide, Err(WindError::InvalidConfig(_))));

        let widest = StationConfig::builder().with_wind_min(4095).build()?;
        assert_eq!(widest.wind_min, Speed::MAX);
        Ok(())
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_from_json() -> Result<()> {
        let config = StationConfig::from_json(r#"{ "window_size": 30, "wind_min": 15 }"#)?;
        assert_eq!(config.window_size, 30);
        assert_eq!(config.wind_min, 15);
        assert_eq!(config.bit_period_us, 1220);

        assert!(matches!(
            StationConfig::from_json("{ not json"),
            Err(WindError::ConfigParse(_))
        ));
        assert!(matches!(
            StationConfig::from_json(r#"{ "window_size": 0 }"#),
            Err(WindError::InvalidConfig(_))
        ));
        Ok(())
    }
}
