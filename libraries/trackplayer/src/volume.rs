//! Volume and playback rate values
//!
//! Volume is a linear gain in `0.0..=1.0` handed straight to the engine.
//! Rate is a speed multiplier and must be positive.

use crate::error::{PlayerError, Result};

/// Linear output volume
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Volume {
    level: f32,
}

impl Volume {
    /// Create volume, clamping to `0.0..=1.0`
    ///
    /// Non-finite input falls back to full volume.
    pub fn new(level: f32) -> Self {
        Self::parse(level).unwrap_or_default()
    }

    /// Validate a host-supplied volume
    ///
    /// Out-of-range values are clamped; NaN and infinities are rejected.
    pub fn parse(level: f32) -> Result<Self> {
        if !level.is_finite() {
            return Err(PlayerError::InvalidValue {
                name: "volume",
                value: f64::from(level),
            });
        }

        Ok(Self {
            level: level.clamp(0.0, 1.0),
        })
    }

    pub fn level(self) -> f32 {
        self.level
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self { level: 1.0 }
    }
}

/// Validate a playback rate
pub fn parse_rate(rate: f32) -> Result<f32> {
    if rate.is_finite() && rate > 0.0 {
        Ok(rate)
    } else {
        Err(PlayerError::InvalidValue {
            name: "rate",
            value: f64::from(rate),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_out_of_range_levels() {
        assert_eq!(Volume::parse(1.5).unwrap().level(), 1.0);
        assert_eq!(Volume::parse(-0.2).unwrap().level(), 0.0);
        assert_eq!(Volume::parse(0.4).unwrap().level(), 0.4);
    }

    #[test]
    fn rejects_nan_volume() {
        let err = Volume::parse(f32::NAN).unwrap_err();
        assert_eq!(err.code(), "invalid_value");
        assert_eq!(Volume::new(f32::INFINITY).level(), 1.0);
    }

    #[test]
    fn rate_must_be_positive() {
        assert_eq!(parse_rate(1.25).unwrap(), 1.25);
        assert!(parse_rate(0.0).is_err());
        assert!(parse_rate(-1.0).is_err());
        assert!(parse_rate(f32::NAN).is_err());
    }
}
