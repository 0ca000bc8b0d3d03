//! Unit Converter - Centimeters Are Truth
//!
//! Every measurement is stored and graded in centimeters. Conversion to the
//! display unit is the last step before formatting.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EngineError;

/// Centimeters per inch
pub const CM_PER_INCH: f64 = 2.54;

/// Display unit for graded measurements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Cm,
    In,
}

impl Default for Unit {
    fn default() -> Self {
        Self::Cm
    }
}

impl Unit {
    /// Suffix appended to formatted values
    pub fn suffix(&self) -> &'static str {
        match self {
            Unit::Cm => "cm",
            Unit::In => "in",
        }
    }

    /// Decimal places used when formatting a value in this unit
    pub fn precision(&self) -> usize {
        match self {
            Unit::Cm => 1,
            Unit::In => 2,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl FromStr for Unit {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cm" | "centimeter" | "centimeters" => Ok(Unit::Cm),
            "in" | "inch" | "inches" => Ok(Unit::In),
            other => Err(EngineError::invalid_config(format!("unrecognized unit '{}'", other))),
        }
    }
}

/// Convert a centimeter value into the display unit
pub fn to_display_unit(value_cm: f64, unit: Unit) -> f64 {
    match unit {
        Unit::Cm => value_cm,
        Unit::In => value_cm / CM_PER_INCH,
    }
}

/// Convert a display-unit value back to centimeters
pub fn to_cm(value: f64, unit: Unit) -> f64 {
    match unit {
        Unit::Cm => value,
        Unit::In => value * CM_PER_INCH,
    }
}

/// Format a display-unit value with the unit's precision and suffix, e.g. "54.1cm"
pub fn format_measurement(value: f64, unit: Unit) -> String {
    format!("{:.*}{}", unit.precision(), value, unit.suffix())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cm_is_identity() {
        assert_eq!(to_display_unit(52.0, Unit::Cm), 52.0);
    }

    #[test]
    fn test_inch_conversion() {
        assert!((to_display_unit(2.54, Unit::In) - 1.0).abs() < 1e-12);
        assert!((to_display_unit(50.8, Unit::In) - 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_round_trip_recovers_value() {
        for x in [0.0, 1.2, 33.3, 54.08, 101.6, 250.25] {
            let back = to_cm(to_display_unit(x, Unit::In), Unit::In);
            assert!((back - x).abs() < 0.01, "{} -> {}", x, back);
        }
    }

    #[test]
    fn test_format_precision() {
        assert_eq!(format_measurement(54.08, Unit::Cm), "54.1cm");
        assert_eq!(format_measurement(20.0, Unit::In), "20.00in");
    }

    #[test]
    fn test_parse_unit() {
        assert_eq!("CM".parse::<Unit>().unwrap(), Unit::Cm);
        assert_eq!("inch".parse::<Unit>().unwrap(), Unit::In);
        assert!("mm".parse::<Unit>().unwrap_err().is_invalid_configuration());
    }
}
