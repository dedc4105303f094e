// Numan Thabit 2025
//! Numeric values paired with the unit token `wrk` printed next to them.

use std::fmt;

use bytesize::{ByteSize, GIB, KIB, MIB, TIB};
use serde::Serialize;

/// A duration-like value (`1.49s`, `329.38ms`, `12.56us`).
///
/// The unit is stored lower-cased and the millisecond value is computed once,
/// at construction. Units without a known conversion leave [`TimeValue::ms`]
/// unset so callers can tell "cannot normalize" apart from zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeValue {
    value: f64,
    unit: String,
    ms: Option<f64>,
}

impl TimeValue {
    pub fn new(value: f64, unit: &str) -> Self {
        let unit = unit.to_ascii_lowercase();
        let ms = to_millis(value, &unit);
        Self { value, unit, ms }
    }

    /// Shorthand for a value already expressed in milliseconds.
    pub fn millis(value: f64) -> Self {
        Self::new(value, "ms")
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Canonical millisecond value, `None` for unrecognized units.
    pub fn ms(&self) -> Option<f64> {
        self.ms
    }
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit)
    }
}

/// Converts `value` expressed in a lower-case `unit` to milliseconds.
pub fn to_millis(value: f64, unit: &str) -> Option<f64> {
    match unit {
        "us" => Some(value / 1000.0),
        "ms" => Some(value),
        "s" => Some(value * 1000.0),
        "m" => Some(value * 60_000.0),
        "h" => Some(value * 3_600_000.0),
        _ => None,
    }
}

/// A byte-size value as printed by `wrk` (`148.32KB`, `2.06MB`).
///
/// `wrk` scales with binary multiples, so `1.00KB` is 1024 bytes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ByteValue {
    value: f64,
    unit: String,
    bytes: Option<u64>,
}

impl ByteValue {
    pub fn new(value: f64, unit: &str) -> Self {
        let unit = unit.to_ascii_lowercase();
        let bytes = byte_multiplier(&unit).map(|mult| (value * mult as f64).round() as u64);
        Self { value, unit, bytes }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Total bytes, `None` for unrecognized units.
    pub fn bytes(&self) -> Option<u64> {
        self.bytes
    }

    pub fn size(&self) -> Option<ByteSize> {
        self.bytes.map(ByteSize::b)
    }
}

impl fmt::Display for ByteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit)
    }
}

fn byte_multiplier(unit: &str) -> Option<u64> {
    match unit {
        "b" => Some(1),
        "kb" => Some(KIB),
        "mb" => Some(MIB),
        "gb" => Some(GIB),
        "tb" => Some(TIB),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_value_normalizes_known_units() {
        assert_eq!(TimeValue::new(123.56, "ms").ms(), Some(123.56));
        assert_eq!(TimeValue::new(1.22, "s").ms(), Some(1220.0));
        assert_eq!(TimeValue::new(12.56, "s").ms(), Some(12560.0));
        assert_eq!(TimeValue::new(12.56, "us").ms(), Some(0.01256));
        assert_eq!(TimeValue::new(1.5, "m").ms(), Some(90_000.0));
    }

    #[test]
    fn time_value_lowercases_unit() {
        let value = TimeValue::new(2.0, "MS");
        assert_eq!(value.unit(), "ms");
        assert_eq!(value.ms(), Some(2.0));
        assert_eq!(value.to_string(), "2ms");
    }

    #[test]
    fn time_value_unknown_unit_is_unset() {
        let value = TimeValue::new(3.0, "ns");
        assert_eq!(value.value(), 3.0);
        assert!(value.ms().is_none());
    }

    #[test]
    fn byte_value_uses_binary_multiples() {
        let read = ByteValue::new(2.0, "MB");
        assert_eq!(read.unit(), "mb");
        assert_eq!(read.bytes(), Some(2 * 1024 * 1024));
        assert_eq!(read.size(), Some(ByteSize::mib(2)));

        assert!(ByteValue::new(1.0, "XB").bytes().is_none());
    }
}
