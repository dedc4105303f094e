// Numan Thabit 2025
//! Numbers that `wrk` may replace with `nan`/`inf` tokens.

use std::{fmt, str::FromStr};

use serde::{Serialize, Serializer};

/// Literal tokens emitted by `wrk` for undefined statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sentinel {
    Nan,
    NegNan,
    Inf,
    NegInf,
}

impl Sentinel {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "nan" => Some(Self::Nan),
            "-nan" => Some(Self::NegNan),
            "inf" => Some(Self::Inf),
            "-inf" => Some(Self::NegInf),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nan => "nan",
            Self::NegNan => "-nan",
            Self::Inf => "inf",
            Self::NegInf => "-inf",
        }
    }
}

impl fmt::Display for Sentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Sentinel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Either a parsed number or the sentinel token found in its place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Numeric<T> {
    Number(T),
    Sentinel(Sentinel),
}

impl<T: Copy> Numeric<T> {
    pub fn as_number(&self) -> Option<T> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Sentinel(_) => None,
        }
    }

    pub fn sentinel(&self) -> Option<Sentinel> {
        match self {
            Self::Number(_) => None,
            Self::Sentinel(token) => Some(*token),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, Self::Sentinel(_))
    }
}

impl<T: FromStr> Numeric<T> {
    /// Strict decimal conversion, falling back to the sentinel set.
    ///
    /// Rust's float parser accepts `NaN`/`infinity`; those spellings are not
    /// what `wrk` prints and are rejected here.
    pub fn parse(token: &str) -> Option<Self> {
        if is_plain_decimal(token) {
            if let Ok(value) = token.parse::<T>() {
                return Some(Self::Number(value));
            }
        }
        Sentinel::from_token(token).map(Self::Sentinel)
    }
}

impl<T: fmt::Display> fmt::Display for Numeric<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => fmt::Display::fmt(value, f),
            Self::Sentinel(token) => f.write_str(token.as_str()),
        }
    }
}

// wrk never prints negative statistics; `-nan`/`-inf` go through the sentinels.
fn is_plain_decimal(token: &str) -> bool {
    token.bytes().any(|b| b.is_ascii_digit())
        && token.bytes().all(|b| b.is_ascii_digit() || b == b'.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numbers_before_sentinels() {
        assert_eq!(Numeric::<f64>::parse("1.25"), Some(Numeric::Number(1.25)));
        assert_eq!(Numeric::<u64>::parse("59985"), Some(Numeric::Number(59985)));
    }

    #[test]
    fn rejects_negative_numbers() {
        assert!(Numeric::<f64>::parse("-3.5").is_none());
        assert!(Numeric::<u64>::parse("-1").is_none());
        assert_eq!(
            Numeric::<f64>::parse("-inf"),
            Some(Numeric::Sentinel(Sentinel::NegInf))
        );
    }

    #[test]
    fn keeps_sentinel_tokens() {
        let parsed = Numeric::<f64>::parse("-nan").expect("sentinel");
        assert_eq!(parsed, Numeric::Sentinel(Sentinel::NegNan));
        assert_eq!(parsed.to_string(), "-nan");
        assert!(parsed.as_number().is_none());
        assert_eq!(Numeric::<u64>::parse("inf"), Some(Numeric::Sentinel(Sentinel::Inf)));
    }

    #[test]
    fn rejects_rust_only_float_spellings() {
        assert!(Numeric::<f64>::parse("NaN").is_none());
        assert!(Numeric::<f64>::parse("infinity").is_none());
        assert!(Numeric::<f64>::parse("1e3").is_none());
        assert!(Numeric::<f64>::parse("").is_none());
        assert!(Numeric::<u64>::parse("1.5").is_none());
    }
}
