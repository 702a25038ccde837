use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error as ThisError;

///
/// ScalarType
///
/// Closed enumeration of the primitive kinds the engine understands.
/// Every scalar owns its literal coercion, so adding a kind is a
/// compile-time obligation rather than a table entry.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ScalarType {
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
    Text,
}

impl ScalarType {
    /// Coerce raw literal text into a typed value of this kind.
    ///
    /// Numeric coercions are range-checked per width. `Text` is the
    /// identity. `Bool` accepts exactly `true, false, 1, 0, t, f, T, F`.
    pub fn coerce(self, raw: &str) -> Result<Value, CoercionError> {
        match self {
            Self::Bool => coerce_bool(raw),
            Self::Int => raw.parse::<i64>().map(Value::Int).map_err(|_| self.error(raw)),
            Self::Int8 => raw.parse::<i8>().map(Value::Int8).map_err(|_| self.error(raw)),
            Self::Int16 => raw
                .parse::<i16>()
                .map(Value::Int16)
                .map_err(|_| self.error(raw)),
            Self::Int32 => raw
                .parse::<i32>()
                .map(Value::Int32)
                .map_err(|_| self.error(raw)),
            Self::Int64 => raw
                .parse::<i64>()
                .map(Value::Int64)
                .map_err(|_| self.error(raw)),
            Self::Uint => raw.parse::<u64>().map(Value::Uint).map_err(|_| self.error(raw)),
            Self::Uint8 => raw
                .parse::<u8>()
                .map(Value::Uint8)
                .map_err(|_| self.error(raw)),
            Self::Uint16 => raw
                .parse::<u16>()
                .map(Value::Uint16)
                .map_err(|_| self.error(raw)),
            Self::Uint32 => raw
                .parse::<u32>()
                .map(Value::Uint32)
                .map_err(|_| self.error(raw)),
            Self::Uint64 => raw
                .parse::<u64>()
                .map(Value::Uint64)
                .map_err(|_| self.error(raw)),
            Self::Float32 => raw
                .parse::<f32>()
                .map(Value::Float32)
                .map_err(|_| self.error(raw)),
            Self::Float64 => raw
                .parse::<f64>()
                .map(Value::Float64)
                .map_err(|_| self.error(raw)),
            Self::Text => Ok(Value::Text(raw.to_string())),
        }
    }

    /// Stable lowercase label used in diagnostics.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Uint => "uint",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Text => "text",
        }
    }

    fn error(self, raw: &str) -> CoercionError {
        CoercionError {
            kind: self,
            raw: raw.to_string(),
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// The accepted token set is deliberately narrow; "TRUE" and "yes" are not
// literals of the language.
fn coerce_bool(raw: &str) -> Result<Value, CoercionError> {
    match raw {
        "true" | "1" | "t" | "T" => Ok(Value::Bool(true)),
        "false" | "0" | "f" | "F" => Ok(Value::Bool(false)),
        _ => Err(CoercionError {
            kind: ScalarType::Bool,
            raw: raw.to_string(),
        }),
    }
}

///
/// CoercionError
///
/// A raw literal could not be normalized into the declared scalar kind.
/// Carries the offending text for diagnostics.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("cannot coerce '{raw}' into {kind}")]
pub struct CoercionError {
    pub kind: ScalarType,
    pub raw: String,
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_accepts_exactly_the_defined_tokens() {
        for raw in ["true", "1", "t", "T"] {
            assert_eq!(ScalarType::Bool.coerce(raw), Ok(Value::Bool(true)));
        }
        for raw in ["false", "0", "f", "F"] {
            assert_eq!(ScalarType::Bool.coerce(raw), Ok(Value::Bool(false)));
        }
        for raw in ["TRUE", "False", "yes", "2", ""] {
            assert!(ScalarType::Bool.coerce(raw).is_err(), "accepted {raw:?}");
        }
    }

    #[test]
    fn integers_are_range_checked_per_width() {
        assert_eq!(ScalarType::Int8.coerce("-128"), Ok(Value::Int8(-128)));
        assert!(ScalarType::Int8.coerce("128").is_err());
        assert_eq!(ScalarType::Uint8.coerce("255"), Ok(Value::Uint8(255)));
        assert!(ScalarType::Uint8.coerce("256").is_err());
        assert!(ScalarType::Uint64.coerce("-1").is_err());
        assert_eq!(
            ScalarType::Int64.coerce("-9223372036854775808"),
            Ok(Value::Int64(i64::MIN))
        );
        assert!(ScalarType::Int64.coerce("9223372036854775808").is_err());
    }

    #[test]
    fn integers_reject_malformed_input() {
        for raw in ["", "abc", "1.5", "0x10", "1 "] {
            assert!(ScalarType::Int32.coerce(raw).is_err(), "accepted {raw:?}");
        }
    }

    #[test]
    fn floats_accept_decimal_and_scientific() {
        assert_eq!(ScalarType::Float64.coerce("1.5"), Ok(Value::Float64(1.5)));
        assert_eq!(
            ScalarType::Float64.coerce("-2.5e3"),
            Ok(Value::Float64(-2500.0))
        );
        assert_eq!(ScalarType::Float32.coerce("0.25"), Ok(Value::Float32(0.25)));
        assert!(ScalarType::Float64.coerce("1.2.3").is_err());
        assert!(ScalarType::Float32.coerce("").is_err());
    }

    #[test]
    fn text_is_the_identity() {
        assert_eq!(
            ScalarType::Text.coerce("any text at all"),
            Ok(Value::Text("any text at all".to_string()))
        );
        assert_eq!(ScalarType::Text.coerce(""), Ok(Value::Text(String::new())));
    }

    #[test]
    fn errors_carry_kind_and_raw_text() {
        let err = ScalarType::Uint16.coerce("70000").unwrap_err();
        assert_eq!(err.kind, ScalarType::Uint16);
        assert_eq!(err.raw, "70000");
        assert_eq!(err.to_string(), "cannot coerce '70000' into uint16");
    }
}
