//! Tolerance-aware comparison and the non-finite-safe number codec.
//!
//! Containers never hand `f64` to `serde_json`'s own number machinery:
//! `±inf`/`nan` are not representable as JSON numbers, so the document form
//! uses the string tokens `"inf"`, `"-inf"`, `"nan"` instead (§4.H).

use crate::error::{FormatError, Result};
use serde_json::Value;

/// Absolute/relative tolerance pair used by every `equals` check in the crate.
///
/// Modeled as an explicit value rather than process-wide mutable state
/// (§9): callers who want a single shared tolerance can construct one
/// `Tolerance` and pass it down, but nothing in this crate reaches for a
/// hidden global.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub abs_tol: f64,
    pub rel_tol: f64,
}

impl Tolerance {
    pub const DEFAULT: Tolerance = Tolerance {
        abs_tol: 1e-12,
        rel_tol: 1e-12,
    };

    pub const fn new(abs_tol: f64, rel_tol: f64) -> Self {
        Tolerance { abs_tol, rel_tol }
    }

    /// `|a - b| <= max(abs_tol, rel_tol * max(|a|, |b|))`.
    ///
    /// Both-NaN and matching infinities of the same sign compare equal,
    /// since those arise routinely from round-tripping a container through
    /// its document form.
    pub fn close(&self, a: f64, b: f64) -> bool {
        if a.is_nan() && b.is_nan() {
            return true;
        }
        if a.is_infinite() || b.is_infinite() {
            return a == b;
        }
        let diff = (a - b).abs();
        diff <= self.abs_tol.max(self.rel_tol * a.abs().max(b.abs()))
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Tolerance::DEFAULT
    }
}

/// Encode a finite-or-not `f64` into its document form.
pub fn encode_number(x: f64) -> Value {
    if x.is_nan() {
        Value::String("nan".to_string())
    } else if x == f64::INFINITY {
        Value::String("inf".to_string())
    } else if x == f64::NEG_INFINITY {
        Value::String("-inf".to_string())
    } else {
        serde_json::Number::from_f64(x)
            .map(Value::Number)
            .unwrap_or(Value::String("nan".to_string()))
    }
}

/// Decode a document-form number back into an `f64`.
pub fn decode_number(value: &Value, path: &str) -> Result<f64> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| {
            FormatError::BadNumber {
                path: path.to_string(),
                token: n.to_string(),
            }
            .into()
        }),
        Value::String(s) => match s.as_str() {
            "inf" => Ok(f64::INFINITY),
            "-inf" => Ok(f64::NEG_INFINITY),
            "nan" => Ok(f64::NAN),
            other => other.parse::<f64>().map_err(|_| {
                FormatError::BadNumber {
                    path: path.to_string(),
                    token: other.to_string(),
                }
                .into()
            }),
        },
        other => Err(FormatError::BadNumber {
            path: path.to_string(),
            token: other.to_string(),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_handles_ordinary_values() {
        let tol = Tolerance::DEFAULT;
        assert!(tol.close(1.0, 1.0 + 1e-15));
        assert!(!tol.close(1.0, 1.1));
    }

    #[test]
    fn close_treats_both_nan_as_equal() {
        let tol = Tolerance::DEFAULT;
        assert!(tol.close(f64::NAN, f64::NAN));
        assert!(!tol.close(f64::NAN, 1.0));
    }

    #[test]
    fn close_compares_infinities_by_sign() {
        let tol = Tolerance::DEFAULT;
        assert!(tol.close(f64::INFINITY, f64::INFINITY));
        assert!(!tol.close(f64::INFINITY, f64::NEG_INFINITY));
    }

    #[test]
    fn encode_decode_round_trip_non_finite() {
        for x in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            let encoded = encode_number(x);
            let decoded = decode_number(&encoded, "$").unwrap();
            if x.is_nan() {
                assert!(decoded.is_nan());
            } else {
                assert_eq!(x, decoded);
            }
        }
    }

    #[test]
    fn encode_decode_round_trip_finite() {
        let decoded = decode_number(&encode_number(3.5), "$").unwrap();
        assert_eq!(decoded, 3.5);
    }

    #[test]
    fn decode_rejects_garbage() {
        let bad = Value::Bool(true);
        assert!(decode_number(&bad, "$.x").is_err());
    }
}
