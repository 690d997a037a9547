//! Run identifier codec.
//!
//! The sweep driver names every invocation `operation[v0, v1, ...]`, with the
//! values in parameter declaration order. This module is the only place that
//! knows about that text form; the aggregator works on [`ObservationDescriptor`].

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

use crate::error::DecodeError;

static NAME_VALUES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^([^\[\]]*)\[([^\[\]]*)\]$").expect("static regex"));
static VALUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9.e+-]+").expect("static regex"));

/// Identity of one benchmarked operation: the suite it belongs to plus its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct OperationId {
    pub namespace: String,
    pub name: String,
}

impl OperationId {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}.{}", self.namespace, self.name)
        }
    }
}

/// One decoded invocation: which operation ran, and with which values.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationDescriptor {
    operation: OperationId,
    values: Vec<f64>,
}

impl ObservationDescriptor {
    /// Structured channel: build a descriptor without going through the text form.
    pub fn new(operation: OperationId, values: Vec<f64>) -> Self {
        Self { operation, values }
    }

    pub fn operation(&self) -> &OperationId {
        &self.operation
    }

    /// Parameter values in declaration order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// Decode `run_id` for an operation that declares `expected` parameters.
pub fn decode(
    namespace: &str,
    run_id: &str,
    expected: usize,
) -> Result<ObservationDescriptor, DecodeError> {
    let caps = NAME_VALUES
        .captures(run_id)
        .ok_or_else(|| DecodeError::Shape(run_id.to_string()))?;

    let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
    if name.trim().is_empty() {
        return Err(DecodeError::MissingName(run_id.to_string()));
    }
    let inner = caps.get(2).map(|m| m.as_str()).unwrap_or_default();

    let values = VALUE
        .find_iter(inner)
        .map(|m| {
            m.as_str()
                .parse::<f64>()
                .map_err(|_| DecodeError::BadNumber {
                    run_id: run_id.to_string(),
                    token: m.as_str().to_string(),
                })
        })
        .collect::<Result<Vec<f64>, _>>()?;

    // ordering is the sweep driver's promise; the count is all we can check
    if values.len() != expected {
        return Err(DecodeError::ValueCount {
            run_id: run_id.to_string(),
            expected,
            found: values.len(),
        });
    }

    Ok(ObservationDescriptor {
        operation: OperationId::new(namespace, name),
        values,
    })
}

/// Inverse of [`decode`], used by the sweep driver.
pub fn encode_run_id(name: &str, values: &[f64]) -> String {
    format!("{}[{}]", name, values.iter().join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn one_varying_param() {
        let d = decode("Suite", "methodName[1000]", 1).unwrap();
        assert_eq!(d.operation(), &OperationId::new("Suite", "methodName"));
        assert_eq!(d.values(), &[1000.0]);
    }

    #[test]
    fn one_varying_param_single_char() {
        let d = decode("Suite", "methodName[6]", 1).unwrap();
        assert_eq!(d.values(), &[6.0]);
    }

    #[test]
    fn two_varying_params() {
        let d = decode("Suite", "methodName[1000, 3456]", 2).unwrap();
        assert_eq!(d.operation().name, "methodName");
        assert_eq!(d.values(), &[1000.0, 3456.0]);
    }

    #[test]
    fn signed_fractional_and_exponent_values() {
        let d = decode("", "m[-1.5,2e3  +0.25]", 3).unwrap();
        assert_eq!(d.values(), &[-1.5, 2000.0, 0.25]);
        assert_eq!(d.operation().to_string(), "m");
    }

    #[test]
    fn zero_params_still_decode_a_name() {
        let d = decode("Suite", "noArgs[]", 0).unwrap();
        assert_eq!(d.operation().name, "noArgs");
        assert!(d.values().is_empty());
    }

    #[test]
    fn missing_brackets_is_a_shape_error() {
        assert_eq!(
            decode("Suite", "methodName", 0),
            Err(DecodeError::Shape("methodName".into()))
        );
        assert!(matches!(decode("Suite", "a[1]b", 1), Err(DecodeError::Shape(_))));
        assert!(matches!(decode("Suite", "a[[1]]", 1), Err(DecodeError::Shape(_))));
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(matches!(
            decode("Suite", "[1, 2]", 2),
            Err(DecodeError::MissingName(_))
        ));
    }

    #[test]
    fn unparseable_token_is_rejected() {
        assert!(matches!(
            decode("Suite", "m[1, e, 3]", 3),
            Err(DecodeError::BadNumber { token, .. }) if token == "e"
        ));
    }

    #[test]
    fn value_count_must_match_declarations() {
        assert_eq!(
            decode("Suite", "m[1, 2]", 3),
            Err(DecodeError::ValueCount {
                run_id: "m[1, 2]".into(),
                expected: 3,
                found: 2
            })
        );
    }

    #[test]
    fn encode_matches_wire_format() {
        assert_eq!(encode_run_id("concat", &[1.0, 100000.0, 0.5]), "concat[1, 100000, 0.5]");
        assert_eq!(encode_run_id("noArgs", &[]), "noArgs[]");
    }

    proptest! {
        #[test]
        fn run_id_round_trips(
            name in "[A-Za-z_][A-Za-z0-9_ .$-]{0,24}",
            values in prop::collection::vec(-1.0e9f64..1.0e9, 0..6),
        ) {
            let run_id = encode_run_id(&name, &values);
            let d = decode("Suite", &run_id, values.len()).unwrap();
            prop_assert_eq!(&d.operation().name, &name);
            prop_assert_eq!(d.values().len(), values.len());
            for (got, want) in d.values().iter().zip(&values) {
                prop_assert!((got - want).abs() <= want.abs() * 1e-12);
            }
        }
    }
}
