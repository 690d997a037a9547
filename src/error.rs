//! Error types for perfchart
//!
//! Decoding and configuration failures get their own enums so callers can
//! match on them; everything funnels into [`ReportError`].

use std::io;
use thiserror::Error;

use crate::data::decoder::OperationId;

/// Result type alias for report operations
pub type Result<T> = std::result::Result<T, ReportError>;

/// A run identifier that does not have the `name[v0, v1, ...]` shape.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("unrecognized method name+value syntax in run identifier '{0}'")]
    Shape(String),

    #[error("no operation name in run identifier '{0}'")]
    MissingName(String),

    #[error("bad numeric token '{token}' in run identifier '{run_id}'")]
    BadNumber { run_id: String, token: String },

    #[error("run identifier '{run_id}' carries {found} values, expected {expected}")]
    ValueCount {
        run_id: String,
        expected: usize,
        found: usize,
    },
}

/// Invalid parameter declarations for an operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("no X axis parameter was specified for {0}")]
    NoXAxis(String),

    #[error("multiple X axis parameters for {operation}: {first} and {second}")]
    MultipleXAxes {
        operation: String,
        first: String,
        second: String,
    },

    #[error("parameter '{name}' has invalid sweep bounds from={from} to={to} step={step}")]
    SweepBounds {
        name: String,
        from: f64,
        to: f64,
        step: f64,
    },

    #[error("sweep over {name} exceeds {limit} invocations")]
    SweepTooLarge { name: String, limit: usize },
}

/// Crate-wide error.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An observation handed straight to the aggregator does not belong to
    /// the operation it is accumulating.
    #[error("observation for {found} does not belong to aggregate of {expected}")]
    Consistency {
        expected: OperationId,
        found: OperationId,
    },

    /// An observation handed straight to the aggregator while nothing is
    /// accumulating.
    #[error("no aggregate is accumulating; cannot add observation for {0}")]
    NotAccumulating(OperationId),

    /// Parameter vector length disagrees with the operation's declarations.
    #[error("{operation}: got {found} parameter values, aggregate expects {expected}")]
    Arity {
        operation: OperationId,
        expected: usize,
        found: usize,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("render error: {0}")]
    Render(String),
}

impl ReportError {
    /// True for errors that reject a single observation without touching
    /// the report output.
    pub fn is_observation_error(&self) -> bool {
        matches!(
            self,
            ReportError::Decode(_)
                | ReportError::Config(_)
                | ReportError::Consistency { .. }
                | ReportError::NotAccumulating(_)
                | ReportError::Arity { .. }
        )
    }
}
