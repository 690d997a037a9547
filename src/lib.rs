//! Parameter-sweep micro-benchmarks rendered as multi-axis chart reports.
//!
//! The sweep driver runs an operation over the cartesian product of its
//! declared parameter ranges; every invocation becomes an observation that
//! the aggregator groups into pages, series and points.

pub mod config;
pub mod error;
pub mod report;
pub mod sweep;

pub mod data {
    pub mod aggregator;
    pub mod axis;
    pub mod decoder;
    pub mod loader;
    pub mod sample;
    pub mod utils;
}

pub mod plot {
    pub mod plot_html;
    pub mod plot_json;
    pub mod table;
}

pub use config::{AxisRole, ErrorPolicy, OutputFormat, ParameterDeclaration, ReportConfig};
pub use data::aggregator::{Aggregator, MethodAggregate, Page, Point, Series};
pub use data::axis::AxisKey;
pub use data::decoder::{ObservationDescriptor, OperationId};
pub use data::sample::MeasurementSample;
pub use error::{ReportError, Result};
pub use report::{ReportBuilder, Renderer};
pub use sweep::{Benchmark, Sweep, SweepSummary};
