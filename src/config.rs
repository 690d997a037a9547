use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Where a varying parameter ends up on the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AxisRole {
    /// Horizontal axis of the chart. Exactly one per operation.
    #[serde(alias = "x")]
    X,
    /// Each distinct combination of SERIES values is one plotted line.
    /// With no SERIES parameters the chart has a single unlabeled line.
    #[default]
    #[serde(alias = "series")]
    Series,
    /// Each distinct combination of PAGE values is its own chart.
    #[serde(alias = "page")]
    Page,
}

impl fmt::Display for AxisRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisRole::X => f.write_str("X"),
            AxisRole::Series => f.write_str("SERIES"),
            AxisRole::Page => f.write_str("PAGE"),
        }
    }
}

fn default_bound() -> f64 {
    1.0
}

/// Static metadata for one benchmark parameter.
///
/// `from`/`to`/`step` only matter to the sweep driver; the aggregator reads
/// `name` and `role`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDeclaration {
    pub name: String,
    #[serde(rename = "axis", default)]
    pub role: AxisRole,
    #[serde(default = "default_bound")]
    pub from: f64,
    #[serde(default = "default_bound")]
    pub to: f64,
    #[serde(default = "default_bound")]
    pub step: f64,
}

impl ParameterDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: AxisRole::Series,
            from: 1.0,
            to: 1.0,
            step: 1.0,
        }
    }

    pub fn x(name: impl Into<String>) -> Self {
        Self::new(name).axis(AxisRole::X)
    }

    pub fn series(name: impl Into<String>) -> Self {
        Self::new(name)
    }

    pub fn page(name: impl Into<String>) -> Self {
        Self::new(name).axis(AxisRole::Page)
    }

    pub fn axis(mut self, role: AxisRole) -> Self {
        self.role = role;
        self
    }

    pub fn range(mut self, from: f64, to: f64, step: f64) -> Self {
        self.from = from;
        self.to = to;
        self.step = step;
        self
    }
}

/// Output documents the report builder can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Html,
    Json,
    Table,
}

/// What the sweep does with an observation the aggregator rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Stop the sweep and return the error.
    #[default]
    Abort,
    /// Log it, keep it in the summary, carry on.
    Skip,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub title: String,
    pub output_dir: PathBuf,
    /// Output files are `<file_stem>.html`, `<file_stem>.json`.
    pub file_stem: String,
    /// Sample metric plotted on the Y axis.
    pub y_metric: String,
    pub formats: Vec<OutputFormat>,
    pub on_error: ErrorPolicy,
    /// How many times the whole sweep is run.
    pub repeat: usize,
    pub progress: bool,
    pub log_level: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: "perfchart report".to_string(),
            output_dir: PathBuf::from("."),
            file_stem: "perfchart".to_string(),
            y_metric: crate::data::sample::ELAPSED_MS.to_string(),
            formats: vec![OutputFormat::Html],
            on_error: ErrorPolicy::Abort,
            repeat: 1,
            progress: true,
            log_level: "info".to_string(),
        }
    }
}

impl ReportConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn output_path(&self, extension: &str) -> PathBuf {
        self.output_dir.join(format!("{}.{}", self.file_stem, extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declaration_defaults_match_annotation_defaults() {
        let p: ParameterDeclaration = serde_json::from_str(r#"{"name": "threads"}"#).unwrap();
        assert_eq!(p.role, AxisRole::Series);
        assert_eq!((p.from, p.to, p.step), (1.0, 1.0, 1.0));
        assert_eq!(p, ParameterDeclaration::new("threads"));
    }

    #[test]
    fn axis_accepts_upper_and_lower_case() {
        let p: ParameterDeclaration =
            serde_json::from_str(r#"{"name": "n", "axis": "X", "from": 0, "to": 10, "step": 5}"#)
                .unwrap();
        assert_eq!(p, ParameterDeclaration::x("n").range(0.0, 10.0, 5.0));

        let p: ParameterDeclaration =
            serde_json::from_str(r#"{"name": "size", "axis": "page"}"#).unwrap();
        assert_eq!(p.role, AxisRole::Page);
    }

    #[test]
    fn partial_report_config_keeps_defaults() {
        let cfg = ReportConfig::from_json_str(
            r#"{"title": "strings", "formats": ["html", "table"], "on_error": "skip"}"#,
        )
        .unwrap();
        assert_eq!(cfg.title, "strings");
        assert_eq!(cfg.formats, vec![OutputFormat::Html, OutputFormat::Table]);
        assert_eq!(cfg.on_error, ErrorPolicy::Skip);
        assert_eq!(cfg.y_metric, "elapsed_ms");
        assert_eq!(cfg.repeat, 1);
    }

    #[test]
    fn output_path_joins_stem_and_extension() {
        let cfg = ReportConfig {
            output_dir: PathBuf::from("out"),
            file_stem: "run".into(),
            ..ReportConfig::default()
        };
        assert_eq!(cfg.output_path("html"), PathBuf::from("out").join("run.html"));
    }
}
