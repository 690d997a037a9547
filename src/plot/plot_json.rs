use chrono::Local;
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use tracing::info;

use crate::data::aggregator::MethodAggregate;
use crate::error::Result;
use crate::report::Renderer;

/// Dumps every aggregate of the run as one JSON document for external tools.
pub struct JsonRenderer {
    path: PathBuf,
    title: String,
    operations: Vec<Value>,
}

impl JsonRenderer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            title: String::new(),
            operations: Vec::new(),
        }
    }

    pub fn document(&self) -> Value {
        json!({
            "title": self.title,
            "generated": Local::now().to_rfc3339(),
            "operations": self.operations,
        })
    }
}

impl Renderer for JsonRenderer {
    fn begin(&mut self, title: &str) -> Result<()> {
        self.title = title.to_string();
        Ok(())
    }

    fn render(&mut self, aggregate: &MethodAggregate) -> Result<()> {
        self.operations.push(serde_json::to_value(aggregate)?);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let file = fs::File::create(&self.path)?;
        serde_json::to_writer_pretty(file, &self.document())?;
        info!(path = %self.path.display(), operations = self.operations.len(), "wrote JSON report");
        Ok(())
    }
}
