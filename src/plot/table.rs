use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use indexmap::IndexSet;
use std::io::{self, Write};

use crate::data::aggregator::{MethodAggregate, Page};
use crate::error::Result;
use crate::report::Renderer;

/// Metric columns for a page: every metric seen, in first-seen order.
fn metric_columns(page: &Page) -> IndexSet<String> {
    page.series()
        .flat_map(|s| s.points())
        .flat_map(|p| p.sample.metric_names())
        .map(str::to_string)
        .collect()
}

pub fn page_table(aggregate: &MethodAggregate, page: &Page) -> Table {
    let metrics = metric_columns(page);

    let mut header = vec!["series".to_string(), aggregate.x_param().name.clone()];
    header.extend(metrics.iter().cloned());

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(header);

    for series in page.series() {
        let label = series.key().label().unwrap_or_else(|| "-".to_string());
        for point in series.points() {
            let mut row = vec![label.clone(), point.x.to_string()];
            row.extend(metrics.iter().map(|m| {
                point
                    .sample
                    .get(m)
                    .map(|v| format!("{:.3}", v))
                    .unwrap_or_default()
            }));
            table.add_row(row);
        }
    }
    table
}

/// Prints each page of each aggregate as a text table.
pub struct TableRenderer {
    out: Box<dyn Write>,
}

impl TableRenderer {
    pub fn new(out: Box<dyn Write>) -> Self {
        Self { out }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }
}

impl Renderer for TableRenderer {
    fn render(&mut self, aggregate: &MethodAggregate) -> Result<()> {
        writeln!(self.out, "== {} ==", aggregate.operation())?;
        for page in aggregate.pages() {
            if let Some(label) = page.key().label() {
                writeln!(self.out, "-- {} --", label)?;
            }
            writeln!(self.out, "{}", page_table(aggregate, page))?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}
