use chrono::Local;
use plotly::common::{Mode, Title};
use plotly::layout::{Axis, Layout};
use plotly::{Plot, Scatter};
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::data::aggregator::{MethodAggregate, Page, Series};
use crate::error::{ReportError, Result};
use crate::report::Renderer;

const STYLE: &str = r#"
    body { font-family: sans-serif; margin: 20px 40px; }
    .namespace { color: #888; font-weight: normal; }
    .run-info { color: #666; font-size: 0.9em; margin-bottom: 20px; }
    .chart { margin-bottom: 30px; }
"#;

pub(crate) fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Hover text for every point: all metrics of its sample.
fn hover_text(series: &Series) -> Vec<String> {
    series
        .points()
        .iter()
        .map(|p| {
            p.sample
                .iter()
                .map(|(name, v)| format!("{}: {:.4}", name, v))
                .collect::<Vec<_>>()
                .join("<br>")
        })
        .collect()
}

/// Whether any point of the aggregate recorded `metric`.
pub(crate) fn carries_metric(aggregate: &MethodAggregate, metric: &str) -> bool {
    aggregate
        .pages()
        .flat_map(|page| page.series())
        .flat_map(|series| series.points())
        .any(|p| p.sample.get(metric).is_some())
}

/// One plotly chart for one page: a line per series.
pub fn page_plot(aggregate: &MethodAggregate, page: &Page, y_metric: &str) -> Plot {
    let mut plot = Plot::new();
    for series in page.series() {
        let label = series.key().label();
        let trace = Scatter::new(series.xs(), series.ys(y_metric))
            .mode(Mode::LinesMarkers)
            .name(label.as_deref().unwrap_or(y_metric))
            .show_legend(label.is_some())
            .text_array(hover_text(series));
        plot.add_trace(trace);
    }

    let layout = Layout::new()
        .x_axis(Axis::new().title(Title::new(&aggregate.x_param().name)))
        .y_axis(Axis::new().title(Title::new(y_metric)))
        .height(500);
    plot.set_layout(layout);
    plot
}

/// Writes one HTML document per run: a section per operation, a chart per page.
pub struct HtmlRenderer {
    path: PathBuf,
    y_metric: String,
    body: String,
    title: String,
    chart_num: usize,
}

impl HtmlRenderer {
    pub fn new(path: impl Into<PathBuf>, y_metric: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            y_metric: y_metric.into(),
            body: String::new(),
            title: String::new(),
            chart_num: 0,
        }
    }

    /// The full document as it would be written now.
    pub fn document(&self) -> String {
        format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<script src="https://cdn.plot.ly/plotly-latest.min.js"></script>
<style>{style}</style>
</head>
<body>
<h1>{title}</h1>
<div class="run-info">
  <p>Generated by perfchart on {date}</p>
</div>
{body}
</body>
</html>
"#,
            title = escape_html(&self.title),
            style = STYLE,
            date = Local::now().format("%Y-%m-%d %H:%M:%S"),
            body = self.body,
        )
    }
}

impl Renderer for HtmlRenderer {
    fn begin(&mut self, title: &str) -> Result<()> {
        self.title = title.to_string();
        Ok(())
    }

    fn render(&mut self, aggregate: &MethodAggregate) -> Result<()> {
        let op = aggregate.operation();
        let heading = if op.namespace.is_empty() {
            escape_html(&op.name)
        } else {
            format!(
                r#"<span class="namespace">{}.</span>{}"#,
                escape_html(&op.namespace),
                escape_html(&op.name)
            )
        };
        writeln!(self.body, "<h2>{}</h2>", heading)
            .map_err(|e| ReportError::Render(e.to_string()))?;
        if !carries_metric(aggregate, &self.y_metric) {
            warn!(operation = %op, metric = %self.y_metric, "no point carries the chart metric");
        }

        for page in aggregate.pages() {
            if let Some(label) = page.key().label() {
                writeln!(self.body, "<h3>{}</h3>", escape_html(&label))
                    .map_err(|e| ReportError::Render(e.to_string()))?;
            }
            let div_id = format!("chart{}", self.chart_num);
            let plot = page_plot(aggregate, page, &self.y_metric);
            writeln!(
                self.body,
                r#"<div class="chart">{}</div>"#,
                plot.to_inline_html(Some(div_id.as_str()))
            )
            .map_err(|e| ReportError::Render(e.to_string()))?;
            self.chart_num += 1;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        fs::write(&self.path, self.document())?;
        info!(path = %self.path.display(), charts = self.chart_num, "wrote HTML report");
        Ok(())
    }
}
