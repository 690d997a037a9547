//! Glue between the sweep and the renderers.
//!
//! [`ReportBuilder`] owns the [`Aggregator`] and forwards every aggregate it
//! finalizes to each registered [`Renderer`], in order.

use tracing::debug;

use crate::config::{OutputFormat, ParameterDeclaration, ReportConfig};
use crate::data::aggregator::{Aggregator, MethodAggregate};
use crate::data::decoder::ObservationDescriptor;
use crate::data::sample::MeasurementSample;
use crate::error::Result;
use crate::plot::plot_html::HtmlRenderer;
use crate::plot::plot_json::JsonRenderer;
use crate::plot::table::TableRenderer;

/// Consumer of finalized aggregates. Aggregates are read-only here.
pub trait Renderer {
    /// Called once before the first aggregate.
    fn begin(&mut self, _title: &str) -> Result<()> {
        Ok(())
    }

    fn render(&mut self, aggregate: &MethodAggregate) -> Result<()>;

    /// Called once after the last aggregate.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

pub struct ReportBuilder {
    title: String,
    aggregator: Aggregator,
    renderers: Vec<Box<dyn Renderer>>,
    started: bool,
    rendered: usize,
}

impl ReportBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            aggregator: Aggregator::new(),
            renderers: Vec::new(),
            started: false,
            rendered: 0,
        }
    }

    /// One renderer per configured output format.
    pub fn from_config(cfg: &ReportConfig) -> Self {
        let mut builder = Self::new(cfg.title.clone());
        for format in &cfg.formats {
            let renderer: Box<dyn Renderer> = match format {
                OutputFormat::Html => Box::new(HtmlRenderer::new(
                    cfg.output_path("html"),
                    cfg.y_metric.clone(),
                )),
                OutputFormat::Json => Box::new(JsonRenderer::new(cfg.output_path("json"))),
                OutputFormat::Table => Box::new(TableRenderer::stdout()),
            };
            builder = builder.with_renderer(renderer);
        }
        builder
    }

    pub fn with_renderer(mut self, renderer: Box<dyn Renderer>) -> Self {
        self.renderers.push(renderer);
        self
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Aggregates passed to the renderers so far.
    pub fn rendered(&self) -> usize {
        self.rendered
    }

    pub fn begin(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }
        for r in self.renderers.iter_mut() {
            r.begin(&self.title)?;
        }
        self.started = true;
        Ok(())
    }

    /// Feed one invocation, identified by its run identifier.
    pub fn observe(
        &mut self,
        namespace: &str,
        params: &[ParameterDeclaration],
        run_id: &str,
        sample: MeasurementSample,
    ) -> Result<()> {
        self.begin()?;
        let finished = self
            .aggregator
            .begin_observation(namespace, params, run_id, sample)?;
        self.dispatch(finished)
    }

    /// Feed one invocation through the structured channel.
    pub fn observe_descriptor(
        &mut self,
        params: &[ParameterDeclaration],
        descriptor: &ObservationDescriptor,
        sample: MeasurementSample,
    ) -> Result<()> {
        self.begin()?;
        let finished = self.aggregator.ingest(params, descriptor, sample)?;
        self.dispatch(finished)
    }

    /// Flush the last aggregate and close every renderer. Returns the number
    /// of aggregates rendered over the whole run.
    pub fn finish(&mut self) -> Result<usize> {
        self.begin()?;
        let last = self.aggregator.finalize_run();
        self.dispatch(last)?;
        for r in self.renderers.iter_mut() {
            r.finish()?;
        }
        Ok(self.rendered)
    }

    fn dispatch(&mut self, finished: Option<MethodAggregate>) -> Result<()> {
        if let Some(agg) = finished {
            debug!(operation = %agg.operation(), renderers = self.renderers.len(), "rendering");
            for r in self.renderers.iter_mut() {
                r.render(&agg)?;
            }
            self.rendered += 1;
        }
        Ok(())
    }
}
