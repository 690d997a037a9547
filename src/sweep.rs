//! Sweep driver: runs each benchmark over the cartesian product of its
//! parameter ranges and feeds every measurement to the report, in order.

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::config::{ErrorPolicy, ParameterDeclaration, ReportConfig};
use crate::data::decoder::encode_run_id;
use crate::data::loader::OperationDecl;
use crate::data::sample::measure;
use crate::data::utils::build_combinations;
use crate::error::{ReportError, Result};
use crate::report::ReportBuilder;

pub type BenchFn = Box<dyn FnMut(&[f64])>;

/// A declared operation plus the code to run for each parameter assignment.
pub struct Benchmark {
    pub decl: OperationDecl,
    body: BenchFn,
}

impl Benchmark {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        params: Vec<ParameterDeclaration>,
        body: impl FnMut(&[f64]) + 'static,
    ) -> Self {
        Self::from_decl(
            OperationDecl {
                namespace: namespace.into(),
                name: name.into(),
                params,
            },
            body,
        )
    }

    pub fn from_decl(decl: OperationDecl, body: impl FnMut(&[f64]) + 'static) -> Self {
        Self {
            decl,
            body: Box::new(body),
        }
    }
}

#[derive(Debug, Default)]
pub struct SweepSummary {
    pub accepted: usize,
    /// Observations (or whole benchmarks) skipped under [`ErrorPolicy::Skip`].
    pub rejected: Vec<ReportError>,
}

#[derive(Debug, Clone)]
pub struct Sweep {
    pub repeat: usize,
    pub on_error: ErrorPolicy,
    pub progress: bool,
}

impl Default for Sweep {
    fn default() -> Self {
        Self {
            repeat: 1,
            on_error: ErrorPolicy::Abort,
            progress: false,
        }
    }
}

impl Sweep {
    pub fn from_config(cfg: &ReportConfig) -> Self {
        Self {
            repeat: cfg.repeat.max(1),
            on_error: cfg.on_error,
            progress: cfg.progress,
        }
    }

    fn progress_bar(&self, total: usize) -> ProgressBar {
        if !self.progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(total as u64);
        let style = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");
        pb.set_style(style);
        pb
    }

    /// Decide what a rejected observation means for the rest of the sweep.
    fn reject(&self, err: ReportError, summary: &mut SweepSummary) -> Result<()> {
        if !err.is_observation_error() || self.on_error == ErrorPolicy::Abort {
            return Err(err);
        }
        warn!(error = %err, "skipping observation");
        summary.rejected.push(err);
        Ok(())
    }

    /// Run every benchmark `repeat` times back to back, then finish the report.
    /// Declarations are validated up front; a bad one never runs.
    pub fn run(&self, benches: &mut [Benchmark], report: &mut ReportBuilder) -> Result<SweepSummary> {
        let mut summary = SweepSummary::default();
        report.begin()?;

        let mut plans = Vec::with_capacity(benches.len());
        for bench in benches.iter() {
            let planned = bench
                .decl
                .validate()
                .and_then(|_| build_combinations(&bench.decl.params).map_err(ReportError::from));
            match planned {
                Ok(combos) => plans.push(Some(combos)),
                Err(e) => {
                    self.reject(e, &mut summary)?;
                    plans.push(None);
                }
            }
        }
        let total: usize = plans.iter().flatten().map(|c| c.len() * self.repeat).sum();
        let pb = self.progress_bar(total);

        for (bench, combos) in benches.iter_mut().zip(&plans) {
            let Some(combos) = combos else { continue };
            pb.set_message(bench.decl.qualified_name());
            info!(operation = %bench.decl.qualified_name(), invocations = combos.len() * self.repeat, "sweeping");

            for _ in 0..self.repeat {
                for values in combos {
                    let run_id = encode_run_id(&bench.decl.name, values);
                    let body = &mut bench.body;
                    let ((), sample) = measure(|| body(values.as_slice()));
                    pb.inc(1);

                    match report.observe(&bench.decl.namespace, &bench.decl.params, &run_id, sample) {
                        Ok(()) => summary.accepted += 1,
                        Err(e) => self.reject(e, &mut summary)?,
                    }
                }
            }
        }
        pb.finish_and_clear();

        report.finish()?;
        Ok(summary)
    }
}
