//! Incremental page → series → point grouping for one operation at a time.
//!
//! Observations must arrive one by one in completion order. While they keep
//! naming the same operation they extend the current [`MethodAggregate`];
//! the first observation of a different operation finalizes it and hands it
//! back to the caller, which passes it on to the renderers.
//!
//! Every step is all-or-nothing: an observation that fails to decode or
//! classify leaves the accumulating aggregate exactly as it was.

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use tracing::{debug, info};

use crate::config::ParameterDeclaration;
use crate::data::axis::{classify, AxisKey, AxisRoles};
use crate::data::decoder::{self, ObservationDescriptor, OperationId};
use crate::data::sample::MeasurementSample;
use crate::error::{ReportError, Result};

fn values_as_seq<K, V, S>(map: &IndexMap<K, V>, s: S) -> std::result::Result<S::Ok, S::Error>
where
    V: Serialize,
    S: Serializer,
{
    s.collect_seq(map.values())
}

/// One invocation on the chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub sample: MeasurementSample,
}

/// One plotted line: points in arrival order, repeated x values included.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    key: AxisKey,
    points: Vec<Point>,
}

impl Series {
    fn new(key: AxisKey) -> Self {
        Self {
            key,
            points: Vec::new(),
        }
    }

    pub fn key(&self) -> &AxisKey {
        &self.key
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn xs(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.x).collect()
    }

    /// Values of `metric`, `NaN` where a point's sample lacks it.
    pub fn ys(&self, metric: &str) -> Vec<f64> {
        self.points
            .iter()
            .map(|p| p.sample.get(metric).unwrap_or(f64::NAN))
            .collect()
    }
}

/// One chart: the series sharing a page key, in first-seen order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    key: AxisKey,
    #[serde(serialize_with = "values_as_seq")]
    series: IndexMap<AxisKey, Series>,
}

impl Page {
    fn new(key: AxisKey) -> Self {
        Self {
            key,
            series: IndexMap::new(),
        }
    }

    pub fn key(&self) -> &AxisKey {
        &self.key
    }

    pub fn series(&self) -> impl Iterator<Item = &Series> {
        self.series.values()
    }

    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    pub fn get(&self, key: &AxisKey) -> Option<&Series> {
        self.series.get(key)
    }
}

/// Everything recorded for one operation.
///
/// Only [`Aggregator`] can append to it; once handed out it is read-only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodAggregate {
    operation: OperationId,
    params: Vec<ParameterDeclaration>,
    roles: AxisRoles,
    #[serde(serialize_with = "values_as_seq")]
    pages: IndexMap<AxisKey, Page>,
}

impl MethodAggregate {
    /// Classify `params` and start an empty aggregate. Fails fast on a bad
    /// X axis so nothing partial is ever built.
    pub fn new(operation: OperationId, params: &[ParameterDeclaration]) -> Result<Self> {
        let roles = classify(&operation.to_string(), params)?;
        Ok(Self {
            operation,
            params: params.to_vec(),
            roles,
            pages: IndexMap::new(),
        })
    }

    fn add(&mut self, descriptor: &ObservationDescriptor, sample: MeasurementSample) -> Result<()> {
        if descriptor.operation() != &self.operation {
            return Err(ReportError::Consistency {
                expected: self.operation.clone(),
                found: descriptor.operation().clone(),
            });
        }
        if descriptor.values().len() != self.params.len() {
            return Err(ReportError::Arity {
                operation: self.operation.clone(),
                expected: self.params.len(),
                found: descriptor.values().len(),
            });
        }

        let page_key = AxisKey::build(descriptor, &self.params, &self.roles.page);
        let series_key = AxisKey::build(descriptor, &self.params, &self.roles.series);
        let x = descriptor.values()[self.roles.x];

        let page = self
            .pages
            .entry(page_key)
            .or_insert_with_key(|k| Page::new(k.clone()));
        let series = page
            .series
            .entry(series_key)
            .or_insert_with_key(|k| Series::new(k.clone()));
        series.points.push(Point { x, sample });
        Ok(())
    }

    pub fn operation(&self) -> &OperationId {
        &self.operation
    }

    pub fn params(&self) -> &[ParameterDeclaration] {
        &self.params
    }

    pub fn roles(&self) -> &AxisRoles {
        &self.roles
    }

    /// Declaration of the X axis parameter.
    pub fn x_param(&self) -> &ParameterDeclaration {
        &self.params[self.roles.x]
    }

    pub fn pages(&self) -> impl Iterator<Item = &Page> {
        self.pages.values()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn get(&self, key: &AxisKey) -> Option<&Page> {
        self.pages.get(key)
    }

    pub fn point_count(&self) -> usize {
        self.pages
            .values()
            .flat_map(|p| p.series.values())
            .map(|s| s.points.len())
            .sum()
    }
}

/// Where the aggregator currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregatorState<'a> {
    Empty,
    Accumulating(&'a OperationId),
}

/// The stateful core: owns at most one accumulating aggregate.
///
/// Not synchronized; callers deliver observations from a single thread.
#[derive(Debug, Default)]
pub struct Aggregator {
    current: Option<MethodAggregate>,
    emitted: usize,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> AggregatorState<'_> {
        match &self.current {
            Some(agg) => AggregatorState::Accumulating(&agg.operation),
            None => AggregatorState::Empty,
        }
    }

    pub fn current(&self) -> Option<&MethodAggregate> {
        self.current.as_ref()
    }

    /// Number of aggregates handed out so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Decode `run_id` and ingest it. Returns the previous operation's
    /// aggregate when this observation starts a new operation.
    pub fn begin_observation(
        &mut self,
        namespace: &str,
        params: &[ParameterDeclaration],
        run_id: &str,
        sample: MeasurementSample,
    ) -> Result<Option<MethodAggregate>> {
        let descriptor = decoder::decode(namespace, run_id, params.len())?;
        self.ingest(params, &descriptor, sample)
    }

    /// Structured form of [`begin_observation`](Self::begin_observation).
    pub fn ingest(
        &mut self,
        params: &[ParameterDeclaration],
        descriptor: &ObservationDescriptor,
        sample: MeasurementSample,
    ) -> Result<Option<MethodAggregate>> {
        if let Some(agg) = self.current.as_mut() {
            if agg.operation == *descriptor.operation() {
                agg.add(descriptor, sample)?;
                debug!(operation = %agg.operation, values = ?descriptor.values(), "added point");
                return Ok(None);
            }
        }

        // build the new aggregate before touching the current one
        let mut fresh = MethodAggregate::new(descriptor.operation().clone(), params)?;
        fresh.add(descriptor, sample)?;
        debug!(operation = %fresh.operation, roles = ?fresh.roles, "started aggregate");

        let finished = self.current.replace(fresh);
        Ok(finished.map(|agg| self.emit(agg)))
    }

    /// Append to the accumulating aggregate without any transition.
    pub fn add_observation(
        &mut self,
        descriptor: &ObservationDescriptor,
        sample: MeasurementSample,
    ) -> Result<()> {
        match self.current.as_mut() {
            Some(agg) => agg.add(descriptor, sample),
            None => Err(ReportError::NotAccumulating(descriptor.operation().clone())),
        }
    }

    /// End of stream: hand out whatever is accumulating.
    pub fn finalize_run(&mut self) -> Option<MethodAggregate> {
        self.current.take().map(|agg| self.emit(agg))
    }

    fn emit(&mut self, agg: MethodAggregate) -> MethodAggregate {
        self.emitted += 1;
        info!(
            operation = %agg.operation,
            pages = agg.page_count(),
            points = agg.point_count(),
            "finalized aggregate"
        );
        agg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, DecodeError};

    fn t(ms: f64) -> MeasurementSample {
        MeasurementSample::elapsed(ms)
    }

    fn xs_of(series: &Series) -> Vec<f64> {
        series.xs()
    }

    #[test]
    fn series_keep_first_seen_order_and_arrival_order() {
        let params = vec![ParameterDeclaration::series("s"), ParameterDeclaration::x("x")];
        let mut agg = Aggregator::new();
        for (i, (s, x)) in [(1.0, 10.0), (2.0, 20.0), (1.0, 30.0), (3.0, 40.0)].iter().enumerate() {
            let run_id = decoder::encode_run_id("m", &[*s, *x]);
            assert!(agg.begin_observation("C", &params, &run_id, t(i as f64)).unwrap().is_none());
        }
        let done = agg.finalize_run().unwrap();
        assert_eq!(done.page_count(), 1);
        let page = done.pages().next().unwrap();
        let keys: Vec<String> = page.series().map(|s| s.key().to_string()).collect();
        assert_eq!(keys, vec!["s=1", "s=2", "s=3"]);
        let s1 = page.get(&AxisKey::from_pairs([("s", 1.0)])).unwrap();
        assert_eq!(xs_of(s1), vec![10.0, 30.0]);
        assert_eq!(s1.ys("elapsed_ms"), vec![0.0, 2.0]);
    }

    #[test]
    fn pages_and_series_group_by_value() {
        let params = vec![
            ParameterDeclaration::page("p"),
            ParameterDeclaration::series("s"),
            ParameterDeclaration::x("x"),
        ];
        let mut agg = Aggregator::new();
        for v in [[1.0, 0.0, 1.0], [1.0, 1.0, 2.0], [2.0, 0.0, 3.0], [1.0, 0.0, 4.0]] {
            agg.begin_observation("C", &params, &decoder::encode_run_id("m", &v), t(1.0))
                .unwrap();
        }
        let done = agg.finalize_run().unwrap();
        assert_eq!(done.page_count(), 2);

        let p1 = done.get(&AxisKey::from_pairs([("p", 1.0)])).unwrap();
        assert_eq!(p1.series_count(), 2);
        assert_eq!(xs_of(p1.get(&AxisKey::from_pairs([("s", 0.0)])).unwrap()), vec![1.0, 4.0]);
        assert_eq!(xs_of(p1.get(&AxisKey::from_pairs([("s", 1.0)])).unwrap()), vec![2.0]);

        let p2 = done.get(&AxisKey::from_pairs([("p", 2.0)])).unwrap();
        assert_eq!(p2.series_count(), 1);
        assert_eq!(xs_of(p2.get(&AxisKey::from_pairs([("s", 0.0)])).unwrap()), vec![3.0]);
    }

    #[test]
    fn new_operation_emits_previous_exactly_once() {
        let params = vec![ParameterDeclaration::x("n")];
        let mut agg = Aggregator::new();
        assert_eq!(agg.state(), AggregatorState::Empty);

        assert!(agg.begin_observation("ClassX", &params, "methodA[1]", t(1.0)).unwrap().is_none());
        assert!(agg.begin_observation("ClassX", &params, "methodA[2]", t(2.0)).unwrap().is_none());
        let snapshot = agg.current().cloned().unwrap();

        let emitted = agg
            .begin_observation("ClassX", &params, "methodB[1]", t(3.0))
            .unwrap()
            .unwrap();
        assert_eq!(emitted, snapshot);
        assert_eq!(emitted.operation(), &OperationId::new("ClassX", "methodA"));
        assert_eq!(agg.emitted(), 1);
        assert_eq!(
            agg.state(),
            AggregatorState::Accumulating(&OperationId::new("ClassX", "methodB"))
        );

        let last = agg.finalize_run().unwrap();
        assert_eq!(last.operation().name, "methodB");
        assert_eq!(last.point_count(), 1);
        assert!(agg.finalize_run().is_none());
        assert_eq!(agg.emitted(), 2);
    }

    #[test]
    fn same_method_name_in_other_namespace_is_a_new_operation() {
        let params = vec![ParameterDeclaration::x("n")];
        let mut agg = Aggregator::new();
        agg.begin_observation("A", &params, "run[1]", t(1.0)).unwrap();
        let emitted = agg.begin_observation("B", &params, "run[1]", t(1.0)).unwrap();
        assert_eq!(emitted.unwrap().operation().namespace, "A");
    }

    #[test]
    fn no_page_or_series_params_give_one_default_group() {
        let params = vec![ParameterDeclaration::x("n")];
        let mut agg = Aggregator::new();
        for n in [1.0, 2.0, 1.0, 1.0] {
            agg.begin_observation("C", &params, &decoder::encode_run_id("m", &[n]), t(n))
                .unwrap();
        }
        let done = agg.finalize_run().unwrap();
        assert_eq!(done.page_count(), 1);
        let page = done.pages().next().unwrap();
        assert!(page.key().is_empty());
        assert_eq!(page.series_count(), 1);
        let series = page.series().next().unwrap();
        assert!(series.key().is_empty());
        assert_eq!(series.xs(), vec![1.0, 2.0, 1.0, 1.0]);
    }

    #[test]
    fn rejected_observations_leave_aggregate_untouched() {
        let params = vec![ParameterDeclaration::series("s"), ParameterDeclaration::x("x")];
        let mut agg = Aggregator::new();
        agg.begin_observation("C", &params, "m[1, 1]", t(1.0)).unwrap();
        let before = agg.current().cloned().unwrap();

        let err = agg.begin_observation("C", &params, "m 1, 2", t(1.0)).unwrap_err();
        assert!(matches!(err, ReportError::Decode(DecodeError::Shape(_))));

        let err = agg.begin_observation("C", &params, "m[1]", t(1.0)).unwrap_err();
        assert!(matches!(err, ReportError::Decode(DecodeError::ValueCount { .. })));

        // a new operation with a broken X axis must not finalize the current one
        let bad = vec![ParameterDeclaration::series("a"), ParameterDeclaration::series("b")];
        let err = agg.begin_observation("C", &bad, "other[1, 2]", t(1.0)).unwrap_err();
        assert!(matches!(err, ReportError::Config(ConfigError::NoXAxis(_))));

        assert_eq!(agg.current(), Some(&before));
        assert_eq!(agg.emitted(), 0);
    }

    #[test]
    fn direct_add_checks_operation_identity() {
        let params = vec![ParameterDeclaration::x("n")];
        let mut agg = Aggregator::new();

        let other = ObservationDescriptor::new(OperationId::new("C", "b"), vec![1.0]);
        assert!(matches!(
            agg.add_observation(&other, t(1.0)),
            Err(ReportError::NotAccumulating(_))
        ));

        agg.begin_observation("C", &params, "a[1]", t(1.0)).unwrap();
        assert!(matches!(
            agg.add_observation(&other, t(1.0)),
            Err(ReportError::Consistency { .. })
        ));

        let same = ObservationDescriptor::new(OperationId::new("C", "a"), vec![5.0]);
        agg.add_observation(&same, t(2.0)).unwrap();

        let short = ObservationDescriptor::new(OperationId::new("C", "a"), vec![]);
        assert!(matches!(
            agg.add_observation(&short, t(2.0)),
            Err(ReportError::Arity { expected: 1, found: 0, .. })
        ));
        assert_eq!(agg.current().unwrap().point_count(), 2);
    }

    #[test]
    fn repeated_tuples_append_duplicates() {
        let params = vec![ParameterDeclaration::x("n")];
        let mut agg = Aggregator::new();
        agg.begin_observation("C", &params, "m[3]", t(1.0)).unwrap();
        agg.begin_observation("C", &params, "m[3]", t(9.0)).unwrap();
        let done = agg.finalize_run().unwrap();
        let series = done.pages().next().unwrap().series().next().unwrap();
        assert_eq!(series.points().len(), 2);
        assert_eq!(series.ys("elapsed_ms"), vec![1.0, 9.0]);
    }

    #[test]
    fn aggregate_serializes_pages_as_list() {
        let params = vec![ParameterDeclaration::page("p"), ParameterDeclaration::x("x")];
        let mut agg = Aggregator::new();
        agg.begin_observation("C", &params, "m[1, 2]", t(1.5)).unwrap();
        let done = agg.finalize_run().unwrap();
        let v = serde_json::to_value(&done).unwrap();
        assert_eq!(v["operation"]["name"], "m");
        assert_eq!(v["pages"][0]["key"][0]["name"], "p");
        assert_eq!(v["pages"][0]["series"][0]["points"][0]["x"], 2.0);
        assert_eq!(v["pages"][0]["series"][0]["points"][0]["sample"]["elapsed_ms"], 1.5);
    }
}
