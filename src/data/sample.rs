//! Measurement capture around a single invocation.
//!
//! A [`Snapshot`] holds absolute readings; a [`MeasurementSample`] is always
//! the difference of two snapshots. Deltas are not clamped, a negative
//! `heap_bytes` just means memory was released during the call.

use cpu_time::ProcessTime;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Instant;

pub const ELAPSED_MS: &str = "elapsed_ms";
pub const CPU_MS: &str = "cpu_ms";
pub const ALLOC_COUNT: &str = "alloc_count";
pub const HEAP_BYTES: &str = "heap_bytes";

static EPOCH: Lazy<Instant> = Lazy::new(Instant::now);

/// Absolute metric readings at one instant, in display order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    readings: IndexMap<String, f64>,
}

impl Snapshot {
    pub fn from_readings<I, S>(readings: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            readings: readings.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Read every probe now: wall clock, process CPU time, allocator counters.
    pub fn capture() -> Self {
        let mut readings = IndexMap::with_capacity(4);
        readings.insert(
            ELAPSED_MS.to_string(),
            EPOCH.elapsed().as_nanos() as f64 / 1_000_000.0,
        );
        readings.insert(
            CPU_MS.to_string(),
            ProcessTime::now().as_duration().as_nanos() as f64 / 1_000_000.0,
        );
        readings.insert(ALLOC_COUNT.to_string(), ALLOCATIONS.load(Ordering::Relaxed) as f64);
        readings.insert(HEAP_BYTES.to_string(), HEAP_IN_USE.load(Ordering::Relaxed) as f64);
        Self { readings }
    }

    pub fn get(&self, metric: &str) -> Option<f64> {
        self.readings.get(metric).copied()
    }

    /// Sample from `self` (taken before the call) to a fresh capture.
    pub fn relative_to_now(&self) -> MeasurementSample {
        MeasurementSample::delta(self, &Snapshot::capture())
    }
}

/// Metric deltas for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MeasurementSample {
    metrics: IndexMap<String, f64>,
}

impl MeasurementSample {
    /// `after - before` for every metric present in both, in `before` order.
    pub fn delta(before: &Snapshot, after: &Snapshot) -> Self {
        let metrics = before
            .readings
            .iter()
            .filter_map(|(name, b)| after.get(name).map(|a| (name.clone(), a - b)))
            .collect();
        Self { metrics }
    }

    /// A sample carrying only wall-clock time.
    pub fn elapsed(millis: f64) -> Self {
        Self::from_metrics([(ELAPSED_MS, millis)])
    }

    pub fn from_metrics<I, S>(metrics: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            metrics: metrics.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn get(&self, metric: &str) -> Option<f64> {
        self.metrics.get(metric).copied()
    }

    pub fn elapsed_ms(&self) -> Option<f64> {
        self.get(ELAPSED_MS)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.metrics.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn metric_names(&self) -> impl Iterator<Item = &str> {
        self.metrics.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

/// Run `f` between two snapshots.
pub fn measure<T>(f: impl FnOnce() -> T) -> (T, MeasurementSample) {
    let before = Snapshot::capture();
    let out = f();
    (out, before.relative_to_now())
}

static ALLOCATIONS: AtomicU64 = AtomicU64::new(0);
static HEAP_IN_USE: AtomicI64 = AtomicI64::new(0);

/// System allocator wrapper feeding the `alloc_count` and `heap_bytes` probes.
///
/// Install it in a binary with `#[global_allocator]`; without it both probes
/// read zero and their deltas stay zero.
pub struct TrackingAlloc;

unsafe impl GlobalAlloc for TrackingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let p = System.alloc(layout);
        if !p.is_null() {
            ALLOCATIONS.fetch_add(1, Ordering::Relaxed);
            HEAP_IN_USE.fetch_add(layout.size() as i64, Ordering::Relaxed);
        }
        p
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout);
        HEAP_IN_USE.fetch_sub(layout.size() as i64, Ordering::Relaxed);
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let p = System.realloc(ptr, layout, new_size);
        if !p.is_null() {
            ALLOCATIONS.fetch_add(1, Ordering::Relaxed);
            HEAP_IN_USE.fetch_add(new_size as i64 - layout.size() as i64, Ordering::Relaxed);
        }
        p
    }
}
