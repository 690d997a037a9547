//! Built-in benchmarks for `perfchart demo`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::hint::black_box;
use std::sync::Mutex;
use std::thread;

use perfchart::data::utils::sweep_values;
use perfchart::{Benchmark, ParameterDeclaration};

/// push_str into one buffer vs. format! + join.
fn string_building() -> Benchmark {
    let params = vec![
        ParameterDeclaration::series("strategy").range(0.0, 1.0, 1.0),
        ParameterDeclaration::x("pieces").range(1_000.0, 10_000.0, 3_000.0),
    ];
    Benchmark::new("Strings", "build", params, |v| {
        let pieces = v[1] as usize;
        let out = if v[0] == 0.0 {
            let mut s = String::new();
            for i in 0..pieces {
                let _ = write!(s, "{},", i);
            }
            s
        } else {
            (0..pieces).map(|i| format!("{}", i)).collect::<Vec<_>>().join(",")
        };
        black_box(out);
    })
}

/// Stable vs. unstable sort, one page for random input and one for presorted.
fn sorting() -> Benchmark {
    let len = ParameterDeclaration::x("len").range(10_000.0, 100_000.0, 30_000.0);
    let mut rng = StdRng::seed_from_u64(42);
    let mut inputs: HashMap<(bool, usize), Vec<u32>> = HashMap::new();
    for n in sweep_values(&len).unwrap_or_default() {
        let n = n as usize;
        let random: Vec<u32> = (0..n).map(|_| rng.gen()).collect();
        let mut sorted = random.clone();
        sorted.sort_unstable();
        inputs.insert((false, n), random);
        inputs.insert((true, n), sorted);
    }

    let params = vec![
        ParameterDeclaration::page("presorted").range(0.0, 1.0, 1.0),
        ParameterDeclaration::series("unstable").range(0.0, 1.0, 1.0),
        len,
    ];
    Benchmark::new("Sorting", "sort", params, move |v| {
        let mut data = inputs
            .get(&(v[0] == 1.0, v[2] as usize))
            .cloned()
            .unwrap_or_default();
        if v[1] == 1.0 {
            data.sort_unstable();
        } else {
            data.sort();
        }
        black_box(data);
    })
}

/// Several threads filling one shared vector.
fn shared_fill() -> Benchmark {
    let params = vec![
        ParameterDeclaration::series("threads").range(1.0, 4.0, 1.0),
        ParameterDeclaration::x("entries").range(100_000.0, 500_000.0, 100_000.0),
    ];
    Benchmark::new("Queues", "fill", params, |v| {
        let threads = v[0] as usize;
        let entries = v[1] as usize;
        let shared = Mutex::new(Vec::with_capacity(entries));
        let per_thread = entries / threads;
        let remainder = entries % threads;

        thread::scope(|s| {
            for t in 0..threads {
                let count = if t == 0 { per_thread + remainder } else { per_thread };
                let shared = &shared;
                s.spawn(move || {
                    for i in 0..count {
                        if let Ok(mut guard) = shared.lock() {
                            guard.push(i as u32);
                        }
                    }
                });
            }
        });
        black_box(shared);
    })
}

pub fn benchmarks() -> Vec<Benchmark> {
    vec![string_building(), sorting(), shared_fill()]
}
