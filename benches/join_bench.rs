//! Benchmark for the calling hot path: argument join, callables and call queues.
//!
//! Measures the overhead sinch adds around an operation in each calling mode.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use sinch::args;
use sinch::deferred::{Arguments, Callable, Completion, Deferred, Value, join};
use sinch::object::Definition;
use std::cell::RefCell;
use std::hint::black_box;
use std::rc::Rc;

fn add() -> Callable {
    Callable::new(|values, _| Some(Value::Int(values.iter().filter_map(Value::as_int).sum())))
}

// =============================================================================
// Join Benchmarks
// =============================================================================

fn benchmark_join(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("join");

    for size in [1, 4, 16, 64] {
        group.bench_with_input(BenchmarkId::new("concrete", size), &size, |bencher, &size| {
            bencher.iter(|| {
                let arguments: Arguments = (0..size).map(|index: i64| index.into()).collect();
                join(arguments, |values| {
                    black_box(values);
                });
            });
        });

        group.bench_with_input(BenchmarkId::new("resolved_deferred", size), &size, |bencher, &size| {
            bencher.iter(|| {
                let arguments: Arguments = (0..size).map(|index: i64| Deferred::resolved(index).into()).collect();
                join(arguments, |values| {
                    black_box(values);
                });
            });
        });

        group.bench_with_input(BenchmarkId::new("late_deferred", size), &size, |bencher, &size| {
            bencher.iter(|| {
                let parked: Rc<RefCell<Vec<Completion>>> = Rc::new(RefCell::new(Vec::new()));
                let arguments: Arguments = (0..size)
                    .map(|_| {
                        let parked = Rc::clone(&parked);
                        Deferred::new(move |port| parked.borrow_mut().push(port)).into()
                    })
                    .collect();
                join(arguments, |values| {
                    black_box(values);
                });
                let ports: Vec<Completion> = parked.borrow_mut().drain(..).collect();
                for port in ports.into_iter().rev() {
                    port.complete(1);
                }
            });
        });
    }

    group.finish();
}

// =============================================================================
// Callable Benchmarks
// =============================================================================

fn benchmark_callable(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("callable");
    let add = add();

    group.bench_function("eager", |bencher| {
        bencher.iter(|| {
            add.call_with(args![black_box(1), black_box(2)], |value| {
                black_box(value);
            });
        });
    });

    group.bench_function("deferred", |bencher| {
        bencher.iter(|| {
            add.call(args![black_box(1), black_box(2)]).resolve_with(|value| {
                black_box(value);
            });
        });
    });

    for depth in [1, 8, 32] {
        group.bench_with_input(BenchmarkId::new("nested", depth), &depth, |bencher, &depth| {
            bencher.iter(|| {
                let mut deferred = add.call(args![1]);
                for _ in 0..depth {
                    deferred = add.call(args![deferred, 1]);
                }
                deferred.resolve_with(|value| {
                    black_box(value);
                });
            });
        });
    }

    group.finish();
}

// =============================================================================
// Call Queue Benchmarks
// =============================================================================

fn benchmark_queue(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("call_queue");

    for calls in [1, 16, 128] {
        group.bench_with_input(BenchmarkId::new("drain", calls), &calls, |bencher, &calls| {
            let parked: Rc<RefCell<Option<Completion>>> = Rc::new(RefCell::new(None));
            let store = Rc::clone(&parked);
            let factory = Definition::new("Counter")
                .initializer(move |_, _, port| *store.borrow_mut() = Some(port))
                .method("echo", |_, values, _| values.into_iter().next())
                .build()
                .expect("valid definition");

            bencher.iter(|| {
                let handle = factory.construct(args![]);
                for index in 0..calls {
                    handle
                        .call_with("echo", args![index], |value| {
                            black_box(value);
                        })
                        .expect("declared method");
                }
                if let Some(port) = parked.borrow_mut().take() {
                    port.done();
                }
                black_box(handle.is_ready())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_join, benchmark_callable, benchmark_queue);
criterion_main!(benches);
