//! Dispatch overhead benchmarks
//!
//! Measures the round trip of an empty work item per strategy: dispatch,
//! run on a worker, post back, run the callback on the main loop. The work
//! itself is free, so the numbers are pure dispatcher and host overhead.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tinythreading::models::DispatchSettings;
use tinythreading::{Dispatcher, MainLoop, Strategy, WorkerRuntime};

const BATCH: usize = 64;

fn setup_runtime() -> WorkerRuntime {
    let settings = DispatchSettings {
        max_in_flight: BATCH,
        ..DispatchSettings::default()
    };
    WorkerRuntime::new(&settings).expect("Failed to build worker runtime")
}

fn bench_round_trip(c: &mut Criterion) {
    let runtime = setup_runtime();
    let mut group = c.benchmark_group("round_trip");
    group.measurement_time(Duration::from_secs(5));

    for strategy in Strategy::ALL {
        let mut main_loop = MainLoop::new().expect("Failed to create main loop");
        let dispatcher = Dispatcher::new(
            runtime.executor(strategy),
            Arc::new(main_loop.handle()),
            BATCH,
        );
        let delivered = Arc::new(AtomicUsize::new(0));

        group.bench_with_input(
            BenchmarkId::new("batch_of_64", strategy),
            &strategy,
            |b, _| {
                b.iter(|| {
                    delivered.store(0, Ordering::Relaxed);
                    for i in 0..BATCH {
                        let delivered = Arc::clone(&delivered);
                        dispatcher
                            .dispatch(
                                move || black_box(i),
                                move |_| {
                                    delivered.fetch_add(1, Ordering::Relaxed);
                                },
                            )
                            .expect("Dispatcher saturated");
                    }
                    main_loop
                        .run_until(
                            || delivered.load(Ordering::Relaxed) == BATCH,
                            Duration::from_secs(10),
                        )
                        .expect("Callbacks not delivered");
                });
            },
        );
    }

    group.finish();
}

fn bench_post_to_main_thread(c: &mut Criterion) {
    let mut main_loop = MainLoop::new().expect("Failed to create main loop");
    let handle = main_loop.handle();

    c.bench_function("post_and_drain_1000", |b| {
        b.iter(|| {
            for i in 0..1000 {
                handle
                    .invoke(move || {
                        black_box(i);
                    })
                    .expect("Main loop gone");
            }
            main_loop.run_pending()
        });
    });
}

criterion_group!(benches, bench_round_trip, bench_post_to_main_thread);
criterion_main!(benches);
