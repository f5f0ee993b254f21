// FFT STRESS HARNESS INTEGRATION TESTS
// DRIVE REAL WORKER THREADS THROUGH THE PUBLIC LIBRARY API.
// EVERY RUN IS BOUNDED BY AN EXPLICIT SHUTDOWN OR A SHORT DEADLINE.

use std::sync::Arc;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use fft_stress::harness;
use fft_stress::stats::Reporter;
use fft_stress::worker::Worker;
use fft_stress::worker::FLUSH_BATCH;
use fft_stress::Config;
use fft_stress::IterationCounter;
use fft_stress::Shutdown;
use fft_stress::TransformSize;

fn size(len: usize) -> TransformSize {
    TransformSize::new(len).unwrap()
}

fn spawn_workers(
    sizes: &[usize],
    counter: &Arc<IterationCounter>,
    shutdown: &Shutdown,
) -> Vec<thread::JoinHandle<u64>> {
    sizes
        .iter()
        .enumerate()
        .map(|(id, &len)| {
            let worker = Worker::new(id, size(len), counter.clone(), shutdown.clone());
            thread::spawn(move || worker.run())
        })
        .collect()
}

// SHARED COUNTER NEVER GOES BACKWARDS AND ENDS AT THE EXACT SUM OF LOCAL TOTALS

#[test]
fn counter_monotonic_and_exact_after_shutdown() {
    let counter = Arc::new(IterationCounter::new());
    let shutdown = Shutdown::new();
    let handles = spawn_workers(&[8, 64, 512, 1024], &counter, &shutdown);

    let mut prev = 0;
    let until = Instant::now() + Duration::from_millis(300);
    while Instant::now() < until {
        let cur = counter.load();
        assert!(cur >= prev, "counter went backwards: {} -> {}", prev, cur);
        assert_eq!(cur % FLUSH_BATCH, 0, "mid-run counter only moves in batches");
        prev = cur;
        thread::sleep(Duration::from_millis(5));
    }

    shutdown.request();
    let totals: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let sum: u64 = totals.iter().sum();
    assert!(counter.load() >= prev);
    assert_eq!(counter.load(), sum);
}

// SHUTDOWN LATENCY IS ONE ROUND-TRIP PER WORKER, NOT A TIMEOUT

#[test]
fn shutdown_drains_promptly() {
    let counter = Arc::new(IterationCounter::new());
    let shutdown = Shutdown::new();
    let handles = spawn_workers(&[1024, 1024], &counter, &shutdown);

    thread::sleep(Duration::from_millis(100));
    let requested_at = Instant::now();
    assert!(shutdown.request());
    for h in handles {
        h.join().unwrap();
    }
    assert!(
        requested_at.elapsed() < Duration::from_secs(2),
        "workers took {:?} to stop",
        requested_at.elapsed()
    );
}

// REPORTER OUTPUT: ONE LINE PER INTERVAL, ITERATION COLUMN NON-DECREASING

fn iterations_column(line: &str) -> u64 {
    let field = line
        .split('|')
        .find(|f| f.trim_start().starts_with("iterations:"))
        .unwrap_or_else(|| panic!("no iterations field in {:?}", line));
    field
        .trim()
        .trim_start_matches("iterations:")
        .trim()
        .parse()
        .unwrap()
}

#[test]
fn reporter_lines_track_progress() {
    let counter = Arc::new(IterationCounter::new());
    let shutdown = Shutdown::new();
    let started_at = Instant::now();
    let handles = spawn_workers(&[16, 32], &counter, &shutdown);

    let reporter = Reporter::new(
        counter.clone(),
        shutdown.clone(),
        started_at,
        Duration::from_millis(40),
    )
    .with_deadline(Some(Duration::from_millis(400)));
    let report = thread::spawn(move || {
        let mut out = Vec::new();
        reporter.run(&mut out).map(|_| out)
    });

    let out = report.join().unwrap().unwrap();
    for h in handles {
        h.join().unwrap();
    }
    assert!(!shutdown.is_running());

    let text = String::from_utf8(out).unwrap();
    let values: Vec<u64> = text.lines().map(iterations_column).collect();
    assert!(values.len() >= 3, "too few reports:\n{}", text);
    assert!(values.windows(2).all(|w| w[0] <= w[1]), "{:?}", values);
    assert!(*values.last().unwrap() <= counter.load());
}

// FULL HARNESS: CLAMPED WORKER COUNT, ROUND-ROBIN SIZES, CONSISTENT SUMMARY

#[test]
fn harness_run_with_clamped_workers() {
    let available = harness::available_cores();
    let workers = harness::clamp_workers(available + 3, available).min(4);

    let config = Config {
        workers,
        sizes: vec![size(8), size(128)],
        interval: Duration::from_millis(50),
        duration: Some(Duration::from_millis(250)),
    };
    let shutdown = Shutdown::new();
    let summary = harness::run(&config, &shutdown).unwrap();

    assert_eq!(summary.workers.len(), workers);
    for w in summary.workers.iter() {
        assert_eq!(w.size, config.sizes[w.id % 2]);
    }
    let sum: u64 = summary.workers.iter().map(|w| w.iterations).sum();
    assert_eq!(summary.iterations, sum);
    assert!(summary.rate() >= 0.0);

    let mut buf = Vec::new();
    summary.format(&mut buf).unwrap();
    let text = String::from_utf8(buf).unwrap();
    assert!(text.contains(&format!("total iterations: {}", sum)));
}

#[test]
fn harness_stops_on_external_request() {
    let shutdown = Shutdown::new();
    let config = Config {
        workers: 2,
        sizes: vec![size(256)],
        interval: Duration::from_secs(2),
        duration: None,
    };

    let remote = shutdown.clone();
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(150));
        remote.request()
    });

    let started = Instant::now();
    let summary = harness::run(&config, &shutdown).unwrap();
    assert!(stopper.join().unwrap());
    // The reporter polls in short slices, so a 2s interval does not hold
    // up the join.
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(summary.workers.len(), 2);
}
