use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::oracle::{Evaluation, Features, HeuristicOracle, Oracle, OracleError, UniformOracle};
use crate::server::{InferenceServer, ServerOptions};
use kb_core::A;
use kb_features::{F, SCORE_DIFF_INDEX};

/// Uniform evaluator that records the size of every batch it sees.
struct RecordingOracle {
    sizes: Arc<Mutex<Vec<usize>>>,
}

impl Oracle for RecordingOracle {
    fn infer(&self, features: &Features) -> Result<Evaluation, OracleError> {
        Ok(self.infer_batch(std::slice::from_ref(features))?[0])
    }

    fn infer_batch(&self, batch: &[Features]) -> Result<Vec<Evaluation>, OracleError> {
        self.sizes.lock().unwrap().push(batch.len());
        Ok(batch
            .iter()
            .map(|_| Evaluation {
                policy: [1.0 / (A as f32); A],
                value: 0.0,
            })
            .collect())
    }
}

/// Evaluator that stalls long enough for requests to pile up behind it.
struct SlowOracle {
    delay: Duration,
}

impl Oracle for SlowOracle {
    fn infer(&self, features: &Features) -> Result<Evaluation, OracleError> {
        Ok(self.infer_batch(std::slice::from_ref(features))?[0])
    }

    fn infer_batch(&self, batch: &[Features]) -> Result<Vec<Evaluation>, OracleError> {
        thread::sleep(self.delay);
        UniformOracle.infer_batch(batch)
    }
}

struct FailingOracle;

impl Oracle for FailingOracle {
    fn infer(&self, _features: &Features) -> Result<Evaluation, OracleError> {
        Err(OracleError::Eval("broken evaluator".to_string()))
    }
}

#[test]
fn concurrent_callers_all_served_with_bounded_batches() {
    let sizes = Arc::new(Mutex::new(Vec::new()));
    let server = Arc::new(InferenceServer::start(
        RecordingOracle {
            sizes: Arc::clone(&sizes),
        },
        ServerOptions {
            max_batch: 8,
            max_wait: Duration::from_millis(5),
        },
    ));

    let callers = 50usize;
    let mut handles = Vec::with_capacity(callers);
    for i in 0..callers {
        let server = Arc::clone(&server);
        handles.push(thread::spawn(move || {
            let mut f: Features = [0.0; F];
            f[0] = i as f32;
            server.infer(&f)
        }));
    }
    for h in handles {
        let ev = h.join().unwrap().expect("every caller receives a result");
        let sum: f32 = ev.policy.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }

    let sizes = sizes.lock().unwrap();
    assert!(!sizes.is_empty());
    assert!(sizes.iter().all(|&n| n >= 1 && n <= 8), "sizes={sizes:?}");
    assert_eq!(sizes.iter().sum::<usize>(), callers);

    let stats = server.stats_snapshot();
    assert_eq!(stats.requests, callers as u64);
    assert_eq!(stats.total_batch_size, callers as u64);
    assert_eq!(stats.batches, sizes.len() as u64);
    assert!(stats.avg_batch_size >= 1.0 && stats.avg_batch_size <= 8.0);
}

#[test]
fn infer_batch_repeated_features_yield_identical_results() {
    let server = InferenceServer::start(HeuristicOracle, ServerOptions::default());

    let mut f: Features = [0.0; F];
    f[SCORE_DIFF_INDEX] = 0.375;
    let out = server.infer_batch(&[f, f]).unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(out[0], out[1]);
    assert_eq!(out[0].value, 0.375);
}

#[test]
fn single_caller_is_flushed_by_the_window() {
    let sizes = Arc::new(Mutex::new(Vec::new()));
    let server = InferenceServer::start(
        RecordingOracle {
            sizes: Arc::clone(&sizes),
        },
        ServerOptions {
            max_batch: 32,
            max_wait: Duration::from_millis(2),
        },
    );

    // Load below batch size: a lone request must not wait for a full batch.
    server.infer(&[0.0; F]).unwrap();
    let stats = server.stats_snapshot();
    assert_eq!(stats.batches, 1);
    assert_eq!(stats.requests, 1);
    assert_eq!(sizes.lock().unwrap().as_slice(), [1usize]);
}

#[test]
fn infer_after_stop_returns_shutting_down() {
    let server = InferenceServer::start(UniformOracle, ServerOptions::default());
    server.stop();
    match server.infer(&[0.0; F]) {
        Err(OracleError::ShuttingDown) => {}
        other => panic!("expected ShuttingDown, got {other:?}"),
    }
}

#[test]
fn stop_fails_requests_still_queued_behind_a_busy_dispatch() {
    let server = Arc::new(InferenceServer::start(
        SlowOracle {
            delay: Duration::from_millis(150),
        },
        ServerOptions {
            max_batch: 1,
            max_wait: Duration::from_millis(1),
        },
    ));

    // First caller lands in the in-flight batch and resolves normally.
    let first = {
        let server = Arc::clone(&server);
        thread::spawn(move || server.infer(&[0.0; F]))
    };
    thread::sleep(Duration::from_millis(30));

    // Second caller queues behind the stalled evaluator call.
    let second = {
        let server = Arc::clone(&server);
        thread::spawn(move || server.infer(&[0.0; F]))
    };
    thread::sleep(Duration::from_millis(30));

    server.stop();

    assert!(first.join().unwrap().is_ok());
    match second.join().unwrap() {
        Err(OracleError::ShuttingDown) => {}
        other => panic!("expected ShuttingDown, got {other:?}"),
    }
}

#[test]
fn evaluator_failure_propagates_to_every_caller() {
    let server = Arc::new(InferenceServer::start(
        FailingOracle,
        ServerOptions {
            max_batch: 4,
            max_wait: Duration::from_millis(5),
        },
    ));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let server = Arc::clone(&server);
        handles.push(thread::spawn(move || server.infer(&[0.0; F])));
    }
    for h in handles {
        match h.join().unwrap() {
            Err(OracleError::Eval(msg)) => assert!(msg.contains("broken")),
            other => panic!("expected Eval error, got {other:?}"),
        }
    }
}
