//! Batched inference dispatcher: many callers, one evaluator.
//!
//! A single dispatch thread takes exclusive ownership of the evaluator and
//! coalesces concurrent `infer` calls into batches. No locking is needed
//! around evaluator calls; the only shared state is the request queue and the
//! statistics counters.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::oracle::{Evaluation, Features, Oracle, OracleError};

/// Floor for queue-pull timeouts so the collection loop stays responsive at
/// the edge of the batching window.
const POLL_FLOOR: Duration = Duration::from_micros(200);

#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Maximum batch size before flushing.
    pub max_batch: usize,
    /// Maximum time to wait for a batch to fill.
    pub max_wait: Duration,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            max_batch: 32,
            max_wait: Duration::from_millis(2),
        }
    }
}

#[derive(Debug, Default)]
struct ServerStats {
    batches: u64,
    requests: u64,
    total_batch_size: u64,
}

#[derive(Debug, Clone)]
pub struct ServerStatsSnapshot {
    pub batches: u64,
    pub requests: u64,
    pub total_batch_size: u64,
    pub avg_batch_size: f64,
}

/// One queued evaluation request: features in, single-assignment result out.
///
/// The per-request channel is the rendezvous: the caller blocks on `recv`
/// until the dispatch thread sends exactly one result.
struct Request {
    features: Features,
    tx: mpsc::Sender<Result<Evaluation, OracleError>>,
}

/// Batching dispatcher around one evaluator.
///
/// `start` spawns the dispatch thread; `stop` (also run on drop) halts it and
/// fails every request still pending with `OracleError::ShuttingDown`, so no
/// caller is left blocked across shutdown.
pub struct InferenceServer {
    submit_tx: Mutex<mpsc::Sender<Request>>,
    running: Arc<AtomicBool>,
    stats: Arc<Mutex<ServerStats>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl InferenceServer {
    pub fn start(oracle: impl Oracle + 'static, opts: ServerOptions) -> Self {
        let (submit_tx, submit_rx) = mpsc::channel::<Request>();
        let running = Arc::new(AtomicBool::new(true));
        let stats = Arc::new(Mutex::new(ServerStats::default()));

        let running_d = Arc::clone(&running);
        let stats_d = Arc::clone(&stats);
        let handle = thread::spawn(move || {
            dispatch_loop(oracle, submit_rx, opts, running_d, stats_d);
        });

        Self {
            submit_tx: Mutex::new(submit_tx),
            running,
            stats,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Request one evaluation. Blocks until the dispatch thread fills the
    /// result slot. Safe to call from arbitrary threads.
    pub fn infer(&self, features: &Features) -> Result<Evaluation, OracleError> {
        let rx = self.submit(features)?;
        match rx.recv() {
            Ok(res) => res,
            Err(_) => Err(OracleError::ShuttingDown),
        }
    }

    /// Request evaluations for every element, blocking until all resolve.
    ///
    /// All elements are enqueued before any wait, so they can land in the
    /// same dispatcher batch.
    pub fn infer_batch(&self, batch: &[Features]) -> Result<Vec<Evaluation>, OracleError> {
        let mut slots = Vec::with_capacity(batch.len());
        for f in batch {
            slots.push(self.submit(f)?);
        }
        let mut out = Vec::with_capacity(slots.len());
        for rx in slots {
            match rx.recv() {
                Ok(res) => out.push(res?),
                Err(_) => return Err(OracleError::ShuttingDown),
            }
        }
        Ok(out)
    }

    pub fn stats_snapshot(&self) -> ServerStatsSnapshot {
        let s = self.stats.lock().unwrap();
        let avg = if s.batches == 0 {
            0.0
        } else {
            (s.total_batch_size as f64) / (s.batches as f64)
        };
        ServerStatsSnapshot {
            batches: s.batches,
            requests: s.requests,
            total_batch_size: s.total_batch_size,
            avg_batch_size: avg,
        }
    }

    /// Stop the dispatch thread and fail all still-pending requests.
    ///
    /// The running flag is checked every collection step and queue pulls are
    /// bounded by the batching window, so the join returns promptly.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(h) = self.handle.lock().unwrap().take() {
            let _ = h.join();
        }
    }

    fn submit(
        &self,
        features: &Features,
    ) -> Result<mpsc::Receiver<Result<Evaluation, OracleError>>, OracleError> {
        if !self.running.load(Ordering::Relaxed) {
            return Err(OracleError::ShuttingDown);
        }
        let (tx, rx) = mpsc::channel();
        let req = Request {
            features: *features,
            tx,
        };
        self.submit_tx
            .lock()
            .unwrap()
            .send(req)
            .map_err(|_| OracleError::ShuttingDown)?;
        Ok(rx)
    }
}

impl Drop for InferenceServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The dispatcher is itself an `Oracle`, so a search engine can run against
/// it or against a raw evaluator interchangeably.
impl Oracle for InferenceServer {
    fn infer(&self, features: &Features) -> Result<Evaluation, OracleError> {
        InferenceServer::infer(self, features)
    }

    fn infer_batch(&self, batch: &[Features]) -> Result<Vec<Evaluation>, OracleError> {
        InferenceServer::infer_batch(self, batch)
    }
}

fn dispatch_loop(
    oracle: impl Oracle,
    rx: mpsc::Receiver<Request>,
    opts: ServerOptions,
    running: Arc<AtomicBool>,
    stats: Arc<Mutex<ServerStats>>,
) {
    'run: while running.load(Ordering::Relaxed) {
        let mut batch: Vec<Request> = Vec::with_capacity(opts.max_batch);
        let mut cycle_start = Instant::now();

        // Collect requests until the batch fills or the window closes.
        loop {
            if batch.len() >= opts.max_batch {
                break;
            }
            if !running.load(Ordering::Relaxed) {
                fail_all(batch, OracleError::ShuttingDown);
                break 'run;
            }
            let elapsed = cycle_start.elapsed();
            if elapsed > opts.max_wait && !batch.is_empty() {
                break;
            }
            let budget = opts.max_wait.saturating_sub(elapsed).max(POLL_FLOOR);
            match rx.recv_timeout(budget) {
                Ok(req) => batch.push(req),
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    if !batch.is_empty() {
                        break;
                    }
                    // Idle: restart the window rather than dispatching an
                    // empty batch.
                    cycle_start = Instant::now();
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    fail_all(batch, OracleError::ShuttingDown);
                    break 'run;
                }
            }
        }

        if batch.is_empty() {
            continue;
        }

        // Count the batch before releasing any completion signal so callers
        // never observe counters that lag their own request.
        {
            let mut s = stats.lock().unwrap();
            s.batches += 1;
            s.requests += batch.len() as u64;
            s.total_batch_size += batch.len() as u64;
        }

        let feats: Vec<Features> = batch.iter().map(|r| r.features).collect();
        match oracle.infer_batch(&feats) {
            Ok(evals) if evals.len() == batch.len() => {
                for (req, ev) in batch.iter().zip(evals) {
                    let _ = req.tx.send(Ok(ev));
                }
            }
            Ok(evals) => {
                let err = OracleError::Eval(format!(
                    "batch result length {} != request count {}",
                    evals.len(),
                    batch.len()
                ));
                for req in &batch {
                    let _ = req.tx.send(Err(err.clone()));
                }
            }
            Err(e) => {
                for req in &batch {
                    let _ = req.tx.send(Err(e.clone()));
                }
            }
        }
    }

    // Fail whatever is still queued so no caller blocks across shutdown.
    while let Ok(req) = rx.try_recv() {
        let _ = req.tx.send(Err(OracleError::ShuttingDown));
    }
}

fn fail_all(batch: Vec<Request>, err: OracleError) {
    for req in batch {
        let _ = req.tx.send(Err(err.clone()));
    }
}
