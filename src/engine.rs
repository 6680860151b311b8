use std::net::{IpAddr, SocketAddr};
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::probe;
use crate::types::PortOutcome;

/// Tuning knobs for the probing engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Number of long-lived probe workers, and therefore the upper bound on
    /// concurrently open sockets.
    pub workers: usize,
    /// Connect timeout applied to every probe.
    pub probe_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            probe_timeout: Duration::from_secs(1),
        }
    }
}

/// One pending probe: the address to try plus the sink of the batch that
/// enqueued it. Consumed exactly once by a single worker.
struct ScanJob {
    addr: SocketAddr,
    outcome_tx: mpsc::UnboundedSender<PortOutcome>,
}

type JobReceiver = Arc<Mutex<mpsc::UnboundedReceiver<ScanJob>>>;

/// Concurrent port-probing engine: a fixed pool of workers consuming scan
/// jobs from one shared FIFO queue.
///
/// Workers are spawned once at construction and live until [`shutdown`]
/// (or until the engine is dropped, which closes the job queue). Each call
/// to [`scan_host`] owns a private result channel, so any number of batches
/// may be in flight against the same pool without seeing each other's
/// outcomes.
///
/// [`shutdown`]: ScanEngine::shutdown
/// [`scan_host`]: ScanEngine::scan_host
pub struct ScanEngine {
    job_tx: mpsc::UnboundedSender<ScanJob>,
    shutdown: CancellationToken,
}

impl ScanEngine {
    /// Start `config.workers` worker loops against a fresh job queue.
    pub fn new(config: EngineConfig) -> Self {
        let (job_tx, job_rx) = mpsc::unbounded_channel();
        let job_rx: JobReceiver = Arc::new(Mutex::new(job_rx));
        let shutdown = CancellationToken::new();

        for worker_id in 0..config.workers.max(1) {
            tokio::spawn(worker_loop(
                worker_id,
                job_rx.clone(),
                shutdown.clone(),
                config.probe_timeout,
            ));
        }

        info!(workers = config.workers.max(1), "scan engine started");
        Self { job_tx, shutdown }
    }

    /// Probe every port of `ports` on `ip` and return the collected outcomes.
    ///
    /// Jobs are enqueued in ascending port order without blocking, then this
    /// call suspends until the whole batch has been processed. The returned
    /// outcomes are in probe-completion order, not port order; callers that
    /// need ascending ports must sort.
    ///
    /// Every call uses its own result channel as both sink and completion
    /// barrier: each job sends exactly one outcome, and the channel closes
    /// once the last job handle of this batch is gone. Overlapping calls on
    /// the same engine are therefore isolated from each other.
    pub async fn scan_host(&self, ip: IpAddr, ports: RangeInclusive<u16>) -> Result<Vec<PortOutcome>> {
        let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel();

        let mut enqueued = 0usize;
        for port in ports.clone() {
            let job = ScanJob {
                addr: SocketAddr::new(ip, port),
                outcome_tx: outcome_tx.clone(),
            };
            self.job_tx
                .send(job)
                .map_err(|_| anyhow!("scan engine is shut down"))?;
            enqueued += 1;
        }
        // Only the job handles may keep the batch channel open now.
        drop(outcome_tx);

        info!(%ip, start = *ports.start(), end = *ports.end(), jobs = enqueued, "batch started");

        let mut outcomes = Vec::with_capacity(enqueued);
        while let Some(outcome) = outcome_rx.recv().await {
            outcomes.push(outcome);
        }

        debug!(%ip, done = outcomes.len(), "batch finished");
        Ok(outcomes)
    }

    /// Ask every worker to exit after its current probe. Jobs still queued
    /// are dropped; their batches observe a shortened result set instead of
    /// hanging on the barrier.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

/// One worker: pull the next job, probe it, report into the job's batch.
///
/// The shutdown token is only consulted between jobs, so a probe that is
/// already on the wire always runs to completion and closes its socket.
/// Probe failures degrade to a closed outcome inside [`probe::probe_port`];
/// nothing a single probe does can end this loop.
async fn worker_loop(
    worker_id: usize,
    jobs: JobReceiver,
    shutdown: CancellationToken,
    probe_timeout: Duration,
) {
    loop {
        let job = {
            let mut rx = jobs.lock().await;
            tokio::select! {
                _ = shutdown.cancelled() => None,
                job = rx.recv() => job,
            }
        };
        let Some(job) = job else {
            break;
        };

        debug!(worker = worker_id, addr = %job.addr, "job started");
        let outcome = probe::probe_port(job.addr, probe_timeout).await;
        // The receiving batch may be gone (engine shutdown mid-batch);
        // there is nobody left to care about the outcome then.
        let _ = job.outcome_tx.send(outcome);
        debug!(worker = worker_id, addr = %job.addr, "job finished");
    }
    debug!(worker = worker_id, "worker stopped");
}
