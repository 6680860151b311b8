use std::net::IpAddr;
use std::ops::RangeInclusive;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::engine::ScanEngine;
use crate::types::PortOutcome;

/// One admitted scan request waiting for the dispatcher, paired with the
/// reply handle of the caller that submitted it.
struct PendingScan {
    ip: IpAddr,
    ports: RangeInclusive<u16>,
    reply_tx: oneshot::Sender<Vec<PortOutcome>>,
}

/// Bounded front door for scan requests.
///
/// At most `capacity` requests can be waiting for execution; past that,
/// [`submit`] applies backpressure by suspending the caller until a slot
/// frees. No request is ever rejected for capacity reasons.
///
/// A single dispatcher task drains the queue and drives each request
/// through the engine. Batches are isolated inside [`ScanEngine::scan_host`],
/// so the dispatcher starts the next request without waiting for the
/// previous batch to finish; the engine's fixed worker pool still bounds
/// the actual probe concurrency.
///
/// [`submit`]: ScanGateway::submit
#[derive(Clone)]
pub struct ScanGateway {
    submit_tx: mpsc::Sender<PendingScan>,
    capacity: usize,
}

impl ScanGateway {
    /// Create the gateway and start its dispatcher loop on `engine`.
    pub fn new(engine: Arc<ScanEngine>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (submit_tx, submit_rx) = mpsc::channel(capacity);
        tokio::spawn(dispatch_loop(engine, submit_rx));
        Self { submit_tx, capacity }
    }

    /// Submit one scan request and wait for its batch of outcomes.
    ///
    /// The result returned here belongs to exactly this submission: every
    /// request carries its own one-shot reply channel through the queue.
    pub async fn submit(&self, ip: IpAddr, ports: RangeInclusive<u16>) -> Result<Vec<PortOutcome>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let pending = PendingScan {
            ip,
            ports,
            reply_tx,
        };

        match self.submit_tx.try_send(pending) {
            Ok(()) => {}
            Err(TrySendError::Full(pending)) => {
                warn!(capacity = self.capacity, "scan queue limit reached, waiting for a free slot");
                self.submit_tx
                    .send(pending)
                    .await
                    .map_err(|_| anyhow!("scan dispatcher is gone"))?;
            }
            Err(TrySendError::Closed(_)) => return Err(anyhow!("scan dispatcher is gone")),
        }

        reply_rx
            .await
            .map_err(|_| anyhow!("scan request was dropped before completing"))
    }
}

/// Pull admitted requests in FIFO order and run each as its own batch.
/// Receiving a request is what frees its admission slot.
async fn dispatch_loop(engine: Arc<ScanEngine>, mut submit_rx: mpsc::Receiver<PendingScan>) {
    while let Some(pending) = submit_rx.recv().await {
        let engine = engine.clone();
        tokio::spawn(async move {
            debug!(ip = %pending.ip, "dispatching scan request");
            match engine.scan_host(pending.ip, pending.ports).await {
                Ok(outcomes) => {
                    // The submitter may have given up; nothing to do then.
                    let _ = pending.reply_tx.send(outcomes);
                }
                Err(err) => {
                    warn!(ip = %pending.ip, error = %err, "scan request failed");
                }
            }
        });
    }
    debug!("scan dispatcher stopped");
}
