use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time;
use tracing::debug;

use crate::types::PortOutcome;

/// Probe a single TCP port with an asynchronous connect bounded by `timeout`.
///
/// A completed handshake within the deadline reports the port as open; a
/// timeout, a refused connection, or any other socket error reports it as
/// closed. Note that an unreachable host therefore looks identical to a host
/// with every port closed — the probe cannot tell "no route" from "closed"
/// and does not try to.
///
/// The connected stream is dropped before returning, so no socket outlives
/// its probe regardless of how the attempt ended.
pub async fn probe_port(addr: SocketAddr, timeout: Duration) -> PortOutcome {
    match time::timeout(timeout, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => {
            drop(stream);
            debug!(%addr, "handshake completed, port open");
            PortOutcome::open(addr.port())
        }
        Ok(Err(err)) => {
            // Refused, unreachable, or any other connect failure.
            debug!(%addr, error = %err, "connect failed, reporting closed");
            PortOutcome::closed(addr.port())
        }
        Err(_) => {
            debug!(%addr, "connect timed out, reporting closed");
            PortOutcome::closed(addr.port())
        }
    }
}
