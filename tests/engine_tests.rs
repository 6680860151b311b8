use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use tcpscan_rs::engine::{EngineConfig, ScanEngine};
use tcpscan_rs::types::PortState;
use tokio::net::TcpListener;

const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

fn test_engine(workers: usize, timeout_ms: u64) -> ScanEngine {
    ScanEngine::new(EngineConfig {
        workers,
        probe_timeout: Duration::from_millis(timeout_ms),
    })
}

/// Bind two adjacent loopback ports; keep the first listening, leave the
/// second closed. Returns the listener and the (open, closed) port pair.
async fn adjacent_open_closed_pair() -> (TcpListener, u16, u16) {
    for base in (49200..60000u16).step_by(2) {
        if let Ok(listener) = TcpListener::bind(("127.0.0.1", base)).await {
            if let Ok(second) = TcpListener::bind(("127.0.0.1", base + 1)).await {
                drop(second);
                return (listener, base, base + 1);
            }
        }
    }
    panic!("no free adjacent loopback port pair found");
}

#[tokio::test]
async fn batch_has_one_outcome_per_port() {
    let engine = test_engine(10, 500);
    let outcomes = engine.scan_host(LOCALHOST, 47100..=47109).await.unwrap();

    assert_eq!(outcomes.len(), 10);
    let ports: HashSet<u16> = outcomes.iter().map(|o| o.port).collect();
    assert_eq!(ports, (47100..=47109).collect::<HashSet<u16>>());
}

#[tokio::test]
async fn open_and_closed_ports_are_classified() {
    let (_listener, open_port, closed_port) = adjacent_open_closed_pair().await;

    let engine = test_engine(10, 1000);
    let outcomes = engine
        .scan_host(LOCALHOST, open_port..=closed_port)
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 2);
    for outcome in outcomes {
        if outcome.port == open_port {
            assert_eq!(outcome.state, PortState::Open);
        } else {
            assert_eq!(outcome.port, closed_port);
            assert_eq!(outcome.state, PortState::Closed);
        }
    }
}

#[tokio::test]
async fn repeated_scans_yield_identical_outcomes() {
    let engine = test_engine(4, 500);

    let mut first = engine.scan_host(LOCALHOST, 47200..=47204).await.unwrap();
    let mut second = engine.scan_host(LOCALHOST, 47200..=47204).await.unwrap();

    // Completion order may differ between runs; the sets must not.
    first.sort_by_key(|o| o.port);
    second.sort_by_key(|o| o.port);
    assert_eq!(first, second);
    assert!(first.iter().all(|o| o.state == PortState::Closed));
}

#[tokio::test]
async fn overlapping_batches_do_not_cross_contaminate() {
    // Two workers force the batches to interleave on the shared queue.
    let engine = Arc::new(test_engine(2, 500));

    let (a, b) = tokio::join!(
        engine.scan_host(LOCALHOST, 47300..=47309),
        engine.scan_host(LOCALHOST, 47310..=47319),
    );
    let a = a.unwrap();
    let b = b.unwrap();

    assert_eq!(a.len(), 10);
    assert_eq!(b.len(), 10);
    assert!(a.iter().all(|o| (47300..=47309).contains(&o.port)));
    assert!(b.iter().all(|o| (47310..=47319).contains(&o.port)));
}

#[tokio::test]
async fn unroutable_host_batch_completes_within_timeout() {
    // TEST-NET-1 is never routed: every probe must run into its timeout
    // and the barrier must still release.
    let engine = test_engine(10, 300);
    let target: IpAddr = "192.0.2.1".parse().unwrap();

    let started = tokio::time::Instant::now();
    let outcomes = engine.scan_host(target, 80..=82).await.unwrap();

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes.iter().all(|o| o.state == PortState::Closed));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn shutdown_does_not_hang() {
    let engine = test_engine(3, 200);
    let outcomes = engine.scan_host(LOCALHOST, 47400..=47402).await.unwrap();
    assert_eq!(outcomes.len(), 3);
    engine.shutdown();
}
