//! Integration tests for the relaywarp-host crate.
//!
//! These tests run hosts and peers against one in-process loopback relay and
//! verify how setup, the per-tick pump and teardown interact.

use std::sync::Arc;

use relaywarp_core::{
    config::Config,
    connection::ConnectionHandle,
    constants::JOIN_CODE_LEN,
    error::{AllocationError, ErrorKind},
    join_code::JoinCode,
};
use relaywarp_host::{BrokerEvent, Lifecycle, SessionBroker, SessionRole};
use relaywarp_loopback::{Fault, LoopbackDriverFactory, LoopbackRelay};
use relaywarp_peer::LinkState;
use relaywarp_protocol::record::TextRecord;

type Broker = SessionBroker<LoopbackDriverFactory>;

fn create_broker(relay: &LoopbackRelay) -> Broker {
    SessionBroker::new(
        Config::default(),
        Arc::new(relay.clone()),
        Arc::new(relay.clone()),
        LoopbackDriverFactory::new(relay.clone()),
    )
}

async fn signed_in(relay: &LoopbackRelay, name: &str) -> Broker {
    let mut broker = create_broker(relay);
    broker.authenticate(name).await.unwrap();
    assert!(matches!(broker.recv(), Some(BrokerEvent::SignedIn(_))));
    broker
}

async fn hosting(relay: &LoopbackRelay, max_peers: u32) -> (Broker, JoinCode) {
    let mut host = signed_in(relay, "Host").await;
    let code = host.create_session(max_peers).await.unwrap();
    (host, code)
}

async fn joined(relay: &LoopbackRelay, name: &str, code: &JoinCode) -> Broker {
    let mut peer = signed_in(relay, name).await;
    peer.join_session(code.as_str()).await.unwrap();
    peer
}

/// Ticks every broker, in order, until in-flight frames have settled.
fn settle(brokers: &mut [&mut Broker]) {
    for _ in 0..3 {
        for broker in brokers.iter_mut() {
            broker.tick();
        }
    }
}

fn drain(broker: &mut Broker) -> Vec<BrokerEvent> {
    std::iter::from_fn(|| broker.recv()).collect()
}

fn record(text: &str) -> TextRecord {
    TextRecord::new(text).unwrap()
}

#[tokio::test]
async fn test_host_session_with_no_pending_connections() {
    let relay = LoopbackRelay::default();
    let mut host = signed_in(&relay, "P1").await;

    let code = host.create_session(5).await.unwrap();
    assert_eq!(code.as_str().len(), JOIN_CODE_LEN);
    assert_eq!(host.role(), SessionRole::Hosting);
    assert_eq!(host.lifecycle(), Lifecycle::Bound);
    assert!(host.is_bound());

    let report = host.tick();
    assert!(report.ran);
    assert!(host.connections().is_empty());
    assert_eq!(host.lifecycle(), Lifecycle::Active);
    assert!(drain(&mut host).is_empty());
}

#[tokio::test]
async fn test_tick_before_setup_is_noop() {
    let relay = LoopbackRelay::default();
    let mut broker = signed_in(&relay, "P1").await;

    let report = broker.tick();

    assert!(!report.ran);
    assert_eq!(broker.lifecycle(), Lifecycle::Authenticated);
    assert!(broker.connections().is_empty());
    assert!(broker.recv().is_none());
}

#[tokio::test]
async fn test_all_pending_connections_accepted_in_one_tick() {
    let relay = LoopbackRelay::default();
    let (mut host, code) = hosting(&relay, 8).await;

    let mut peers = Vec::new();
    for i in 0..8 {
        let mut peer = joined(&relay, &format!("Peer{}", i), &code).await;
        // Flushes the connect request to the relay.
        peer.tick();
        peers.push(peer);
    }

    let report = host.tick();

    assert_eq!(report.accepted, 8);
    let connections = host.connections().to_vec();
    assert_eq!(connections.len(), 8);
    let mut distinct = connections.clone();
    distinct.sort();
    distinct.dedup();
    assert_eq!(distinct.len(), 8);

    let connected: Vec<ConnectionHandle> = drain(&mut host)
        .into_iter()
        .map(|event| match event {
            BrokerEvent::Connected(handle) => handle,
            other => panic!("unexpected event {:?}", other),
        })
        .collect();
    assert_eq!(connected, connections);
}

#[tokio::test]
async fn test_host_disconnect_removed_on_following_tick() {
    let relay = LoopbackRelay::default();
    let (mut host, code) = hosting(&relay, 5).await;
    let mut first = joined(&relay, "Peer1", &code).await;
    let mut second = joined(&relay, "Peer2", &code).await;
    settle(&mut [&mut host, &mut first, &mut second]);

    let handles = host.connections().to_vec();
    assert_eq!(handles.len(), 2);
    drain(&mut host);

    first.dispose();

    host.tick();
    assert_eq!(drain(&mut host), vec![BrokerEvent::Disconnected(handles[0])]);
    assert_eq!(host.connections().len(), 2);
    assert!(!host.connections()[0].is_created());
    assert!(!host.is_connection_valid(handles[0]));

    let report = host.tick();
    assert_eq!(report.swept, 1);
    assert_eq!(host.connections(), &[handles[1]]);
    assert!(host.is_connection_valid(handles[1]));
}

#[tokio::test]
async fn test_unknown_join_code_then_retry() {
    let relay = LoopbackRelay::default();
    let (_host, code) = hosting(&relay, 5).await;
    let mut peer = signed_in(&relay, "P2").await;

    let err = peer.join_session("ABCDEF").await.unwrap_err();
    assert!(matches!(err, ErrorKind::Allocation(AllocationError::JoinCodeNotFound(_))));
    assert_eq!(peer.role(), SessionRole::Uninitialized);
    assert!(!peer.is_bound());

    peer.join_session(code.as_str()).await.unwrap();
    assert_eq!(peer.role(), SessionRole::Joining(code));
    assert_eq!(peer.link_state(), Some(LinkState::Connecting));
}

#[tokio::test]
async fn test_join_code_is_normalized() {
    let relay = LoopbackRelay::default();
    let (_host, code) = hosting(&relay, 5).await;
    let mut peer = signed_in(&relay, "P2").await;

    let typed = format!("  {}\n", code.as_str().to_lowercase());
    peer.join_session(&typed).await.unwrap();
    assert_eq!(peer.join_code(), Some(&code));
}

#[tokio::test]
async fn test_peer_connects_and_exchanges_records() {
    let relay = LoopbackRelay::default();
    let (mut host, code) = hosting(&relay, 5).await;
    let mut peer = joined(&relay, "Peer1", &code).await;
    let outbound = peer.peer_connection().unwrap();

    assert!(matches!(peer.send(outbound, &record("early")), Err(ErrorKind::NotConnected)));

    settle(&mut [&mut host, &mut peer]);
    assert_eq!(peer.link_state(), Some(LinkState::Connected));
    assert_eq!(drain(&mut peer), vec![BrokerEvent::Connected(outbound)]);
    let inbound = host.connections()[0];
    assert_eq!(drain(&mut host), vec![BrokerEvent::Connected(inbound)]);

    peer.send(outbound, &record("hello host")).unwrap();
    settle(&mut [&mut peer, &mut host]);
    assert_eq!(
        drain(&mut host),
        vec![BrokerEvent::Data { connection: inbound, record: record("hello host") }]
    );

    assert_eq!(host.broadcast(&record("hello all")).unwrap(), 1);
    settle(&mut [&mut host, &mut peer]);
    assert_eq!(
        drain(&mut peer),
        vec![BrokerEvent::Data { connection: outbound, record: record("hello all") }]
    );
}

#[tokio::test]
async fn test_broadcast_requires_host_role() {
    let relay = LoopbackRelay::default();
    let (_host, code) = hosting(&relay, 5).await;
    let mut peer = joined(&relay, "Peer1", &code).await;
    assert!(matches!(peer.broadcast(&record("x")), Err(ErrorKind::WrongRole)));
}

#[tokio::test]
async fn test_second_role_is_rejected() {
    let relay = LoopbackRelay::default();
    let (mut host, code) = hosting(&relay, 5).await;
    assert!(matches!(host.create_session(5).await, Err(ErrorKind::RoleAlreadySelected)));
    assert!(matches!(
        host.join_session(code.as_str()).await,
        Err(ErrorKind::RoleAlreadySelected)
    ));
    assert_eq!(host.role(), SessionRole::Hosting);
}

#[tokio::test]
async fn test_host_kick_reaches_peer() {
    let relay = LoopbackRelay::default();
    let (mut host, code) = hosting(&relay, 5).await;
    let mut peer = joined(&relay, "Peer1", &code).await;
    settle(&mut [&mut host, &mut peer]);
    let outbound = peer.peer_connection().unwrap();
    let inbound = host.connections()[0];
    drain(&mut peer);

    host.disconnect(inbound).unwrap();
    assert!(!host.is_connection_valid(inbound));
    assert!(matches!(host.disconnect(inbound), Err(ErrorKind::UnknownConnection)));

    settle(&mut [&mut host, &mut peer]);
    assert!(host.connections().is_empty());
    assert_eq!(drain(&mut peer), vec![BrokerEvent::Disconnected(outbound)]);
    assert_eq!(peer.peer_connection(), Some(ConnectionHandle::INVALID));
    assert_eq!(peer.link_state(), Some(LinkState::Unconnected));
}

#[tokio::test]
async fn test_host_dispose_disconnects_peer() {
    let relay = LoopbackRelay::default();
    let (mut host, code) = hosting(&relay, 5).await;
    let mut peer = joined(&relay, "Peer1", &code).await;
    settle(&mut [&mut host, &mut peer]);
    let outbound = peer.peer_connection().unwrap();
    drain(&mut peer);

    host.dispose();
    peer.tick();

    assert_eq!(drain(&mut peer), vec![BrokerEvent::Disconnected(outbound)]);
    assert!(!peer.peer_connection().unwrap().is_created());
}

#[tokio::test]
async fn test_dispose_twice_is_dispose_once() {
    let relay = LoopbackRelay::default();
    let (mut host, code) = hosting(&relay, 5).await;
    let mut peer = joined(&relay, "Peer1", &code).await;
    settle(&mut [&mut host, &mut peer]);
    let allocation = host.allocation_id().unwrap();

    host.dispose();
    host.dispose();

    assert_eq!(host.lifecycle(), Lifecycle::Disposed);
    assert!(!host.is_bound());
    assert!(host.connections().is_empty());
    assert!(!relay.has_bound_endpoint(&allocation));
    // Without shutdown the allocation is left to expire.
    assert!(relay.is_allocated(&allocation));
    assert!(!host.tick().ran);
}

#[tokio::test]
async fn test_shutdown_releases_allocation() {
    let relay = LoopbackRelay::default();
    let (mut host, _code) = hosting(&relay, 5).await;
    let allocation = host.allocation_id().unwrap();

    host.shutdown().await.unwrap();

    assert_eq!(host.lifecycle(), Lifecycle::Disposed);
    assert!(!relay.is_allocated(&allocation));
    assert_eq!(relay.allocation_count(), 0);
    host.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_keeps_allocation_when_configured() {
    let relay = LoopbackRelay::default();
    let config = Config { release_on_shutdown: false, ..Config::default() };
    let mut host = SessionBroker::new(
        config,
        Arc::new(relay.clone()),
        Arc::new(relay.clone()),
        LoopbackDriverFactory::new(relay.clone()),
    );
    host.authenticate("P1").await.unwrap();
    host.create_session(2).await.unwrap();
    let allocation = host.allocation_id().unwrap();

    host.shutdown().await.unwrap();

    assert!(relay.is_allocated(&allocation));
}

#[tokio::test]
async fn test_bind_failure_rolls_back_host_setup() {
    let relay = LoopbackRelay::default();
    let mut host = signed_in(&relay, "P1").await;

    relay.inject_fault(Fault::Bind);
    let err = host.create_session(5).await.unwrap_err();

    assert!(matches!(err, ErrorKind::Bind { .. }));
    assert_eq!(host.role(), SessionRole::Uninitialized);
    assert_eq!(host.lifecycle(), Lifecycle::Authenticated);
    assert!(!host.is_bound());
    assert_eq!(relay.allocation_count(), 0);

    host.create_session(5).await.unwrap();
    assert_eq!(relay.allocation_count(), 1);
}

#[tokio::test]
async fn test_listen_failure_rolls_back_host_setup() {
    let relay = LoopbackRelay::default();
    let mut host = signed_in(&relay, "P1").await;

    relay.inject_fault(Fault::Listen);
    let err = host.create_session(5).await.unwrap_err();

    assert!(matches!(err, ErrorKind::Listen(_)));
    assert!(host.endpoint().is_none());
    assert!(host.allocation_id().is_none());
    assert_eq!(relay.allocation_count(), 0);
}

#[tokio::test]
async fn test_bind_failure_rolls_back_peer_setup() {
    let relay = LoopbackRelay::default();
    let (_host, code) = hosting(&relay, 5).await;
    let mut peer = signed_in(&relay, "P2").await;

    relay.inject_fault(Fault::Bind);
    assert!(matches!(peer.join_session(code.as_str()).await, Err(ErrorKind::Bind { .. })));
    assert_eq!(peer.role(), SessionRole::Uninitialized);
    // Only the host allocation remains.
    assert_eq!(relay.allocation_count(), 1);

    peer.join_session(code.as_str()).await.unwrap();
    assert_eq!(relay.allocation_count(), 2);
}

#[tokio::test]
async fn test_full_allocation_rejects_join() {
    let relay = LoopbackRelay::default();
    let (_host, code) = hosting(&relay, 1).await;
    let _first = joined(&relay, "Peer1", &code).await;
    let mut second = signed_in(&relay, "Peer2").await;

    let err = second.join_session(code.as_str()).await.unwrap_err();
    assert!(matches!(err, ErrorKind::Allocation(AllocationError::AllocationFull)));
}

#[tokio::test]
async fn test_rejected_sign_in_can_be_retried() {
    let relay = LoopbackRelay::default();
    let mut broker = create_broker(&relay);

    assert!(matches!(broker.authenticate("not a name!").await, Err(ErrorKind::Identity(_))));
    assert_eq!(broker.lifecycle(), Lifecycle::Uninitialized);

    relay.inject_fault(Fault::SignIn);
    assert!(matches!(broker.authenticate("P1").await, Err(ErrorKind::Identity(_))));

    let participant = broker.authenticate("P1").await.unwrap();
    broker.authenticate("P1").await.unwrap();
    assert_eq!(drain(&mut broker), vec![BrokerEvent::SignedIn(participant)]);
}

#[tokio::test]
async fn test_zero_max_peers_uses_configured_default() {
    let relay = LoopbackRelay::default();
    let (_host, code) = hosting(&relay, 0).await;
    let mut peers = Vec::new();
    for i in 0..5 {
        peers.push(joined(&relay, &format!("Peer{}", i), &code).await);
    }
    let mut extra = signed_in(&relay, "Extra").await;
    assert!(extra.join_session(code.as_str()).await.is_err());
}
