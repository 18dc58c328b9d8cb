//! Per-tick event pump.
//!
//! Converts driver events into [`BrokerEvent`]s exactly once each. One tick
//! runs, in order: driver maintenance, the stale sweep, the acceptance drain
//! (host only), then event draining for every tracked handle. Nothing here
//! blocks or returns an error; a payload that is not a valid record is
//! logged and dropped.

use crossbeam_channel::Sender;
use relaywarp_core::{
    connection::ConnectionHandle,
    transport::{Endpoint, NetworkEvent},
};
use relaywarp_peer::PeerLink;
use relaywarp_protocol::record::TextRecord;
use tracing::{debug, trace, warn};

use crate::{event_types::BrokerEvent, registry::ConnectionRegistry};

/// Minimal event sink abstraction to decouple the pump from a concrete channel.
pub trait EventSink {
    /// Delivers one event to the application.
    fn send(&mut self, event: BrokerEvent);
}

/// Channel-backed event sink using crossbeam `Sender`.
#[derive(Debug, Clone)]
pub struct ChannelSink(Sender<BrokerEvent>);

impl ChannelSink {
    /// Wraps a sender.
    pub fn new(sender: Sender<BrokerEvent>) -> Self {
        Self(sender)
    }
}

impl EventSink for ChannelSink {
    fn send(&mut self, event: BrokerEvent) {
        if let Err(err) = self.0.send(event) {
            trace!("Event dropped, receiver gone: {:?}", err.0);
        }
    }
}

impl EventSink for Vec<BrokerEvent> {
    fn send(&mut self, event: BrokerEvent) {
        self.push(event);
    }
}

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    /// False when the endpoint was not bound and the tick was skipped.
    pub ran: bool,
    /// Stale slots removed by the sweep.
    pub swept: usize,
    /// Connections accepted this tick.
    pub accepted: usize,
    /// Driver events popped this tick.
    pub events: usize,
}

fn emit_data<S: EventSink>(connection: ConnectionHandle, payload: &[u8], sink: &mut S) {
    match TextRecord::decode(payload) {
        Ok(record) => {
            trace!("Received record on {}: {}", connection, record);
            sink.send(BrokerEvent::Data { connection, record });
        }
        Err(err) => warn!("Dropping {} byte payload on {}: {}", payload.len(), connection, err),
    }
}

/// Runs one host tick over `endpoint` and `registry`.
///
/// A disconnect only overwrites the handle's slot with the sentinel; the
/// slot is removed by the sweep at the start of the following tick.
pub fn pump_host<E: Endpoint, S: EventSink>(
    endpoint: &mut E,
    registry: &mut ConnectionRegistry,
    sink: &mut S,
) -> TickReport {
    if !endpoint.is_bound() {
        return TickReport::default();
    }
    let mut report = TickReport { ran: true, ..TickReport::default() };

    // Keeps the relay binding alive and flushes driver queues.
    endpoint.maintain();

    report.swept = registry.sweep_stale();

    let accepted = registry.drain_accepts(endpoint);
    report.accepted = accepted.len();
    for handle in accepted {
        sink.send(BrokerEvent::Connected(*handle));
    }

    for index in 0..registry.len() {
        let Some(handle) = registry.get(index).filter(ConnectionHandle::is_created) else {
            continue;
        };
        while let Some(event) = endpoint.pop_event(handle) {
            report.events += 1;
            match event {
                NetworkEvent::Data(payload) => emit_data(handle, &payload, sink),
                NetworkEvent::Disconnect => {
                    debug!("Server received disconnect from {}", handle);
                    registry.invalidate(index);
                    sink.send(BrokerEvent::Disconnected(handle));
                    break;
                }
                NetworkEvent::Connect => {
                    trace!("Ignoring connect event on accepted connection {}", handle);
                }
            }
        }
    }
    report
}

/// Runs one peer tick over `endpoint` and the single `link`.
pub fn pump_peer<E: Endpoint, S: EventSink>(
    endpoint: &mut E,
    link: &mut PeerLink,
    sink: &mut S,
) -> TickReport {
    if !endpoint.is_bound() {
        return TickReport::default();
    }
    let mut report = TickReport { ran: true, ..TickReport::default() };

    endpoint.maintain();

    let handle = link.handle();
    if !handle.is_created() {
        return report;
    }
    while let Some(event) = endpoint.pop_event(handle) {
        report.events += 1;
        match event {
            NetworkEvent::Connect => {
                debug!("Connected to the host as {}", handle);
                if link.mark_connected() {
                    sink.send(BrokerEvent::Connected(handle));
                }
            }
            NetworkEvent::Data(payload) => emit_data(handle, &payload, sink),
            NetworkEvent::Disconnect => {
                debug!("Disconnected from the host");
                link.reset();
                sink.send(BrokerEvent::Disconnected(handle));
                break;
            }
        }
    }
    report
}
