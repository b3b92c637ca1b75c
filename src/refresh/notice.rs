//! Completion notices posted to connected host clients

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Opaque handle for a connected client
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClientId(u64);

/// Message sent from the proxy to its clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HostMessage {
    /// A background refresh run finished; `timestamp` is RFC 3339 UTC
    BackgroundUpdateComplete { timestamp: String },
}

#[derive(Debug, Default)]
struct Clients {
    next_id: u64,
    outboxes: BTreeMap<ClientId, Vec<HostMessage>>,
}

/// Per-client outboxes.
///
/// Delivery is best effort: a message only reaches clients connected at the
/// time of the broadcast, and nobody acknowledges it.
#[derive(Debug, Default)]
pub struct HostPort {
    clients: Mutex<Clients>,
}

impl HostPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&self) -> ClientId {
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());
        let id = ClientId(clients.next_id);
        clients.next_id += 1;
        clients.outboxes.insert(id, Vec::new());
        id
    }

    /// Drop a client and anything still queued for it
    pub fn disconnect(&self, id: ClientId) {
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());
        clients.outboxes.remove(&id);
    }

    /// Queue `message` for every connected client; returns how many got it
    pub fn broadcast(&self, message: HostMessage) -> usize {
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());
        for outbox in clients.outboxes.values_mut() {
            outbox.push(message.clone());
        }
        clients.outboxes.len()
    }

    /// Take everything queued for `id`. Unknown clients get nothing.
    pub fn drain(&self, id: ClientId) -> Vec<HostMessage> {
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());
        clients
            .outboxes
            .get_mut(&id)
            .map(std::mem::take)
            .unwrap_or_default()
    }

    pub fn connected(&self) -> usize {
        self.clients.lock().unwrap_or_else(|e| e.into_inner()).outboxes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice() -> HostMessage {
        HostMessage::BackgroundUpdateComplete {
            timestamp: "2024-05-01T10:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn test_message_wire_format() {
        let json = serde_json::to_value(notice()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "BACKGROUND_UPDATE_COMPLETE",
                "timestamp": "2024-05-01T10:00:00.000Z"
            })
        );

        let back: HostMessage = serde_json::from_value(json).unwrap();
        assert_eq!(back, notice());
    }

    #[test]
    fn test_broadcast_reaches_every_connected_client() {
        let port = HostPort::new();
        let a = port.connect();
        let b = port.connect();

        assert_eq!(port.broadcast(notice()), 2);

        assert_eq!(port.drain(a), vec![notice()]);
        assert_eq!(port.drain(b), vec![notice()]);
    }

    #[test]
    fn test_drain_empties_outbox() {
        let port = HostPort::new();
        let a = port.connect();
        port.broadcast(notice());

        assert_eq!(port.drain(a).len(), 1);
        assert!(port.drain(a).is_empty());
    }

    #[test]
    fn test_broadcast_with_no_clients_is_dropped() {
        let port = HostPort::new();
        assert_eq!(port.broadcast(notice()), 0);

        let late = port.connect();
        assert!(port.drain(late).is_empty());
    }

    #[test]
    fn test_disconnected_client_receives_nothing() {
        let port = HostPort::new();
        let a = port.connect();
        let b = port.connect();
        port.disconnect(b);

        assert_eq!(port.broadcast(notice()), 1);
        assert_eq!(port.connected(), 1);
        assert_eq!(port.drain(a).len(), 1);
        assert!(port.drain(b).is_empty());
    }

    #[test]
    fn test_client_ids_are_unique() {
        let port = HostPort::new();
        let a = port.connect();
        port.disconnect(a);
        let b = port.connect();
        assert_ne!(a, b);
    }
}
