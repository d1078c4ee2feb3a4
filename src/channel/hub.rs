//! Channel Hub
//!
//! In-process port layer pairing page/popup contexts with the coordinator.
//! The hub plays the role the platform's messaging layer plays in a real
//! deployment: it assigns the sender identity at connect time and multiplexes
//! all inbound traffic into the coordinator's single event queue, preserving
//! order per port but not across ports.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use super::manager::{ChannelEvent, ChannelEventKind, ChannelOpener, ChannelTransport};
use super::messages::{Message, PortIdentity};
use crate::error::{QsError, QsResult};

/// Identifies one open port on the coordinator side.
pub type PortId = u64;

/// Events delivered to the coordinator's event loop.
#[derive(Debug)]
pub enum HubEvent {
    Connected {
        port: PortId,
        identity: PortIdentity,
        name: String,
    },
    Message {
        port: PortId,
        message: Message,
    },
    Disconnected {
        port: PortId,
    },
}

struct PortEntry {
    identity: PortIdentity,
    page_tx: UnboundedSender<ChannelEvent>,
    generation: u64,
}

struct HubInner {
    next_port: AtomicU64,
    coordinator_tx: UnboundedSender<HubEvent>,
    ports: Mutex<HashMap<PortId, PortEntry>>,
}

/// Coordinator-side handle to the port layer.
#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

impl Hub {
    pub fn new() -> (Self, UnboundedReceiver<HubEvent>) {
        let (coordinator_tx, coordinator_rx) = mpsc::unbounded_channel();
        (
            Self {
                inner: Arc::new(HubInner {
                    next_port: AtomicU64::new(1),
                    coordinator_tx,
                    ports: Mutex::new(HashMap::new()),
                }),
            },
            coordinator_rx,
        )
    }

    /// Returns an opener for a context with the given identity, suitable for
    /// handing to a [`super::ChannelManager`].
    pub fn opener(&self, identity: PortIdentity) -> Arc<dyn ChannelOpener> {
        Arc::new(HubOpener {
            inner: self.inner.clone(),
            identity,
        })
    }

    /// Posts a message to the context behind `port`.
    ///
    /// Sending to a port that has since closed is an expected condition and
    /// is logged as informational, never an error.
    pub fn post(&self, port: PortId, message: Message) {
        let Ok(ports) = self.inner.ports.lock() else {
            warn!(port, "Port table lock poisoned");
            return;
        };
        let Some(entry) = ports.get(&port) else {
            info!(port, ?message, "⚠️ Message dropped; the port has already closed");
            return;
        };
        let event = ChannelEvent {
            generation: entry.generation,
            kind: ChannelEventKind::Message(message),
        };
        if entry.page_tx.send(event).is_err() {
            info!(port, "⚠️ Message dropped; the other side of the port is gone");
        }
    }

    /// Closes a port from the coordinator side, notifying the remote context.
    pub fn disconnect(&self, port: PortId) {
        let Ok(mut ports) = self.inner.ports.lock() else {
            warn!(port, "Port table lock poisoned");
            return;
        };
        if let Some(entry) = ports.remove(&port) {
            let _ = entry.page_tx.send(ChannelEvent {
                generation: entry.generation,
                kind: ChannelEventKind::Disconnected,
            });
            debug!(port, "Port closed by the coordinator");
        }
    }

    /// Finds the open port for a (surface, frame) pair, if any.
    pub fn find_port(&self, surface_id: u32, frame_id: u32) -> Option<PortId> {
        let ports = self.inner.ports.lock().ok()?;
        ports
            .iter()
            .find(|(_, entry)| {
                entry.identity.surface_id == surface_id && entry.identity.frame_id == frame_id
            })
            .map(|(port, _)| *port)
    }

    pub fn identity_of(&self, port: PortId) -> Option<PortIdentity> {
        let ports = self.inner.ports.lock().ok()?;
        ports.get(&port).map(|entry| entry.identity)
    }
}

struct HubOpener {
    inner: Arc<HubInner>,
    identity: PortIdentity,
}

impl ChannelOpener for HubOpener {
    fn open(
        &self,
        name: &str,
        generation: u64,
        events_tx: UnboundedSender<ChannelEvent>,
    ) -> QsResult<Box<dyn ChannelTransport>> {
        if self.inner.coordinator_tx.is_closed() {
            return Err(QsError::Channel("coordinator is gone".to_string()));
        }

        let port = self.inner.next_port.fetch_add(1, Ordering::SeqCst);
        self.inner.ports.lock()?.insert(
            port,
            PortEntry {
                identity: self.identity,
                page_tx: events_tx,
                generation,
            },
        );
        self.inner
            .coordinator_tx
            .send(HubEvent::Connected {
                port,
                identity: self.identity,
                name: name.to_string(),
            })
            .map_err(|_| QsError::Channel("coordinator is gone".to_string()))?;

        debug!(port, name, "🔌 Port opened to the coordinator");
        Ok(Box::new(HubTransport {
            inner: self.inner.clone(),
            port,
        }))
    }
}

struct HubTransport {
    inner: Arc<HubInner>,
    port: PortId,
}

impl ChannelTransport for HubTransport {
    fn send(&self, message: Message) -> QsResult<()> {
        {
            let ports = self.inner.ports.lock()?;
            if !ports.contains_key(&self.port) {
                return Err(QsError::Channel("port already closed".to_string()));
            }
        }
        self.inner
            .coordinator_tx
            .send(HubEvent::Message {
                port: self.port,
                message,
            })
            .map_err(|_| QsError::Channel("coordinator is gone".to_string()))
    }

    fn close(&self) {
        let Ok(mut ports) = self.inner.ports.lock() else {
            return;
        };
        if ports.remove(&self.port).is_some() {
            let _ = self.inner.coordinator_tx.send(HubEvent::Disconnected {
                port: self.port,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::manager::{ChannelManager, ChannelParams};

    fn page_manager(hub: &Hub, surface_id: u32, frame_id: u32) -> (ChannelManager, UnboundedReceiver<ChannelEvent>) {
        ChannelManager::new(
            hub.opener(PortIdentity {
                surface_id,
                frame_id,
            }),
            ChannelParams {
                name: format!("page-{surface_id}-{frame_id}"),
                auto_connect: false,
            },
        )
    }

    #[tokio::test]
    async fn test_connect_and_message_flow() {
        let (hub, mut coordinator_rx) = Hub::new();
        let (mut manager, _page_rx) = page_manager(&hub, 1, 0);

        manager.connect();
        manager.post_message(Message::Hello);

        let Some(HubEvent::Connected { port, identity, .. }) = coordinator_rx.recv().await else {
            panic!("expected Connected");
        };
        assert_eq!(identity, PortIdentity { surface_id: 1, frame_id: 0 });

        let Some(HubEvent::Message { port: message_port, message }) = coordinator_rx.recv().await
        else {
            panic!("expected Message");
        };
        assert_eq!(message_port, port);
        assert_eq!(message, Message::Hello);
    }

    #[tokio::test]
    async fn test_per_port_order_is_preserved() {
        let (hub, mut coordinator_rx) = Hub::new();
        let (mut manager, _page_rx) = page_manager(&hub, 1, 0);

        manager.connect();
        for _ in 0..3 {
            manager.post_message(Message::Hello);
        }
        manager.post_message(Message::GetSelection { tab: 1 });

        let mut seen = Vec::new();
        for _ in 0..5 {
            match coordinator_rx.recv().await.unwrap() {
                HubEvent::Connected { .. } => seen.push("connected"),
                HubEvent::Message { message: Message::Hello, .. } => seen.push("hello"),
                HubEvent::Message { .. } => seen.push("other"),
                HubEvent::Disconnected { .. } => seen.push("disconnected"),
            }
        }
        assert_eq!(seen, ["connected", "hello", "hello", "hello", "other"]);
    }

    #[tokio::test]
    async fn test_local_close_notifies_coordinator() {
        let (hub, mut coordinator_rx) = Hub::new();
        let (mut manager, _page_rx) = page_manager(&hub, 1, 0);

        manager.connect();
        manager.disconnect();

        let Some(HubEvent::Connected { port, .. }) = coordinator_rx.recv().await else {
            panic!("expected Connected");
        };
        let Some(HubEvent::Disconnected { port: closed }) = coordinator_rx.recv().await else {
            panic!("expected Disconnected");
        };
        assert_eq!(closed, port);
        assert!(hub.identity_of(port).is_none());
    }

    #[tokio::test]
    async fn test_coordinator_disconnect_reaches_page() {
        let (hub, mut coordinator_rx) = Hub::new();
        let (mut manager, mut page_rx) = page_manager(&hub, 1, 0);

        manager.connect();
        let Some(HubEvent::Connected { port, .. }) = coordinator_rx.recv().await else {
            panic!("expected Connected");
        };

        hub.disconnect(port);
        let event = page_rx.recv().await.unwrap();
        assert!(manager.handle_event(event).is_none());
        assert!(!manager.is_connected());
    }

    #[tokio::test]
    async fn test_send_after_close_is_an_error() {
        let (hub, mut coordinator_rx) = Hub::new();
        let (mut manager, _page_rx) = page_manager(&hub, 1, 0);

        manager.connect();
        let Some(HubEvent::Connected { port, .. }) = coordinator_rx.recv().await else {
            panic!("expected Connected");
        };
        hub.disconnect(port);

        // The manager swallows the failure; posting must not panic and the
        // coordinator must not observe the message.
        manager.post_message(Message::Hello);
        assert!(coordinator_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_find_port_by_identity() {
        let (hub, mut coordinator_rx) = Hub::new();
        let (mut frame0, _rx0) = page_manager(&hub, 7, 0);
        let (mut frame1, _rx1) = page_manager(&hub, 7, 1);

        frame0.connect();
        frame1.connect();
        let _ = coordinator_rx.recv().await;
        let _ = coordinator_rx.recv().await;

        assert!(hub.find_port(7, 0).is_some());
        assert!(hub.find_port(7, 1).is_some());
        assert_ne!(hub.find_port(7, 0), hub.find_port(7, 1));
        assert!(hub.find_port(8, 0).is_none());
    }
}
