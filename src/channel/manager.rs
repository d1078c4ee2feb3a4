//! Channel Manager
//!
//! Client-side wrapper around one reconnectable duplex port to the
//! coordinator, with optional auto-connect on send.

use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use super::messages::Message;
use crate::error::QsResult;

/// Inbound traffic and remote closes observed on a channel.
///
/// Carries the generation of the transport that produced it, so events that
/// raced with a reconnect can be told apart from current ones.
#[derive(Debug)]
pub struct ChannelEvent {
    pub generation: u64,
    pub kind: ChannelEventKind,
}

#[derive(Debug)]
pub enum ChannelEventKind {
    Message(Message),
    /// The remote side closed the port.
    Disconnected,
}

/// One direction of an open port, owned by the local side.
pub trait ChannelTransport: Send {
    /// Sends a message; fails when the remote side is already gone.
    fn send(&self, message: Message) -> QsResult<()>;
    /// Tears the port down locally, notifying the remote side.
    fn close(&self);
}

/// Externally supplied capability to open a port to the coordinator.
pub trait ChannelOpener: Send + Sync {
    fn open(
        &self,
        name: &str,
        generation: u64,
        events_tx: UnboundedSender<ChannelEvent>,
    ) -> QsResult<Box<dyn ChannelTransport>>;
}

/// Construction parameters, fixed for the lifetime of the manager.
#[derive(Debug, Clone)]
pub struct ChannelParams {
    /// Opaque name tag for the channel (the page URL, by convention).
    pub name: String,
    /// Connect implicitly when posting while disconnected.
    pub auto_connect: bool,
}

type Callback = Box<dyn FnMut() + Send>;

/// Manages the connection to the coordinator and re-establishes it on
/// demand.
///
/// The owning event loop polls the receiver returned by [`ChannelManager::new`]
/// and feeds events back through [`ChannelManager::handle_event`].
pub struct ChannelManager {
    params: ChannelParams,
    opener: Arc<dyn ChannelOpener>,
    events_tx: UnboundedSender<ChannelEvent>,
    transport: Option<Box<dyn ChannelTransport>>,
    generation: u64,
    on_connect: Callback,
    on_disconnect: Callback,
}

impl ChannelManager {
    pub fn new(
        opener: Arc<dyn ChannelOpener>,
        params: ChannelParams,
    ) -> (Self, UnboundedReceiver<ChannelEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        (
            Self {
                params,
                opener,
                events_tx,
                transport: None,
                generation: 0,
                on_connect: Box::new(|| {}),
                on_disconnect: Box::new(|| {}),
            },
            events_rx,
        )
    }

    /// Replaces the connect callback, fired after every successful open.
    pub fn set_on_connect(&mut self, callback: impl FnMut() + Send + 'static) {
        self.on_connect = Box::new(callback);
    }

    /// Replaces the disconnect callback, fired only for a disconnect
    /// observed from the remote side (never for a local `disconnect()`).
    pub fn set_on_disconnect(&mut self, callback: impl FnMut() + Send + 'static) {
        self.on_disconnect = Box::new(callback);
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    pub fn name(&self) -> &str {
        &self.params.name
    }

    /// Opens the port. No-op when already connected.
    ///
    /// An open failure is an expected steady-state condition (the coordinator
    /// may have been reloaded), so it is swallowed: the channel stays
    /// disconnected and no callback fires. The message is logged at a level
    /// that survives default filtering so the situation stays diagnosable.
    pub fn connect(&mut self) {
        if self.transport.is_some() {
            warn!(name = %self.params.name, "Already connected");
            return;
        }

        self.generation += 1;
        match self
            .opener
            .open(&self.params.name, self.generation, self.events_tx.clone())
        {
            Ok(transport) => {
                self.transport = Some(transport);
                debug!(name = %self.params.name, "🔌 Connected to coordinator");
                (self.on_connect)();
            }
            Err(error) => {
                warn!(
                    name = %self.params.name,
                    %error,
                    "⚠️ Failed to connect to coordinator; it may have been reloaded. \
                     The channel stays disconnected until the next attempt"
                );
            }
        }
    }

    /// Tears the port down locally. No-op when already disconnected. Does
    /// not fire the disconnect callback.
    pub fn disconnect(&mut self) {
        if let Some(transport) = self.transport.take() {
            transport.close();
            debug!(name = %self.params.name, "🔌 Disconnected from coordinator");
        }
    }

    /// Disconnects then connects, attempting the open even if already
    /// disconnected.
    ///
    /// If a previously connected channel fails to come back, the disconnect
    /// callback fires: for the client this is indistinguishable from the
    /// remote side closing the port.
    pub fn reconnect(&mut self) {
        let was_connected = self.transport.is_some();

        self.disconnect();
        self.connect();

        if was_connected && self.transport.is_none() {
            debug!(name = %self.params.name, "Channel closed due to reconnection failure");
            (self.on_disconnect)();
        }
    }

    /// Sends a message, connecting first when `auto_connect` is set.
    ///
    /// A message that cannot be sent is dropped with a warning; a send
    /// failure (remote already gone) is swallowed and logged, never
    /// propagated.
    pub fn post_message(&mut self, message: Message) {
        if self.transport.is_none() && self.params.auto_connect {
            self.connect();
        }

        let Some(transport) = &self.transport else {
            warn!(
                name = %self.params.name,
                ?message,
                "Could not send message because the channel is closed"
            );
            return;
        };

        if let Err(error) = transport.send(message) {
            info!(
                name = %self.params.name,
                %error,
                "⚠️ Message could not be sent; the other side of the channel has already closed"
            );
        }
    }

    /// Feeds one event from the receiver back into the manager.
    ///
    /// Events from a stale generation (a port replaced by a reconnect) or
    /// observed after a local disconnect are discarded. A remote close
    /// transitions to disconnected and fires the disconnect callback exactly
    /// once; inbound messages are returned to the caller.
    pub fn handle_event(&mut self, event: ChannelEvent) -> Option<Message> {
        if event.generation != self.generation || self.transport.is_none() {
            debug!(
                name = %self.params.name,
                generation = event.generation,
                "Discarding event from a stale channel"
            );
            return None;
        }

        match event.kind {
            ChannelEventKind::Disconnected => {
                self.transport = None;
                debug!(name = %self.params.name, "Channel closed by the other end");
                (self.on_disconnect)();
                None
            }
            ChannelEventKind::Message(message) => Some(message),
        }
    }
}
