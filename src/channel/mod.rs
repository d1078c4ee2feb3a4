//! Channel Module
//!
//! Reconnectable messaging between execution contexts. Protocol: tagged JSON
//! messages over duplex ports. The [`hub`] pairs page/popup contexts with the
//! coordinator in-process; [`manager`] wraps one port on the client side.

pub mod hub;
pub mod manager;
pub mod messages;

pub use hub::{Hub, HubEvent, PortId};
pub use manager::{
    ChannelEvent, ChannelEventKind, ChannelManager, ChannelOpener, ChannelParams, ChannelTransport,
};
pub use messages::*;
