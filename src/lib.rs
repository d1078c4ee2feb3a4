//! Quoted Search Library
//!
//! Core modules for coordinating a shared text selection across
//! independently lifecycled execution contexts, and dispatching quoted
//! searches derived from it.

use tracing_subscriber::EnvFilter;

pub mod action;
pub mod channel;
pub mod commands;
pub mod config;
pub mod coordinator;
pub mod core;
pub mod dispatch;
pub mod error;
pub mod menu;
pub mod platform;
pub mod registry;
pub mod tracker;

/// Sets up logging for an embedding binary.
///
/// `QUOTED_SEARCH_LOG` overrides the default `info` level with any
/// `tracing` filter directive.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("QUOTED_SEARCH_LOG")
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}
