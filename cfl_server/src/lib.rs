//! HTTP and WebSocket front end for Cannabis Fantasy League drafts.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
