//! # neuromesh-core
//!
//! Shared library for the NeuroMesh chat client.
//! Contains domain types, the REST wire format, configuration, and the
//! client-side state (conversation store, peer dashboard, session).
//!
//! Nothing here touches the terminal or the network directly; the
//! `neuromesh` binary supplies both.

pub mod api;
pub mod config;
pub mod conversation;
pub mod dashboard;
pub mod session;
pub mod types;
