//! Sugarlight firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod codec;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod events;
pub mod failure;
pub mod render;
pub mod router;
pub mod session;
pub mod timer;
pub mod update;

// Platform adapters; ESP-IDF implementations are cfg-gated inside,
// host builds get simulation stand-ins.
pub mod adapters;
