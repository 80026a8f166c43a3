//! Application core: domain logic behind port traits.
//!
//! This module ties the session state machine, the connectivity monitor,
//! the message router and the update coordinator into one serial
//! dispatcher.  All interaction with the platform happens through
//! **port traits** defined in [`ports`], keeping this layer fully testable
//! without real peripherals.

pub mod events;
pub mod ports;
pub mod service;
