//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (LED, broker client, network interface, boot glue,
//! event sinks) implement these traits.  The
//! [`AppService`](super::service::AppService) consumes them via generics,
//! so the domain core never touches the platform directly.

use crate::config::Qos;
use crate::error::{ConnectError, NetworkError, OutputError};
use crate::render::Color;

// ───────────────────────────────────────────────────────────────
// Output port (domain → light)
// ───────────────────────────────────────────────────────────────

/// Drives three proportional output channels from a colour.
pub trait OutputSink {
    fn set_color(&mut self, color: Color) -> Result<(), OutputError>;
}

// ───────────────────────────────────────────────────────────────
// Broker port (domain → MQTT client)
// ───────────────────────────────────────────────────────────────

/// Session control on the broker client.
///
/// `connect` is asynchronous: `Ok(())` means the request is in flight and
/// the outcome arrives later as a broker event.  Timeouts and a busy
/// transport come back as retryable [`ConnectError`]s.
pub trait BrokerPort {
    fn connect(&mut self) -> Result<(), ConnectError>;

    /// Close the session.  Errors carry the client's status code.
    fn disconnect(&mut self) -> Result<(), i32>;

    fn subscribe(&mut self, topic: &str, qos: Qos) -> Result<(), i32>;
}

// ───────────────────────────────────────────────────────────────
// Network port (domain → interface driver)
// ───────────────────────────────────────────────────────────────

/// Interface lifecycle.  Every call blocks until the driver answers.
/// Link status itself arrives asynchronously as
/// [`Event::Network`](crate::events::Event::Network).
pub trait NetworkPort {
    fn bring_up(&mut self) -> Result<(), NetworkError>;

    /// Start associating / attaching.  Completion is reported as a link event.
    fn connect_network(&mut self) -> Result<(), NetworkError>;

    fn bring_down(&mut self) -> Result<(), NetworkError>;
}

// ───────────────────────────────────────────────────────────────
// Boot port (domain → bootloader)
// ───────────────────────────────────────────────────────────────

pub trait BootPort {
    /// Mark the running image as good so the bootloader keeps it.
    /// A no-op when no image is pending verification.
    fn confirm_image(&mut self) -> Result<(), i32>;
}

/// Device restart.  Never returns.
pub trait RestartPort {
    fn restart(&mut self) -> !;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
