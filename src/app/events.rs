//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them.

use crate::connectivity::LinkEvent;
use crate::error::FatalError;
use crate::router::DropReason;
use crate::session::SessionState;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppEvent {
    /// The service has started (carries the initial session state).
    Started(SessionState),

    /// Network link went up or down.
    Link(LinkEvent),

    /// The broker session moved between states.
    SessionChanged { from: SessionState, to: SessionState },

    /// A valid reading was handed to the display.
    ReadingReceived(i32),

    /// An inbound message was discarded.
    ReadingDropped(DropReason),

    /// Firmware download progress, percent.
    UpdateProgress(u8),

    /// The running image was confirmed after the first session.
    ImageConfirmed,

    /// An unrecoverable condition; a restart follows.
    Fatal(FatalError),
}
