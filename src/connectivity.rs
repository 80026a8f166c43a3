//! Network link observer.
//!
//! Turns the platform's interface status into the two discrete events the
//! session manager cares about.  It holds no retry policy: it only reports
//! transitions, and it short-circuits an unrecoverable interface fault to
//! a [`FatalError`] instead of treating it as an ordinary link-down.

use log::{debug, error, info};

use crate::error::FatalError;

/// Interface status as reported by the platform connection layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetStatus {
    /// IP connectivity established.
    L4Connected,
    /// IP connectivity lost.
    L4Disconnected,
    /// The interface itself failed and cannot recover.
    InterfaceFatal,
}

/// Link transitions delivered to the subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    Up,
    Down,
}

#[derive(Debug, Default)]
pub struct ConnectivityMonitor {
    link_up: Option<bool>,
}

impl ConnectivityMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one platform status report.
    ///
    /// Returns the link transition to deliver, `None` when the level did
    /// not change, or the fatal error for an interface fault.
    pub fn observe(&mut self, status: NetStatus) -> Result<Option<LinkEvent>, FatalError> {
        let up = match status {
            NetStatus::L4Connected => true,
            NetStatus::L4Disconnected => false,
            NetStatus::InterfaceFatal => {
                error!("Network: interface fatal error");
                return Err(FatalError::InterfaceFatal);
            }
        };

        if self.link_up == Some(up) {
            debug!("Network: duplicate status {:?} ignored", status);
            return Ok(None);
        }
        self.link_up = Some(up);

        if up {
            info!("Network: connectivity established");
            Ok(Some(LinkEvent::Up))
        } else {
            info!("Network: connectivity lost");
            Ok(Some(LinkEvent::Down))
        }
    }

    /// Last reported level; `false` before the first report.
    pub fn is_up(&self) -> bool {
        self.link_up.unwrap_or(false)
    }
}
