//! Firmware-update coordination.
//!
//! Update lifecycle events arrive on the broker event stream.  Most are
//! informational; only a completed image changes anything:
//!
//! | Completed image     | Action                                       |
//! |---------------------|----------------------------------------------|
//! | application         | restart into the new image                   |
//! | modem (delta/full)  | drop the session, cycle the network interface|
//! | anything else       | log and ignore                               |

use log::{info, warn};

/// Which image an update installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Application,
    /// Delta patch for the radio subsystem.
    Modem,
    /// Full radio firmware image.
    ModemFull,
    Unknown(u8),
}

/// Update lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateEvent {
    Started,
    ErasePending,
    EraseDone,
    /// Download progress, percent.
    Progress(u8),
    Done(ImageKind),
    Error(i32),
    Cancelled,
}

/// What the dispatcher must do in response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateAction {
    None,
    /// Tear down the session, bring the interface down and up, reconnect.
    ReinitNetwork,
    /// Restart the device into the new application image.
    Restart,
}

#[derive(Debug, Default)]
pub struct UpdateCoordinator {
    in_progress: bool,
    last_progress: Option<u8>,
}

impl UpdateCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&mut self, event: UpdateEvent) -> UpdateAction {
        match event {
            UpdateEvent::Started => {
                info!("Update: download started");
                self.in_progress = true;
                self.last_progress = None;
                UpdateAction::None
            }
            UpdateEvent::ErasePending => {
                info!("Update: erase pending, waiting for flash erase");
                UpdateAction::None
            }
            UpdateEvent::EraseDone => {
                info!("Update: erase done");
                UpdateAction::None
            }
            UpdateEvent::Progress(percent) => {
                let percent = percent.min(100);
                info!("Update: {}% downloaded", percent);
                self.last_progress = Some(percent);
                UpdateAction::None
            }
            UpdateEvent::Done(kind) => {
                self.in_progress = false;
                self.on_done(kind)
            }
            UpdateEvent::Error(code) => {
                warn!("Update: failed (code={})", code);
                self.in_progress = false;
                UpdateAction::None
            }
            UpdateEvent::Cancelled => {
                warn!("Update: cancelled");
                self.in_progress = false;
                UpdateAction::None
            }
        }
    }

    fn on_done(&self, kind: ImageKind) -> UpdateAction {
        match kind {
            ImageKind::Application => {
                info!("Update: application image ready, restarting");
                UpdateAction::Restart
            }
            ImageKind::Modem | ImageKind::ModemFull => {
                info!("Update: modem image applied, reinitialising network");
                UpdateAction::ReinitNetwork
            }
            ImageKind::Unknown(tag) => {
                warn!("Update: done with unknown image type {}, ignored", tag);
                UpdateAction::None
            }
        }
    }

    /// An update has started and not yet completed or failed.
    pub fn in_progress(&self) -> bool {
        self.in_progress
    }

    /// Last reported download percentage for the current update.
    pub fn last_progress(&self) -> Option<u8> {
        self.last_progress
    }
}
