//! Fail-safe restart.
//!
//! Every unrecoverable condition ends here: log the cause, flush the
//! logger so the record survives, restart.  There is no degraded mode.

use log::{error, info};

use crate::app::ports::RestartPort;
use crate::error::{FatalError, Shutdown};

pub struct FailureEscalator<R> {
    restart: R,
}

impl<R: RestartPort> FailureEscalator<R> {
    pub fn new(restart: R) -> Self {
        Self { restart }
    }

    /// Log `cause`, flush, restart.  Never returns.
    pub fn escalate(&mut self, cause: FatalError) -> ! {
        error!("FATAL | {}, restarting", cause);
        log::logger().flush();
        self.restart.restart()
    }

    /// Terminate the dispatch loop.  A fatal shutdown escalates; an
    /// applied image restarts without the error record.
    pub fn shutdown(&mut self, reason: Shutdown) -> ! {
        match reason {
            Shutdown::Fatal(cause) => self.escalate(cause),
            Shutdown::ImageApplied => {
                info!("Restarting into the new application image");
                log::logger().flush();
                self.restart.restart()
            }
        }
    }
}
