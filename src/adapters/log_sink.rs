//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the logger (UART / USB-CDC on the device).  Dropped readings are routine
//! and stay at debug level.

use log::{Level, log};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

fn level(event: &AppEvent) -> Level {
    match event {
        AppEvent::ReadingDropped(_) => Level::Debug,
        AppEvent::Fatal(_) => Level::Error,
        _ => Level::Info,
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        let lvl = level(event);
        match event {
            AppEvent::Started(state) => log!(lvl, "START | session={:?}", state),
            AppEvent::Link(link) => log!(lvl, "LINK | {:?}", link),
            AppEvent::SessionChanged { from, to } => {
                log!(lvl, "STATE | {:?} -> {:?}", from, to);
            }
            AppEvent::ReadingReceived(value) => log!(lvl, "GLUCOSE | {} mg/dL", value),
            AppEvent::ReadingDropped(reason) => log!(lvl, "GLUCOSE | dropped: {}", reason),
            AppEvent::UpdateProgress(percent) => log!(lvl, "UPDATE | {}%", percent),
            AppEvent::ImageConfirmed => log!(lvl, "BOOT | image confirmed"),
            AppEvent::Fatal(cause) => log!(lvl, "FATAL | {}", cause),
        }
    }
}
