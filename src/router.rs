//! Inbound message routing and the glucose display.
//!
//! Exactly one topic is subscribed, so routing is unconditional: every
//! data event is decoded as a [`Reading`] and, if valid, handed to the one
//! consumer injected at construction.  Bad input is dropped, never
//! propagated.
//!
//! ```text
//!  Message ─▶ size guard ─▶ PayloadDecoder ─▶ validity ─▶ ReadingConsumer
//!                 │               │               │        (GlucoseDisplay:
//!                 └───────────────┴───────────────┴─▶ drop  render ─▶ OutputSink)
//! ```

use core::fmt;

use log::{debug, info, warn};

use crate::app::ports::OutputSink;
use crate::codec::{DecodeError, JsonDecoder, PayloadDecoder, Reading};
use crate::events::Message;
use crate::render::{self, Color, color::WHITE};

// ───────────────────────────────────────────────────────────────
// Consumer
// ───────────────────────────────────────────────────────────────

/// Receives every valid reading.
pub trait ReadingConsumer {
    fn on_reading(&mut self, reading: Reading);
}

// ───────────────────────────────────────────────────────────────
// Router
// ───────────────────────────────────────────────────────────────

/// Why a message did not reach the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    Oversized(usize),
    Undecodable(DecodeError),
    /// Decoded but negative.
    Invalid(i32),
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Oversized(len) => write!(f, "payload too large ({} bytes)", len),
            Self::Undecodable(e) => write!(f, "{e}"),
            Self::Invalid(v) => write!(f, "invalid reading {}", v),
        }
    }
}

pub struct MessageRouter<C, D = JsonDecoder> {
    consumer: C,
    decoder: D,
    max_payload_bytes: usize,
}

impl<C: ReadingConsumer> MessageRouter<C> {
    pub fn new(consumer: C, max_payload_bytes: usize) -> Self {
        Self::with_decoder(consumer, JsonDecoder, max_payload_bytes)
    }
}

impl<C: ReadingConsumer, D: PayloadDecoder> MessageRouter<C, D> {
    pub fn with_decoder(consumer: C, decoder: D, max_payload_bytes: usize) -> Self {
        Self {
            consumer,
            decoder,
            max_payload_bytes,
        }
    }

    /// Decode `msg` and deliver it.  Returns the delivered reading or the
    /// reason it was dropped; either way nothing propagates further.
    pub fn route(&mut self, msg: &Message) -> Result<Reading, DropReason> {
        info!(
            "MQTT: received {} bytes on '{}'",
            msg.payload.len(),
            msg.topic
        );

        let result = self.decode(&msg.payload);
        match result {
            Ok(reading) => self.consumer.on_reading(reading),
            Err(reason) => debug!("Router: message dropped: {}", reason),
        }
        result
    }

    fn decode(&self, payload: &[u8]) -> Result<Reading, DropReason> {
        if payload.len() > self.max_payload_bytes {
            return Err(DropReason::Oversized(payload.len()));
        }
        let reading = self
            .decoder
            .decode(payload)
            .map_err(DropReason::Undecodable)?;
        if !reading.is_valid() {
            return Err(DropReason::Invalid(reading.value()));
        }
        Ok(reading)
    }

    pub fn consumer(&self) -> &C {
        &self.consumer
    }

    pub fn consumer_mut(&mut self) -> &mut C {
        &mut self.consumer
    }
}

// ───────────────────────────────────────────────────────────────
// Display consumer
// ───────────────────────────────────────────────────────────────

/// Renders each reading onto an [`OutputSink`].
///
/// The sink is optional: a display whose output never initialised skips
/// every update silently.
pub struct GlucoseDisplay<S> {
    sink: Option<S>,
    brightness: f32,
    last_color: Option<Color>,
}

impl<S: OutputSink> GlucoseDisplay<S> {
    pub fn new(sink: Option<S>, brightness: f32) -> Self {
        if sink.is_none() {
            warn!("Display: output device not ready, readings will not be shown");
        }
        Self {
            sink,
            brightness: brightness.clamp(0.0, 1.0),
            last_color: None,
        }
    }

    /// Show white until the first reading arrives.
    pub fn show_boot_color(&mut self) {
        self.show(WHITE);
    }

    /// Last colour written to the sink, before brightness scaling.
    pub fn last_color(&self) -> Option<Color> {
        self.last_color
    }

    pub fn is_ready(&self) -> bool {
        self.sink.is_some()
    }

    pub fn sink(&self) -> Option<&S> {
        self.sink.as_ref()
    }

    fn show(&mut self, color: Color) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        match sink.set_color(color * self.brightness) {
            Ok(()) => self.last_color = Some(color),
            Err(e) => warn!("Display: {}", e),
        }
    }
}

impl<S: OutputSink> ReadingConsumer for GlucoseDisplay<S> {
    fn on_reading(&mut self, reading: Reading) {
        match render::render(reading.value()) {
            Ok(color) => {
                debug!(
                    "Display: {} mg/dL -> ({:.3}, {:.3}, {:.3})",
                    reading.value(),
                    color.r(),
                    color.g(),
                    color.b()
                );
                self.show(color);
            }
            Err(e) => debug!("Display: {}", e),
        }
    }
}
