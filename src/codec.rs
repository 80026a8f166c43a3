//! Glucose payload decoding.
//!
//! The publisher sends one JSON object per reading:
//!
//! ```json
//! { "value": 142, "timestamp": "2024-05-01T10:15:00Z" }
//! ```
//!
//! Only `value` is required.  `timestamp` is carried for logging.

use core::fmt;

use serde::Deserialize;

/// One glucose reading in mg/dL.  Negative values are invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading(pub i32);

impl Reading {
    pub fn value(self) -> i32 {
        self.0
    }

    pub fn is_valid(self) -> bool {
        self.0 >= 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Not a JSON object of the expected shape.
    Malformed,
    /// `value` is absent.
    MissingValue,
    /// `value` does not fit a 32-bit reading.
    OutOfRange,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed payload"),
            Self::MissingValue => write!(f, "payload has no value"),
            Self::OutOfRange => write!(f, "value out of range"),
        }
    }
}

/// Turns raw message bytes into a [`Reading`].
pub trait PayloadDecoder {
    fn decode(&self, payload: &[u8]) -> Result<Reading, DecodeError>;
}

#[derive(Deserialize)]
struct GlucosePayload {
    value: Option<i64>,
    #[serde(default)]
    timestamp: Option<String>,
}

/// Decoder for the JSON wire format above.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonDecoder;

impl PayloadDecoder for JsonDecoder {
    fn decode(&self, payload: &[u8]) -> Result<Reading, DecodeError> {
        let parsed: GlucosePayload =
            serde_json::from_slice(payload).map_err(|_| DecodeError::Malformed)?;
        let value = parsed.value.ok_or(DecodeError::MissingValue)?;
        let value = i32::try_from(value).map_err(|_| DecodeError::OutOfRange)?;
        if let Some(ts) = parsed.timestamp.as_deref() {
            log::debug!("Codec: reading {} at {}", value, ts);
        }
        Ok(Reading(value))
    }
}
