//! System configuration parameters
//!
//! All tunable parameters for the glucose light.  Defaults match the
//! shipped device; the broker endpoint and Wi-Fi credentials are injected
//! at build time (see `build.rs`).

use core::fmt;

use serde::{Deserialize, Serialize};

/// MQTT delivery guarantee for the application subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Qos {
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Broker ---
    /// Broker URL, e.g. `mqtts://example.iot.region.amazonaws.com:8883`
    pub broker_url: String,
    /// MQTT client identifier
    pub client_id: String,
    /// The single application topic carrying glucose readings
    pub topic: String,
    /// Delivery guarantee for `topic`
    pub qos: Qos,
    /// Largest payload accepted from the broker (bytes)
    pub max_payload_bytes: usize,

    // --- Session timing ---
    /// Delay before the first connect after link-up, and after a
    /// broker-initiated disconnect (seconds)
    pub reconnect_delay_secs: u32,
    /// Delay before retrying a connect attempt that timed out (seconds)
    pub connect_retry_backoff_secs: u32,

    // --- Indicator ---
    /// LED PWM frequency (Hz)
    pub led_pwm_frequency_hz: u32,
    /// Global brightness applied to every rendered colour (0.0-1.0)
    pub led_brightness: f32,

    // --- Loop ---
    /// Event queue poll interval (milliseconds)
    pub event_poll_interval_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Broker
            broker_url: String::from("mqtt://localhost:1883"),
            client_id: String::from("glucose-light"),
            topic: String::from("glucose/value"),
            qos: Qos::AtMostOnce,
            max_payload_bytes: 512,

            // Session timing
            reconnect_delay_secs: 5,
            connect_retry_backoff_secs: 60,

            // Indicator
            led_pwm_frequency_hz: 125, // 8 ms period
            led_brightness: 1.0,

            // Loop
            event_poll_interval_ms: 50,
        }
    }
}

/// A config field failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The `&'static str` names the field and the rule.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}

impl SystemConfig {
    /// Defaults overridden by the build-time broker URL, if one was set.
    pub fn from_build_env() -> Self {
        let mut config = Self::default();
        let url = option_env!("MQTT_BROKER_URL").unwrap_or("");
        if !url.is_empty() {
            config.broker_url = String::from(url);
        }
        config
    }

    pub fn reconnect_delay_ms(&self) -> u64 {
        u64::from(self.reconnect_delay_secs) * 1000
    }

    pub fn connect_retry_backoff_ms(&self) -> u64 {
        u64::from(self.connect_retry_backoff_secs) * 1000
    }

    /// Reject values the firmware cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.broker_url.is_empty() {
            return Err(ConfigError::ValidationFailed("broker_url must not be empty"));
        }
        if self.topic.is_empty() || self.topic.len() > crate::events::MAX_TOPIC_LEN {
            return Err(ConfigError::ValidationFailed("topic must be 1-64 bytes"));
        }
        if self.topic.contains(['+', '#']) {
            return Err(ConfigError::ValidationFailed("topic must not contain wildcards"));
        }
        if self.max_payload_bytes == 0 || self.max_payload_bytes > crate::events::MAX_PAYLOAD_LEN {
            return Err(ConfigError::ValidationFailed("max_payload_bytes must be 1-512"));
        }
        if self.reconnect_delay_secs == 0 || self.connect_retry_backoff_secs == 0 {
            return Err(ConfigError::ValidationFailed("session delays must be non-zero"));
        }
        if self.led_pwm_frequency_hz == 0 {
            return Err(ConfigError::ValidationFailed("led_pwm_frequency_hz must be non-zero"));
        }
        if !(0.0..=1.0).contains(&self.led_brightness) {
            return Err(ConfigError::ValidationFailed("led_brightness must be 0.0-1.0"));
        }
        if self.event_poll_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("event_poll_interval_ms must be non-zero"));
        }
        Ok(())
    }
}
