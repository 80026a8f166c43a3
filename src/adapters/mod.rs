//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements             | Connects to               |
//! |-------------|------------------------|---------------------------|
//! | `boot`      | BootPort, RestartPort  | esp-ota (app slot, reset) |
//! | `led`       | OutputSink             | 3 × PWM (LEDC)            |
//! | `log_sink`  | EventSink              | Serial log output         |
//! | `mqtt`      | BrokerPort             | ESP-IDF MQTT client       |
//! | `platform`  | all outbound ports     | bundles the three above   |
//! | `time`      | (clock)                | ESP32 system timer        |
//! | `wifi`      | NetworkPort            | ESP-IDF WiFi STA          |

pub mod boot;
pub mod led;
pub mod log_sink;
pub mod mqtt;
pub mod platform;
pub mod time;
pub mod wifi;
