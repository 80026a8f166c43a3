//! MQTT broker adapter.
//!
//! Implements [`BrokerPort`] over the ESP-IDF MQTT client.  Each connect
//! creates a fresh client (the request returns immediately; the outcome
//! arrives as an event) and a receiver thread that translates client
//! events into [`BrokerEvent`]s on the global event queue.  Disconnect
//! drops the client, which ends the receiver thread.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::mqtt::client`.
//! - **all other targets**: simulation stub that records requests.
//!
//! Transport failures are reported by the client as an error event
//! followed by a disconnect.  Both are forwarded; while a connect is in
//! flight the session treats either as a timed-out attempt and backs off.
//! The session also disconnects (drops the client) after every failed
//! attempt and every lost session, so the client library never retries
//! on its own.

use log::{info, warn};

use crate::app::ports::BrokerPort;
use crate::config::{Qos, SystemConfig};
use crate::error::ConnectError;

pub struct EspBroker {
    broker_url: String,
    client_id: String,
    max_payload_bytes: usize,
    #[cfg(target_os = "espidf")]
    client: Option<esp_idf_svc::mqtt::client::EspMqttClient<'static>>,
    #[cfg(not(target_os = "espidf"))]
    sim: SimState,
}

/// Requests seen by the simulated client.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
pub struct SimState {
    pub connected: bool,
    pub connects: u32,
    pub subscriptions: Vec<(String, Qos)>,
}

impl EspBroker {
    pub fn new(config: &SystemConfig) -> Self {
        info!(
            "MQTT: broker {} as '{}'",
            config.broker_url, config.client_id
        );
        Self {
            broker_url: config.broker_url.clone(),
            client_id: config.client_id.clone(),
            max_payload_bytes: config.max_payload_bytes,
            #[cfg(target_os = "espidf")]
            client: None,
            #[cfg(not(target_os = "espidf"))]
            sim: SimState::default(),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim(&self) -> &SimState {
        &self.sim
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF client
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod platform {
    use esp_idf_svc::mqtt::client::{
        Details, EspMqttConnection, EventPayload, QoS,
    };
    use esp_idf_svc::sys::{EspError, ESP_ERR_INVALID_STATE, ESP_ERR_NO_MEM, ESP_ERR_TIMEOUT};
    use log::{debug, info, warn};

    use crate::config::Qos;
    use crate::error::ConnectError;
    use crate::events::{BrokerEvent, EVENTS, Event, Message};

    pub(super) const NOT_CONNECTED: i32 = ESP_ERR_INVALID_STATE as i32;

    pub(super) fn qos(q: Qos) -> QoS {
        match q {
            Qos::AtMostOnce => QoS::AtMostOnce,
            Qos::AtLeastOnce => QoS::AtLeastOnce,
            Qos::ExactlyOnce => QoS::ExactlyOnce,
        }
    }

    pub(super) fn classify(e: EspError) -> ConnectError {
        match e.code() {
            c if c == ESP_ERR_TIMEOUT as i32 => ConnectError::TimedOut,
            c if c == ESP_ERR_INVALID_STATE as i32 => ConnectError::WouldBlock,
            c => ConnectError::Failed(c),
        }
    }

    pub(super) fn spawn_receiver(
        mut conn: EspMqttConnection,
        max_payload_bytes: usize,
    ) -> Result<(), ConnectError> {
        std::thread::Builder::new()
            .name("mqtt-rx".into())
            .stack_size(6 * 1024)
            .spawn(move || {
                while let Ok(event) = conn.next() {
                    if let Some(e) = translate(event.payload(), max_payload_bytes) {
                        EVENTS.push(Event::Broker(e));
                    }
                }
                info!("MQTT: connection closed, receiver exiting");
            })
            .map(|_| ())
            .map_err(|_| ConnectError::Failed(ESP_ERR_NO_MEM as i32))
    }

    fn translate(payload: EventPayload<'_, EspError>, max_payload_bytes: usize) -> Option<BrokerEvent> {
        match payload {
            EventPayload::BeforeConnect => Some(BrokerEvent::Connecting),
            EventPayload::Connected(session_present) => Some(BrokerEvent::Connected {
                persistent_session: session_present,
            }),
            EventPayload::Disconnected => Some(BrokerEvent::Disconnected),
            EventPayload::Received {
                topic,
                data,
                details,
                ..
            } => {
                if !matches!(details, Details::Complete) {
                    warn!("MQTT: fragmented message ignored");
                    return None;
                }
                if data.len() > max_payload_bytes {
                    warn!("MQTT: dropping oversized payload ({} bytes)", data.len());
                    return None;
                }
                match Message::new(topic.unwrap_or(""), data) {
                    Some(msg) => Some(BrokerEvent::Message(msg)),
                    None => {
                        warn!("MQTT: message does not fit the event buffer");
                        None
                    }
                }
            }
            EventPayload::Published(id) => Some(BrokerEvent::PubAck(id)),
            EventPayload::Error(e) => {
                warn!("MQTT: transport error: {:?}", e);
                Some(BrokerEvent::TransportError(e.code()))
            }
            EventPayload::Subscribed(id) => {
                debug!("MQTT: SUBACK id={}", id);
                None
            }
            other => {
                warn!("MQTT: unhandled event {:?}", other);
                None
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// BrokerPort
// ───────────────────────────────────────────────────────────────

impl BrokerPort for EspBroker {
    #[cfg(target_os = "espidf")]
    fn connect(&mut self) -> Result<(), ConnectError> {
        use esp_idf_svc::mqtt::client::{EspMqttClient, MqttClientConfiguration};

        // A leftover client from the previous session goes first.
        self.client = None;

        let conf = MqttClientConfiguration {
            client_id: Some(self.client_id.as_str()),
            ..Default::default()
        };
        let (client, conn) =
            EspMqttClient::new(self.broker_url.as_str(), &conf).map_err(platform::classify)?;
        platform::spawn_receiver(conn, self.max_payload_bytes)?;
        self.client = Some(client);
        info!("MQTT: connect requested");
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn connect(&mut self) -> Result<(), ConnectError> {
        self.sim.connects += 1;
        self.sim.connected = true;
        info!(
            "MQTT(sim): connect to {} as '{}' (max payload {} B)",
            self.broker_url, self.client_id, self.max_payload_bytes
        );
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn disconnect(&mut self) -> Result<(), i32> {
        if self.client.take().is_some() {
            info!("MQTT: client closed");
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn disconnect(&mut self) -> Result<(), i32> {
        self.sim.connected = false;
        info!("MQTT(sim): disconnected");
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn subscribe(&mut self, topic: &str, qos: Qos) -> Result<(), i32> {
        let Some(client) = self.client.as_mut() else {
            warn!("MQTT: subscribe without a client");
            return Err(platform::NOT_CONNECTED);
        };
        client
            .subscribe(topic, platform::qos(qos))
            .map(|_| ())
            .map_err(|e| e.code())
    }

    #[cfg(not(target_os = "espidf"))]
    fn subscribe(&mut self, topic: &str, qos: Qos) -> Result<(), i32> {
        if !self.sim.connected {
            warn!("MQTT(sim): subscribe without a client");
            return Err(-1);
        }
        self.sim.subscriptions.push((String::from(topic), qos));
        Ok(())
    }
}
