//! WiFi station-mode adapter.
//!
//! Implements [`NetworkPort`], the hexagonal boundary for the network
//! interface lifecycle.  Link status is not polled: the adapter subscribes
//! to the system event loop and enqueues [`NetStatus`] reports, which the
//! connectivity monitor turns into link transitions.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver via `esp_idf_svc::wifi`.
//! - **all other targets**: simulation stubs for host-side tests.
//!
//! ## Reconnection policy
//!
//! On station disconnect the driver is asked to re-associate straight
//! away; the broker session waits for the next IP assignment.

use log::info;

use crate::app::ports::NetworkPort;
#[cfg(target_os = "espidf")]
use crate::connectivity::NetStatus;
use crate::error::NetworkError;

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn valid_ssid(ssid: &str) -> bool {
    !ssid.is_empty() && ssid.len() <= 32 && is_printable_ascii(ssid)
}

/// Empty means an open network; otherwise WPA2 length rules.
fn valid_password(password: &str) -> bool {
    password.is_empty() || (8..=64).contains(&password.len())
}

/// Forward a platform status report to the dispatch loop.
#[cfg(target_os = "espidf")]
fn report(status: NetStatus) {
    crate::events::EVENTS.push_status(status);
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiNetwork {
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    #[cfg(target_os = "espidf")]
    wifi: esp_idf_svc::wifi::EspWifi<'static>,
    #[cfg(target_os = "espidf")]
    _subscriptions: (
        esp_idf_svc::eventloop::EspSubscription<'static, esp_idf_svc::eventloop::System>,
        esp_idf_svc::eventloop::EspSubscription<'static, esp_idf_svc::eventloop::System>,
    ),
    #[cfg(not(target_os = "espidf"))]
    up: bool,
}

impl WifiNetwork {
    /// Take the radio and hook the WiFi / IP events.
    #[cfg(target_os = "espidf")]
    pub fn new(
        modem: esp_idf_svc::hal::modem::Modem,
        sysloop: esp_idf_svc::eventloop::EspSystemEventLoop,
        nvs: Option<esp_idf_svc::nvs::EspDefaultNvsPartition>,
        ssid: &str,
        password: &str,
    ) -> anyhow::Result<Self> {
        use esp_idf_svc::netif::IpEvent;
        use esp_idf_svc::wifi::{EspWifi, WifiEvent};

        let (ssid, password) =
            credentials(ssid, password).map_err(|e| anyhow::anyhow!("WiFi: {e}"))?;
        let wifi = EspWifi::new(modem, sysloop.clone(), nvs)?;

        let ip_sub = sysloop.subscribe::<IpEvent, _>(|event| match event {
            IpEvent::DhcpIpAssigned(_) => report(NetStatus::L4Connected),
            IpEvent::DhcpIpDeassigned(_) => report(NetStatus::L4Disconnected),
            _ => {}
        })?;
        let wifi_sub = sysloop.subscribe::<WifiEvent, _>(|event| {
            if let WifiEvent::StaDisconnected(_) = event {
                report(NetStatus::L4Disconnected);
                // SAFETY: plain driver call; the station is started.
                let rc = unsafe { esp_idf_svc::sys::esp_wifi_connect() };
                if rc != 0 {
                    log::warn!("WiFi: re-associate failed (rc={})", rc);
                }
            }
        })?;

        Ok(Self {
            ssid,
            password,
            wifi,
            _subscriptions: (ip_sub, wifi_sub),
        })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(ssid: &str, password: &str) -> Result<Self, NetworkError> {
        let (ssid, password) = credentials(ssid, password)?;
        Ok(Self {
            ssid,
            password,
            up: false,
        })
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn is_up(&self) -> bool {
        self.up
    }
}

fn credentials(
    ssid: &str,
    password: &str,
) -> Result<(heapless::String<32>, heapless::String<64>), NetworkError> {
    if !valid_ssid(ssid) || !valid_password(password) {
        return Err(NetworkError::NoCredentials);
    }
    let mut s = heapless::String::new();
    s.push_str(ssid).map_err(|_| NetworkError::NoCredentials)?;
    let mut p = heapless::String::new();
    p.push_str(password).map_err(|_| NetworkError::NoCredentials)?;
    Ok((s, p))
}

// ───────────────────────────────────────────────────────────────
// NetworkPort
// ───────────────────────────────────────────────────────────────

impl NetworkPort for WifiNetwork {
    #[cfg(target_os = "espidf")]
    fn bring_up(&mut self) -> Result<(), NetworkError> {
        use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration};

        let auth_method = if self.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let conf = Configuration::Client(ClientConfiguration {
            ssid: self.ssid.clone(),
            password: self.password.clone(),
            auth_method,
            ..Default::default()
        });
        self.wifi
            .set_configuration(&conf)
            .map_err(|e| NetworkError::UpFailed(e.code()))?;
        self.wifi.start().map_err(|e| NetworkError::UpFailed(e.code()))?;
        info!("WiFi: station started");
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn bring_up(&mut self) -> Result<(), NetworkError> {
        self.up = true;
        let auth = if self.password.is_empty() { "open" } else { "WPA2" };
        info!("WiFi(sim): station started ({})", auth);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn connect_network(&mut self) -> Result<(), NetworkError> {
        self.wifi
            .connect()
            .map_err(|e| NetworkError::ConnectFailed(e.code()))?;
        info!("WiFi: associating with '{}'", self.ssid);
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn connect_network(&mut self) -> Result<(), NetworkError> {
        if !self.up {
            return Err(NetworkError::ConnectFailed(-1));
        }
        info!("WiFi(sim): associating with '{}'", self.ssid);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn bring_down(&mut self) -> Result<(), NetworkError> {
        if let Err(e) = self.wifi.disconnect() {
            log::warn!("WiFi: disconnect failed: {}", e);
        }
        self.wifi.stop().map_err(|e| NetworkError::DownFailed(e.code()))?;
        info!("WiFi: station stopped");
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn bring_down(&mut self) -> Result<(), NetworkError> {
        self.up = false;
        info!("WiFi(sim): station stopped");
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
