//! Mock platform adapters for integration tests.
//!
//! Records every port call so tests can assert on the full command
//! history without a network, a broker, or PWM registers.

use std::collections::VecDeque;

use sugarlight::app::events::AppEvent;
use sugarlight::app::ports::{
    BootPort, BrokerPort, EventSink, NetworkPort, OutputSink, RestartPort,
};
use sugarlight::app::service::AppService;
use sugarlight::config::{Qos, SystemConfig};
use sugarlight::connectivity::NetStatus;
use sugarlight::error::{ConnectError, NetworkError, OutputError, Shutdown};
use sugarlight::events::{BrokerEvent, Event, EventQueue, Message};
use sugarlight::render::Color;
use sugarlight::router::GlucoseDisplay;

// ── Port call record ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum PortCall {
    Connect,
    Disconnect,
    Subscribe(String, Qos),
    ConfirmImage,
    BringUp,
    ConnectNetwork,
    BringDown,
}

// ── MockPorts ─────────────────────────────────────────────────

/// Broker, network and boot ports in one recorder.
#[derive(Default)]
pub struct MockPorts {
    pub calls: Vec<PortCall>,
    /// Results handed out by successive `connect` calls; `Ok` once drained.
    pub connect_results: VecDeque<Result<(), ConnectError>>,
    pub subscribe_error: Option<i32>,
    pub bring_down_error: Option<NetworkError>,
}

#[allow(dead_code)]
impl MockPorts {
    pub fn count(&self, call: &PortCall) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }

    pub fn connects(&self) -> usize {
        self.count(&PortCall::Connect)
    }

    pub fn subscribes(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, PortCall::Subscribe(..)))
            .count()
    }
}

impl BrokerPort for MockPorts {
    fn connect(&mut self) -> Result<(), ConnectError> {
        self.calls.push(PortCall::Connect);
        self.connect_results.pop_front().unwrap_or(Ok(()))
    }

    fn disconnect(&mut self) -> Result<(), i32> {
        self.calls.push(PortCall::Disconnect);
        Ok(())
    }

    fn subscribe(&mut self, topic: &str, qos: Qos) -> Result<(), i32> {
        self.calls.push(PortCall::Subscribe(topic.to_string(), qos));
        match self.subscribe_error {
            Some(code) => Err(code),
            None => Ok(()),
        }
    }
}

impl NetworkPort for MockPorts {
    fn bring_up(&mut self) -> Result<(), NetworkError> {
        self.calls.push(PortCall::BringUp);
        Ok(())
    }

    fn connect_network(&mut self) -> Result<(), NetworkError> {
        self.calls.push(PortCall::ConnectNetwork);
        Ok(())
    }

    fn bring_down(&mut self) -> Result<(), NetworkError> {
        self.calls.push(PortCall::BringDown);
        match self.bring_down_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl BootPort for MockPorts {
    fn confirm_image(&mut self) -> Result<(), i32> {
        self.calls.push(PortCall::ConfirmImage);
        Ok(())
    }
}

// ── Output and event sinks ────────────────────────────────────

#[derive(Default)]
pub struct MockLed {
    pub colors: Vec<Color>,
}

impl OutputSink for MockLed {
    fn set_color(&mut self, color: Color) -> Result<(), OutputError> {
        self.colors.push(color);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(*event);
    }
}

/// Restart port that counts calls and unwinds instead of resetting.
pub struct PanicRestart<'a> {
    pub restarts: &'a mut u32,
}

impl RestartPort for PanicRestart<'_> {
    fn restart(&mut self) -> ! {
        *self.restarts += 1;
        panic!("restart requested");
    }
}

// ── Harness ───────────────────────────────────────────────────

pub type TestService = AppService<GlucoseDisplay<MockLed>>;

/// Service, mocks, and a manual clock.
pub struct Harness {
    pub app: TestService,
    pub io: MockPorts,
    pub sink: RecordingSink,
    pub now: u64,
}

#[allow(dead_code)]
impl Harness {
    pub fn new() -> Self {
        Self::with_config(&SystemConfig::default())
    }

    pub fn with_config(config: &SystemConfig) -> Self {
        let mut display = GlucoseDisplay::new(Some(MockLed::default()), config.led_brightness);
        display.show_boot_color();
        let mut app = AppService::new(config, display);
        let mut sink = RecordingSink::default();
        app.start(&mut sink);
        Self {
            app,
            io: MockPorts::default(),
            sink,
            now: 0,
        }
    }

    pub fn send(&mut self, event: Event) -> Result<(), Shutdown> {
        self.app.dispatch(event, self.now, &mut self.io, &mut self.sink)
    }

    /// Move the clock forward and deliver a due timer expiry, if any.
    pub fn advance(&mut self, ms: u64) -> Result<(), Shutdown> {
        self.now += ms;
        match self.app.poll_timer(self.now) {
            Some(expiry) => self.send(expiry),
            None => Ok(()),
        }
    }

    /// One main-loop pass at the current time against `queue`.
    pub fn run_once(&mut self, queue: &EventQueue) -> Result<(), Shutdown> {
        self.app
            .run_once(self.now, queue, &mut self.io, &mut self.sink)
    }

    pub fn link_up(&mut self) -> Result<(), Shutdown> {
        self.send(Event::Network(NetStatus::L4Connected))
    }

    pub fn link_down(&mut self) -> Result<(), Shutdown> {
        self.send(Event::Network(NetStatus::L4Disconnected))
    }

    pub fn broker(&mut self, event: BrokerEvent) -> Result<(), Shutdown> {
        self.send(Event::Broker(event))
    }

    pub fn publish(&mut self, payload: &str) -> Result<(), Shutdown> {
        let msg = Message::new("glucose/value", payload.as_bytes()).expect("fits");
        self.broker(BrokerEvent::Message(msg))
    }

    /// Link up, wait out the reconnect delay, accept a fresh session.
    pub fn establish(&mut self) {
        self.link_up().unwrap();
        self.advance(5_000).unwrap();
        self.broker(BrokerEvent::Connected {
            persistent_session: false,
        })
        .unwrap();
    }

    pub fn led(&self) -> &MockLed {
        self.app.consumer().sink().expect("LED present")
    }
}
