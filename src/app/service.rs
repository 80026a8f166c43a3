//! Application service, the hexagonal core.
//!
//! [`AppService`] owns the session state machine, the connectivity monitor,
//! the retry timer, the message router, and the update coordinator.  It
//! handles one [`Event`] at a time; all I/O flows through port traits
//! injected at call sites, making the entire service testable with mock
//! adapters.
//!
//! ```text
//!               ┌───────────────────────────────┐ ──▶ BrokerPort
//!  Event ─────▶ │          AppService            │ ──▶ NetworkPort
//!               │ Monitor · Session · Timer      │ ──▶ BootPort
//!               │ Router · Updates               │ ──▶ EventSink
//!               └───────────────────────────────┘
//!                    │ Err(Shutdown)
//!                    ▼
//!               FailureEscalator (caller)
//! ```
//!
//! Fatal conditions never panic here: they come back as
//! `Err(Shutdown)` and the service halts, ignoring anything queued after.

use log::{debug, info, warn};

use crate::codec::{JsonDecoder, PayloadDecoder};
use crate::config::{Qos, SystemConfig};
use crate::connectivity::{ConnectivityMonitor, LinkEvent, NetStatus};
use crate::error::{FatalError, Shutdown};
use crate::events::{BrokerEvent, Event, EventQueue};
use crate::router::{MessageRouter, ReadingConsumer};
use crate::session::{SessionEffect, SessionInput, SessionManager, SessionState, SessionTiming};
use crate::timer::RetryTimer;
use crate::update::{UpdateAction, UpdateCoordinator, UpdateEvent};

use super::events::AppEvent;
use super::ports::{BootPort, BrokerPort, EventSink, NetworkPort};

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

pub struct AppService<C, D = JsonDecoder> {
    session: SessionManager,
    monitor: ConnectivityMonitor,
    timer: RetryTimer,
    router: MessageRouter<C, D>,
    updates: UpdateCoordinator,
    topic: String,
    qos: Qos,
    image_confirmed: bool,
    halted: bool,
}

impl<C: ReadingConsumer> AppService<C> {
    /// Construct the service with the JSON payload decoder.
    pub fn new(config: &SystemConfig, consumer: C) -> Self {
        Self::with_decoder(config, consumer, JsonDecoder)
    }
}

impl<C: ReadingConsumer, D: PayloadDecoder> AppService<C, D> {
    pub fn with_decoder(config: &SystemConfig, consumer: C, decoder: D) -> Self {
        Self {
            session: SessionManager::new(SessionTiming::from(config)),
            monitor: ConnectivityMonitor::new(),
            timer: RetryTimer::new(),
            router: MessageRouter::with_decoder(consumer, decoder, config.max_payload_bytes),
            updates: UpdateCoordinator::new(),
            topic: config.topic.clone(),
            qos: config.qos,
            image_confirmed: false,
            halted: false,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, sink: &mut impl EventSink) {
        sink.emit(&AppEvent::Started(self.session.state()));
        info!(
            "AppService started, topic '{}' ({:?})",
            self.topic, self.qos
        );
    }

    /// Expiry of the retry timer, if due.  The timer is disarmed, so the
    /// result must go straight to [`dispatch`](Self::dispatch).
    pub fn poll_timer(&mut self, now_ms: u64) -> Option<Event> {
        self.timer.poll(now_ms).map(Event::RetryTimer)
    }

    /// One pass of the main loop: a due retry expiry is handled at once,
    /// then every queued event, oldest first.  The expiry never goes
    /// through `queue`, so a full queue cannot lose it.
    pub fn run_once<IO>(
        &mut self,
        now_ms: u64,
        queue: &EventQueue,
        io: &mut IO,
        sink: &mut impl EventSink,
    ) -> Result<(), Shutdown>
    where
        IO: BrokerPort + NetworkPort + BootPort,
    {
        if let Some(expiry) = self.poll_timer(now_ms) {
            self.dispatch(expiry, now_ms, io, sink)?;
        }
        queue.drain(|event| self.dispatch(event, now_ms, io, sink))
    }

    // ── Dispatch ──────────────────────────────────────────────

    /// Handle one event.
    ///
    /// `io` satisfies every outbound port at once, which avoids juggling
    /// several mutable borrows of what is usually one platform object.
    pub fn dispatch<IO>(
        &mut self,
        event: Event,
        now_ms: u64,
        io: &mut IO,
        sink: &mut impl EventSink,
    ) -> Result<(), Shutdown>
    where
        IO: BrokerPort + NetworkPort + BootPort,
    {
        if self.halted {
            debug!("AppService halted, {:?} ignored", event);
            return Ok(());
        }

        let result = self.handle_event(event, now_ms, io, sink);
        if let Err(reason) = result {
            if let Shutdown::Fatal(cause) = reason {
                sink.emit(&AppEvent::Fatal(cause));
            }
            self.halted = true;
        }
        result
    }

    fn handle_event<IO>(
        &mut self,
        event: Event,
        now_ms: u64,
        io: &mut IO,
        sink: &mut impl EventSink,
    ) -> Result<(), Shutdown>
    where
        IO: BrokerPort + NetworkPort + BootPort,
    {
        match event {
            Event::Network(status) => match self.monitor.observe(status)? {
                Some(link) => {
                    sink.emit(&AppEvent::Link(link));
                    let input = match link {
                        LinkEvent::Up => SessionInput::LinkUp,
                        LinkEvent::Down => SessionInput::LinkDown,
                    };
                    self.drive(input, now_ms, io, sink)
                }
                None => Ok(()),
            },

            Event::Broker(broker) => self.on_broker(broker, now_ms, io, sink),

            Event::RetryTimer(token) => {
                if self.timer.is_current(token) {
                    self.drive(SessionInput::RetryTimerFired, now_ms, io, sink)
                } else {
                    debug!("Timer: stale expiry (gen {}) dropped", token.generation());
                    Ok(())
                }
            }

            Event::Stop => self.drive(SessionInput::Stop, now_ms, io, sink),
        }
    }

    fn on_broker<IO>(
        &mut self,
        event: BrokerEvent,
        now_ms: u64,
        io: &mut IO,
        sink: &mut impl EventSink,
    ) -> Result<(), Shutdown>
    where
        IO: BrokerPort + NetworkPort + BootPort,
    {
        match event {
            BrokerEvent::Connecting => {
                debug!("MQTT: connecting");
                Ok(())
            }
            BrokerEvent::Connected { persistent_session } => self.drive(
                SessionInput::BrokerConnected { persistent_session },
                now_ms,
                io,
                sink,
            ),
            BrokerEvent::Disconnected => {
                self.drive(SessionInput::BrokerDisconnected, now_ms, io, sink)
            }
            BrokerEvent::Message(msg) => {
                let event = match self.router.route(&msg) {
                    Ok(reading) => AppEvent::ReadingReceived(reading.value()),
                    Err(reason) => AppEvent::ReadingDropped(reason),
                };
                sink.emit(&event);
                Ok(())
            }
            BrokerEvent::PubAck(id) => {
                debug!("MQTT: PUBACK id={}", id);
                Ok(())
            }
            BrokerEvent::PingResp => {
                debug!("MQTT: PINGRESP");
                Ok(())
            }
            BrokerEvent::Update(update) => self.on_update(update, now_ms, io, sink),
            BrokerEvent::TransportError(code) => {
                self.drive(SessionInput::BrokerTransportError(code), now_ms, io, sink)
            }
            BrokerEvent::Error(code) => self.drive(SessionInput::BrokerError(code), now_ms, io, sink),
        }
    }

    fn on_update<IO>(
        &mut self,
        event: UpdateEvent,
        now_ms: u64,
        io: &mut IO,
        sink: &mut impl EventSink,
    ) -> Result<(), Shutdown>
    where
        IO: BrokerPort + NetworkPort + BootPort,
    {
        match self.updates.handle(event) {
            UpdateAction::None => {
                if let UpdateEvent::Progress(_) = event {
                    if let Some(percent) = self.updates.last_progress() {
                        sink.emit(&AppEvent::UpdateProgress(percent));
                    }
                }
                Ok(())
            }
            UpdateAction::ReinitNetwork => self.reinit_network(now_ms, io, sink),
            UpdateAction::Restart => Err(Shutdown::ImageApplied),
        }
    }

    /// Drop the session and cycle the interface after a radio image update.
    /// The link-up that follows reconnects through the normal path.
    fn reinit_network<IO>(
        &mut self,
        now_ms: u64,
        io: &mut IO,
        sink: &mut impl EventSink,
    ) -> Result<(), Shutdown>
    where
        IO: BrokerPort + NetworkPort + BootPort,
    {
        self.drive(SessionInput::LinkDown, now_ms, io, sink)?;
        if let Ok(Some(link)) = self.monitor.observe(NetStatus::L4Disconnected) {
            sink.emit(&AppEvent::Link(link));
        }

        io.bring_down()?;
        io.bring_up()?;
        io.connect_network()?;
        info!("Network: reinitialised, waiting for connectivity");
        Ok(())
    }

    // ── Session plumbing ──────────────────────────────────────

    /// Run `input` through the session manager and execute its effects.
    /// A connect result is fed straight back in as the next input.
    fn drive<IO>(
        &mut self,
        input: SessionInput,
        now_ms: u64,
        io: &mut IO,
        sink: &mut impl EventSink,
    ) -> Result<(), Shutdown>
    where
        IO: BrokerPort + BootPort,
    {
        let mut next = Some(input);
        while let Some(input) = next.take() {
            let from = self.session.state();
            let effects = self.session.handle(input);
            let to = self.session.state();
            if from != to {
                sink.emit(&AppEvent::SessionChanged { from, to });
            }

            for effect in effects {
                if let Some(follow_up) = self.apply(effect, now_ms, io, sink)? {
                    next = Some(follow_up);
                }
            }
        }
        Ok(())
    }

    fn apply<IO>(
        &mut self,
        effect: SessionEffect,
        now_ms: u64,
        io: &mut IO,
        sink: &mut impl EventSink,
    ) -> Result<Option<SessionInput>, Shutdown>
    where
        IO: BrokerPort + BootPort,
    {
        match effect {
            SessionEffect::ArmRetryTimer { delay_ms } => {
                self.timer.arm(now_ms, delay_ms);
                debug!("Timer: armed for {} ms", delay_ms);
            }
            SessionEffect::CancelRetryTimer => self.timer.cancel(),
            SessionEffect::Connect => {
                return Ok(Some(SessionInput::ConnectReturned(io.connect())));
            }
            SessionEffect::Disconnect => {
                if let Err(code) = io.disconnect() {
                    warn!("MQTT: disconnect failed (code={})", code);
                }
            }
            SessionEffect::Subscribe => {
                io.subscribe(&self.topic, self.qos)
                    .map_err(FatalError::SubscribeFailed)?;
                info!("MQTT: subscribed to '{}'", self.topic);
            }
            SessionEffect::ConfirmImage => self.confirm_image(io, sink),
            SessionEffect::Escalate(cause) => return Err(Shutdown::Fatal(cause)),
        }
        Ok(None)
    }

    fn confirm_image(&mut self, io: &mut impl BootPort, sink: &mut impl EventSink) {
        if self.image_confirmed {
            return;
        }
        match io.confirm_image() {
            Ok(()) => {
                self.image_confirmed = true;
                info!("Boot: running image confirmed");
                sink.emit(&AppEvent::ImageConfirmed);
            }
            Err(code) => warn!("Boot: image confirmation failed (code={})", code),
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn timer(&self) -> &RetryTimer {
        &self.timer
    }

    pub fn link_up(&self) -> bool {
        self.monitor.is_up()
    }

    pub fn image_confirmed(&self) -> bool {
        self.image_confirmed
    }

    pub fn update_in_progress(&self) -> bool {
        self.updates.in_progress()
    }

    /// The service stopped after a shutdown and ignores further events.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn consumer(&self) -> &C {
        self.router.consumer()
    }

    pub fn consumer_mut(&mut self) -> &mut C {
        self.router.consumer_mut()
    }
}
