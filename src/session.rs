//! Broker session state machine.
//!
//! ```text
//!                LinkUp / BrokerDisconnected
//!  Disconnected ──────────────(arm 5 s)──────────▶ ConnectAttemptPending
//!       ▲                                             │  ▲
//!       │ LinkDown / Stop                 timer fires │  │ timed out, transport
//!       │ (from any state)                  (Connect) ▼  │ error or disconnect
//!       │                                           Connecting (arm backoff)
//!       │                                             │
//!       │                        BrokerConnected      ▼
//!       └──────────────────────────────────────── Connected
//! ```
//!
//! [`SessionManager::handle`] is a pure transition: it updates the state
//! and returns the [`SessionEffect`]s the dispatcher must carry out.  It
//! never touches the network, the clock, or the timer itself, which keeps
//! every transition unit-testable.
//!
//! The manager separates "link available" from "session established": the
//! reconnect delay gives the broker time to release the previous session,
//! and the longer backoff after a timed-out attempt keeps a slow broker
//! from being hammered.  Timeouts are retried forever.

use log::{debug, info, warn};

use crate::config::SystemConfig;
use crate::error::{ConnectError, FatalError};

/// Most effects a single input can produce.
pub const MAX_EFFECTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    /// Retry timer armed; the next expiry issues a connect.
    ConnectAttemptPending,
    /// Connect request in flight.
    Connecting,
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionInput {
    LinkUp,
    LinkDown,
    RetryTimerFired,
    /// Immediate result of the connect request issued for [`SessionEffect::Connect`].
    ConnectReturned(Result<(), ConnectError>),
    BrokerConnected { persistent_session: bool },
    BrokerDisconnected,
    /// The client lost its transport; a disconnect report follows.
    BrokerTransportError(i32),
    BrokerError(i32),
    /// System shutdown. Terminal.
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEffect {
    /// Arm the retry timer, superseding any pending schedule.
    ArmRetryTimer { delay_ms: u64 },
    CancelRetryTimer,
    Connect,
    Disconnect,
    /// Subscribe the application topic.
    Subscribe,
    /// Mark the running firmware image as good.
    ConfirmImage,
    Escalate(FatalError),
}

pub type Effects = heapless::Vec<SessionEffect, MAX_EFFECTS>;

/// Delays used by the session manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTiming {
    /// After link-up and after a broker-initiated disconnect.
    pub reconnect_delay_ms: u64,
    /// After a connect attempt timed out or was refused by the transport.
    pub retry_backoff_ms: u64,
}

impl From<&SystemConfig> for SessionTiming {
    fn from(config: &SystemConfig) -> Self {
        Self {
            reconnect_delay_ms: config.reconnect_delay_ms(),
            retry_backoff_ms: config.connect_retry_backoff_ms(),
        }
    }
}

pub struct SessionManager {
    state: SessionState,
    timing: SessionTiming,
    link_up: bool,
    stopped: bool,
    /// Connect requests issued since the last established session.
    attempts: u32,
}

impl SessionManager {
    pub fn new(timing: SessionTiming) -> Self {
        Self {
            state: SessionState::Disconnected,
            timing,
            link_up: false,
            stopped: false,
            attempts: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Apply one input and return the effects to execute, in order.
    pub fn handle(&mut self, input: SessionInput) -> Effects {
        let mut fx = Effects::new();
        if self.stopped {
            debug!("Session: stopped, {:?} ignored", input);
            return fx;
        }

        match input {
            SessionInput::LinkUp => {
                self.link_up = true;
                if self.state == SessionState::Disconnected {
                    self.schedule_connect(&mut fx, self.timing.reconnect_delay_ms);
                } else {
                    debug!("Session: link up while {:?}, nothing to do", self.state);
                }
            }

            SessionInput::LinkDown => {
                self.link_up = false;
                self.tear_down(&mut fx);
            }

            SessionInput::RetryTimerFired => {
                if self.state == SessionState::ConnectAttemptPending {
                    self.attempts = self.attempts.saturating_add(1);
                    info!("Session: connecting to broker (attempt {})", self.attempts);
                    push(&mut fx, SessionEffect::Connect);
                    self.state = SessionState::Connecting;
                } else {
                    debug!("Session: stale retry expiry while {:?}", self.state);
                }
            }

            SessionInput::ConnectReturned(Ok(())) => {
                debug!("Session: connect request in flight");
            }

            SessionInput::ConnectReturned(Err(e)) if e.is_retryable() => match self.state {
                SessionState::Connecting | SessionState::ConnectAttemptPending => {
                    info!(
                        "Session: {}, next connection retry in {} s",
                        e,
                        self.timing.retry_backoff_ms / 1000
                    );
                    self.schedule_connect(&mut fx, self.timing.retry_backoff_ms);
                }
                _ => debug!("Session: late {} while {:?} ignored", e, self.state),
            },

            SessionInput::ConnectReturned(Err(e)) => {
                if self.state == SessionState::Connecting {
                    let code = match e {
                        ConnectError::Failed(code) => code,
                        _ => 0,
                    };
                    push(&mut fx, SessionEffect::Escalate(FatalError::ConnectFailed(code)));
                } else {
                    warn!("Session: {} while {:?} ignored", e, self.state);
                }
            }

            SessionInput::BrokerConnected { persistent_session } => match self.state {
                SessionState::Connecting | SessionState::ConnectAttemptPending => {
                    push(&mut fx, SessionEffect::CancelRetryTimer);
                    if persistent_session {
                        warn!("Session: persistent session, reusing previous subscriptions");
                    } else {
                        push(&mut fx, SessionEffect::Subscribe);
                    }
                    push(&mut fx, SessionEffect::ConfirmImage);
                    self.state = SessionState::Connected;
                    info!("Session: connected after {} attempt(s)", self.attempts);
                    self.attempts = 0;
                }
                SessionState::Connected => debug!("Session: duplicate connected event"),
                SessionState::Disconnected => {
                    warn!("Session: broker connected while link is down, disconnecting");
                    push(&mut fx, SessionEffect::Disconnect);
                }
            },

            SessionInput::BrokerDisconnected => match self.state {
                SessionState::Connecting => {
                    info!(
                        "Session: broker closed the connection attempt, next retry in {} s",
                        self.timing.retry_backoff_ms / 1000
                    );
                    self.abandon_attempt(&mut fx);
                }
                SessionState::ConnectAttemptPending => {
                    debug!("Session: broker disconnected, retry already scheduled");
                }
                SessionState::Connected if self.link_up => {
                    info!("Session: broker disconnected");
                    push(&mut fx, SessionEffect::Disconnect);
                    self.schedule_connect(&mut fx, self.timing.reconnect_delay_ms);
                }
                _ if self.link_up => {
                    self.schedule_connect(&mut fx, self.timing.reconnect_delay_ms);
                }
                _ => {
                    debug!("Session: broker disconnected while link is down");
                    self.state = SessionState::Disconnected;
                }
            },

            SessionInput::BrokerTransportError(code) => {
                if self.state == SessionState::Connecting {
                    info!(
                        "Session: transport error (code={}), next retry in {} s",
                        code,
                        self.timing.retry_backoff_ms / 1000
                    );
                    self.abandon_attempt(&mut fx);
                } else {
                    debug!("Session: transport error (code={}) while {:?}", code, self.state);
                }
            }

            SessionInput::BrokerError(code) => {
                push(&mut fx, SessionEffect::Escalate(FatalError::BrokerProtocol(code)));
            }

            SessionInput::Stop => {
                info!("Session: stopping");
                self.tear_down(&mut fx);
                self.stopped = true;
            }
        }
        fx
    }

    fn schedule_connect(&mut self, fx: &mut Effects, delay_ms: u64) {
        push(fx, SessionEffect::ArmRetryTimer { delay_ms });
        self.state = SessionState::ConnectAttemptPending;
    }

    /// Release the client of a failed attempt and retry after the backoff.
    fn abandon_attempt(&mut self, fx: &mut Effects) {
        push(fx, SessionEffect::Disconnect);
        self.schedule_connect(fx, self.timing.retry_backoff_ms);
    }

    fn tear_down(&mut self, fx: &mut Effects) {
        push(fx, SessionEffect::CancelRetryTimer);
        if matches!(self.state, SessionState::Connected | SessionState::Connecting) {
            push(fx, SessionEffect::Disconnect);
        }
        self.state = SessionState::Disconnected;
    }
}

fn push(fx: &mut Effects, effect: SessionEffect) {
    let pushed = fx.push(effect).is_ok();
    debug_assert!(pushed, "session effect list overflow");
}
