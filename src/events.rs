//! Event queue between platform callbacks and the dispatch loop.
//!
//! Events are produced by the Wi-Fi / IP system event loop (link status)
//! and the MQTT connection thread (session, data, and update events), and
//! consumed one at a time, in FIFO order, by the main loop.  Retry timer
//! expiries bypass the queue.
//!
//! Link status is level-like: when the queue is full the newest report is
//! parked in a one-slot overflow and handed out once the queue drains.  An
//! interface fault, once parked, is never overwritten.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Wi-Fi / IP   │────▶│              │     │              │
//! │ MQTT thread  │────▶│  EventQueue  │────▶│  Main Loop   │
//! │              │     │  (bounded)   │     │  (dispatch)  │
//! └──────────────┘     └──────────────┘     └──────────────┘
//! ```

use core::sync::atomic::{AtomicU8, AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{debug, warn};

use crate::connectivity::NetStatus;
use crate::timer::TimerToken;
use crate::update::UpdateEvent;

/// Maximum number of pending events.
pub const EVENT_QUEUE_CAP: usize = 16;

/// Longest topic name carried in a [`Message`].
pub const MAX_TOPIC_LEN: usize = 64;

/// Largest payload carried in a [`Message`].
pub const MAX_PAYLOAD_LEN: usize = 512;

/// An inbound application message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: heapless::String<MAX_TOPIC_LEN>,
    pub payload: heapless::Vec<u8, MAX_PAYLOAD_LEN>,
}

impl Message {
    /// Copy `topic` and `payload` into bounded storage.
    /// Returns `None` if either does not fit.
    pub fn new(topic: &str, payload: &[u8]) -> Option<Self> {
        let mut t = heapless::String::new();
        t.push_str(topic).ok()?;
        let p = heapless::Vec::from_slice(payload).ok()?;
        Some(Self { topic: t, payload: p })
    }
}

/// Events reported by the broker client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerEvent {
    /// A connection attempt is under way.
    Connecting,
    /// The broker accepted the session.
    Connected { persistent_session: bool },
    /// The session ended (broker-initiated or requested).
    Disconnected,
    /// Data on the application topic.
    Message(Message),
    /// Publish acknowledged.
    PubAck(u32),
    /// Keep-alive answered.
    PingResp,
    /// Firmware-update lifecycle, multiplexed on the broker stream.
    Update(UpdateEvent),
    /// Transport failure (TCP, TLS); a disconnect follows.
    TransportError(i32),
    /// Protocol-level error reported by the client library.
    Error(i32),
}

/// Everything the dispatch loop reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Network(NetStatus),
    Broker(BrokerEvent),
    RetryTimer(TimerToken),
    /// Orderly shutdown of the broker session.
    Stop,
}

/// Bounded MPSC queue of [`Event`]s.
pub struct EventQueue {
    channel: Channel<CriticalSectionRawMutex, Event, EVENT_QUEUE_CAP>,
    dropped: AtomicU32,
    /// Latest link status that did not fit, encoded by `status_code`.
    parked_status: AtomicU8,
}

impl EventQueue {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
            dropped: AtomicU32::new(0),
            parked_status: AtomicU8::new(NO_STATUS),
        }
    }

    /// Enqueue an event.  Safe from any thread.
    /// Returns `false` if the queue is full (event dropped).
    pub fn push(&self, event: Event) -> bool {
        match self.channel.try_send(event) {
            Ok(()) => true,
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Event queue full, event dropped");
                false
            }
        }
    }

    /// Enqueue a link status report.  Never lost: if the queue is full the
    /// report is parked and delivered after everything already queued.
    pub fn push_status(&self, status: NetStatus) {
        let status = match status_from_code(self.parked_status.swap(NO_STATUS, Ordering::AcqRel)) {
            Some(NetStatus::InterfaceFatal) => NetStatus::InterfaceFatal,
            _ => status,
        };
        if self.channel.try_send(Event::Network(status)).is_err() {
            debug!("Event queue full, link status {:?} parked", status);
            self.parked_status.store(status_code(status), Ordering::Release);
        }
    }

    /// Dequeue the oldest event, if any.  A parked link status comes out
    /// once the queue itself is empty.
    pub fn pop(&self) -> Option<Event> {
        self.channel.try_receive().ok().or_else(|| {
            status_from_code(self.parked_status.swap(NO_STATUS, Ordering::AcqRel))
                .map(Event::Network)
        })
    }

    /// Hand every pending event to `handler`, oldest first.
    /// Stops early and returns the error if the handler fails.
    pub fn drain<E>(&self, mut handler: impl FnMut(Event) -> Result<(), E>) -> Result<(), E> {
        while let Some(event) = self.pop() {
            handler(event)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty() && self.parked_status.load(Ordering::Acquire) == NO_STATUS
    }

    /// Events dropped because the queue was full.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

const NO_STATUS: u8 = 0;

fn status_code(status: NetStatus) -> u8 {
    match status {
        NetStatus::L4Connected => 1,
        NetStatus::L4Disconnected => 2,
        NetStatus::InterfaceFatal => 3,
    }
}

fn status_from_code(code: u8) -> Option<NetStatus> {
    match code {
        1 => Some(NetStatus::L4Connected),
        2 => Some(NetStatus::L4Disconnected),
        3 => Some(NetStatus::InterfaceFatal),
        _ => None,
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide queue fed by the device adapters.
pub static EVENTS: EventQueue = EventQueue::new();
