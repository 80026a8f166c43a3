//! Broker session lifecycle through the full dispatcher: link events,
//! retry timing, subscription, image confirmation, and fatal paths.

use std::panic::{AssertUnwindSafe, catch_unwind};

use sugarlight::app::events::AppEvent;
use sugarlight::config::Qos;
use sugarlight::connectivity::NetStatus;
use sugarlight::error::{ConnectError, FatalError, Shutdown};
use sugarlight::events::{BrokerEvent, EVENT_QUEUE_CAP, Event, EventQueue};
use sugarlight::failure::FailureEscalator;
use sugarlight::session::SessionState;

use crate::mock_hw::{Harness, PanicRestart, PortCall};

// ── Connect timing ────────────────────────────────────────────

#[test]
fn link_up_connects_after_reconnect_delay() {
    let mut h = Harness::new();
    h.link_up().unwrap();
    assert_eq!(h.app.session_state(), SessionState::ConnectAttemptPending);

    h.advance(4_999).unwrap();
    assert_eq!(h.io.connects(), 0);

    h.advance(1).unwrap();
    assert_eq!(h.io.connects(), 1);
    assert_eq!(h.app.session_state(), SessionState::Connecting);
    assert!(!h.app.timer().is_armed());
}

#[test]
fn connect_timeout_leaves_single_long_backoff() {
    let mut h = Harness::new();
    h.io.connect_results.push_back(Err(ConnectError::TimedOut));
    h.io.connect_results.push_back(Err(ConnectError::TimedOut));

    h.link_up().unwrap();
    h.advance(5_000).unwrap();
    assert_eq!(h.app.session_state(), SessionState::ConnectAttemptPending);
    assert_eq!(h.app.timer().pending(), 1);
    assert_eq!(h.app.timer().armed_delay_ms(), Some(60_000));

    // Second timeout after the backoff: still exactly one schedule.
    h.advance(60_000).unwrap();
    assert_eq!(h.io.connects(), 2);
    assert_eq!(h.app.timer().pending(), 1);
    assert_eq!(h.app.timer().armed_delay_ms(), Some(60_000));

    // Third attempt goes through.
    h.advance(60_000).unwrap();
    assert_eq!(h.io.connects(), 3);
    assert_eq!(h.app.session_state(), SessionState::Connecting);
}

#[test]
fn backoff_is_not_cut_short() {
    let mut h = Harness::new();
    h.io.connect_results.push_back(Err(ConnectError::WouldBlock));
    h.link_up().unwrap();
    h.advance(5_000).unwrap();

    h.advance(59_999).unwrap();
    assert_eq!(h.io.connects(), 1);
    h.advance(1).unwrap();
    assert_eq!(h.io.connects(), 2);
}

#[test]
fn unreachable_broker_waits_out_the_long_backoff() {
    let mut h = Harness::new();
    h.link_up().unwrap();
    h.advance(5_000).unwrap();
    assert_eq!(h.io.connects(), 1);

    // The client reports the failed attempt asynchronously.
    h.broker(BrokerEvent::TransportError(-0x7003)).unwrap();
    h.broker(BrokerEvent::Disconnected).unwrap();
    assert_eq!(h.app.session_state(), SessionState::ConnectAttemptPending);
    assert_eq!(h.app.timer().armed_delay_ms(), Some(60_000));
    assert_eq!(h.app.timer().pending(), 1);
    assert_eq!(h.io.count(&PortCall::Disconnect), 1);

    h.advance(59_999).unwrap();
    assert_eq!(h.io.connects(), 1);
    h.advance(1).unwrap();
    assert_eq!(h.io.connects(), 2);
}

#[test]
fn refused_attempt_without_error_report_still_backs_off() {
    let mut h = Harness::new();
    h.link_up().unwrap();
    h.advance(5_000).unwrap();
    h.broker(BrokerEvent::Disconnected).unwrap();
    assert_eq!(h.app.timer().armed_delay_ms(), Some(60_000));
}

// ── Main loop ─────────────────────────────────────────────────

fn saturate(queue: &EventQueue) {
    while queue.len() < EVENT_QUEUE_CAP {
        queue.push(Event::Broker(BrokerEvent::PingResp));
    }
}

#[test]
fn retry_expiry_survives_a_full_queue() {
    let mut h = Harness::new();
    let queue = EventQueue::new();
    queue.push_status(NetStatus::L4Connected);
    h.run_once(&queue).unwrap();
    assert_eq!(h.app.session_state(), SessionState::ConnectAttemptPending);

    for _ in 0..200 {
        saturate(&queue);
        assert_eq!(queue.len(), EVENT_QUEUE_CAP);
        h.now += 50;
        h.run_once(&queue).unwrap();
    }

    assert_eq!(h.io.connects(), 1);
    assert_eq!(h.app.session_state(), SessionState::Connecting);
    assert_eq!(queue.dropped(), 0);
}

#[test]
fn link_status_survives_a_full_queue() {
    let mut h = Harness::new();
    let queue = EventQueue::new();
    saturate(&queue);
    queue.push_status(NetStatus::L4Connected);
    h.run_once(&queue).unwrap();

    assert!(h.app.link_up());
    assert_eq!(h.app.session_state(), SessionState::ConnectAttemptPending);
    assert!(queue.is_empty());
}

// ── Session established ───────────────────────────────────────

#[test]
fn fresh_session_subscribes_once() {
    let mut h = Harness::new();
    h.establish();
    assert_eq!(h.app.session_state(), SessionState::Connected);
    assert_eq!(h.io.subscribes(), 1);
    assert_eq!(
        h.io.count(&PortCall::Subscribe("glucose/value".to_string(), Qos::AtMostOnce)),
        1
    );
}

#[test]
fn persistent_session_does_not_subscribe() {
    let mut h = Harness::new();
    h.link_up().unwrap();
    h.advance(5_000).unwrap();
    h.broker(BrokerEvent::Connected {
        persistent_session: true,
    })
    .unwrap();
    assert_eq!(h.app.session_state(), SessionState::Connected);
    assert_eq!(h.io.subscribes(), 0);
}

#[test]
fn image_confirmed_once_across_reconnects() {
    let mut h = Harness::new();
    h.establish();
    assert!(h.app.image_confirmed());

    h.broker(BrokerEvent::Disconnected).unwrap();
    h.advance(5_000).unwrap();
    h.broker(BrokerEvent::Connected {
        persistent_session: false,
    })
    .unwrap();

    assert_eq!(h.io.count(&PortCall::ConfirmImage), 1);
    assert_eq!(h.io.subscribes(), 2);
    let confirmations = h
        .sink
        .events
        .iter()
        .filter(|e| **e == AppEvent::ImageConfirmed)
        .count();
    assert_eq!(confirmations, 1);
}

#[test]
fn broker_disconnect_reconnects_after_delay() {
    let mut h = Harness::new();
    h.establish();
    h.broker(BrokerEvent::Disconnected).unwrap();
    assert_eq!(h.app.session_state(), SessionState::ConnectAttemptPending);
    assert_eq!(h.app.timer().armed_delay_ms(), Some(5_000));

    h.advance(5_000).unwrap();
    assert_eq!(h.io.connects(), 2);
}

#[test]
fn informational_broker_events_change_nothing() {
    let mut h = Harness::new();
    h.establish();
    let calls = h.io.calls.len();
    h.broker(BrokerEvent::PingResp).unwrap();
    h.broker(BrokerEvent::PubAck(70_000)).unwrap();
    h.broker(BrokerEvent::Connecting).unwrap();
    assert_eq!(h.io.calls.len(), calls);
    assert_eq!(h.app.session_state(), SessionState::Connected);
}

// ── Link loss ─────────────────────────────────────────────────

#[test]
fn link_loss_before_delay_cancels_attempt() {
    let mut h = Harness::new();
    h.link_up().unwrap();
    h.advance(2_000).unwrap();
    h.link_down().unwrap();
    h.advance(10_000).unwrap();
    assert_eq!(h.io.connects(), 0);
    assert_eq!(h.app.session_state(), SessionState::Disconnected);
}

#[test]
fn link_loss_tears_down_live_session() {
    let mut h = Harness::new();
    h.establish();
    h.link_down().unwrap();
    assert_eq!(h.io.count(&PortCall::Disconnect), 1);
    assert_eq!(h.app.session_state(), SessionState::Disconnected);

    // The broker's own disconnect report must not schedule a reconnect.
    h.broker(BrokerEvent::Disconnected).unwrap();
    assert!(!h.app.timer().is_armed());
}

#[test]
fn duplicate_link_reports_are_ignored() {
    let mut h = Harness::new();
    h.link_up().unwrap();
    h.advance(3_000).unwrap();
    h.link_up().unwrap();
    // The original schedule still stands.
    h.advance(2_000).unwrap();
    assert_eq!(h.io.connects(), 1);
}

#[test]
fn stale_expiry_is_dropped() {
    let mut h = Harness::new();
    h.link_up().unwrap();
    h.now += 5_000;
    let expiry = h.app.poll_timer(h.now).expect("due");
    h.link_down().unwrap();
    h.send(expiry).unwrap();
    assert_eq!(h.io.connects(), 0);
}

#[test]
fn stop_is_terminal() {
    let mut h = Harness::new();
    h.establish();
    h.send(Event::Stop).unwrap();
    assert_eq!(h.io.count(&PortCall::Disconnect), 1);

    h.link_down().unwrap();
    h.link_up().unwrap();
    h.advance(60_000).unwrap();
    assert_eq!(h.io.connects(), 1);
    assert_eq!(h.app.session_state(), SessionState::Disconnected);
}

// ── Fatal paths ───────────────────────────────────────────────

#[test]
fn fatal_connect_error_escalates_exactly_once() {
    let mut h = Harness::new();
    h.io.connect_results.push_back(Err(ConnectError::Failed(-111)));
    h.link_up().unwrap();

    let result = h.advance(5_000);
    assert_eq!(
        result,
        Err(Shutdown::Fatal(FatalError::ConnectFailed(-111)))
    );
    assert_eq!(h.app.session_state(), SessionState::Connecting);
    assert!(h.app.is_halted());

    // Nothing after the shutdown is acted on.
    let calls = h.io.calls.len();
    h.broker(BrokerEvent::Disconnected).unwrap();
    h.advance(60_000).unwrap();
    assert_eq!(h.io.calls.len(), calls);
    assert_eq!(h.app.session_state(), SessionState::Connecting);

    let mut restarts = 0;
    let Err(reason) = result else { unreachable!() };
    let unwound = catch_unwind(AssertUnwindSafe(|| {
        FailureEscalator::new(PanicRestart {
            restarts: &mut restarts,
        })
        .shutdown(reason);
    }));
    assert!(unwound.is_err());
    assert_eq!(restarts, 1);
}

#[test]
fn broker_error_is_fatal() {
    let mut h = Harness::new();
    h.establish();
    assert_eq!(
        h.broker(BrokerEvent::Error(-3)),
        Err(Shutdown::Fatal(FatalError::BrokerProtocol(-3)))
    );
    assert!(
        h.sink
            .events
            .contains(&AppEvent::Fatal(FatalError::BrokerProtocol(-3)))
    );
}

#[test]
fn interface_fatal_bypasses_link_down() {
    let mut h = Harness::new();
    h.establish();
    let result = h.send(Event::Network(NetStatus::InterfaceFatal));
    assert_eq!(result, Err(Shutdown::Fatal(FatalError::InterfaceFatal)));
    assert_eq!(h.io.count(&PortCall::Disconnect), 0);
    assert_eq!(h.app.session_state(), SessionState::Connected);
}

#[test]
fn subscribe_failure_is_fatal() {
    let mut h = Harness::new();
    h.io.subscribe_error = Some(-12);
    h.link_up().unwrap();
    h.advance(5_000).unwrap();
    let result = h.broker(BrokerEvent::Connected {
        persistent_session: false,
    });
    assert_eq!(result, Err(Shutdown::Fatal(FatalError::SubscribeFailed(-12))));
    assert!(!h.app.image_confirmed());
}
