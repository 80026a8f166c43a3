//! Firmware-update events arriving on the broker stream.

use sugarlight::app::events::AppEvent;
use sugarlight::connectivity::LinkEvent;
use sugarlight::error::{FatalError, NetworkError, Shutdown};
use sugarlight::events::BrokerEvent;
use sugarlight::session::SessionState;
use sugarlight::update::{ImageKind, UpdateEvent};

use crate::mock_hw::{Harness, PortCall};

fn update(h: &mut Harness, event: UpdateEvent) -> Result<(), Shutdown> {
    h.broker(BrokerEvent::Update(event))
}

#[test]
fn download_progress_leaves_session_alone() {
    let mut h = Harness::new();
    h.establish();
    let calls = h.io.calls.len();

    for e in [
        UpdateEvent::Started,
        UpdateEvent::ErasePending,
        UpdateEvent::EraseDone,
        UpdateEvent::Progress(30),
        UpdateEvent::Progress(60),
    ] {
        update(&mut h, e).unwrap();
    }

    assert_eq!(h.io.calls.len(), calls);
    assert_eq!(h.app.session_state(), SessionState::Connected);
    assert!(h.app.update_in_progress());
    assert!(h.sink.events.contains(&AppEvent::UpdateProgress(60)));
}

#[test]
fn failed_or_cancelled_update_is_logged_only() {
    let mut h = Harness::new();
    h.establish();
    update(&mut h, UpdateEvent::Started).unwrap();
    update(&mut h, UpdateEvent::Error(-5)).unwrap();
    update(&mut h, UpdateEvent::Cancelled).unwrap();
    assert!(!h.app.update_in_progress());
    assert_eq!(h.app.session_state(), SessionState::Connected);
}

#[test]
fn application_image_requests_restart() {
    let mut h = Harness::new();
    h.establish();
    let result = update(&mut h, UpdateEvent::Done(ImageKind::Application));
    assert_eq!(result, Err(Shutdown::ImageApplied));
    assert!(
        !h.sink.events.iter().any(|e| matches!(e, AppEvent::Fatal(_))),
        "a planned restart is not a failure"
    );
}

#[test]
fn modem_image_cycles_the_network() {
    let mut h = Harness::new();
    h.establish();
    let before = h.io.calls.len();

    update(&mut h, UpdateEvent::Done(ImageKind::ModemFull)).unwrap();

    assert_eq!(
        &h.io.calls[before..],
        &[
            PortCall::Disconnect,
            PortCall::BringDown,
            PortCall::BringUp,
            PortCall::ConnectNetwork,
        ]
    );
    assert_eq!(h.app.session_state(), SessionState::Disconnected);
    assert!(!h.app.link_up());
    assert!(!h.app.timer().is_armed());
    assert!(h.sink.events.contains(&AppEvent::Link(LinkEvent::Down)));
}

#[test]
fn session_returns_after_modem_update() {
    let mut h = Harness::new();
    h.establish();
    update(&mut h, UpdateEvent::Done(ImageKind::Modem)).unwrap();

    // The interface reports the outage late, then comes back.
    h.link_down().unwrap();
    h.link_up().unwrap();
    h.advance(5_000).unwrap();
    h.broker(BrokerEvent::Connected {
        persistent_session: false,
    })
    .unwrap();

    assert_eq!(h.io.connects(), 2);
    assert_eq!(h.app.session_state(), SessionState::Connected);
}

#[test]
fn network_failure_during_reinit_is_fatal() {
    let mut h = Harness::new();
    h.establish();
    h.io.bring_down_error = Some(NetworkError::DownFailed(-1));
    let result = update(&mut h, UpdateEvent::Done(ImageKind::Modem));
    assert_eq!(
        result,
        Err(Shutdown::Fatal(FatalError::Network(NetworkError::DownFailed(-1))))
    );
    assert_eq!(h.io.count(&PortCall::BringUp), 0);
}

#[test]
fn unknown_image_is_ignored() {
    let mut h = Harness::new();
    h.establish();
    let calls = h.io.calls.len();
    update(&mut h, UpdateEvent::Done(ImageKind::Unknown(4))).unwrap();
    assert_eq!(h.io.calls.len(), calls);
    assert_eq!(h.app.session_state(), SessionState::Connected);
}
