//! Fuzz target: `SessionManager::handle`
//!
//! Each input byte selects one session input.  The manager must never
//! panic, never overflow its effect list, and never ask for a connect
//! outside the `Connecting` state.
//!
//! cargo fuzz run fuzz_session_inputs

#![no_main]

use libfuzzer_sys::fuzz_target;
use sugarlight::error::ConnectError;
use sugarlight::session::{
    SessionEffect, SessionInput, SessionManager, SessionState, SessionTiming,
};

fn input(byte: u8) -> SessionInput {
    match byte % 12 {
        0 => SessionInput::LinkUp,
        1 => SessionInput::LinkDown,
        2 => SessionInput::RetryTimerFired,
        3 => SessionInput::ConnectReturned(Ok(())),
        4 => SessionInput::ConnectReturned(Err(ConnectError::TimedOut)),
        5 => SessionInput::ConnectReturned(Err(ConnectError::WouldBlock)),
        6 => SessionInput::ConnectReturned(Err(ConnectError::Failed(i32::from(byte)))),
        7 => SessionInput::BrokerConnected { persistent_session: byte & 0x80 != 0 },
        8 => SessionInput::BrokerDisconnected,
        9 => SessionInput::BrokerError(i32::from(byte)),
        10 => SessionInput::BrokerTransportError(i32::from(byte)),
        _ => SessionInput::Stop,
    }
}

fuzz_target!(|data: &[u8]| {
    let mut session = SessionManager::new(SessionTiming {
        reconnect_delay_ms: 5_000,
        retry_backoff_ms: 60_000,
    });

    for &byte in data {
        let effects = session.handle(input(byte));
        if effects.contains(&SessionEffect::Connect) {
            assert_eq!(session.state(), SessionState::Connecting);
        }
    }
});
