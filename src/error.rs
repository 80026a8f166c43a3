//! Unified error types for the firmware.
//!
//! Two classes leave a subsystem: errors that the owning component handles
//! locally (retry, drop) and [`FatalError`]s, which always end in a device
//! restart.  The dispatcher reports the latter, along with deliberate restarts,
//! as a [`Shutdown`] so the top-level loop handles both in one place.
//! All variants are `Copy`.

use core::fmt;

// ---------------------------------------------------------------------------
// Fatal errors
// ---------------------------------------------------------------------------

/// Conditions with no degraded mode: the device must restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalError {
    /// The network interface reported an unrecoverable fault.
    InterfaceFatal,
    /// The broker client reported a protocol-level error.
    BrokerProtocol(i32),
    /// A connect request failed for a reason other than a timeout.
    ConnectFailed(i32),
    /// The application topic could not be subscribed.
    SubscribeFailed(i32),
    /// A network lifecycle call (up / connect / down) failed.
    Network(NetworkError),
    /// Start-up failed before the event loop was entered.
    Init(&'static str),
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InterfaceFatal => write!(f, "network interface fatal error"),
            Self::BrokerProtocol(code) => write!(f, "broker protocol error (code={})", code),
            Self::ConnectFailed(code) => write!(f, "broker connect failed (code={})", code),
            Self::SubscribeFailed(code) => write!(f, "topic subscription failed (code={})", code),
            Self::Network(e) => write!(f, "network: {e}"),
            Self::Init(what) => write!(f, "init: {what}"),
        }
    }
}

impl From<NetworkError> for FatalError {
    fn from(e: NetworkError) -> Self {
        Self::Network(e)
    }
}

// ---------------------------------------------------------------------------
// Broker connect outcome
// ---------------------------------------------------------------------------

/// Immediate failure of a broker connect request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectError {
    /// The attempt timed out; retry after the backoff interval.
    TimedOut,
    /// The transport is busy; treated like a timeout.
    WouldBlock,
    /// Any other failure. Not retryable.
    Failed(i32),
}

impl ConnectError {
    /// Whether the session manager should retry rather than escalate.
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::TimedOut | Self::WouldBlock)
    }
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimedOut => write!(f, "connect timed out"),
            Self::WouldBlock => write!(f, "connect would block"),
            Self::Failed(code) => write!(f, "connect failed (code={})", code),
        }
    }
}

// ---------------------------------------------------------------------------
// Network lifecycle errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkError {
    /// Interface could not be brought up.
    UpFailed(i32),
    /// Interface could not start connecting.
    ConnectFailed(i32),
    /// Interface could not be brought down.
    DownFailed(i32),
    /// No credentials were configured at build time.
    NoCredentials,
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpFailed(rc) => write!(f, "interface up failed (rc={})", rc),
            Self::ConnectFailed(rc) => write!(f, "interface connect failed (rc={})", rc),
            Self::DownFailed(rc) => write!(f, "interface down failed (rc={})", rc),
            Self::NoCredentials => write!(f, "no Wi-Fi credentials configured"),
        }
    }
}

// ---------------------------------------------------------------------------
// Output errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputError {
    /// The output device was never initialised.
    NotReady,
    /// A PWM duty write failed.
    PwmWriteFailed,
}

impl fmt::Display for OutputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotReady => write!(f, "output device not ready"),
            Self::PwmWriteFailed => write!(f, "PWM write failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Shutdown
// ---------------------------------------------------------------------------

/// Why the dispatcher stopped; the caller must restart the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    /// Unrecoverable condition; hand to the failure escalator.
    Fatal(FatalError),
    /// A new application image was installed and needs a restart.
    ImageApplied,
}

impl fmt::Display for Shutdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fatal(e) => write!(f, "fatal: {e}"),
            Self::ImageApplied => write!(f, "application image updated"),
        }
    }
}

impl From<FatalError> for Shutdown {
    fn from(e: FatalError) -> Self {
        Self::Fatal(e)
    }
}

impl From<NetworkError> for Shutdown {
    fn from(e: NetworkError) -> Self {
        Self::Fatal(FatalError::Network(e))
    }
}
