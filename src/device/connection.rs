//! Connection classification and job gating.

use std::fmt;

use serde::Serialize;

use super::model::DeviceType;

/// Classification of a failed connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionErrorKind {
    /// Credentials missing or refused.
    NotConfigured,
    /// Host unreachable, down or timing out.
    NotConnected,
    /// The control channel works but the USB web interface is off.
    DataChannelDisabled,
    /// The device model cannot do what was asked.
    Unsupported,
}

impl ConnectionErrorKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotConfigured => "not configured",
            Self::NotConnected => "not connected",
            Self::DataChannelDisabled => "data channel disabled",
            Self::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for ConnectionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified connection failure with a readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ConnectionError {
    pub kind: ConnectionErrorKind,
    pub message: String,
}

impl ConnectionError {
    #[must_use]
    pub fn new(kind: ConnectionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn not_configured(message: impl Into<String>) -> Self {
        Self::new(ConnectionErrorKind::NotConfigured, message)
    }

    #[must_use]
    pub fn not_connected(message: impl Into<String>) -> Self {
        Self::new(ConnectionErrorKind::NotConnected, message)
    }

    #[must_use]
    pub fn data_channel_disabled(message: impl Into<String>) -> Self {
        Self::new(ConnectionErrorKind::DataChannelDisabled, message)
    }
}

/// Work that depends on the device being reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Backup,
    Sync,
    Recognition,
    Templates,
}

impl JobKind {
    /// Whether the job also needs the data channel.
    #[must_use]
    pub const fn needs_data_channel(self) -> bool {
        matches!(self, Self::Sync | Self::Templates)
    }
}

/// Combined reachability of both channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    /// `None` when both channels answered.
    pub error: Option<ConnectionError>,
    /// Known only once the control channel is up.
    pub device: Option<DeviceType>,
}

impl ConnectionStatus {
    #[must_use]
    pub const fn connected(device: DeviceType) -> Self {
        Self {
            error: None,
            device: Some(device),
        }
    }

    /// Control channel failure; the device type is unknown.
    #[must_use]
    pub const fn unreachable(error: ConnectionError) -> Self {
        Self {
            error: Some(error),
            device: None,
        }
    }

    /// Control channel up, data channel down.
    #[must_use]
    pub const fn degraded(device: DeviceType, error: ConnectionError) -> Self {
        Self {
            error: Some(error),
            device: Some(device),
        }
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.error.is_none()
    }

    /// Whether the control channel answered.
    #[must_use]
    pub const fn control_reachable(&self) -> bool {
        self.device.is_some()
    }

    /// Whether `job` may start under this status.
    #[must_use]
    pub const fn permits(&self, job: JobKind) -> bool {
        if job.needs_data_channel() {
            self.is_connected()
        } else {
            self.control_reachable()
        }
    }

    /// The error to report when `job` is not permitted.
    #[must_use]
    pub fn blocking_error(&self, job: JobKind) -> Option<ConnectionError> {
        if self.permits(job) {
            None
        } else {
            self.error.clone()
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.error, self.device) {
            (None, Some(device)) => write!(f, "connected ({device})"),
            (None, None) => f.write_str("connected"),
            (Some(e), _) => write!(f, "{e}"),
        }
    }
}
