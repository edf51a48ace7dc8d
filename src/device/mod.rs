//! Device transport.
//!
//! Two independent channels talk to the tablet:
//!
//! - the **control channel** ([`ControlChannel`]) reads the document store,
//!   mirrors files for backup and runs shell commands;
//! - the **data channel** ([`DataChannel`]) downloads rendered documents and
//!   uploads new ones through the USB web interface.
//!
//! Each channel lets one operation through at a time. The two channels do
//! not block each other.

mod connection;
mod connector;
mod control;
mod data;
pub mod local;
mod metadata;
mod model;
pub mod ssh;
pub mod usb;

pub use connection::{ConnectionError, ConnectionErrorKind, ConnectionStatus, JobKind};
pub use connector::{DeviceConnector, DeviceSession};
pub use control::{
    ControlChannel, ControlConnector, ControlSession, PageBuffer, DEFAULT_REMOTE_ROOT,
};
pub use data::{DataChannel, DataTransport};
pub use local::LocalConnector;
pub use metadata::{parse_content, parse_metadata};
pub use model::{DeviceType, MACHINE_PATH};
pub use ssh::{SshConnector, SshTarget};
pub use usb::{UsbWebTransport, DEFAULT_WEB_URL};

use crate::error::Error;

/// Report reachability of both channels.
///
/// The control channel is checked first; if it fails, that classification is
/// reported without a device type. Otherwise the data channel is probed and
/// its failure, if any, is reported alongside the detected device.
pub async fn check_status<C, T>(
    control: &ControlChannel<C>,
    data: &DataChannel<T>,
) -> ConnectionStatus
where
    C: ControlConnector,
    T: DataTransport,
{
    let device = match control.detect_device().await {
        Ok(device) => device,
        Err(e) => return ConnectionStatus::unreachable(as_connection_error(e)),
    };

    match data.probe().await {
        Ok(()) => ConnectionStatus::connected(device),
        Err(e) => ConnectionStatus::degraded(device, as_connection_error(e)),
    }
}

fn as_connection_error(error: Error) -> ConnectionError {
    match error {
        Error::Connection(e) => e,
        other => ConnectionError::not_connected(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use std::path::Path;
    use tempfile::TempDir;

    struct FixedData(Option<ConnectionError>);

    impl DataTransport for FixedData {
        async fn probe(&self) -> Result<()> {
            self.0.clone().map_or(Ok(()), |e| Err(e.into()))
        }

        async fn download_document(&self, _id: &str, _dest: &Path) -> Result<u64> {
            Ok(0)
        }

        async fn upload_file(&self, _path: &Path, _parent_id: Option<&str>) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_status_connected_with_device() {
        let remote = TempDir::new().unwrap();
        let control = ControlChannel::new(
            LocalConnector::new(remote.path()).with_machine("reMarkable Chiappa"),
            DEFAULT_REMOTE_ROOT,
        );
        let data = DataChannel::new(FixedData(None));

        let status = check_status(&control, &data).await;
        assert!(status.is_connected());
        assert_eq!(status.device, Some(DeviceType::PaperProMove));
    }

    #[tokio::test]
    async fn test_status_reports_data_failure_with_device() {
        let remote = TempDir::new().unwrap();
        let control = ControlChannel::new(LocalConnector::new(remote.path()), DEFAULT_REMOTE_ROOT);
        let data = DataChannel::new(FixedData(Some(ConnectionError::data_channel_disabled(
            "refused",
        ))));

        let status = check_status(&control, &data).await;
        assert_eq!(status.device, Some(DeviceType::Rm2));
        assert_eq!(
            status.error.map(|e| e.kind),
            Some(ConnectionErrorKind::DataChannelDisabled)
        );
    }

    #[tokio::test]
    async fn test_status_control_failure_skips_data_probe() {
        let remote = TempDir::new().unwrap();
        let control = ControlChannel::new(
            LocalConnector::new(remote.path().join("missing")),
            DEFAULT_REMOTE_ROOT,
        );
        let data = DataChannel::new(FixedData(Some(ConnectionError::data_channel_disabled(
            "never reached",
        ))));

        let status = check_status(&control, &data).await;
        assert!(status.device.is_none());
        assert_eq!(
            status.error.map(|e| e.kind),
            Some(ConnectionErrorKind::NotConnected)
        );
    }
}
