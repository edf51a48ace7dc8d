//! Runtime choice between the SSH and local-directory control channels.

use super::control::{ControlConnector, ControlSession};
use super::local::{LocalConnector, LocalSession};
use super::ssh::{SshConnector, SshSession};
use crate::error::Result;

/// Either control channel backend, picked from configuration.
#[derive(Debug, Clone)]
pub enum DeviceConnector {
    Ssh(SshConnector),
    Local(LocalConnector),
}

impl ControlConnector for DeviceConnector {
    type Session = DeviceSession;

    async fn connect(&self) -> Result<DeviceSession> {
        match self {
            Self::Ssh(c) => c.connect().await.map(DeviceSession::Ssh),
            Self::Local(c) => c.connect().await.map(DeviceSession::Local),
        }
    }
}

#[derive(Debug)]
pub enum DeviceSession {
    Ssh(SshSession),
    Local(LocalSession),
}

impl ControlSession for DeviceSession {
    async fn run(&mut self, command: &str) -> Result<String> {
        match self {
            Self::Ssh(s) => s.run(command).await,
            Self::Local(s) => s.run(command).await,
        }
    }

    async fn read_file(&mut self, path: &str) -> Result<Vec<u8>> {
        match self {
            Self::Ssh(s) => s.read_file(path).await,
            Self::Local(s) => s.read_file(path).await,
        }
    }

    async fn write_file(&mut self, path: &str, data: &[u8]) -> Result<()> {
        match self {
            Self::Ssh(s) => s.write_file(path, data).await,
            Self::Local(s) => s.write_file(path, data).await,
        }
    }

    async fn remove_file(&mut self, path: &str) -> Result<()> {
        match self {
            Self::Ssh(s) => s.remove_file(path).await,
            Self::Local(s) => s.remove_file(path).await,
        }
    }

    async fn list_files(&mut self, dir: &str, prefix: &str) -> Result<Vec<String>> {
        match self {
            Self::Ssh(s) => s.list_files(dir, prefix).await,
            Self::Local(s) => s.list_files(dir, prefix).await,
        }
    }
}
