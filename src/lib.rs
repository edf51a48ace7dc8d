//! rmsync - Backup, sync and stroke extraction for reMarkable tablets
//!
//! This crate provides the core functionality for the `rmsync` CLI tool.
//!
//! # Architecture
//!
//! - [`codec`] - `.lines` v5/v6 page decoder
//! - [`model`] - Data types (RemoteItem, Notebook, Hint)
//! - [`device`] - Control and data channels to the tablet
//! - [`tree`] - Item hierarchy with sync targets and hints
//! - [`storage`] - SQLite sync ledger
//! - [`sync`] - Backup and sync engine
//! - [`recognition`] - Handwriting recognition input
//! - [`config`] - Configuration management
//! - [`cli`] - Command-line interface using clap
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod codec;
pub mod config;
pub mod device;
pub mod error;
pub mod model;
pub mod recognition;
pub mod storage;
pub mod sync;
pub mod tree;

pub use error::{Error, Result};
