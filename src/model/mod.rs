//! Data models for rmsync.
//!
//! This module contains the domain models:
//! - RemoteItem (documents and folders listed from the device)
//! - Hint (derived staleness/conflict flags)
//! - Notebook, Page, Line, Point (decoded strokes)
//! - PenType, PenColor

pub mod hint;
pub mod item;
pub mod notebook;
pub mod pen;

pub use hint::Hint;
pub use item::{display_name, inherit_trash, parse_modified, RemoteItem, TRASH_PARENT};
pub use notebook::{Line, Notebook, Page, Point};
pub use pen::{PenColor, PenType};
