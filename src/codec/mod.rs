//! Decoder for reMarkable `.lines` page files.
//!
//! Two dialects exist, selected by a fixed 43-byte ASCII header:
//!
//! - **Version 5**: flat little-endian layout of layers, lines and points.
//! - **Version 6**: a stream of typed blocks whose fields carry
//!   index/wire-type tags. Only scene-line blocks are decoded; everything
//!   else is skipped by its declared length.
//!
//! Decoding is all-or-nothing: any malformed field fails the whole page, and
//! [`decode_notebook`] fails the whole notebook if any page fails.

mod cursor;
mod lines;

pub use cursor::{ByteCursor, CrdtId, WireType};
pub use lines::{decode_page, HEADER_LEN, HEADER_V5, HEADER_V6};

use crate::model::{Notebook, Page};
use thiserror::Error;

/// Errors raised while decoding a page buffer.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unexpected end of data at byte {position}: needed {needed}, {remaining} left")]
    UnexpectedEof {
        position: usize,
        needed: usize,
        remaining: usize,
    },

    #[error("unknown header: {0:?}")]
    UnknownHeader(String),

    #[error(
        "malformed tag at byte {position}: expected index {expected_index} type {expected_type:#x}, \
         found index {actual_index} type {actual_type:#x}"
    )]
    TagMismatch {
        position: usize,
        expected_index: u64,
        expected_type: u8,
        actual_index: u64,
        actual_type: u8,
    },

    #[error("variable-width integer at byte {position} overflows 64 bits")]
    VarIntOverflow { position: usize },

    #[error("invalid block at byte {position}: {message}")]
    InvalidBlock { position: usize, message: String },

    #[error("page {page_id}: {source}")]
    Page {
        page_id: String,
        #[source]
        source: Box<DecodeError>,
    },
}

/// Decode every page of a notebook, in order.
///
/// `pages` pairs each page id with its raw `.lines` buffer. A page without a
/// buffer was never drawn on and decodes to no lines.
pub fn decode_notebook<I>(notebook_id: &str, pages: I) -> Result<Notebook, DecodeError>
where
    I: IntoIterator<Item = (String, Option<Vec<u8>>)>,
{
    let mut decoded = Vec::new();
    for (page_id, buffer) in pages {
        let lines = match buffer {
            Some(buffer) => decode_page(&buffer).map_err(|e| DecodeError::Page {
                page_id: page_id.clone(),
                source: Box::new(e),
            })?,
            None => Vec::new(),
        };
        decoded.push(Page { id: page_id, lines });
    }

    Ok(Notebook {
        id: notebook_id.to_string(),
        pages: decoded,
    })
}
