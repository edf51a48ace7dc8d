//! Decode command implementation.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::codec::{decode_page, DecodeError};
use crate::error::Result;
use crate::model::{Line, PenType};

#[derive(Serialize)]
struct PageOutput<'a> {
    file: &'a Path,
    line_count: usize,
    point_count: usize,
    lines: &'a [Line],
}

/// Execute decode command.
///
/// Decodes each file as one page. The first malformed file aborts with an
/// error naming it.
pub fn execute(files: &[PathBuf], json: bool) -> Result<()> {
    let mut pages = Vec::with_capacity(files.len());
    for file in files {
        let buffer = std::fs::read(file)?;
        let lines = decode_page(&buffer).map_err(|e| DecodeError::Page {
            page_id: file.display().to_string(),
            source: Box::new(e),
        })?;
        pages.push((file, lines));
    }

    if json {
        let output: Vec<PageOutput<'_>> = pages
            .iter()
            .map(|(file, lines)| PageOutput {
                file,
                line_count: lines.len(),
                point_count: lines.iter().map(|l| l.points.len()).sum(),
                lines,
            })
            .collect();
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    for (file, lines) in &pages {
        let points: usize = lines.iter().map(|l| l.points.len()).sum();
        let erased = lines
            .iter()
            .filter(|l| matches!(l.pen_type, PenType::Eraser | PenType::EraserArea))
            .count();
        println!(
            "{}: {} strokes, {points} points, {erased} eraser strokes",
            file.display(),
            lines.len()
        );
    }
    Ok(())
}
