//! Strokes command implementation.

use serde::Serialize;
use std::path::PathBuf;

use super::{open_engine, runtime, Engine};
use crate::device::{DeviceType, JobKind};
use crate::error::Result;
use crate::recognition::RecognitionInput;

#[derive(Serialize)]
struct StrokesOutput {
    id: String,
    device: DeviceType,
    pages: Vec<RecognitionInput>,
}

/// Execute strokes command.
///
/// Prints what a handwriting recognizer would receive for each page of the
/// notebook: stroke coordinates with erasers and highlighters removed.
pub fn execute(id: &str, language: Option<&str>, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let (engine, config) = open_engine(db_path)?;
    let language = language.unwrap_or(&config.language);
    let output = runtime()?.block_on(prepare(&engine, id, language))?;

    if json {
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    let (w, h) = output.device.resolution();
    println!("{} ({}, {w}x{h}, {language})", output.id, output.device);
    for (n, page) in output.pages.iter().enumerate() {
        println!(
            "  page {:>3}  {}  {} strokes, {} points",
            n + 1,
            page.page_id,
            page.strokes.len(),
            page.point_count()
        );
    }
    Ok(())
}

async fn prepare(engine: &Engine, id: &str, language: &str) -> Result<StrokesOutput> {
    let status = engine.ensure_permitted(JobKind::Recognition).await?;
    let device = status.device.unwrap_or_default();
    let notebook = engine.fetch_notebook(id).await?;
    let pages = notebook
        .pages
        .iter()
        .map(|page| RecognitionInput::from_page(page, language, device))
        .collect();
    Ok(StrokesOutput {
        id: notebook.id,
        device,
        pages,
    })
}
