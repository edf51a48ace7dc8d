//! Upload command implementation.

use serde::Serialize;
use std::path::{Path, PathBuf};

use super::{open_engine, runtime};
use crate::error::{Error, Result};

#[derive(Serialize)]
struct UploadOutput<'a> {
    file: &'a Path,
    parent: Option<&'a str>,
}

/// Execute upload command.
pub fn execute(file: &Path, parent: Option<&str>, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    if !file.is_file() {
        return Err(Error::InvalidArgument(format!(
            "{} is not a file",
            file.display()
        )));
    }

    let (engine, _config) = open_engine(db_path)?;
    runtime()?.block_on(engine.upload(file, parent))?;

    if json {
        let output = UploadOutput { file, parent };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("Uploaded {}", file.display());
    }
    Ok(())
}
