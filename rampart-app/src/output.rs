//! JSON output sink: pretty-printed to stdout, or to `--output <file>`.

use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use tracing::info;

pub fn write_json<T: Serialize>(value: &T, path: Option<&Path>) -> Result<()> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    match path {
        Some(path) => {
            fs::write(path, text)?;
            info!(path = %path.display(), "output written");
        }
        None => print!("{text}"),
    }
    Ok(())
}
