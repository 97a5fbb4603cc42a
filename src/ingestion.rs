use std::fs;
use std::path::Path;

use log::debug;

use crate::error::{FnolError, Result};

pub const DEFAULT_INPUT_PATH: &str = "inputs/sample_fnol.txt";

/// Reads a narrative file holding one or more FNOL reports.
///
/// Missing files and files with only whitespace are rejected up front so the
/// pipeline never spends a model call on nothing.
pub fn read_fnol_text(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(FnolError::InputNotFound(path.to_path_buf()));
    }

    let text = fs::read_to_string(path)?;
    if text.trim().is_empty() {
        return Err(FnolError::EmptyInput(path.to_path_buf()));
    }

    debug!("Read {} bytes of FNOL text from {}", text.len(), path.display());
    Ok(text)
}
