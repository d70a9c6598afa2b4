//! Program I/O: the `.t81`/`.t81vm` text format and the `.json` format,
//! both producing a `core::program::Program`. Neither format is part of
//! the core — they are ambient collaborators the core was designed to
//! be fed by, the same way the teacher crate keeps instruction decoding
//! and bus access as thin shells around `CpuCore`.

pub mod json;
pub mod text;

use std::path::Path;

use thiserror::Error;

/// A failure parsing or reading a program file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(String),
}

/// Load a `Program` from `path`, dispatching on its extension: `.json`
/// uses `format::json`, anything else uses `format::text`.
pub fn load_program_from_file(path: &Path) -> Result<crate::core::program::Program, LoadError> {
    let text = std::fs::read_to_string(path)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => json::parse(&text),
        _ => text::parse(&text),
    }
}
