use std::fs;
use std::path::Path;

use tracing::{debug, error};

/// Reads a line-delimited file, trimming each line and dropping blank ones.
///
/// A missing or unreadable file is logged and yields an empty list; the caller
/// decides whether that is fatal.
pub fn load_lines(path: impl AsRef<Path>) -> Vec<String> {
    let path = path.as_ref();

    if !path.exists() {
        error!("File not found: {}", path.display());
        return Vec::new();
    }

    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            error!("Error reading {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    let lines: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    debug!(path = %path.display(), count = lines.len(), "Loaded lines");
    lines
}
