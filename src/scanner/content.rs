use crate::fs::{extension, file_name};
use content_inspector::{ContentType, inspect};
use std::collections::HashSet;
use tracing::debug;

/// Decides which files have their content captured during a scan.
#[derive(Debug, Clone)]
pub struct ContentPolicy {
    /// Largest file, in bytes, whose content is read
    max_size: u64,
    /// Lower-cased extensions and whole file names treated as text
    text_names: HashSet<String>,
}

impl ContentPolicy {
    /// Creates a policy from a size cap and a text allow-list.
    ///
    /// Entries match either a file's extension (`rs`) or its whole name
    /// (`dockerfile`), case-insensitively.
    #[must_use]
    pub fn new(max_size: u64, text_extensions: &[String]) -> Self {
        Self {
            max_size,
            text_names: text_extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    /// Returns `true` if a file of this path and size should be read.
    #[must_use]
    pub fn wants(&self, path: &str, size: u64) -> bool {
        size <= self.max_size && self.is_text_path(path)
    }

    /// Returns `true` if the path's extension or name is on the allow-list.
    #[must_use]
    pub fn is_text_path(&self, path: &str) -> bool {
        if let Some(ext) = extension(path)
            && self.text_names.contains(&ext)
        {
            return true;
        }
        let name = file_name(path).trim_start_matches('.').to_ascii_lowercase();
        self.text_names.contains(&name)
    }

    /// The configured size cap.
    #[must_use]
    pub const fn max_size(&self) -> u64 {
        self.max_size
    }
}

/// Decodes captured bytes as text.
///
/// Returns `None` when the bytes look binary even though the extension
/// claimed text. Invalid UTF-8 sequences are replaced rather than rejected.
#[must_use]
pub fn decode_text(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        return Some(String::new());
    }

    let sample = &bytes[..bytes.len().min(8192)];
    if matches!(inspect(sample), ContentType::BINARY) {
        debug!(bytes = bytes.len(), "Text-named file holds binary data");
        return None;
    }

    match simdutf8::basic::from_utf8(bytes) {
        Ok(text) => Some(text.to_string()),
        Err(_) => Some(String::from_utf8_lossy(bytes).into_owned()),
    }
}
