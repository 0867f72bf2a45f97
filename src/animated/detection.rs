// SPDX-License-Identifier: MPL-2.0

//! File type detection utilities.

use std::path::Path;

/// File extensions offered by the file picker.
pub const GIF_EXTENSIONS: &[&str] = &["gif"];

const GIF_SIGNATURES: [&[u8; 6]; 2] = [b"GIF87a", b"GIF89a"];

/// Check if a path points to a GIF file.
#[must_use]
pub fn is_gif_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| GIF_EXTENSIONS.iter().any(|gif| ext.eq_ignore_ascii_case(gif)))
        .unwrap_or(false)
}

/// Check whether a byte stream starts with a GIF header.
#[must_use]
pub fn has_gif_signature(header: &[u8]) -> bool {
    GIF_SIGNATURES
        .iter()
        .any(|signature| header.starts_with(&signature[..]))
}
