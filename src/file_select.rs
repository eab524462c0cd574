// File acceptance policy and browse dialog for the upload boundary.
// Only the first file of a multi-file drop is ever considered; this is
// a deliberate single-file policy, not an oversight.

use std::path::{Path, PathBuf};

/// Extensions the drop and browse boundary accepts.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "svg"];

/// True if `path` carries one of the accepted image extensions
/// (case-insensitive). Files without an extension are rejected.
pub fn is_accepted(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()).is_some_and(|ext| {
        let ext = ext.to_ascii_lowercase();
        ACCEPTED_EXTENSIONS.contains(&ext.as_str())
    })
}

/// Open the native file dialog restricted to accepted image types.
pub fn browse() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .add_filter("Image", ACCEPTED_EXTENSIONS)
        .pick_file()
}

/// Human-readable byte size for display next to the file name.
pub fn readable_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}
