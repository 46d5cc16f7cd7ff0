use std::path::PathBuf;

use crate::error::Result;

/// Saves an uploaded blob under `base_dir/<document_id>/<filename>` and
/// returns the path it was written to.
pub fn save_upload(base_dir: &str, document_id: &str, filename: &str, bytes: &[u8]) -> Result<String> {
    let dir = PathBuf::from(base_dir).join(document_id);
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(sanitize_filename(filename));
    std::fs::write(&path, bytes)?;
    Ok(path.to_string_lossy().into_owned())
}

fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "upload.bin".to_string()
    } else {
        cleaned
    }
}
