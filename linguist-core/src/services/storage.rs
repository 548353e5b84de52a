use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CoreError, CoreResult};

/// Writes through a sibling `.tmp` file and renames it over the target.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> CoreResult<()> {
    let tmp = tmp_path(path);

    if let Some(parent) = tmp.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| CoreError::io(parent, e))?;
        }
    }

    fs::write(&tmp, bytes).map_err(|e| CoreError::io(&tmp, e))?;

    if path.exists() {
        fs::remove_file(path).map_err(|e| CoreError::io(path, e))?;
    }

    fs::rename(&tmp, path).map_err(|e| CoreError::io(path, e))?;

    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut p = path.to_path_buf();
    let file_name = match path.file_name().and_then(|s| s.to_str()) {
        Some(n) => n.to_string(),
        None => "out".to_string(),
    };
    p.set_file_name(format!("{file_name}.tmp"));
    p
}
