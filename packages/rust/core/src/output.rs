//! Output path resolution and atomic artifact writes.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use webdoc_shared::{OutputFormat, Result, WebdocError};

/// Final output path for `format`.
///
/// Without a path the artifact goes to `output.<ext>`. A path that does not
/// already end in the format's extension gets it appended, so `report`
/// becomes `report.pdf` and `notes.txt` becomes `notes.txt.md`.
pub fn resolve_output_path(output: Option<&Path>, format: OutputFormat) -> PathBuf {
    let ext = format.extension();
    let Some(path) = output else {
        return PathBuf::from(format!("output.{ext}"));
    };

    let has_ext = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext));
    if has_ext {
        return path.to_path_buf();
    }

    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

/// Write `bytes` to `path` atomically (write to a sibling temp file, then
/// rename). Missing parent directories are created.
#[instrument(skip_all, fields(path = %path.display(), bytes = bytes.len()))]
pub fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(|e| WebdocError::io(&parent, e))?;

    let file_name = path
        .file_name()
        .ok_or_else(|| WebdocError::validation(format!("output path has no file name: {}", path.display())))?;
    let mut temp_name = OsString::from(".");
    temp_name.push(file_name);
    temp_name.push(".tmp");
    let temp = parent.join(temp_name);

    std::fs::write(&temp, bytes).map_err(|e| WebdocError::io(&temp, e))?;
    if let Err(e) = std::fs::rename(&temp, path) {
        let _ = std::fs::remove_file(&temp);
        return Err(WebdocError::io(path, e));
    }

    debug!("output written");
    Ok(())
}
