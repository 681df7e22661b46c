use std::path::{Path, PathBuf};

use super::format::sanitize_filename;
use super::hash::compute_fingerprint;
use super::ImportError;

/// First free path for `filename` in `dir`: `name.ext`, then `name_1.ext`,
/// `name_2.ext`, ...
pub fn unique_path(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !candidate.exists() {
        return candidate;
    }

    let as_path = Path::new(filename);
    let stem = as_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    let ext = as_path.extension().and_then(|e| e.to_str());

    let mut counter = 1u32;
    loop {
        let name = match ext {
            Some(ext) => format!("{stem}_{counter}.{ext}"),
            None => format!("{stem}_{counter}"),
        };
        let candidate = dir.join(name);
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Reject empty uploads and uploads over `max_bytes`.
pub fn check_upload_size(bytes: &[u8], max_bytes: u64) -> Result<(), ImportError> {
    if bytes.is_empty() {
        return Err(ImportError::Empty);
    }
    let size = bytes.len() as u64;
    if size > max_bytes {
        return Err(ImportError::FileTooLarge {
            size_mb: size as f64 / (1024.0 * 1024.0),
            max_mb: max_bytes / (1024 * 1024),
        });
    }
    Ok(())
}

/// Keep a copy of an uploaded file in the uploads directory so a later
/// directory scan can pick it up again.
///
/// Content already present in the directory, under any name, is not
/// written again; the existing file's path is returned.
pub fn store_upload(dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf, ImportError> {
    std::fs::create_dir_all(dir)?;

    if let Some(existing) = find_duplicate_content(dir, bytes)? {
        tracing::debug!(path = %existing.display(), "Upload already stored");
        return Ok(existing);
    }

    let target = unique_path(dir, &sanitize_filename(filename));
    std::fs::write(&target, bytes)?;

    tracing::debug!(path = %target.display(), size = bytes.len(), "Upload stored");
    Ok(target)
}

/// A file in `dir` with the same fingerprint as `bytes`, if any.
/// Only files of equal length are hashed.
fn find_duplicate_content(dir: &Path, bytes: &[u8]) -> Result<Option<PathBuf>, ImportError> {
    let fingerprint = compute_fingerprint(bytes);
    for path in list_files(dir)? {
        let same_size = std::fs::metadata(&path).is_ok_and(|m| m.len() == bytes.len() as u64);
        if !same_size {
            continue;
        }
        match std::fs::read(&path) {
            Ok(existing) if compute_fingerprint(&existing) == fingerprint => return Ok(Some(path)),
            Ok(_) => {}
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Unreadable file in uploads"),
        }
    }
    Ok(None)
}

/// Regular, non-hidden files directly inside `dir`, sorted by name.
/// A missing directory reads as empty.
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>, ImportError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    if !dir.is_dir() {
        return Err(ImportError::NotADirectory(dir.display().to_string()));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if !hidden && entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}
