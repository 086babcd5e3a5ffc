//! Safe archive extraction with path traversal protection.

use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;

use extensa_core::AppError;
use extensa_core::result::AppResult;
use extensa_entity::extension::manifest::MANIFEST_FILE;

/// Maximum number of entries allowed in an archive.
pub const MAX_ENTRY_COUNT: usize = 10_000;

/// Bounds applied while unpacking.
#[derive(Debug, Clone, Copy)]
pub struct ExtractLimits {
    /// Maximum number of archive entries.
    pub max_entries: usize,
    /// Maximum total unpacked size in bytes.
    pub max_unpacked_bytes: u64,
}

impl ExtractLimits {
    /// Limits with the default entry cap and the given size cap.
    pub fn with_max_bytes(max_unpacked_bytes: u64) -> Self {
        Self {
            max_entries: MAX_ENTRY_COUNT,
            max_unpacked_bytes,
        }
    }
}

/// Extract a `.tar.gz` archive into `dest` and return the package root.
///
/// If the archive holds a single top-level directory and no manifest at its
/// root, that directory is the package root. Absolute paths, `..`
/// components, links and device entries are rejected as `INVALID_PACKAGE`.
///
/// Blocking; run it on the blocking pool.
pub fn extract_archive(data: &[u8], dest: &Path, limits: ExtractLimits) -> AppResult<PathBuf> {
    std::fs::create_dir_all(dest)?;

    let mut archive = Archive::new(GzDecoder::new(data));
    let entries = archive
        .entries()
        .map_err(|e| AppError::invalid_package(format!("Unreadable archive: {e}")))?;

    let mut entry_count = 0usize;
    let mut total_size: u64 = 0;

    for entry in entries {
        let mut entry =
            entry.map_err(|e| AppError::invalid_package(format!("Unreadable archive entry: {e}")))?;

        entry_count += 1;
        if entry_count > limits.max_entries {
            return Err(AppError::invalid_package(format!(
                "Archive exceeds {} entries",
                limits.max_entries
            )));
        }

        let path = entry
            .path()
            .map_err(|e| AppError::invalid_package(format!("Invalid entry path: {e}")))?
            .into_owned();
        validate_entry_path(&path)?;

        let entry_type = entry.header().entry_type();
        if !is_safe_entry_type(entry_type) {
            return Err(AppError::invalid_package(format!(
                "Unsupported entry type {entry_type:?} at '{}'",
                path.display()
            )));
        }

        total_size = total_size.saturating_add(entry.header().size().unwrap_or(0));
        if total_size > limits.max_unpacked_bytes {
            return Err(AppError::invalid_package(format!(
                "Archive exceeds {} unpacked bytes",
                limits.max_unpacked_bytes
            )));
        }

        if !matches!(entry_type, tar::EntryType::Regular | tar::EntryType::Directory) {
            continue;
        }

        let target = dest.join(&path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        entry.unpack(&target).map_err(|e| {
            AppError::invalid_package(format!("Failed to unpack '{}': {e}", path.display()))
        })?;
    }

    if entry_count == 0 {
        return Err(AppError::invalid_package("Archive is empty"));
    }

    package_root(dest)
}

/// Resolve the package root: `dest` itself, or its only subdirectory when
/// the manifest is not at `dest`.
fn package_root(dest: &Path) -> AppResult<PathBuf> {
    if dest.join(MANIFEST_FILE).is_file() {
        return Ok(dest.to_path_buf());
    }

    let children: Vec<PathBuf> = std::fs::read_dir(dest)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .collect();

    match children.as_slice() {
        [only] if only.is_dir() => Ok(only.clone()),
        _ => Ok(dest.to_path_buf()),
    }
}

fn is_safe_entry_type(entry_type: tar::EntryType) -> bool {
    matches!(
        entry_type,
        tar::EntryType::Regular
            | tar::EntryType::Directory
            | tar::EntryType::GNULongName
            | tar::EntryType::XHeader
            | tar::EntryType::XGlobalHeader
    )
}

fn validate_entry_path(path: &Path) -> AppResult<()> {
    let escapes = path.is_absolute()
        || path.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
    if escapes {
        return Err(AppError::invalid_package(format!(
            "Entry path escapes the package: '{}'",
            path.display()
        )));
    }
    Ok(())
}
