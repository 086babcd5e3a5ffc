//! Package archive builder.

use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;

use extensa_core::AppError;
use extensa_core::result::AppResult;
use extensa_entity::extension::manifest::MANIFEST_FILE;

/// Builds `.tar.gz` extension packages.
///
/// Used by the operator CLI to pack a directory and by tests to produce
/// packages on the fly.
#[derive(Debug, Clone, Default)]
pub struct PackageBuilder {
    /// Optional directory every entry is placed under.
    top_level_dir: Option<String>,
    /// Archive-relative path and contents of each file.
    files: Vec<(String, Vec<u8>)>,
}

impl PackageBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Places every entry under a single top-level directory.
    pub fn with_top_level_dir(mut self, name: impl Into<String>) -> Self {
        self.top_level_dir = Some(name.into());
        self
    }

    /// Adds `extension.toml`.
    pub fn manifest(self, toml: impl Into<String>) -> Self {
        self.file(MANIFEST_FILE, toml.into())
    }

    /// Adds a file at an archive-relative path.
    pub fn file(mut self, path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.files.push((path.into(), contents.into()));
        self
    }

    /// Collects every regular file below `dir`.
    pub fn from_dir(dir: &Path) -> AppResult<Self> {
        if !dir.join(MANIFEST_FILE).is_file() {
            return Err(AppError::invalid_package(format!(
                "'{}' has no {MANIFEST_FILE}",
                dir.display()
            )));
        }

        let mut builder = Self::new();
        let mut pending: Vec<PathBuf> = vec![dir.to_path_buf()];
        while let Some(current) = pending.pop() {
            for entry in std::fs::read_dir(&current)? {
                let entry = entry?;
                let file_type = entry.file_type()?;
                let path = entry.path();
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() {
                    let relative = path
                        .strip_prefix(dir)
                        .map_err(|e| AppError::internal(format!("Bad package path: {e}")))?
                        .to_string_lossy()
                        .replace('\\', "/");
                    builder.files.push((relative, std::fs::read(&path)?));
                }
            }
        }
        builder.files.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(builder)
    }

    /// Returns the number of files added.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns `true` if no file was added.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Produces the gzip-compressed tar archive.
    pub fn build(&self) -> AppResult<Vec<u8>> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut tar = tar::Builder::new(encoder);

        for (path, contents) in &self.files {
            let full = match &self.top_level_dir {
                Some(dir) => format!("{dir}/{path}"),
                None => path.clone(),
            };
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_entry_type(tar::EntryType::Regular);
            tar.append_data(&mut header, &full, contents.as_slice())
                .map_err(|e| AppError::internal(format!("Failed to add '{full}': {e}")))?;
        }

        let encoder = tar
            .into_inner()
            .map_err(|e| AppError::internal(format!("Failed to finish archive: {e}")))?;
        encoder
            .finish()
            .map_err(|e| AppError::internal(format!("Failed to compress archive: {e}")))
    }

    /// Builds the archive and writes it to `out`.
    pub fn write_to(&self, out: &Path) -> AppResult<u64> {
        let bytes = self.build()?;
        std::fs::write(out, &bytes)?;
        Ok(bytes.len() as u64)
    }
}
