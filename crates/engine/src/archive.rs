//! Receipt image archive.
//!
//! Images live under `<root>/<used|unused>/<year>/<filename>`. The year is the
//! purchase year while a receipt is unused and the usage year once it has been
//! used. This layout is persisted state shared with other tools reading the
//! same data directory, so it must not change.
//!
//! All functions here do blocking filesystem I/O. The engine runs them on the
//! blocking pool and serializes calls per receipt id.

use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use thiserror::Error;

pub const USED_DIR: &str = "used";
pub const UNUSED_DIR: &str = "unused";

/// Numbered variants tried before giving up on a file name that is taken.
const MAX_NAME_ATTEMPTS: u32 = 100;

/// Fatal failures while writing or moving a receipt image.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("failed to open source file {}: {source}", path.display())]
    OpenSource { path: PathBuf, source: io::Error },
    #[error("failed to create destination file {}: {source}", path.display())]
    CreateDestination { path: PathBuf, source: io::Error },
    #[error("failed to copy {} to {}: {source}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("{} already exists", path.display())]
    DestinationExists { path: PathBuf },
    #[error("no free file name for {0:?}")]
    NoFreeName(String),
    #[error("invalid file name: {0:?}")]
    InvalidFileName(String),
}

/// Computes the canonical location of a receipt image.
#[must_use]
pub fn archive_path(root: &Path, used: bool, year: i32, filename: &str) -> PathBuf {
    let area = if used { USED_DIR } else { UNUSED_DIR };
    root.join(area).join(year.to_string()).join(filename)
}

/// Moves the image at `current` to its canonical location and returns that
/// location.
///
/// - If `current` already is the canonical path nothing happens.
/// - Missing directories are created first.
/// - An existing file is never replaced. When the canonical name is taken
///   by another image a numbered variant (`name-1.jpg`, `name-2.jpg`, ...)
///   is used instead, so the returned path may differ in its file name.
pub fn relocate(
    current: &Path,
    root: &Path,
    year: i32,
    filename: &str,
    to_used: bool,
) -> Result<PathBuf, ArchiveError> {
    validate_file_name(filename)?;
    if current == archive_path(root, to_used, year, filename) {
        return Ok(current.to_path_buf());
    }

    for attempt in 0..MAX_NAME_ATTEMPTS {
        let target = archive_path(root, to_used, year, &numbered_name(filename, attempt));
        match move_file(current, &target) {
            Ok(()) => return Ok(target),
            Err(ArchiveError::DestinationExists { path }) => {
                tracing::debug!("{} is taken, trying the next name", path.display());
            }
            Err(err) => return Err(err),
        }
    }
    Err(ArchiveError::NoFreeName(filename.to_string()))
}

/// Moves `from` to `to` without ever replacing an existing `to`.
///
/// The file is hard linked at `to` and then unlinked from `from`; when linking
/// is not possible (e.g. the two paths are on different filesystems) the
/// bytes are copied instead. Failing to remove the original afterwards only
/// logs a warning: the image is already safe at its new location.
pub fn move_file(from: &Path, to: &Path) -> Result<(), ArchiveError> {
    ensure_parent(to)?;

    match fs::hard_link(from, to) {
        Ok(()) => {
            remove_original(from, to);
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            Err(ArchiveError::DestinationExists {
                path: to.to_path_buf(),
            })
        }
        Err(err) => {
            tracing::debug!(
                "linking {} -> {} failed, falling back to copy: {err}",
                from.display(),
                to.display()
            );
            copy_then_remove(from, to)
        }
    }
}

/// Copy-and-delete half of [`move_file`].
pub(crate) fn copy_then_remove(from: &Path, to: &Path) -> Result<(), ArchiveError> {
    let mut source = fs::File::open(from).map_err(|source| ArchiveError::OpenSource {
        path: from.to_path_buf(),
        source,
    })?;
    let mut destination = create_new(to).map_err(|source| {
        if source.kind() == io::ErrorKind::AlreadyExists {
            ArchiveError::DestinationExists {
                path: to.to_path_buf(),
            }
        } else {
            ArchiveError::CreateDestination {
                path: to.to_path_buf(),
                source,
            }
        }
    })?;

    let copied = io::copy(&mut source, &mut destination).and_then(|_| destination.sync_all());
    drop(source);
    drop(destination);
    if let Err(source) = copied {
        // The partial copy is ours; the original is untouched.
        let _ = fs::remove_file(to);
        return Err(ArchiveError::Copy {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source,
        });
    }

    remove_original(from, to);
    Ok(())
}

fn remove_original(from: &Path, to: &Path) {
    if let Err(err) = fs::remove_file(from) {
        tracing::warn!(
            "copied receipt image to {} but could not delete the original {}: {err}",
            to.display(),
            from.display()
        );
    }
}

/// Writes a freshly uploaded image into the unused area for `year` and
/// returns where it landed.
///
/// Two uploads may ask for the same name (same second, same client file
/// name); the later one gets a numbered variant rather than overwriting.
pub fn store_new(
    root: &Path,
    year: i32,
    filename: &str,
    bytes: &[u8],
) -> Result<PathBuf, ArchiveError> {
    validate_file_name(filename)?;
    ensure_parent(&archive_path(root, false, year, filename))?;

    for attempt in 0..MAX_NAME_ATTEMPTS {
        let target = archive_path(root, false, year, &numbered_name(filename, attempt));
        let mut file = match create_new(&target) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(source) => {
                return Err(ArchiveError::CreateDestination {
                    path: target,
                    source,
                });
            }
        };
        if let Err(source) = file.write_all(bytes).and_then(|()| file.sync_all()) {
            drop(file);
            let _ = fs::remove_file(&target);
            return Err(ArchiveError::Write {
                path: target,
                source,
            });
        }
        return Ok(target);
    }
    Err(ArchiveError::NoFreeName(filename.to_string()))
}

fn create_new(path: &Path) -> io::Result<fs::File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

/// `receipt.jpg` for attempt 0, then `receipt-1.jpg`, `receipt-2.jpg`, ...
fn numbered_name(filename: &str, attempt: u32) -> String {
    if attempt == 0 {
        return filename.to_string();
    }
    match filename.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => format!("{stem}-{attempt}.{extension}"),
        _ => format!("{filename}-{attempt}"),
    }
}

/// Creates the `used` and `unused` areas below `root`.
pub fn ensure_layout(root: &Path) -> Result<(), ArchiveError> {
    for area in [UNUSED_DIR, USED_DIR] {
        let dir = root.join(area);
        fs::create_dir_all(&dir).map_err(|source| ArchiveError::CreateDir { path: dir, source })?;
    }
    Ok(())
}

/// Builds the stored file name of an upload: `<unix-seconds>_<original name>`.
///
/// Only the last path component of the client supplied name is kept.
pub fn upload_file_name(unix_seconds: i64, original: &str) -> Result<String, ArchiveError> {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .map(str::trim)
        .unwrap_or_default();
    validate_file_name(base)?;
    Ok(format!("{unix_seconds}_{base}"))
}

fn validate_file_name(filename: &str) -> Result<(), ArchiveError> {
    let invalid = filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains(['/', '\\', '\0']);
    if invalid {
        return Err(ArchiveError::InvalidFileName(filename.to_string()));
    }
    Ok(())
}

fn ensure_parent(target: &Path) -> Result<(), ArchiveError> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|source| ArchiveError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

/// Archive rooted at a base directory.
#[derive(Clone, Debug)]
pub struct Archive {
    root: PathBuf,
}

impl Archive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, used: bool, year: i32, filename: &str) -> PathBuf {
        archive_path(&self.root, used, year, filename)
    }

    pub fn relocate(
        &self,
        current: &Path,
        year: i32,
        filename: &str,
        to_used: bool,
    ) -> Result<PathBuf, ArchiveError> {
        relocate(current, &self.root, year, filename, to_used)
    }

    pub fn store_new(&self, year: i32, filename: &str, bytes: &[u8]) -> Result<PathBuf, ArchiveError> {
        store_new(&self.root, year, filename, bytes)
    }

    pub fn ensure_layout(&self) -> Result<(), ArchiveError> {
        ensure_layout(&self.root)
    }
}
