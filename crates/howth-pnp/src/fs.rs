//! Filesystem access that sees through zip archives.
//!
//! Packages in a PnP install usually live inside `.zip` files in the cache,
//! addressed as if the archive were a directory:
//! `/proj/.yarn/cache/lodash-npm-4.17.21.zip/node_modules/lodash/index.js`.
//! Virtual paths (`__virtual__/<hash>/<depth>/...`) are mapped to the
//! location they alias before touching the disk.

use crate::paths::resolve_virtual;
use std::borrow::Cow;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

const ARCHIVE_EXTENSION: &str = ".zip";

/// Archive-aware file probing and reading.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveFs;

/// A path split at an archive boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ArchivePath {
    archive: PathBuf,
    /// Entry name inside the archive, `/`-separated, without a leading slash.
    entry: String,
}

impl ArchiveFs {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Whether `path` is a regular file, inside an archive or not.
    #[must_use]
    pub fn is_file(&self, path: &Path) -> bool {
        let path = physical(path);
        match split_archive_path(&path) {
            Some(ap) if ap.entry.is_empty() => false,
            Some(ap) => archive_has_file(&ap),
            None => path.is_file(),
        }
    }

    /// Whether `path` is a directory. The archive root counts as one.
    #[must_use]
    pub fn is_dir(&self, path: &Path) -> bool {
        let path = physical(path);
        match split_archive_path(&path) {
            Some(ap) if ap.entry.is_empty() => true,
            Some(ap) => archive_has_dir(&ap),
            None => path.is_dir(),
        }
    }

    /// Read a file's bytes.
    ///
    /// # Errors
    /// Returns an error if the file (or archive entry) cannot be read.
    pub fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let path = physical(path);
        let Some(ap) = split_archive_path(&path) else {
            return std::fs::read(&*path);
        };

        let mut zip = open_archive(&ap.archive)?;
        let mut entry = zip.by_name(&ap.entry).map_err(|e| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{}: {e}", path.display()),
            )
        })?;
        let mut buf = Vec::new();
        entry.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Read a file as UTF-8, replacing invalid sequences.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read.
    pub fn read_to_string_lossy(&self, path: &Path) -> io::Result<String> {
        let bytes = self.read(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

fn physical(path: &Path) -> Cow<'_, Path> {
    resolve_virtual(path).map_or(Cow::Borrowed(path), Cow::Owned)
}

fn open_archive(path: &Path) -> io::Result<zip::ZipArchive<File>> {
    let file = File::open(path)?;
    zip::ZipArchive::new(file).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn archive_has_file(ap: &ArchivePath) -> bool {
    let Ok(mut zip) = open_archive(&ap.archive) else {
        return false;
    };
    zip.by_name(&ap.entry).is_ok_and(|f| f.is_file())
}

/// Archives may omit explicit directory entries, so match on name prefixes.
fn archive_has_dir(ap: &ArchivePath) -> bool {
    let Ok(zip) = open_archive(&ap.archive) else {
        return false;
    };
    let prefix = format!("{}/", ap.entry.trim_end_matches('/'));
    let found = zip.file_names().any(|name| name.starts_with(&prefix));
    found
}

/// Split at the first component ending in `.zip` that is a regular file.
fn split_archive_path(path: &Path) -> Option<ArchivePath> {
    let mut archive = PathBuf::new();
    let mut components = path.components();

    while let Some(component) = components.next() {
        archive.push(component.as_os_str());
        let is_archive_name = matches!(component, Component::Normal(name)
            if name.to_str().is_some_and(|n| n.ends_with(ARCHIVE_EXTENSION)));
        if is_archive_name && archive.is_file() {
            let entry = components
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            return Some(ArchivePath { archive, entry });
        }
    }

    None
}
