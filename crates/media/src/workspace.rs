//! Scratch directory for transcoding artifacts.
//!
//! Every path handed out is unique (UUID v4 token) and owned by a [`TempPath`]
//! guard that deletes the file when released or dropped, so concurrent jobs
//! never collide and no exit path leaks a file.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Which side of a conversion a path is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Input,
    Output,
}

impl PathKind {
    const ALL: [Self; 2] = [Self::Input, Self::Output];

    fn prefix(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
        }
    }
}

/// Whether `name` has the `<kind>-<uuid>.<ext>` shape [`TempWorkspace::acquire`]
/// hands out.
fn is_issued_name(name: &str) -> bool {
    let Some((stem, _extension)) = name.split_once('.') else {
        return false;
    };
    PathKind::ALL.into_iter().any(|kind| {
        stem.strip_prefix(kind.prefix())
            .and_then(|rest| rest.strip_prefix('-'))
            .is_some_and(|token| uuid::Uuid::try_parse(token).is_ok())
    })
}

/// Shared handle to the workspace root. Cheap to clone.
#[derive(Debug, Clone)]
pub struct TempWorkspace {
    root: Arc<PathBuf>,
}

impl TempWorkspace {
    /// Handle for `root` without touching the filesystem; the directory is
    /// created on first acquisition.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Arc::new(root.into()),
        }
    }

    /// Handle for `root`, creating the directory now.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let workspace = Self::new(root);
        workspace.ensure_root()?;
        Ok(workspace)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ensure_root(&self) -> Result<()> {
        if self.root.is_dir() {
            return Ok(());
        }
        debug!(path = %self.root.display(), "creating temp workspace");
        std::fs::create_dir_all(self.root.as_path()).map_err(|e| {
            Error::io(
                format!("creating temp workspace {}", self.root.display()),
                e,
            )
        })
    }

    /// Hand out a fresh path for a conversion artifact.
    ///
    /// The root is re-created if something removed it since startup. The file
    /// itself is not created.
    pub fn acquire(&self, kind: PathKind, extension: &str) -> Result<TempPath> {
        self.ensure_root()?;
        let extension = extension.trim_start_matches('.');
        let name = format!("{}-{}.{extension}", kind.prefix(), uuid::Uuid::new_v4().simple());
        Ok(TempPath {
            path: self.root.join(name),
            released: false,
        })
    }

    /// Remove a file previously acquired from this workspace.
    ///
    /// Idempotent: a file that is already gone is not an error. Only direct
    /// children of the root are accepted, so `..` components cannot escape it.
    pub fn release(&self, path: &Path) -> Result<()> {
        // Components are compared literally, so `<root>/../x` has parent
        // `<root>/..` and is refused.
        if path.parent() != Some(self.root.as_path()) {
            return Err(Error::invalid_input(format!(
                "{} is outside the temp workspace",
                path.display()
            )));
        }
        remove_if_exists(path)
    }

    /// Remove leftover workspace files older than `max_age`, e.g. after a
    /// crash. Files this workspace did not name are left alone. Returns how
    /// many files were removed.
    pub fn purge_stale(&self, max_age: Duration) -> Result<usize> {
        let entries = match std::fs::read_dir(self.root.as_path()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(Error::io("listing temp workspace", e)),
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            let Ok(meta) = entry.metadata() else {
                continue;
            };
            let issued = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(is_issued_name);
            if !meta.is_file() || !issued {
                continue;
            }
            let age = meta
                .modified()
                .ok()
                .and_then(|modified| modified.elapsed().ok());
            if age.is_some_and(|age| age >= max_age) {
                match remove_if_exists(&path) {
                    Ok(()) => removed += 1,
                    Err(e) => warn!(path = %path.display(), error = %e, "failed to purge stale file"),
                }
            }
        }

        if removed > 0 {
            debug!(removed, root = %self.root.display(), "purged stale workspace files");
        }
        Ok(removed)
    }
}

/// An acquired workspace path. The file is removed when the guard is
/// released or dropped.
#[derive(Debug)]
pub struct TempPath {
    path: PathBuf,
    released: bool,
}

impl TempPath {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the file now, off the async worker thread.
    pub async fn release(mut self) -> Result<()> {
        self.released = true;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io(format!("removing {}", self.path.display()), e)),
        }
    }
}

impl AsRef<Path> for TempPath {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempPath {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = remove_if_exists(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove temp file");
        }
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(format!("removing {}", path.display()), e)),
    }
}
