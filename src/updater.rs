//! Dotenv Merge Updater
//!
//! This module merges a set of replacement values into an existing `.env` file.
//! Only keys already declared in the file are rewritten; comments, blank lines,
//! unrelated keys and their order all survive the update.
//!
//! ## Write Strategy
//!
//! The merged document is never written over `.env` in place. Instead:
//! 1. A symlinked `.env` is resolved to the file it points at
//! 2. A sibling temporary file `.env.<pid>.tmp` is created with the permissions
//!    of the current `.env`, before any content goes into it
//! 3. The rendered content is written, flushed and fsynced
//! 4. The temporary file is renamed over the resolved `.env`
//!
//! A crash mid-write therefore leaves either the old file or the new one, never
//! a truncated mix. The rename completes before [`DotenvUpdater::update`]
//! returns, so a caller may exit as soon as the future resolves.

use std::{
    io,
    path::{Path, PathBuf},
    process,
};

use log::debug;
use tokio::{fs, io::AsyncWriteExt};

use crate::{
    dotenv::{Applied, Document, Replacements},
    error::{Error, Result},
};

/// Name of the file the updater manages inside its directory.
pub const DOTENV_FILE: &str = ".env";

/// Merges replacement values into `<directory>/.env`.
pub struct DotenvUpdater {
    /// Full path to the managed `.env` file
    path: PathBuf,
}

impl DotenvUpdater {
    /// Creates an updater for the `.env` file inside `directory`.
    ///
    /// Nothing is touched on disk until [`update`](Self::update) runs.
    pub fn new(directory: impl AsRef<Path>) -> Self {
        Self {
            path: directory.as_ref().join(DOTENV_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applies `replacements` to the `.env` file.
    ///
    /// This method performs the complete merge workflow:
    /// 1. Creates an empty `.env` if none exists yet
    /// 2. Reads and parses the current content
    /// 3. Overwrites the value of every entry whose key is in `replacements`
    /// 4. Renders the document and atomically replaces the file
    ///
    /// Replacement keys that the file does not declare are reported in
    /// [`Applied::missing`] and are not appended.
    ///
    /// # Errors
    ///
    /// Any read or write failure (permission denied, disk full, invalid UTF-8)
    /// is returned as [`Error::Dotenv`]. Nothing is retried.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use aws_mfa_dotenv::{dotenv::Replacements, updater::DotenvUpdater};
    ///
    /// # async fn run() -> aws_mfa_dotenv::error::Result<()> {
    /// let mut replacements = Replacements::new();
    /// replacements.insert("AWS_SESSION_TOKEN".into(), "FQoG...".into());
    ///
    /// let applied = DotenvUpdater::new(".").update(&replacements).await?;
    /// println!("updated: {:?}", applied.updated);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn update(&self, replacements: &Replacements) -> Result<Applied> {
        self.merge(replacements).await.map_err(|source| Error::Dotenv {
            path: self.path.clone(),
            source,
        })
    }

    async fn merge(&self, replacements: &Replacements) -> io::Result<Applied> {
        if !fs::try_exists(&self.path).await? {
            debug!("Creating empty {}", self.path.display());
            fs::write(&self.path, "").await?;
        }

        let contents = fs::read_to_string(&self.path).await?;
        let mut document = Document::parse(&contents);
        let applied = document.apply(replacements);
        for key in &applied.missing {
            debug!("{key} is not declared in {}, skipping", self.path.display());
        }

        write_atomic(&self.path, document.render().as_bytes()).await?;
        Ok(applied)
    }
}

/// Merges `replacements` into `<directory>/.env`.
///
/// Shorthand for `DotenvUpdater::new(directory).update(replacements)`.
pub async fn update(directory: impl AsRef<Path>, replacements: &Replacements) -> Result<Applied> {
    DotenvUpdater::new(directory).update(replacements).await
}

/// Replaces `path` with `contents` via a fsynced sibling file and a rename.
///
/// A symlinked `path` is resolved first so the link survives and the file it
/// points at receives the new content.
async fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let target = resolve_target(path).await?;
    let tmp = temp_path(&target);
    let result = write_and_swap(&target, &tmp, contents).await;
    if result.is_err() {
        // Best effort, the original error is what matters.
        let _ = fs::remove_file(&tmp).await;
    }
    result
}

async fn resolve_target(path: &Path) -> io::Result<PathBuf> {
    match fs::symlink_metadata(path).await {
        Ok(metadata) if metadata.file_type().is_symlink() => fs::canonicalize(path).await,
        _ => Ok(path.to_path_buf()),
    }
}

async fn write_and_swap(target: &Path, tmp: &Path, contents: &[u8]) -> io::Result<()> {
    let mut file = create_temp(target, tmp).await?;
    file.write_all(contents).await?;
    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(tmp, target).await
}

/// Creates the empty temp file, already carrying the permissions of `target`.
///
/// `.env` usually holds secrets, so the mode is settled before any content is
/// written. Without an existing `target` the file is owner-only.
async fn create_temp(target: &Path, tmp: &Path) -> io::Result<fs::File> {
    let permissions = fs::metadata(target).await.map(|m| m.permissions()).ok();

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        options.mode(permissions.as_ref().map_or(0o600, |p| p.mode() & 0o777));
    }
    let file = options.open(tmp).await?;

    // `mode` is filtered by the umask and ignored for a stale file, so pin it.
    if let Some(permissions) = permissions {
        fs::set_permissions(tmp, permissions).await?;
    }
    Ok(file)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| DOTENV_FILE.into());
    name.push(format!(".{}.tmp", process::id()));
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_dotenv_inside_directory() {
        let updater = DotenvUpdater::new("/srv/app");
        assert_eq!(updater.path(), Path::new("/srv/app/.env"));
    }

    #[test]
    fn temp_file_is_a_sibling() {
        let tmp = temp_path(Path::new("/srv/app/.env"));
        assert_eq!(tmp.parent(), Some(Path::new("/srv/app")));
        assert_eq!(
            tmp.file_name().and_then(|n| n.to_str()),
            Some(format!(".env.{}.tmp", process::id()).as_str())
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn temp_file_is_restricted_before_content_is_written() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let target = dir.path().join(".env");
        std::fs::write(&target, "AWS_SECRET_ACCESS_KEY=old\n").unwrap();
        std::fs::set_permissions(&target, std::fs::Permissions::from_mode(0o600)).unwrap();
        let tmp = temp_path(&target);
        std::fs::write(&tmp, "stale").unwrap();
        std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o644)).unwrap();

        let file = create_temp(&target, &tmp).await.unwrap();

        let metadata = file.metadata().await.unwrap();
        assert_eq!(metadata.len(), 0);
        assert_eq!(metadata.permissions().mode() & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinked_dotenv_resolves_to_its_target() {
        let dir = tempfile::TempDir::new().unwrap();
        let shared = dir.path().join("shared.env");
        std::fs::write(&shared, "A=1\n").unwrap();
        let link = dir.path().join(".env");
        std::os::unix::fs::symlink(&shared, &link).unwrap();

        let target = resolve_target(&link).await.unwrap();

        assert_eq!(target, std::fs::canonicalize(&shared).unwrap());
        assert_eq!(resolve_target(&shared).await.unwrap(), shared);
    }
}
