//! Writes rendered pages under the output directory.

use std::collections::HashSet;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Responsible for putting rendered pages on disk. Paths handed to
/// [`Writer::write_page`] are relative to the output directory.
pub struct Writer<'a> {
    output_directory: &'a Path,

    /// Directories already created during this build.
    seen_dirs: HashSet<PathBuf>,
}

impl<'a> Writer<'a> {
    pub fn new(output_directory: &'a Path) -> Writer<'a> {
        Writer {
            output_directory,
            seen_dirs: HashSet::new(),
        }
    }

    /// Writes `contents` to `{output_directory}/{relative_path}`, creating
    /// parent directories as needed.
    pub fn write_page(&mut self, relative_path: &str, contents: &str) -> Result<()> {
        let path = self.output_directory.join(relative_path);
        if let Some(dir) = path.parent() {
            if self.seen_dirs.insert(dir.to_owned()) {
                std::fs::create_dir_all(dir).map_err(|err| Error::Io {
                    path: dir.to_owned(),
                    err,
                })?;
            }
        }
        log::debug!("writing `{}`", path.display());
        std::fs::write(&path, contents).map_err(|err| Error::Io { path, err })
    }

    /// Removes a generated directory (e.g. `c`) from a previous build so
    /// stale pages don't linger. A missing directory is fine.
    pub fn clean(&mut self, relative_dir: &str) -> Result<()> {
        let dir = self.output_directory.join(relative_dir);
        self.seen_dirs.retain(|seen| !seen.starts_with(&dir));
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) => match e.kind() {
                io::ErrorKind::NotFound => Ok(()),
                _ => Err(Error::Clean { path: dir, err: e }),
            },
        }
    }
}

/// The result of a fallible page-writing operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a page-writing operation.
#[derive(Debug)]
pub enum Error {
    /// An error writing an output file or creating its directory.
    Io { path: PathBuf, err: io::Error },

    /// An error removing an old output directory.
    Clean { path: PathBuf, err: io::Error },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as presentable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io { path, err } => {
                write!(f, "Writing '{}': {}", path.display(), err)
            }
            Error::Clean { path, err } => {
                write!(f, "Cleaning directory '{}': {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { path: _, err } => Some(err),
            Error::Clean { path: _, err } => Some(err),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_write_and_clean() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let out = tempfile::tempdir()?;
        let mut writer = Writer::new(out.path());
        writer.write_page("c/1.html", "<p>one</p>")?;
        writer.write_page("c/2.html", "<p>two</p>")?;
        writer.write_page("index.html", "home")?;
        assert_eq!("<p>two</p>", std::fs::read_to_string(out.path().join("c/2.html"))?);

        writer.clean("c")?;
        assert!(!out.path().join("c").exists());
        assert!(out.path().join("index.html").exists());
        writer.clean("never-created")?;
        Ok(())
    }
}
