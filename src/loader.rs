//! Scenario file access.
//!
//! A `FileLoader` turns a scenario path into a byte stream. Missing files are
//! `Ok(None)`, not errors.

use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Stream handed back by a loader.
pub type ByteStream = Box<dyn Read + Send>;

/// Loads scenario and body files by path.
pub trait FileLoader: Send + Sync {
    /// Open the file at `path`, or `Ok(None)` when it does not exist.
    fn load(&self, path: &str) -> io::Result<Option<ByteStream>>;
}

impl<F> FileLoader for F
where
    F: Fn(&str) -> io::Result<Option<ByteStream>> + Send + Sync,
{
    fn load(&self, path: &str) -> io::Result<Option<ByteStream>> {
        self(path)
    }
}

/// Loads files below a root directory.
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    root: PathBuf,
}

impl DirectoryLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FileLoader for DirectoryLoader {
    fn load(&self, path: &str) -> io::Result<Option<ByteStream>> {
        let file_path = self.root.join(path.trim_start_matches('/'));
        let file = match std::fs::File::open(&file_path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        if file.metadata()?.is_dir() {
            return Ok(None);
        }
        Ok(Some(Box::new(file)))
    }
}

/// Read a whole stream as UTF-8 text.
pub(crate) fn read_to_string(mut stream: ByteStream) -> io::Result<String> {
    let mut content = String::new();
    stream.read_to_string(&mut content)?;
    Ok(content)
}
