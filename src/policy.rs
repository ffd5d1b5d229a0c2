//! Filing policies.
//!
//! A filing policy maps a request to the path of the scenario file that
//! describes it. Policies are pure: same request, same path.

use crate::loader::{ByteStream, FileLoader};
use crate::mapper::Mapper;
use crate::model::{HttpRequest, Matcher};
use std::collections::HashMap;
use std::io;
use std::sync::{Arc, RwLock};

/// Computes where the scenario file for a request lives.
pub trait FilingPolicy: Send + Sync {
    fn get_path(&self, request: &HttpRequest) -> String;
}

impl<F> FilingPolicy for F
where
    F: Fn(&HttpRequest) -> String + Send + Sync,
{
    fn get_path(&self, request: &HttpRequest) -> String {
        self(request)
    }
}

const DEFAULT_EXTENSION: &str = "json";

/// Join segments with `/`, turning a trailing empty segment into `index`.
fn mirror_segments(segments: Vec<String>, extension: &str) -> String {
    let suffix = match segments.last().map(String::as_str) {
        Some("") | None => format!("index.{extension}"),
        Some(_) => format!(".{extension}"),
    };
    segments.join("/") + &suffix
}

/// Scenario files mirror the URL path, host ignored.
///
/// `/users/list` maps to `users/list.json`, `/users/` to `users/index.json`.
#[derive(Debug, Clone)]
pub struct MirrorPathPolicy {
    extension: String,
}

impl MirrorPathPolicy {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
        }
    }
}

impl Default for MirrorPathPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSION)
    }
}

impl FilingPolicy for MirrorPathPolicy {
    fn get_path(&self, request: &HttpRequest) -> String {
        mirror_segments(request.path_segments(), &self.extension)
    }
}

/// All scenario files in one folder, path segments joined with `_`.
#[derive(Debug, Clone)]
pub struct SingleFolderPolicy {
    root_folder: String,
    extension: String,
}

impl SingleFolderPolicy {
    pub fn new(root_folder: impl Into<String>) -> Self {
        Self::with_extension(root_folder, DEFAULT_EXTENSION)
    }

    pub fn with_extension(root_folder: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            root_folder: root_folder.into(),
            extension: extension.into(),
        }
    }
}

impl FilingPolicy for SingleFolderPolicy {
    fn get_path(&self, request: &HttpRequest) -> String {
        let prefix = if self.root_folder.is_empty() {
            String::new()
        } else {
            format!("{}/", self.root_folder)
        };
        let file_name = request
            .path_segments()
            .into_iter()
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("_");
        let file_name = if file_name.is_empty() { "index" } else { &file_name };
        format!("{prefix}{file_name}.{}", self.extension)
    }
}

/// Mirrored path below a folder named after the host.
#[derive(Debug, Clone)]
pub struct ServerSpecificPolicy {
    extension: String,
}

impl ServerSpecificPolicy {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
        }
    }
}

impl Default for ServerSpecificPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSION)
    }
}

impl FilingPolicy for ServerSpecificPolicy {
    fn get_path(&self, request: &HttpRequest) -> String {
        let mut segments = vec![request.host.clone()];
        segments.extend(request.path_segments());
        mirror_segments(segments, &self.extension)
    }
}

/// Scenarios registered in memory, keyed by full request URL.
///
/// The policy doubles as the loader: it serves the records registered for a
/// URL through its mapper, so they go through the regular static pipeline.
pub struct InMemoryPolicy {
    mapper: Arc<dyn Mapper>,
    matchers: RwLock<HashMap<String, Vec<Matcher>>>,
}

impl InMemoryPolicy {
    pub fn new(mapper: impl Mapper + 'static) -> Self {
        Self {
            mapper: Arc::new(mapper),
            matchers: RwLock::new(HashMap::new()),
        }
    }

    /// Mapper used to serve the registered records.
    pub fn mapper(&self) -> Arc<dyn Mapper> {
        Arc::clone(&self.mapper)
    }

    /// Append a record for a URL. Records are tried in registration order.
    pub fn add_matcher(&self, url: impl Into<String>, matcher: Matcher) {
        let mut matchers = match self.matchers.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        matchers.entry(url.into()).or_default().push(matcher);
    }
}

impl FilingPolicy for InMemoryPolicy {
    fn get_path(&self, request: &HttpRequest) -> String {
        request.url()
    }
}

impl FileLoader for InMemoryPolicy {
    fn load(&self, path: &str) -> io::Result<Option<ByteStream>> {
        let matchers = self
            .matchers
            .read()
            .map_err(|_| io::Error::other("in-memory scenarios lock poisoned"))?;
        let Some(list) = matchers.get(path) else {
            return Ok(None);
        };
        let content = self
            .mapper
            .serialize(list)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(Some(Box::new(io::Cursor::new(content.into_bytes()))))
    }
}

impl std::fmt::Debug for InMemoryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryPolicy")
            .field("format", &self.mapper.supported_format())
            .finish_non_exhaustive()
    }
}
