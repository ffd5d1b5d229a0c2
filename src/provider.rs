//! Scenario providers.
//!
//! A provider answers a request with a `RequestResult`, or `None` when it has
//! nothing for it. The static provider reads scenario files, the dynamic
//! provider asks programmatic callbacks.

use crate::error::ScenarioError;
use crate::loader::{read_to_string, FileLoader};
use crate::mapper::Mapper;
use crate::matcher::RequestMatcher;
use crate::model::{HttpRequest, Matcher, RequestResult, ResponseDescriptor};
use crate::policy::FilingPolicy;
use std::fmt;
use std::io;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Source of mocked results.
pub trait ScenarioProvider: fmt::Display + Send + Sync {
    fn load_result(&self, request: &HttpRequest) -> Option<RequestResult>;
}

/// Computes a response for a request programmatically.
pub trait RequestCallback: Send + Sync {
    fn process_request(&self, request: &HttpRequest) -> Option<ResponseDescriptor>;
}

impl<F> RequestCallback for F
where
    F: Fn(&HttpRequest) -> Option<ResponseDescriptor> + Send + Sync,
{
    fn process_request(&self, request: &HttpRequest) -> Option<ResponseDescriptor> {
        self(request)
    }
}

/// Callbacks tried in order, the first answer wins.
pub struct DynamicMockProvider {
    callbacks: Vec<Arc<dyn RequestCallback>>,
}

impl DynamicMockProvider {
    pub fn new(callbacks: Vec<Arc<dyn RequestCallback>>) -> Self {
        Self { callbacks }
    }
}

impl ScenarioProvider for DynamicMockProvider {
    fn load_result(&self, request: &HttpRequest) -> Option<RequestResult> {
        self.callbacks
            .iter()
            .find_map(|callback| callback.process_request(request))
            .map(RequestResult::Response)
    }
}

impl fmt::Display for DynamicMockProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dynamic mock configuration")
    }
}

/// Scenario files located by a filing policy.
pub struct StaticMockProvider {
    policy: Arc<dyn FilingPolicy>,
    loader: Arc<dyn FileLoader>,
    mapper: Arc<dyn Mapper>,
    matcher: RequestMatcher,
}

impl StaticMockProvider {
    pub fn new(
        policy: Arc<dyn FilingPolicy>,
        loader: Arc<dyn FileLoader>,
        mapper: Arc<dyn Mapper>,
        matcher: RequestMatcher,
    ) -> Self {
        Self {
            policy,
            loader,
            mapper,
            matcher,
        }
    }

    fn resolve(&self, path: &str, request: &HttpRequest) -> Result<Option<RequestResult>, ScenarioError> {
        let Some(mut stream) = self.open(path)? else {
            return Err(ScenarioError::NotFound(path.to_string()));
        };
        let list = self.mapper.read_matches(&mut stream)?;

        let Some(record) = self.first_match(&list, request)? else {
            info!(path = %path, "No match for request");
            return Ok(None);
        };
        info!(path = %path, "Match found");

        match record.result() {
            Some(RequestResult::Response(response)) => {
                Ok(Some(RequestResult::Response(self.load_body(path, response)?)))
            }
            other => Ok(other),
        }
    }

    /// First record in file order whose template matches.
    ///
    /// Body patterns are checked as records are reached, so an invalid one
    /// after the match is never reported.
    fn first_match<'a>(
        &self,
        list: &'a [Matcher],
        request: &HttpRequest,
    ) -> Result<Option<&'a Matcher>, ScenarioError> {
        for record in list {
            record.request.validate()?;
            if self.matcher.matches(&record.request, request) {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    fn open(&self, path: &str) -> Result<Option<crate::loader::ByteStream>, ScenarioError> {
        match self.loader.load(path) {
            Ok(stream) => Ok(stream),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ScenarioError::Io {
                path: path.to_string(),
                source,
            }),
        }
    }

    /// Replace `body-file` with the content it points to.
    ///
    /// A body file that does not exist leaves the inline `body` in place.
    fn load_body(
        &self,
        scenario_path: &str,
        response: ResponseDescriptor,
    ) -> Result<ResponseDescriptor, ScenarioError> {
        let Some(body_file) = &response.body_file else {
            return Ok(response);
        };
        let path = resolve_relative_path(scenario_path, body_file);
        info!(path = %path, "Loading response body from file");

        let Some(stream) = self.open(&path)? else {
            warn!(path = %path, "Body file not found, keeping inline body");
            return Ok(ResponseDescriptor {
                body_file: None,
                ..response
            });
        };
        let body = read_to_string(stream).map_err(|source| match source.kind() {
            io::ErrorKind::InvalidData => ScenarioError::InvalidBody(path.clone()),
            _ => ScenarioError::Io {
                path: path.clone(),
                source,
            },
        })?;

        Ok(ResponseDescriptor {
            body,
            body_file: None,
            ..response
        })
    }
}

impl ScenarioProvider for StaticMockProvider {
    fn load_result(&self, request: &HttpRequest) -> Option<RequestResult> {
        let path = self.policy.get_path(request);
        info!(path = %path, "Loading scenarios");

        match self.resolve(&path, request) {
            Ok(result) => result,
            Err(e) if e.is_missing_resource() => {
                warn!(path = %path, error = %e, "Scenario file could not be loaded");
                None
            }
            Err(e) => {
                error!(path = %path, error = %e, "Scenario file could not be processed");
                Some(RequestResult::Response(diagnostic_response(&e)))
            }
        }
    }
}

impl fmt::Display for StaticMockProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "static mock configuration ({})", self.mapper.supported_format())
    }
}

/// 404 response carrying the failure and its causes.
fn diagnostic_response(e: &ScenarioError) -> ResponseDescriptor {
    let mut body = format!("{}: {}", e.kind(), e);
    let mut source = std::error::Error::source(e);
    while let Some(cause) = source {
        body.push_str(&format!("\n\tcaused by: {cause}"));
        source = std::error::Error::source(cause);
    }
    ResponseDescriptor {
        code: 404,
        body,
        ..Default::default()
    }
}

/// Resolve `child` against the folder holding `base`.
///
/// The last segment of `base` is dropped, then `..` and `.` segments are
/// collapsed lexically. `..` above the first segment is discarded.
pub fn resolve_relative_path(base: &str, child: &str) -> String {
    let mut segments: Vec<&str> = base.split('/').collect();
    segments.pop();
    for segment in child.split('/') {
        match segment {
            ".." => {
                segments.pop();
            }
            "." => {}
            _ => segments.push(segment),
        }
    }
    segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::ByteStream;
    use crate::mapper::JsonMapper;
    use crate::policy::MirrorPathPolicy;
    use std::collections::HashMap;

    fn files(entries: &[(&str, &str)]) -> Arc<dyn FileLoader> {
        let files: HashMap<String, String> = entries
            .iter()
            .map(|(path, content)| (path.to_string(), content.to_string()))
            .collect();
        Arc::new(move |path: &str| -> io::Result<Option<ByteStream>> {
            Ok(files
                .get(path)
                .map(|content| Box::new(io::Cursor::new(content.clone().into_bytes())) as ByteStream))
        })
    }

    fn provider(loader: Arc<dyn FileLoader>) -> StaticMockProvider {
        StaticMockProvider::new(
            Arc::new(MirrorPathPolicy::default()),
            loader,
            Arc::new(JsonMapper::new()),
            RequestMatcher::default(),
        )
    }

    fn get(url: &str) -> HttpRequest {
        HttpRequest::parse("GET", url).unwrap()
    }

    fn response_body(result: Option<RequestResult>) -> String {
        match result {
            Some(RequestResult::Response(response)) => response.body,
            other => panic!("Expected response, got {:?}", other),
        }
    }

    #[test]
    fn test_relative_path_resolution() {
        assert_eq!(resolve_relative_path("a/b/c.json", "../d/e"), "a/d/e");
        assert_eq!(resolve_relative_path("a/b/c.json", "body.txt"), "a/b/body.txt");
        assert_eq!(resolve_relative_path("c.json", "body.txt"), "body.txt");
        assert_eq!(resolve_relative_path("a/b/c.json", "./d"), "a/b/d");
        assert_eq!(resolve_relative_path("a/b/c.json", "../../d"), "d");
    }

    #[test]
    fn test_first_match_wins_over_more_specific() {
        let scenario = r#"[
            {"request": {}, "response": {"body": "generic"}},
            {"request": {"path": "/specific"}, "response": {"body": "specific"}}
        ]"#;
        let provider = provider(files(&[("specific.json", scenario)]));

        let result = provider.load_result(&get("http://host/specific"));
        assert_eq!(response_body(result), "generic");
    }

    #[test]
    fn test_specific_then_generic_fallback() {
        let scenario = r#"[
            {"request": {"params": {"id": "1"}}, "response": {"body": "one"}},
            {"request": {}, "response": {"body": "fallback"}}
        ]"#;
        let provider = provider(files(&[("items.json", scenario)]));

        assert_eq!(response_body(provider.load_result(&get("http://host/items?id=1"))), "one");
        assert_eq!(
            response_body(provider.load_result(&get("http://host/items?id=2"))),
            "fallback"
        );
    }

    #[test]
    fn test_missing_file_yields_none() {
        let provider = provider(files(&[]));
        assert!(provider.load_result(&get("http://host/unknown")).is_none());
    }

    #[test]
    fn test_loader_io_error_yields_none() {
        let loader: Arc<dyn FileLoader> = Arc::new(|_: &str| -> io::Result<Option<ByteStream>> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        });
        assert!(provider(loader).load_result(&get("http://host/any")).is_none());
    }

    #[test]
    fn test_no_matching_record_yields_none() {
        let scenario = r#"[{"request": {"method": "POST"}, "response": {"body": "B"}}]"#;
        let provider = provider(files(&[("no_match.json", scenario)]));
        assert!(provider.load_result(&get("http://host/no_match")).is_none());
    }

    #[test]
    fn test_record_without_result_yields_none() {
        let scenario = r#"[
            {"request": {"method": "GET"}},
            {"request": {}, "response": {"body": "never reached"}}
        ]"#;
        let provider = provider(files(&[("empty.json", scenario)]));
        assert!(provider.load_result(&get("http://host/empty")).is_none());
    }

    #[test]
    fn test_malformed_scenario_yields_diagnostic() {
        let provider = provider(files(&[("broken.json", "[{\"request\": ")]));
        match provider.load_result(&get("http://host/broken")) {
            Some(RequestResult::Response(response)) => {
                assert_eq!(response.code, 404);
                assert!(response.body.starts_with("JsonParseError: invalid JSON scenario"));
            }
            other => panic!("Expected diagnostic response, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_body_pattern_yields_diagnostic() {
        let scenario = r#"[{"request": {"body": "("}, "response": {"body": "x"}}]"#;
        let provider = provider(files(&[("pattern.json", scenario)]));
        match provider.load_result(&get("http://host/pattern")) {
            Some(RequestResult::Response(response)) => {
                assert_eq!(response.code, 404);
                assert!(response.body.starts_with("InvalidPattern"));
            }
            other => panic!("Expected diagnostic response, got {:?}", other),
        }
    }

    #[test]
    fn test_body_file_is_loaded_relative_to_scenario() {
        let scenario = r#"[{"request": {}, "response": {"body-file": "../bodies/user.json", "media-type": "application/json"}}]"#;
        let provider = provider(files(&[
            ("api/users/1.json", scenario),
            ("api/bodies/user.json", r#"{"id": 1}"#),
        ]));

        match provider.load_result(&get("http://host/api/users/1")) {
            Some(RequestResult::Response(response)) => {
                assert_eq!(response.body, r#"{"id": 1}"#);
                assert_eq!(response.body_file, None);
                assert_eq!(response.media_type, "application/json");
            }
            other => panic!("Expected response, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_body_file_keeps_inline_body() {
        let scenario = r#"[{"request": {}, "response": {"body": "inline", "body-file": "missing.txt"}}]"#;
        let provider = provider(files(&[("page.json", scenario)]));
        match provider.load_result(&get("http://host/page")) {
            Some(RequestResult::Response(response)) => {
                assert_eq!(response.body, "inline");
                assert_eq!(response.body_file, None);
            }
            other => panic!("Expected response, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_pattern_after_match_is_not_reached() {
        let scenario = r#"[
            {"request": {"method": "GET"}, "response": {"body": "first"}},
            {"request": {"body": "("}, "response": {"body": "broken"}}
        ]"#;
        let provider = provider(files(&[("lazy.json", scenario)]));
        assert_eq!(response_body(provider.load_result(&get("http://host/lazy"))), "first");
    }

    #[test]
    fn test_invalid_pattern_before_match_yields_diagnostic() {
        let scenario = r#"[
            {"request": {"body": "("}, "response": {"body": "broken"}},
            {"request": {}, "response": {"body": "second"}}
        ]"#;
        let provider = provider(files(&[("eager.json", scenario)]));
        match provider.load_result(&get("http://host/eager")) {
            Some(RequestResult::Response(response)) => {
                assert_eq!(response.code, 404);
                assert!(response.body.starts_with("InvalidPattern"));
            }
            other => panic!("Expected diagnostic response, got {:?}", other),
        }
    }

    #[test]
    fn test_non_utf8_body_file_yields_diagnostic() {
        let scenario = r#"[{"request": {}, "response": {"body-file": "binary.bin"}}]"#;
        let loader: Arc<dyn FileLoader> = Arc::new(move |path: &str| -> io::Result<Option<ByteStream>> {
            let content = match path {
                "page.json" => scenario.as_bytes().to_vec(),
                "binary.bin" => vec![0xff, 0xfe, 0x00],
                _ => return Ok(None),
            };
            Ok(Some(Box::new(io::Cursor::new(content))))
        });
        match provider(loader).load_result(&get("http://host/page")) {
            Some(RequestResult::Response(response)) => {
                assert_eq!(response.code, 404);
                assert!(response.body.starts_with("InvalidBody"));
            }
            other => panic!("Expected diagnostic response, got {:?}", other),
        }
    }

    #[test]
    fn test_error_record_is_returned() {
        let scenario = r#"[{"request": {}, "error": {"exception-type": "java.io.IOException", "message": "boom"}}]"#;
        let provider = provider(files(&[("fail.json", scenario)]));
        match provider.load_result(&get("http://host/fail")) {
            Some(RequestResult::Error(error)) => assert_eq!(error.message.as_deref(), Some("boom")),
            other => panic!("Expected error, got {:?}", other),
        }
    }

    #[test]
    fn test_dynamic_callbacks_in_order() {
        let first: Arc<dyn RequestCallback> = Arc::new(|request: &HttpRequest| {
            (request.path == "/first").then(|| ResponseDescriptor {
                body: "first".to_string(),
                ..Default::default()
            })
        });
        let second: Arc<dyn RequestCallback> = Arc::new(|_: &HttpRequest| {
            Some(ResponseDescriptor {
                body: "second".to_string(),
                ..Default::default()
            })
        });
        let provider = DynamicMockProvider::new(vec![first, second]);

        assert_eq!(response_body(provider.load_result(&get("http://host/first"))), "first");
        assert_eq!(response_body(provider.load_result(&get("http://host/other"))), "second");
    }

    #[test]
    fn test_dynamic_provider_without_answer() {
        let none: Arc<dyn RequestCallback> = Arc::new(|_: &HttpRequest| -> Option<ResponseDescriptor> { None });
        let provider = DynamicMockProvider::new(vec![none]);
        assert!(provider.load_result(&get("http://host/any")).is_none());
    }
}
