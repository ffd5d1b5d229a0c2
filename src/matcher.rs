//! Request matching logic.
//!
//! Decides whether a normalized request satisfies a request template. Every
//! declared field must hold; undeclared fields match anything.

use crate::model::{Header, HttpRequest, NamedParameter, RequestTemplate};
use regex::Regex;
use tracing::warn;

/// Request matcher engine.
#[derive(Debug, Clone, Copy)]
pub struct RequestMatcher {
    /// Compare header names ignoring ASCII case
    case_insensitive_headers: bool,
}

impl Default for RequestMatcher {
    fn default() -> Self {
        Self::new(true)
    }
}

impl RequestMatcher {
    pub fn new(case_insensitive_headers: bool) -> Self {
        Self {
            case_insensitive_headers,
        }
    }

    /// Check a request against a template.
    pub fn matches(&self, template: &RequestTemplate, request: &HttpRequest) -> bool {
        matches_ignoring_case(template.protocol.as_deref(), &request.scheme)
            && matches_ignoring_case(template.method.as_deref(), &request.method)
            && matches_ignoring_case(template.host.as_deref(), &request.host)
            && template.port.map_or(true, |port| port == request.port)
            && template.path.as_ref().map_or(true, |path| *path == request.path)
            && self.matches_headers(template, &request.headers)
            && matches_pairs(&template.params, &request.params, template.exact_match, |a, b| a == b)
            && matches_body(template.body.as_deref(), request.body.as_deref())
    }

    fn matches_headers(&self, template: &RequestTemplate, headers: &[Header]) -> bool {
        if self.case_insensitive_headers {
            matches_pairs(&template.headers, headers, template.exact_match, |a, b| {
                a.eq_ignore_ascii_case(b)
            })
        } else {
            matches_pairs(&template.headers, headers, template.exact_match, |a, b| a == b)
        }
    }
}

fn matches_ignoring_case(expected: Option<&str>, actual: &str) -> bool {
    expected.map_or(true, |expected| expected.eq_ignore_ascii_case(actual))
}

/// Shared rule for headers and query parameters.
///
/// A declared value requires an equal pair in the request, a `None` value
/// requires the name to be absent. Exact matching also requires the same
/// number of entries on both sides.
fn matches_pairs(
    expected: &[NamedParameter],
    actual: &[Header],
    exact_match: bool,
    same_name: impl Fn(&str, &str) -> bool,
) -> bool {
    let declared = expected.iter().all(|param| match &param.value {
        Some(value) => actual
            .iter()
            .any(|pair| same_name(&param.name, &pair.name) && *value == pair.value),
        None => !actual.iter().any(|pair| same_name(&param.name, &pair.name)),
    });
    declared && (!exact_match || expected.len() == actual.len())
}

fn matches_body(pattern: Option<&str>, body: Option<&str>) -> bool {
    let Some(pattern) = pattern else {
        return true;
    };
    let Some(body) = body else {
        return false;
    };
    match compile_body_pattern(pattern) {
        Ok(regex) => regex.is_match(body),
        Err(e) => {
            warn!(pattern = %pattern, error = %e, "Invalid body pattern, request not matched");
            false
        }
    }
}

/// Compile a body pattern anchored on both ends.
pub(crate) fn compile_body_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(r"\A(?:{pattern})\z"))
}
