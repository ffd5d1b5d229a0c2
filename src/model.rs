//! Normalized HTTP exchange and scenario records.
//!
//! `HttpRequest` / `HttpResponse` describe a call independently of any HTTP
//! client library. `Matcher` and friends are the records stored in scenario
//! files.

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One name/value pair of a normalized request or response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A request as seen by the matching engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub scheme: String,
    pub host: String,
    pub port: u16,
    /// Encoded path, as it appears in the URL.
    pub path: String,
    pub headers: Vec<Header>,
    /// Decoded query parameters, in URL order.
    pub params: Vec<Header>,
    pub body: Option<String>,
    /// URL text as the client sent it, when known.
    pub raw_url: Option<String>,
}

impl Default for HttpRequest {
    fn default() -> Self {
        Self {
            method: "GET".to_string(),
            scheme: "http".to_string(),
            host: String::new(),
            port: 80,
            path: String::new(),
            headers: Vec::new(),
            params: Vec::new(),
            body: None,
            raw_url: None,
        }
    }
}

impl HttpRequest {
    /// Build a request from a method and an absolute URL.
    pub fn parse(method: &str, raw_url: &str) -> Result<Self, url::ParseError> {
        let url = url::Url::parse(raw_url)?;
        Ok(Self {
            method: method.to_string(),
            scheme: url.scheme().to_string(),
            host: url.host_str().unwrap_or_default().to_string(),
            port: url.port_or_known_default().unwrap_or_default(),
            path: url.path().to_string(),
            headers: Vec::new(),
            params: url
                .query_pairs()
                .map(|(name, value)| Header::new(name, value))
                .collect(),
            body: None,
            raw_url: Some(raw_url.to_string()),
        })
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(Header::new(name, value));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Percent-decoded path segments without the leading slash.
    ///
    /// A trailing slash yields a final empty segment, so `/` is `[""]`.
    pub fn path_segments(&self) -> Vec<String> {
        self.path
            .strip_prefix('/')
            .unwrap_or(&self.path)
            .split('/')
            .map(|segment| percent_decode_str(segment).decode_utf8_lossy().into_owned())
            .collect()
    }

    /// Full URL of the request.
    ///
    /// The text the request was parsed from when available, otherwise
    /// rebuilt from the parts with default ports omitted.
    pub fn url(&self) -> String {
        if let Some(raw_url) = &self.raw_url {
            return raw_url.clone();
        }
        let mut url = format!("{}://{}", self.scheme, self.host);
        if Some(self.port) != default_port(&self.scheme) {
            url.push_str(&format!(":{}", self.port));
        }
        url.push_str(&self.path);
        if !self.params.is_empty() {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(self.params.iter().map(|p| (&p.name, &p.value)))
                .finish();
            url.push('?');
            url.push_str(&query);
        }
        url
    }
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme.to_ascii_lowercase().as_str() {
        "http" | "ws" => Some(80),
        "https" | "wss" => Some(443),
        _ => None,
    }
}

impl fmt::Display for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url())
    }
}

/// A synthesized response handed back to the HTTP client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub code: u16,
    /// Reason phrase for `code`.
    pub message: String,
    pub media_type: String,
    pub headers: Vec<Header>,
    pub body: String,
}

impl HttpResponse {
    /// First value of a header, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }
}

/// A name with an optional value, as declared in a scenario file.
///
/// In request templates a `None` value asserts the name is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedParameter {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
}

impl NamedParameter {
    pub fn new(name: impl Into<String>, value: Option<&str>) -> Self {
        Self {
            name: name.into(),
            value: value.map(str::to_string),
        }
    }
}

/// Declarative request matcher. `None` fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RequestTemplate {
    /// Headers and params must match the declared sets exactly.
    #[serde(default, skip_serializing_if = "is_false")]
    pub exact_match: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, with = "named_params", skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<NamedParameter>,

    #[serde(default, with = "named_params", skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<NamedParameter>,

    /// Regular expression the whole request body must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl RequestTemplate {
    /// Check that the body pattern compiles.
    pub fn validate(&self) -> Result<(), crate::error::ScenarioError> {
        if let Some(pattern) = &self.body {
            crate::matcher::compile_body_pattern(pattern).map_err(|source| {
                crate::error::ScenarioError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                }
            })?;
        }
        Ok(())
    }
}

/// Description of a mocked response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResponseDescriptor {
    /// Simulated delay in milliseconds, overrides the global delay when > 0.
    #[serde(default)]
    pub delay: u64,

    #[serde(default = "default_code")]
    pub code: u16,

    #[serde(default = "default_media_type")]
    pub media_type: String,

    #[serde(default, with = "named_params", skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<NamedParameter>,

    #[serde(default)]
    pub body: String,

    /// Secondary file holding the body, relative to the scenario file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_file: Option<String>,
}

fn default_code() -> u16 {
    200
}

fn default_media_type() -> String {
    "text/plain".to_string()
}

impl Default for ResponseDescriptor {
    fn default() -> Self {
        Self {
            delay: 0,
            code: default_code(),
            media_type: default_media_type(),
            headers: Vec::new(),
            body: String::new(),
            body_file: None,
        }
    }
}

/// A network failure to raise instead of answering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NetworkError {
    #[serde(default = "default_exception_type")]
    pub exception_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

fn default_exception_type() -> String {
    "java.lang.IllegalStateException".to_string()
}

impl Default for NetworkError {
    fn default() -> Self {
        Self {
            exception_type: default_exception_type(),
            message: None,
        }
    }
}

/// What a matched record resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestResult {
    Response(ResponseDescriptor),
    Error(NetworkError),
}

/// One record of a scenario file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matcher {
    #[serde(default)]
    pub request: RequestTemplate,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseDescriptor>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<NetworkError>,
}

impl Matcher {
    pub fn new(request: RequestTemplate, response: ResponseDescriptor) -> Self {
        Self {
            request,
            response: Some(response),
            error: None,
        }
    }

    pub fn failing(request: RequestTemplate, error: NetworkError) -> Self {
        Self {
            request,
            response: None,
            error: Some(error),
        }
    }

    /// The response if present, else the error, else nothing usable.
    pub fn result(&self) -> Option<RequestResult> {
        match (&self.response, &self.error) {
            (Some(response), _) => Some(RequestResult::Response(response.clone())),
            (None, Some(error)) => Some(RequestResult::Error(error.clone())),
            (None, None) => None,
        }
    }
}

/// (De)serialization of header and param lists.
///
/// Reads either the compact map form (`{"Name": "Value"}`, duplicate keys
/// kept in order) or the expanded list form (`[{"name": .., "value": ..}]`).
/// Always writes the compact form.
mod named_params {
    use super::NamedParameter;
    use serde::de::{MapAccess, SeqAccess, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(
        params: &[NamedParameter],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_map(params.iter().map(|p| (&p.name, &p.value)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<NamedParameter>, D::Error> {
        deserializer.deserialize_any(ParamsVisitor)
    }

    struct ParamsVisitor;

    impl<'de> Visitor<'de> for ParamsVisitor {
        type Value = Vec<NamedParameter>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of names to values or a list of {name, value} objects")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut params = Vec::new();
            while let Some((name, value)) = map.next_entry::<String, Option<String>>()? {
                params.push(NamedParameter { name, value });
            }
            Ok(params)
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut params = Vec::new();
            while let Some(param) = seq.next_element::<NamedParameter>()? {
                params.push(param);
            }
            Ok(params)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_none<E>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }
    }
}
