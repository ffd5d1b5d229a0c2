//! Turns provider results into responses.
//!
//! Providers are asked in order; the first result wins. Responses go through
//! the simulated delay and the status table, network errors are raised as
//! `MockError::Simulated`.

use crate::error::MockError;
use crate::model::{Header, HttpRequest, HttpResponse, NetworkError, RequestResult, ResponseDescriptor};
use crate::provider::ScenarioProvider;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Kinds of network failure a scenario can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    IllegalState,
    IllegalArgument,
    Runtime,
    Io,
    UnknownHost,
    SocketTimeout,
    Connect,
    Socket,
    SslHandshake,
}

impl ErrorKind {
    /// Resolve an `exception-type` by its simple name.
    ///
    /// Package prefixes are ignored, so `java.io.IOException` and
    /// `IOException` are the same kind.
    pub fn from_type_name(type_name: &str) -> Option<Self> {
        let simple_name = type_name.rsplit('.').next().unwrap_or(type_name);
        let kind = match simple_name {
            "IllegalStateException" => ErrorKind::IllegalState,
            "IllegalArgumentException" => ErrorKind::IllegalArgument,
            "RuntimeException" | "Exception" => ErrorKind::Runtime,
            "IOException" => ErrorKind::Io,
            "UnknownHostException" => ErrorKind::UnknownHost,
            "SocketTimeoutException" => ErrorKind::SocketTimeout,
            "ConnectException" => ErrorKind::Connect,
            "SocketException" => ErrorKind::Socket,
            "SSLHandshakeException" | "SSLException" => ErrorKind::SslHandshake,
            _ => return None,
        };
        Some(kind)
    }

    /// Whether the failure happens at the network layer.
    pub fn is_network(&self) -> bool {
        !matches!(
            self,
            ErrorKind::IllegalState | ErrorKind::IllegalArgument | ErrorKind::Runtime
        )
    }
}

/// A network failure raised on behalf of a scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedError {
    pub kind: ErrorKind,
    /// `exception-type` as written in the scenario
    pub type_name: String,
    pub message: Option<String>,
}

impl SimulatedError {
    pub fn from_network_error(error: &NetworkError) -> Result<Self, MockError> {
        let kind = ErrorKind::from_type_name(&error.exception_type)
            .ok_or_else(|| MockError::UnsupportedErrorType(error.exception_type.clone()))?;
        Ok(Self {
            kind,
            type_name: error.exception_type.clone(),
            message: error.message.clone(),
        })
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl fmt::Display for SimulatedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{message}"),
            None => write!(f, "{}", self.type_name),
        }
    }
}

impl std::error::Error for SimulatedError {}

/// Answers requests from an ordered list of providers.
pub struct MockResponder {
    providers: Vec<Arc<dyn ScenarioProvider>>,
    /// Delay applied when a response does not set its own
    delay: Duration,
}

impl MockResponder {
    pub fn new(providers: Vec<Arc<dyn ScenarioProvider>>, delay: Duration) -> Self {
        Self { providers, delay }
    }

    /// Mocked response, or the fixed 404 when no provider has one.
    pub async fn mock_response(&self, request: &HttpRequest) -> Result<HttpResponse, MockError> {
        match self.mock_response_or_none(request).await? {
            Some(response) => Ok(response),
            None => build_response(&response_not_found()),
        }
    }

    /// Mocked response, or `None` when no provider has one.
    pub async fn mock_response_or_none(
        &self,
        request: &HttpRequest,
    ) -> Result<Option<HttpResponse>, MockError> {
        for provider in &self.providers {
            info!(request = %request, provider = %provider, "Looking up mock scenario");
            match provider.load_result(request) {
                Some(RequestResult::Response(response)) => {
                    info!(code = response.code, "Response was found");
                    self.simulate_delay(response.delay).await;
                    return build_response(&response).map(Some);
                }
                Some(RequestResult::Error(error)) => {
                    info!(exception_type = %error.exception_type, "Error was found");
                    self.simulate_delay(0).await;
                    return Err(SimulatedError::from_network_error(&error)?.into());
                }
                None => continue,
            }
        }
        Ok(None)
    }

    async fn simulate_delay(&self, response_delay: u64) {
        let delay = if response_delay > 0 {
            Duration::from_millis(response_delay)
        } else {
            self.delay
        };
        if !delay.is_zero() {
            debug!(delay_ms = delay.as_millis() as u64, "Applying delay");
            tokio::time::sleep(delay).await;
        }
    }
}

/// The response used when nothing matched.
pub fn response_not_found() -> ResponseDescriptor {
    ResponseDescriptor {
        code: 404,
        body: "Page not found".to_string(),
        ..Default::default()
    }
}

/// Build the final response for a descriptor.
pub fn build_response(descriptor: &ResponseDescriptor) -> Result<HttpResponse, MockError> {
    let message = reason_phrase(descriptor.code)?;
    Ok(HttpResponse {
        code: descriptor.code,
        message: message.to_string(),
        media_type: descriptor.media_type.clone(),
        headers: descriptor
            .headers
            .iter()
            .map(|h| Header::new(h.name.clone(), h.value.clone().unwrap_or_default()))
            .collect(),
        body: descriptor.body.clone(),
    })
}

/// Reason phrase for a status code.
pub fn reason_phrase(code: u16) -> Result<&'static str, MockError> {
    let phrase = match code {
        100 => "Continue",
        101 => "Switching Protocols",
        102 => "Processing",
        103 => "Early Hints",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        203 => "Non-Authoritative Information",
        204 => "No Content",
        205 => "Reset Content",
        206 => "Partial Content",
        207 => "Multi-Status",
        208 => "Already Reported",
        210 => "Content Different",
        226 => "IM Used",
        300 => "Multiple Choices",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        305 => "Use Proxy",
        306 => "Switch Proxy",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        310 => "Too many Redirects",
        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        407 => "Proxy Authentication Required",
        408 => "Request Time-out",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        412 => "Precondition Failed",
        413 => "Request Entity Too Large",
        414 => "Request-URI Too Long",
        415 => "Unsupported Media Type",
        416 => "Requested range unsatisfiable",
        417 => "Expectation failed",
        418 => "I’m a teapot",
        421 => "Bad mapping / Misdirected Request",
        422 => "Unprocessable entity",
        423 => "Locked",
        424 => "Method failure",
        425 => "Unordered Collection",
        426 => "Upgrade Required",
        428 => "Precondition Required",
        429 => "Too Many Requests",
        431 => "Request Header Fields Too Large",
        444 => "No Response",
        449 => "Retry With",
        450 => "Blocked by Windows Parental Controls",
        451 => "Unavailable For Legal Reasons",
        456 => "Unrecoverable Error",
        495 => "SSL Certificate Error",
        496 => "SSL Certificate Required",
        497 => "HTTP Request Sent to HTTPS Port",
        498 => "Token expired/invalid",
        499 => "Client Closed Request",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service unavailable",
        504 => "Gateway Time-out",
        505 => "HTTP Version not supported",
        506 => "Variant Also Negotiates",
        507 => "Insufficient storage",
        508 => "Loop detected",
        509 => "Bandwidth Limit Exceeded",
        510 => "Not extended",
        511 => "Network authentication required",
        520 => "Unknown Error",
        521 => "Web Server Is Down",
        522 => "Connection Timed Out",
        523 => "Origin Is Unreachable",
        524 => "A Timeout Occurred",
        525 => "SSL Handshake Failed",
        526 => "Invalid SSL Certificate",
        527 => "Railgun Error",
        _ => return Err(MockError::UnknownStatusCode(code)),
    };
    Ok(phrase)
}
