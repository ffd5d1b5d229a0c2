//! Error types for scenario loading, response synthesis and configuration.

use thiserror::Error;

/// Errors raised while parsing or serializing scenario files.
#[derive(Debug, Error)]
pub enum MapperError {
    #[error("could not read scenario content: {0}")]
    Read(#[from] std::io::Error),

    #[error("invalid JSON scenario: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML scenario: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Errors raised by the static scenario pipeline.
///
/// `NotFound` and `Io` are recovered as "no scenario"; every other variant is
/// reported back as a diagnostic response.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("no file found at {0}")]
    NotFound(String),

    #[error("could not load {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Mapper(#[from] MapperError),

    #[error("invalid body pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("body file {0} is not valid UTF-8")]
    InvalidBody(String),
}

impl ScenarioError {
    /// Whether this error means the scenario simply does not exist.
    pub fn is_missing_resource(&self) -> bool {
        matches!(self, ScenarioError::NotFound(_) | ScenarioError::Io { .. })
    }

    /// Short name of the failure, used in diagnostic bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            ScenarioError::NotFound(_) => "NotFound",
            ScenarioError::Io { .. } => "IoError",
            ScenarioError::Mapper(MapperError::Read(_)) => "ReadError",
            ScenarioError::Mapper(MapperError::Json(_)) => "JsonParseError",
            ScenarioError::Mapper(MapperError::Yaml(_)) => "YamlParseError",
            ScenarioError::InvalidPattern { .. } => "InvalidPattern",
            ScenarioError::InvalidBody(_) => "InvalidBody",
        }
    }
}

/// Errors raised by the header/param format converter.
#[derive(Debug, Error)]
pub enum ConverterError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0} entry must be an object with a string \"name\"")]
    InvalidEntry(&'static str),
}

/// Errors surfaced to the caller of the interceptor.
#[derive(Debug, Error)]
pub enum MockError {
    /// A scenario asked for a network failure.
    #[error(transparent)]
    Simulated(#[from] crate::responder::SimulatedError),

    #[error("unsupported exception type in scenario: {0}")]
    UnsupportedErrorType(String),

    #[error("unknown HTTP status code: {0}")]
    UnknownStatusCode(u16),

    #[error("upstream call failed: {0}")]
    Upstream(#[source] anyhow::Error),

    #[error("recording failed: {0}")]
    Recording(#[source] anyhow::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Fatal configuration problems, raised when the interceptor is configured.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("No method has been provided to load the scenarios.")]
    NoLoader,

    #[error("No mapper has been provided to deserialize scenarios. Please specify a Mapper to decode the scenario files.")]
    NoMapper,

    #[error("Recording configuration is not complete. Please add a recorder.")]
    NoRecorder,
}
