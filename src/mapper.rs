//! Scenario file serialization.
//!
//! A `Mapper` parses scenario content into an ordered list of `Matcher`
//! records and writes them back. JSON and YAML backends share one schema.

use crate::error::MapperError;
use crate::model::Matcher;
use std::io::Read;

/// Parses and writes scenario files.
pub trait Mapper: Send + Sync {
    /// File extension used by filing policies for this format.
    fn supported_format(&self) -> &str;

    fn deserialize(&self, payload: &str) -> Result<Vec<Matcher>, MapperError>;

    fn serialize(&self, matchers: &[Matcher]) -> Result<String, MapperError>;

    /// Read a whole stream and parse it.
    fn read_matches(&self, stream: &mut dyn Read) -> Result<Vec<Matcher>, MapperError> {
        let mut payload = String::new();
        stream.read_to_string(&mut payload)?;
        self.deserialize(&payload)
    }
}

/// JSON scenarios, compact or pretty-printed on output.
#[derive(Debug, Clone, Default)]
pub struct JsonMapper {
    pretty: bool,
}

impl JsonMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl Mapper for JsonMapper {
    fn supported_format(&self) -> &str {
        "json"
    }

    fn deserialize(&self, payload: &str) -> Result<Vec<Matcher>, MapperError> {
        Ok(serde_json::from_str(payload)?)
    }

    fn serialize(&self, matchers: &[Matcher]) -> Result<String, MapperError> {
        let json = if self.pretty {
            serde_json::to_string_pretty(matchers)?
        } else {
            serde_json::to_string(matchers)?
        };
        Ok(json)
    }
}

/// YAML scenarios.
#[derive(Debug, Clone, Default)]
pub struct YamlMapper;

impl Mapper for YamlMapper {
    fn supported_format(&self) -> &str {
        "yaml"
    }

    fn deserialize(&self, payload: &str) -> Result<Vec<Matcher>, MapperError> {
        Ok(serde_yaml::from_str(payload)?)
    }

    fn serialize(&self, matchers: &[Matcher]) -> Result<String, MapperError> {
        Ok(serde_yaml::to_string(matchers)?)
    }
}
