//! Configuration for the mocker binary.
//!
//! Selects the mode, where scenario files live, how requests map to them and
//! which format they use.

use crate::interceptor::{InterceptorBuilder, MockInterceptor, Mode};
use crate::loader::DirectoryLoader;
use crate::mapper::{JsonMapper, YamlMapper};
use crate::policy::{MirrorPathPolicy, ServerSpecificPolicy, SingleFolderPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MockerConfig {
    /// Initial interceptor mode
    #[serde(default = "default_mode")]
    pub mode: Mode,

    /// Default delay for responses without their own, in milliseconds
    #[serde(default)]
    pub delay_ms: u64,

    /// Where and how scenario files are stored
    #[serde(default)]
    pub scenarios: ScenarioSource,

    /// Global settings
    #[serde(default)]
    pub settings: GlobalSettings,
}

fn default_mode() -> Mode {
    Mode::Enabled
}

impl Default for MockerConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            delay_ms: 0,
            scenarios: ScenarioSource::default(),
            settings: GlobalSettings::default(),
        }
    }
}

impl MockerConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.mode == Mode::Record {
            anyhow::bail!("Mode 'record' needs a recorder, which this binary does not provide");
        }
        self.scenarios.validate()
    }

    /// Build an interceptor serving the configured scenario folder.
    pub fn build_interceptor(&self) -> anyhow::Result<MockInterceptor> {
        let builder = MockInterceptor::builder()
            .load_file_with(DirectoryLoader::new(&self.scenarios.root))
            .add_fake_network_delay(self.delay_ms)
            .set_mode(self.mode)
            .case_insensitive_headers(self.settings.case_insensitive_headers)
            .fail_on_recording_error(self.settings.fail_on_recording_error)
            .log_matches(self.settings.log_matches)
            .log_unmatched(self.settings.log_unmatched);
        let builder = self.scenarios.apply(builder);
        Ok(builder.build()?)
    }
}

/// Scenario storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioSource {
    /// Root directory of scenario files
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// How a request maps to a scenario file
    #[serde(default)]
    pub policy: PolicyKind,

    /// Folder name for the single-folder policy
    #[serde(default)]
    pub folder: Option<String>,

    /// Scenario file format
    #[serde(default)]
    pub format: ScenarioFormat,
}

fn default_root() -> PathBuf {
    PathBuf::from("scenarios")
}

impl Default for ScenarioSource {
    fn default() -> Self {
        Self {
            root: default_root(),
            policy: PolicyKind::default(),
            folder: None,
            format: ScenarioFormat::default(),
        }
    }
}

impl ScenarioSource {
    fn validate(&self) -> anyhow::Result<()> {
        if let Some(folder) = &self.folder {
            if self.policy != PolicyKind::SingleFolder {
                anyhow::bail!("'folder' is only used by the single_folder policy");
            }
            if folder.contains("..") {
                anyhow::bail!("Scenario folder cannot leave the root: {folder}");
            }
        }
        Ok(())
    }

    fn extension(&self) -> &'static str {
        match self.format {
            ScenarioFormat::Json => "json",
            ScenarioFormat::Yaml => "yaml",
        }
    }

    fn apply(&self, builder: InterceptorBuilder) -> InterceptorBuilder {
        let extension = self.extension();
        let builder = match self.policy {
            PolicyKind::MirrorPath => builder.decode_scenario_path_with(MirrorPathPolicy::new(extension)),
            PolicyKind::SingleFolder => builder.decode_scenario_path_with(SingleFolderPolicy::with_extension(
                self.folder.clone().unwrap_or_default(),
                extension,
            )),
            PolicyKind::ServerSpecific => {
                builder.decode_scenario_path_with(ServerSpecificPolicy::new(extension))
            }
        };
        match self.format {
            ScenarioFormat::Json => builder.parse_scenarios_with(JsonMapper::new()),
            ScenarioFormat::Yaml => builder.parse_scenarios_with(YamlMapper),
        }
    }
}

/// Filing policy selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    #[default]
    MirrorPath,
    SingleFolder,
    ServerSpecific,
}

/// Scenario file format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioFormat {
    #[default]
    Json,
    Yaml,
}

/// Global settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalSettings {
    /// Log all mocked requests
    #[serde(default = "default_true")]
    pub log_matches: bool,

    /// Log requests no scenario answered
    #[serde(default = "default_true")]
    pub log_unmatched: bool,

    /// Case-insensitive header name matching
    #[serde(default = "default_true")]
    pub case_insensitive_headers: bool,

    /// Surface recording failures to the caller
    #[serde(default)]
    pub fail_on_recording_error: bool,
}

fn default_true() -> bool {
    true
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            log_matches: true,
            log_unmatched: true,
            case_insensitive_headers: true,
            fail_on_recording_error: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
mode: mixed
delay_ms: 250
scenarios:
  root: ./mocks
  policy: single_folder
  folder: flat
  format: yaml
settings:
  log_matches: false
  case_insensitive_headers: false
"#;
        let config: MockerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.mode, Mode::Mixed);
        assert_eq!(config.delay_ms, 250);
        assert_eq!(config.scenarios.root, PathBuf::from("./mocks"));
        assert_eq!(config.scenarios.policy, PolicyKind::SingleFolder);
        assert_eq!(config.scenarios.folder.as_deref(), Some("flat"));
        assert_eq!(config.scenarios.format, ScenarioFormat::Yaml);
        assert!(!config.settings.log_matches);
        assert!(config.settings.log_unmatched);
        assert!(!config.settings.case_insensitive_headers);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let config: MockerConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.mode, Mode::Enabled);
        assert_eq!(config.scenarios.root, PathBuf::from("scenarios"));
        assert_eq!(config.scenarios.policy, PolicyKind::MirrorPath);
        assert_eq!(config.scenarios.format, ScenarioFormat::Json);
        assert!(config.settings.case_insensitive_headers);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result: Result<MockerConfig, _> = serde_yaml::from_str("stubs: []");
        assert!(result.is_err());
    }

    #[test]
    fn test_record_mode_rejected() {
        let config: MockerConfig = serde_yaml::from_str("mode: record").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_folder_requires_single_folder_policy() {
        let config: MockerConfig = serde_yaml::from_str(
            "scenarios:\n  policy: server_specific\n  folder: flat\n",
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_and_build() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mocker.yaml");
        std::fs::write(
            &path,
            format!("mode: enabled\nscenarios:\n  root: {}\n", dir.path().display()),
        )
        .unwrap();

        let config = MockerConfig::from_file(&path).unwrap();
        let interceptor = config.build_interceptor().unwrap();
        assert_eq!(interceptor.mode(), Mode::Enabled);
    }
}
