//! Request interception.
//!
//! The interceptor sits between an HTTP client and the network. Depending on
//! its mode it forwards requests, answers them from the configured
//! scenarios, or forwards them and hands the exchange to a recorder.

use crate::error::{ConfigError, MockError};
use crate::loader::FileLoader;
use crate::mapper::Mapper;
use crate::matcher::RequestMatcher;
use crate::model::{HttpRequest, HttpResponse};
use crate::policy::{FilingPolicy, InMemoryPolicy, MirrorPathPolicy};
use crate::provider::{DynamicMockProvider, RequestCallback, ScenarioProvider, StaticMockProvider};
use crate::responder::MockResponder;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How the interceptor treats requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Every request goes to the network.
    #[default]
    Disabled,
    /// Every request is answered from scenarios, 404 when none matches.
    Enabled,
    /// Scenarios first, network when none matches.
    Mixed,
    /// Every request goes to the network and the exchange is recorded.
    Record,
}

impl Mode {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Mode::Enabled,
            2 => Mode::Mixed,
            3 => Mode::Record,
            _ => Mode::Disabled,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Mode::Disabled => 0,
            Mode::Enabled => 1,
            Mode::Mixed => 2,
            Mode::Record => 3,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Mode::Disabled => "disabled",
            Mode::Enabled => "enabled",
            Mode::Mixed => "in mixed mode",
            Mode::Record => "recording",
        };
        write!(f, "{label}")
    }
}

/// Current mode, readable and writable from any thread.
///
/// Last writer wins; a request reads the mode once.
#[derive(Debug, Default)]
pub struct ModeFlag(AtomicU8);

impl ModeFlag {
    pub fn new(mode: Mode) -> Self {
        Self(AtomicU8::new(mode.as_u8()))
    }

    pub fn get(&self) -> Mode {
        Mode::from_u8(self.0.load(Ordering::Relaxed))
    }

    pub fn set(&self, mode: Mode) {
        self.0.store(mode.as_u8(), Ordering::Relaxed);
    }
}

/// Continuation to the real network.
#[async_trait]
pub trait Chain: Send + Sync {
    async fn proceed(&self, request: &HttpRequest) -> Result<HttpResponse, MockError>;
}

/// Persists real exchanges when recording.
pub trait RequestRecorder: Send + Sync {
    fn record(&self, request: &HttpRequest, response: &HttpResponse) -> anyhow::Result<()>;
}

/// Mocking interceptor.
pub struct MockInterceptor {
    responder: MockResponder,
    recorder: Option<Arc<dyn RequestRecorder>>,
    mode: ModeFlag,
    fail_on_recording_error: bool,
    log_matches: bool,
    log_unmatched: bool,
    /// Total requests intercepted.
    requests_total: AtomicU64,
    /// Requests answered with a mocked response.
    requests_mocked: AtomicU64,
    /// Requests forwarded to the network.
    requests_forwarded: AtomicU64,
}

impl MockInterceptor {
    pub fn builder() -> InterceptorBuilder {
        InterceptorBuilder::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode.get()
    }

    /// Switch modes. Recording needs a recorder.
    pub fn set_mode(&self, mode: Mode) -> Result<(), ConfigError> {
        if mode == Mode::Record && self.recorder.is_none() {
            return Err(ConfigError::NoRecorder);
        }
        self.mode.set(mode);
        info!(mode = %mode, "Mock interceptor mode changed");
        Ok(())
    }

    /// Get total requests intercepted.
    pub fn total_requests(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    /// Get total requests answered with a mock.
    pub fn total_mocked(&self) -> u64 {
        self.requests_mocked.load(Ordering::Relaxed)
    }

    /// Get total requests sent to the network.
    pub fn total_forwarded(&self) -> u64 {
        self.requests_forwarded.load(Ordering::Relaxed)
    }

    /// Answer `request` according to the current mode.
    pub async fn intercept(
        &self,
        request: &HttpRequest,
        chain: &dyn Chain,
    ) -> Result<HttpResponse, MockError> {
        self.requests_total.fetch_add(1, Ordering::Relaxed);

        let mode = self.mode.get();
        debug!(request = %request, mode = %mode, "Intercepting request");

        match mode {
            Mode::Disabled => self.forward(request, chain).await,
            Mode::Enabled => {
                let response = self.responder.mock_response(request).await?;
                self.requests_mocked.fetch_add(1, Ordering::Relaxed);
                self.log_mocked(request, &response);
                Ok(response)
            }
            Mode::Mixed => match self.responder.mock_response_or_none(request).await? {
                Some(response) => {
                    self.requests_mocked.fetch_add(1, Ordering::Relaxed);
                    self.log_mocked(request, &response);
                    Ok(response)
                }
                None => {
                    if self.log_unmatched {
                        info!(request = %request, "No mock found, forwarding request");
                    }
                    self.forward(request, chain).await
                }
            },
            Mode::Record => self.record(request, chain).await,
        }
    }

    async fn forward(&self, request: &HttpRequest, chain: &dyn Chain) -> Result<HttpResponse, MockError> {
        self.requests_forwarded.fetch_add(1, Ordering::Relaxed);
        chain.proceed(request).await
    }

    async fn record(&self, request: &HttpRequest, chain: &dyn Chain) -> Result<HttpResponse, MockError> {
        let response = self.forward(request, chain).await?;
        let Some(recorder) = &self.recorder else {
            return Err(ConfigError::NoRecorder.into());
        };
        if let Err(e) = recorder.record(request, &response) {
            if self.fail_on_recording_error {
                return Err(MockError::Recording(e));
            }
            warn!(request = %request, error = %e, "Failed to record exchange");
        }
        Ok(response)
    }

    fn log_mocked(&self, request: &HttpRequest, response: &HttpResponse) {
        if self.log_matches {
            info!(request = %request, code = response.code, "Request mocked");
        }
    }
}

/// Assembles a `MockInterceptor`.
#[derive(Default)]
pub struct InterceptorBuilder {
    policies: Vec<Arc<dyn FilingPolicy>>,
    loader: Option<Arc<dyn FileLoader>>,
    mapper: Option<Arc<dyn Mapper>>,
    callbacks: Vec<Arc<dyn RequestCallback>>,
    recorder: Option<Arc<dyn RequestRecorder>>,
    delay: Duration,
    mode: Mode,
    fail_on_recording_error: bool,
    case_insensitive_headers: Option<bool>,
    log_matches: Option<bool>,
    log_unmatched: Option<bool>,
}

impl InterceptorBuilder {
    /// Add a filing policy. Each policy gets its own static provider, tried
    /// in the order they were added.
    pub fn decode_scenario_path_with(mut self, policy: impl FilingPolicy + 'static) -> Self {
        self.policies.push(Arc::new(policy));
        self
    }

    pub fn load_file_with(mut self, loader: impl FileLoader + 'static) -> Self {
        self.loader = Some(Arc::new(loader));
        self
    }

    pub fn parse_scenarios_with(mut self, mapper: impl Mapper + 'static) -> Self {
        self.mapper = Some(Arc::new(mapper));
        self
    }

    /// Add a callback. Dynamic mocks are consulted before scenario files.
    pub fn use_dynamic_mocks(mut self, callback: impl RequestCallback + 'static) -> Self {
        self.callbacks.push(Arc::new(callback));
        self
    }

    /// Serve the records registered on `policy`.
    pub fn use_in_memory(mut self, policy: Arc<InMemoryPolicy>) -> Self {
        self.mapper = Some(policy.mapper());
        self.loader = Some(Arc::clone(&policy) as Arc<dyn FileLoader>);
        self.policies.push(policy);
        self
    }

    /// Default delay for responses that do not set their own.
    pub fn add_fake_network_delay(mut self, delay_ms: u64) -> Self {
        self.delay = Duration::from_millis(delay_ms);
        self
    }

    pub fn set_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn record_with(mut self, recorder: impl RequestRecorder + 'static) -> Self {
        self.recorder = Some(Arc::new(recorder));
        self
    }

    pub fn fail_on_recording_error(mut self, fail_on_error: bool) -> Self {
        self.fail_on_recording_error = fail_on_error;
        self
    }

    pub fn case_insensitive_headers(mut self, enabled: bool) -> Self {
        self.case_insensitive_headers = Some(enabled);
        self
    }

    pub fn log_matches(mut self, enabled: bool) -> Self {
        self.log_matches = Some(enabled);
        self
    }

    pub fn log_unmatched(mut self, enabled: bool) -> Self {
        self.log_unmatched = Some(enabled);
        self
    }

    pub fn build(self) -> Result<MockInterceptor, ConfigError> {
        if self.mode == Mode::Record && self.recorder.is_none() {
            return Err(ConfigError::NoRecorder);
        }

        let matcher = RequestMatcher::new(self.case_insensitive_headers.unwrap_or(true));
        let mut providers: Vec<Arc<dyn ScenarioProvider>> = Vec::new();
        if !self.callbacks.is_empty() {
            providers.push(Arc::new(DynamicMockProvider::new(self.callbacks)));
        }

        let static_configured =
            !self.policies.is_empty() || self.loader.is_some() || self.mapper.is_some();
        if static_configured {
            let loader = self.loader.ok_or(ConfigError::NoLoader)?;
            let mapper = self.mapper.ok_or(ConfigError::NoMapper)?;
            let mut policies = self.policies;
            if policies.is_empty() {
                policies.push(Arc::new(MirrorPathPolicy::new(mapper.supported_format())));
            }
            for policy in policies {
                providers.push(Arc::new(StaticMockProvider::new(
                    policy,
                    Arc::clone(&loader),
                    Arc::clone(&mapper),
                    matcher,
                )));
            }
        }

        info!(
            providers = providers.len(),
            mode = %self.mode,
            delay_ms = self.delay.as_millis() as u64,
            "Mock interceptor initialized"
        );

        Ok(MockInterceptor {
            responder: MockResponder::new(providers, self.delay),
            recorder: self.recorder,
            mode: ModeFlag::new(self.mode),
            fail_on_recording_error: self.fail_on_recording_error,
            log_matches: self.log_matches.unwrap_or(true),
            log_unmatched: self.log_unmatched.unwrap_or(true),
            requests_total: AtomicU64::new(0),
            requests_mocked: AtomicU64::new(0),
            requests_forwarded: AtomicU64::new(0),
        })
    }
}
