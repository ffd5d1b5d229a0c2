//! HTTP Mocker
//!
//! A scenario-based HTTP mocking engine. An interceptor placed in front of
//! an HTTP client answers requests from scenario files, programmatic
//! callbacks or in-memory records instead of the network.
//!
//! # Features
//!
//! - **Filing Policies**: Map a request to the scenario file describing it
//! - **Request Matching**: Match by protocol, method, host, port, path,
//!   headers, query params and a body regex; first match in file order wins
//! - **Dynamic Mocks**: Compute responses with callbacks
//! - **Latency Simulation**: Per-response or default delay
//! - **Error Simulation**: Raise network failures from scenarios
//! - **Modes**: Disabled, enabled, mixed (fall back to the network), record
//!
//! # Example Scenario
//!
//! ```json
//! [
//!   {
//!     "request": { "method": "GET", "params": { "id": "1" } },
//!     "response": {
//!       "code": 200,
//!       "media-type": "application/json",
//!       "headers": { "Cache-Control": "no-cache" },
//!       "body-file": "bodies/user_1.json"
//!     }
//!   },
//!   {
//!     "request": { "method": "GET" },
//!     "error": { "exception-type": "java.net.SocketTimeoutException", "message": "timeout" }
//!   }
//! ]
//! ```

pub mod config;
pub mod converter;
pub mod error;
pub mod interceptor;
pub mod loader;
pub mod mapper;
pub mod matcher;
pub mod model;
pub mod policy;
pub mod provider;
pub mod responder;

pub use config::MockerConfig;
pub use converter::JsonFormatConverter;
pub use error::{ConfigError, ConverterError, MapperError, MockError, ScenarioError};
pub use interceptor::{Chain, InterceptorBuilder, MockInterceptor, Mode, RequestRecorder};
pub use loader::{DirectoryLoader, FileLoader};
pub use mapper::{JsonMapper, Mapper, YamlMapper};
pub use matcher::RequestMatcher;
pub use model::{
    Header, HttpRequest, HttpResponse, Matcher, NamedParameter, NetworkError, RequestResult,
    RequestTemplate, ResponseDescriptor,
};
pub use policy::{FilingPolicy, InMemoryPolicy, MirrorPathPolicy, ServerSpecificPolicy, SingleFolderPolicy};
pub use provider::{DynamicMockProvider, RequestCallback, ScenarioProvider, StaticMockProvider};
pub use responder::{MockResponder, SimulatedError};
