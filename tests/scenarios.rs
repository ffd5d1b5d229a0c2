//! End-to-end tests: scenario folders on disk served through the interceptor.

use async_trait::async_trait;
use http_mocker::{
    Chain, DirectoryLoader, HttpRequest, HttpResponse, JsonMapper, MockError, MockInterceptor,
    Mode, SingleFolderPolicy, YamlMapper,
};
use std::path::Path;
use tokio_test::{assert_err, assert_ok};

struct Network;

#[async_trait]
impl Chain for Network {
    async fn proceed(&self, _request: &HttpRequest) -> Result<HttpResponse, MockError> {
        Ok(HttpResponse {
            code: 200,
            message: "OK".to_string(),
            media_type: "text/html".to_string(),
            headers: Vec::new(),
            body: "from network".to_string(),
        })
    }
}

fn write(root: &Path, path: &str, content: &str) {
    let file = root.join(path);
    if let Some(parent) = file.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(file, content).unwrap();
}

fn interceptor(root: &Path, mode: Mode) -> MockInterceptor {
    MockInterceptor::builder()
        .load_file_with(DirectoryLoader::new(root))
        .parse_scenarios_with(JsonMapper::new())
        .set_mode(mode)
        .build()
        .unwrap()
}

fn request(method: &str, url: &str) -> HttpRequest {
    HttpRequest::parse(method, url).unwrap()
}

#[tokio::test]
async fn test_method_selects_record() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "api/items.json",
        r#"[
            {"request": {"method": "get"}, "response": {"body": "A"}},
            {"request": {"method": "POST"}, "response": {"body": "B", "code": 201}}
        ]"#,
    );
    let interceptor = interceptor(dir.path(), Mode::Enabled);

    let get = interceptor
        .intercept(&request("GET", "http://example.com/api/items"), &Network)
        .await
        .unwrap();
    assert_eq!(get.body, "A");

    let post = interceptor
        .intercept(&request("POST", "http://example.com/api/items"), &Network)
        .await
        .unwrap();
    assert_eq!(post.body, "B");
    assert_eq!(post.code, 201);
    assert_eq!(post.message, "Created");
}

#[tokio::test]
async fn test_missing_scenario_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let interceptor = interceptor(dir.path(), Mode::Enabled);

    let response = interceptor
        .intercept(&request("GET", "http://example.com/nothing/here"), &Network)
        .await
        .unwrap();
    assert_eq!(response.code, 404);
    assert_eq!(response.message, "Not Found");
    assert_eq!(response.body, "Page not found");
}

#[tokio::test]
async fn test_error_record_is_raised() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "fail.json",
        r#"[{"request": {}, "error": {"exception-type": "java.io.IOException", "message": "boom"}}]"#,
    );
    let interceptor = interceptor(dir.path(), Mode::Enabled);

    let result = interceptor
        .intercept(&request("GET", "http://example.com/fail"), &Network)
        .await;
    match assert_err!(result) {
        MockError::Simulated(error) => assert_eq!(error.message(), Some("boom")),
        other => panic!("Expected simulated error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_first_match_in_file_order() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "search.json",
        r#"[
            {"request": {"params": {"q": "rust"}}, "response": {"body": "first"}},
            {"request": {"params": {"q": "rust", "page": "2"}}, "response": {"body": "more specific"}}
        ]"#,
    );
    let interceptor = interceptor(dir.path(), Mode::Enabled);

    let response = interceptor
        .intercept(&request("GET", "http://example.com/search?q=rust&page=2"), &Network)
        .await
        .unwrap();
    assert_eq!(response.body, "first");
}

#[tokio::test]
async fn test_body_file_relative_to_scenario() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "a/b/c.json",
        r#"[{"request": {}, "response": {"media-type": "application/json", "body-file": "../d/e"}}]"#,
    );
    write(dir.path(), "a/d/e", r#"{"ok": true}"#);
    let interceptor = interceptor(dir.path(), Mode::Enabled);

    let response = interceptor
        .intercept(&request("GET", "http://example.com/a/b/c"), &Network)
        .await
        .unwrap();
    assert_eq!(response.body, r#"{"ok": true}"#);
    assert_eq!(response.media_type, "application/json");
}

#[tokio::test]
async fn test_mixed_and_disabled_modes() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "mocked.json", r#"[{"request": {}, "response": {"body": "mocked"}}]"#);

    let mixed = interceptor(dir.path(), Mode::Mixed);
    let response = assert_ok!(
        mixed
            .intercept(&request("GET", "http://example.com/mocked"), &Network)
            .await
    );
    assert_eq!(response.body, "mocked");
    let response = assert_ok!(
        mixed
            .intercept(&request("GET", "http://example.com/other"), &Network)
            .await
    );
    assert_eq!(response.body, "from network");

    let disabled = interceptor(dir.path(), Mode::Disabled);
    let response = assert_ok!(
        disabled
            .intercept(&request("GET", "http://example.com/mocked"), &Network)
            .await
    );
    assert_eq!(response.body, "from network");
}

#[tokio::test]
async fn test_header_absence_and_body_pattern() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "login.json",
        r#"[
            {"request": {"headers": {"Authorization": null}}, "response": {"code": 401}},
            {"request": {"body": ".*\"user\":\"admin\".*"}, "response": {"body": "welcome admin"}},
            {"request": {}, "response": {"body": "welcome"}}
        ]"#,
    );
    let interceptor = interceptor(dir.path(), Mode::Enabled);

    let anonymous = interceptor
        .intercept(&request("POST", "http://example.com/login"), &Network)
        .await
        .unwrap();
    assert_eq!(anonymous.code, 401);
    assert_eq!(anonymous.message, "Unauthorized");

    let admin = request("POST", "http://example.com/login")
        .with_header("authorization", "Bearer x")
        .with_body(r#"{"user":"admin"}"#);
    let response = interceptor.intercept(&admin, &Network).await.unwrap();
    assert_eq!(response.body, "welcome admin");

    let other = request("POST", "http://example.com/login")
        .with_header("Authorization", "Bearer y")
        .with_body(r#"{"user":"bob"}"#);
    let response = interceptor.intercept(&other, &Network).await.unwrap();
    assert_eq!(response.body, "welcome");
}

#[tokio::test]
async fn test_yaml_single_folder_layout() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "flat/users_list.yaml",
        "- request:\n    method: GET\n  response:\n    body: users\n",
    );
    let interceptor = MockInterceptor::builder()
        .decode_scenario_path_with(SingleFolderPolicy::with_extension("flat", "yaml"))
        .load_file_with(DirectoryLoader::new(dir.path()))
        .parse_scenarios_with(YamlMapper)
        .set_mode(Mode::Enabled)
        .build()
        .unwrap();

    let response = interceptor
        .intercept(&request("GET", "http://example.com/users/list"), &Network)
        .await
        .unwrap();
    assert_eq!(response.body, "users");
}

#[tokio::test]
async fn test_malformed_scenario_surfaces_diagnostic() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "broken.json", "[{");
    let interceptor = interceptor(dir.path(), Mode::Enabled);

    let response = interceptor
        .intercept(&request("GET", "http://example.com/broken"), &Network)
        .await
        .unwrap();
    assert_eq!(response.code, 404);
    assert!(response.body.starts_with("JsonParseError"));
}
