use crate::utils::{request_with_body, send};
use httpmock_adapter::{Adapter, AdapterConfig, Error, TransportOptions};
use serde_json::{json, Value};

const DEFINITIONS: &str = r#"
method: GET
url: http://www.test.com/items?page=1
complete_qs: true
responses:
  - status_code: 400
    reason: Bad Request
  - json: {"items": [1, 2]}
    headers:
      X-Source: definitions
---
method: POST
url_regex: "^https?://www\\.test\\.com/upload$"
request_headers:
  X-Token: secret
status_code: 201
content: [104, 105]
"#;

#[test]
fn load_definitions_test() {
    // Arrange
    let _ = env_logger::try_init();
    let adapter = Adapter::new();

    // Act
    let matchers = adapter.load_definitions(DEFINITIONS).unwrap();

    let first = send(&adapter, "GET", "http://www.test.com/items?page=1").unwrap();
    let second = send(&adapter, "GET", "http://www.test.com/items?page=1").unwrap();
    let extra_qs = send(&adapter, "GET", "http://www.test.com/items?page=1&size=2");

    // Assert
    assert_eq!(matchers.len(), 2);

    assert_eq!(first.status_code(), 400);
    assert_eq!(first.reason(), Some("Bad Request"));
    assert_eq!(second.status_code(), 200);
    assert_eq!(second.json::<Value>().unwrap(), json!({"items": [1, 2]}));
    assert_eq!(second.headers()["x-source"], "definitions");
    assert!(matches!(extra_qs, Err(Error::NoMockAddress(_))));

    matchers[0].assert_call_count(2);
}

#[test]
fn definitions_request_headers_test() {
    // Arrange
    let adapter = Adapter::new();
    let matchers = adapter.load_definitions(DEFINITIONS).unwrap();
    let url = "http://www.test.com/upload";

    // Act
    let with_token = adapter
        .send(
            request_with_body("POST", url, &[("X-Token", "secret")], "data"),
            TransportOptions::default(),
        )
        .unwrap();
    let without_token = send(&adapter, "POST", url);

    // Assert
    assert_eq!(with_token.status_code(), 201);
    assert_eq!(with_token.content().as_ref(), b"hi");
    assert!(matches!(without_token, Err(Error::NoMockAddress(_))));
    matchers[1].assert_call_count(1);
}

#[test]
fn definitions_without_method_and_url_match_everything_test() {
    let adapter = Adapter::new();
    adapter.load_definitions("text: fallback\n").unwrap();

    let res = send(&adapter, "DELETE", "https://other.org/anything").unwrap();

    assert_eq!(res.text(), "fallback");
}

#[test]
fn invalid_definitions_register_nothing_test() {
    // Arrange
    let adapter = Adapter::new();
    let content = "url: http://www.test.com/\ntext: ok\n---\nurl: http://www.test.com/\nstatus: 200\n";

    // Act
    let err = adapter.load_definitions(content).unwrap_err();

    // Assert
    assert!(matches!(err, Error::UnexpectedArguments(_)));
    assert!(matches!(
        send(&adapter, "GET", "http://www.test.com/"),
        Err(Error::NoMockAddress(_))
    ));
}

#[test]
fn url_and_url_regex_together_are_rejected_test() {
    let adapter = Adapter::new();

    let err = adapter
        .load_definitions("url: http://www.test.com/\nurl_regex: \".*\"\n")
        .unwrap_err();

    assert!(matches!(err, Error::Definition(_)));
}

#[test]
fn malformed_yaml_is_rejected_test() {
    let adapter = Adapter::new();

    let err = adapter.load_definitions("url: [unclosed\n").unwrap_err();

    assert!(matches!(err, Error::Definition(_)));
}

#[test]
fn definitions_follow_adapter_case_sensitivity_test() {
    // Arrange
    let insensitive = Adapter::new();
    let sensitive = Adapter::with_config(AdapterConfig::new().case_sensitive(true));
    let content = "url: http://www.test.com/Path\ntext: found\n";
    insensitive.load_definitions(content).unwrap();
    sensitive.load_definitions(content).unwrap();

    // Act & Assert
    assert!(send(&insensitive, "GET", "http://www.test.com/path").is_ok());
    assert!(send(&sensitive, "GET", "http://www.test.com/Path").is_ok());
    assert!(matches!(
        send(&sensitive, "GET", "http://www.test.com/path"),
        Err(Error::NoMockAddress(_))
    ));
}
