use crate::utils::{send, view};
use httpmock_adapter::{Adapter, Error, Matcher};

fn matches(target: &str, url: &str, complete_qs: bool) -> bool {
    let matcher = Matcher::builder("GET", target)
        .complete_qs(complete_qs)
        .build()
        .unwrap();
    matcher.matches(&view("GET", url))
}

#[test]
fn query_string_test() {
    let _ = env_logger::try_init();

    assert!(matches("/path?a=1&b=2", "http://www.test.com/path?a=1&b=2", false));
    assert!(matches("/path?a=1", "http://www.test.com/path?a=1&b=2", false));
    assert!(!matches("/path?a=1", "http://www.test.com/path?a=1&b=2", true));
    assert!(!matches("/path?a=1&b=2", "http://www.test.com/path?a=1", false));
    assert!(!matches("/path?a=1&b=2", "http://www.test.com/path?a=1", true));
}

#[test]
fn query_values_are_consumed_with_multiplicity_test() {
    assert!(matches("/path?a=1&a=1", "http://www.test.com/path?a=1&a=1", true));
    assert!(matches("/path?a=1", "http://www.test.com/path?a=1&a=1", false));
    assert!(!matches("/path?a=1", "http://www.test.com/path?a=1&a=1", true));
    assert!(!matches("/path?a=1&a=1", "http://www.test.com/path?a=1", false));
}

#[test]
fn query_order_does_not_matter_test() {
    assert!(matches("/path?b=2&a=1", "http://www.test.com/path?a=1&b=2", true));
    assert!(matches("/path?a=1&a=2", "http://www.test.com/path?a=2&a=1", true));
}

#[test]
fn query_values_are_compared_decoded_test() {
    assert!(matches("/path?a=x y", "http://www.test.com/path?a=x+y", true));
    assert!(matches("/path?a=x%20y", "http://www.test.com/path?a=x+y", true));
}

#[test]
fn query_is_compared_case_insensitively_by_default_test() {
    assert!(matches("/path?aBcDe=FgHiJ", "http://www.test.com/path?abcde=fghij", true));
}

#[test]
fn case_sensitive_query_test() {
    let matcher = Matcher::builder("GET", "/path?aBcDe=FgHiJ")
        .case_sensitive(true)
        .complete_qs(true)
        .build()
        .unwrap();

    let exact = view("GET", "http://www.test.com/path?aBcDe=FgHiJ").case_sensitive(true);
    let lower = view("GET", "http://www.test.com/path?abcde=fghij").case_sensitive(true);

    assert!(matcher.matches(&exact));
    assert!(!matcher.matches(&lower));
    assert_eq!(
        exact.qs().get("aBcDe"),
        Some(&vec!["FgHiJ".to_string()])
    );
    assert_eq!(exact.qs().get("abcde"), None);
}

#[test]
fn case_sensitive_query_on_default_adapter_test() {
    // Arrange
    let adapter = Adapter::new();
    adapter
        .register_uri("GET", "/path?aBcDe=FgHiJ", |m| {
            m.case_sensitive(true).complete_qs(true).text("exact")
        })
        .unwrap();

    // Act
    let exact = send(&adapter, "GET", "http://www.test.com/path?aBcDe=FgHiJ");
    let lower = send(&adapter, "GET", "http://www.test.com/path?abcde=fghij");

    // Assert
    assert_eq!(exact.unwrap().text(), "exact");
    assert!(matches!(lower, Err(Error::NoMockAddress(_))));

    // The adapter still records the request lower-cased.
    let history = adapter.request_history();
    assert_eq!(history[0].qs().get("abcde"), Some(&vec!["fghij".to_string()]));
}
