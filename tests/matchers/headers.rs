use crate::utils::request_with_body;
use bytes::Bytes;
use httpmock_adapter::{Matcher, RequestView, TransportOptions};

fn view_with_headers(headers: &[(&str, &str)]) -> RequestView {
    let req = request_with_body("GET", "http://www.test.com/path", headers, Bytes::new());
    RequestView::new(req, TransportOptions::default())
}

#[test]
fn required_headers_test() {
    let _ = env_logger::try_init();

    let matcher = Matcher::builder("GET", "/path")
        .request_header("A", "abc")
        .request_header("Content-Type", "application/json")
        .build()
        .unwrap();

    assert!(matcher.matches(&view_with_headers(&[
        ("a", "abc"),
        ("content-type", "application/json"),
    ])));

    // Headers the matcher does not mention are ignored.
    assert!(matcher.matches(&view_with_headers(&[
        ("A", "abc"),
        ("Content-Type", "application/json"),
        ("X-Other", "value"),
    ])));

    // Missing header
    assert!(!matcher.matches(&view_with_headers(&[("A", "abc")])));

    // Different value
    assert!(!matcher.matches(&view_with_headers(&[
        ("A", "ABC"),
        ("Content-Type", "application/json"),
    ])));
}

#[test]
fn header_mismatches_test() {
    let matcher = Matcher::builder("GET", "/path")
        .request_header("A", "abc")
        .request_header("B", "def")
        .build()
        .unwrap();

    let mismatches = matcher.mismatches(&view_with_headers(&[("A", "xyz")]));

    assert_eq!(mismatches.len(), 2);
    assert_eq!(mismatches[0].title, "Request header does not match");
    assert_eq!(mismatches[0].actual.as_deref(), Some("xyz"));
    assert_eq!(mismatches[1].title, "Request header missing");
}
