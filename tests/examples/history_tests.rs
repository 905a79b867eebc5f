use crate::utils::send;
use httpmock_adapter::{Adapter, Error, Matcher};
use std::rc::Rc;

#[test]
fn no_last_request_test() {
    let adapter = Adapter::new();

    assert!(adapter.last_request().is_none());
    assert!(adapter.request_history().is_empty());
    assert!(!adapter.called());
    assert_eq!(adapter.call_count(), 0);
}

#[test]
fn requests_in_history_on_no_match_test() {
    // Arrange
    let _ = env_logger::try_init();
    let adapter = Adapter::new();
    adapter
        .register_uri("GET", "http://www.test.com/known", |m| m.text("known"))
        .unwrap();

    // Act
    let err = send(&adapter, "GET", "http://www.test.com/unknown").unwrap_err();

    // Assert
    let unmatched = err.unmatched_request().unwrap();
    assert_eq!(unmatched.url(), "http://www.test.com/unknown");
    assert_eq!(
        err.to_string(),
        "No mock address: GET http://www.test.com/unknown"
    );

    let last = adapter.last_request().unwrap();
    assert!(Rc::ptr_eq(&last, unmatched));
    assert!(last.matcher().is_none());
    assert_eq!(adapter.call_count(), 1);
}

#[test]
fn requests_in_history_on_exception_test() {
    // Arrange
    let adapter = Adapter::new();
    let matcher = adapter
        .register_uri("GET", "http://www.test.com/", |m| {
            m.exc(std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out"))
        })
        .unwrap();

    // Act
    let err = send(&adapter, "GET", "http://www.test.com/").unwrap_err();

    // Assert
    assert!(matches!(err, Error::Raised(_)));
    assert_eq!(adapter.call_count(), 1);
    assert_eq!(matcher.call_count(), 1);
    assert_eq!(adapter.last_request().unwrap().url(), "http://www.test.com/");
    assert_eq!(adapter.last_request().unwrap().matcher(), Some(matcher));
}

#[test]
fn not_called_and_called_count_test() {
    let adapter = Adapter::new();
    let matcher = adapter
        .register_uri("GET", "http://www.test.com/", |m| m.text("resp"))
        .unwrap();

    assert!(!matcher.called());
    assert_eq!(matcher.call_count(), 0);
    assert!(matcher.last_request().is_none());
    assert!(matcher.request_history().is_empty());
}

#[test]
fn called_and_called_count_test() {
    // Arrange
    let adapter = Adapter::new();
    let matcher = adapter
        .register_uri("GET", "http://www.test.com/", |m| m.text("resp"))
        .unwrap();

    // Act
    for path in ["/?a=1", "/?a=2", "/?a=3"] {
        send(&adapter, "GET", &format!("http://www.test.com{}", path)).unwrap();
    }
    send(&adapter, "GET", "http://www.test.com/other").unwrap_err();

    // Assert
    assert!(matcher.called());
    assert_eq!(matcher.call_count(), 3);
    assert_eq!(adapter.call_count(), 4);

    let urls: Vec<String> = matcher
        .request_history()
        .iter()
        .map(|req| req.url().to_string())
        .collect();
    assert_eq!(
        urls,
        vec![
            "http://www.test.com/?a=1",
            "http://www.test.com/?a=2",
            "http://www.test.com/?a=3",
        ]
    );
    assert_eq!(matcher.last_request().unwrap().qs()["a"], vec!["3"]);
}

#[test]
fn sets_request_matcher_in_history_test() {
    // Arrange
    let adapter = Adapter::new();
    let first = adapter
        .register_uri("GET", "http://www.test.com/first", |m| m.text("1"))
        .unwrap();
    let second = adapter
        .register_uri("GET", "http://www.test.com/second", |m| m.text("2"))
        .unwrap();

    // Act
    send(&adapter, "GET", "http://www.test.com/first").unwrap();
    send(&adapter, "GET", "http://www.test.com/second").unwrap();
    send(&adapter, "GET", "http://www.test.com/third").unwrap_err();

    // Assert
    let history = adapter.request_history();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].matcher(), Some(first));
    assert_eq!(history[1].matcher(), Some(second));
    assert_eq!(history[2].matcher(), None);
}

#[test]
fn matcher_reference_does_not_keep_matcher_alive_test() {
    // Arrange
    let adapter = Adapter::new();
    let matcher = adapter
        .register_uri("GET", "http://www.test.com/", |m| m.text("resp"))
        .unwrap();
    send(&adapter, "GET", "http://www.test.com/").unwrap();
    let req = adapter.last_request().unwrap();
    assert!(req.matcher().is_some());

    // Act
    drop(adapter);
    assert!(req.matcher().is_some());
    drop(matcher);

    // Assert
    assert!(req.matcher().is_none());
    assert_eq!(req.url(), "http://www.test.com/");
}

#[test]
fn matcher_outside_adapter_is_not_consulted_test() {
    let adapter = Adapter::new();
    let matcher = Matcher::builder("GET", "http://www.test.com/")
        .text("resp")
        .build()
        .unwrap();

    send(&adapter, "GET", "http://www.test.com/").unwrap_err();

    assert!(!matcher.called());
    assert_eq!(adapter.call_count(), 1);
}
