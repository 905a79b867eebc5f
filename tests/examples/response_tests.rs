use crate::utils::send;
use http::HeaderValue;
use httpmock_adapter::{
    Adapter, Context, Error, RawResponse, RequestView, Response, ResponseSpec,
};
use serde_json::{json, Value};
use std::io::Cursor;

#[test]
fn content_test() {
    // Arrange
    let _ = env_logger::try_init();
    let adapter = Adapter::new();
    adapter
        .register_uri("GET", "http://www.test.com/", |m| {
            m.content(b"data".to_vec()).header("X-Test", "value")
        })
        .unwrap();

    // Act
    let res = send(&adapter, "GET", "http://www.test.com/").unwrap();

    // Assert
    assert_eq!(res.content().as_ref(), b"data");
    assert_eq!(res.headers().get("x-test").unwrap(), "value");
    assert_eq!(res.encoding(), None);
}

#[test]
fn text_test() {
    let adapter = Adapter::new();
    adapter
        .register_uri("GET", "http://www.test.com/", |m| m.text("Ünïcödé"))
        .unwrap();

    let res = send(&adapter, "GET", "http://www.test.com/").unwrap();

    assert_eq!(res.text(), "Ünïcödé");
    assert_eq!(res.content().as_ref(), "Ünïcödé".as_bytes());
    assert_eq!(res.encoding(), Some("utf-8"));
}

#[test]
fn json_round_trip_test() {
    let adapter = Adapter::new();
    adapter
        .register_uri("GET", "http://www.test.com/", |m| m.json(json!({"a": 1})))
        .unwrap();

    let res = send(&adapter, "GET", "http://www.test.com/").unwrap();

    assert_eq!(res.text(), r#"{"a": 1}"#);
    assert_eq!(res.json::<Value>().unwrap(), json!({"a": 1}));
    assert_eq!(res.encoding(), Some("utf-8"));
}

#[test]
fn body_reader_is_drained_once_test() {
    let adapter = Adapter::new();
    adapter
        .register_uri("GET", "http://www.test.com/", |m| {
            m.body(Cursor::new(b"streamed".to_vec()))
        })
        .unwrap();

    let first = send(&adapter, "GET", "http://www.test.com/").unwrap();
    let second = send(&adapter, "GET", "http://www.test.com/").unwrap();

    assert_eq!(first.content().as_ref(), b"streamed");
    assert!(second.content().is_empty());
}

#[test]
fn body_callback_creates_reader_per_response_test() {
    // Arrange
    let adapter = Adapter::new();
    adapter
        .register_uri("GET", "http://www.test.com/", |m| {
            m.body_with(|req: &RequestView, ctx: &mut Context| {
                ctx.status_code = 202;
                Cursor::new(format!("streamed {}", req.path()).into_bytes())
            })
        })
        .unwrap();

    // Act
    let first = send(&adapter, "GET", "http://www.test.com/").unwrap();
    let second = send(&adapter, "GET", "http://www.test.com/").unwrap();

    // Assert
    assert_eq!(first.status_code(), 202);
    assert_eq!(first.text(), "streamed /");
    assert_eq!(second.text(), "streamed /");
}

#[test]
fn raw_response_test() {
    let adapter = Adapter::new();
    let mut raw = RawResponse::new(418, "short and stout");
    raw.reason = Some("I'm a teapot".to_string());
    adapter
        .register_uri("GET", "http://www.test.com/", |m| m.raw(raw.clone()))
        .unwrap();

    let res = send(&adapter, "GET", "http://www.test.com/").unwrap();

    assert_eq!(res.status_code(), 418);
    assert_eq!(res.reason(), Some("I'm a teapot"));
    assert_eq!(res.raw(), &raw);
}

#[test]
fn no_body_test() {
    let adapter = Adapter::new();
    adapter
        .register_uri("GET", "http://www.test.com/", |m| m)
        .unwrap();

    let res = send(&adapter, "GET", "http://www.test.com/").unwrap();

    assert_eq!(res.status_code(), 200);
    assert!(res.content().is_empty());
    assert_eq!(res.text(), "");
}

#[test]
fn empty_string_return_test() {
    let adapter = Adapter::new();
    adapter
        .register_uri("GET", "http://www.test.com/", |m| m.text(""))
        .unwrap();

    let res = send(&adapter, "GET", "http://www.test.com/").unwrap();

    assert_eq!(res.text(), "");
    assert_eq!(res.encoding(), Some("utf-8"));
}

#[test]
fn callbacks_test() {
    // Arrange
    let adapter = Adapter::new();
    adapter
        .register_uri("GET", "http://www.test.com/", |m| {
            m.status_code(202)
                .header("X-Static", "1")
                .text_with(|req: &RequestView, ctx: &mut Context| {
                    ctx.status_code = 201;
                    ctx.reason = Some("Made".to_string());
                    ctx.headers
                        .insert("x-dynamic", HeaderValue::from_static("2"));
                    format!("you asked for {}", req.path())
                })
        })
        .unwrap();

    // Act
    let res = send(&adapter, "GET", "http://www.test.com/").unwrap();

    // Assert
    assert_eq!(res.status_code(), 201);
    assert_eq!(res.reason(), Some("Made"));
    assert_eq!(res.headers().get("x-static").unwrap(), "1");
    assert_eq!(res.headers().get("x-dynamic").unwrap(), "2");
    assert_eq!(res.text(), "you asked for /");
}

#[test]
fn callback_context_is_fresh_per_response_test() {
    let adapter = Adapter::new();
    adapter
        .register_uri("GET", "http://www.test.com/", |m| {
            m.header("X-Count", "0")
                .json_with(|_: &RequestView, ctx: &mut Context| {
                    let seen = ctx.headers.len();
                    ctx.headers.append("x-count", HeaderValue::from_static("1"));
                    json!({"headers_seen": seen})
                })
        })
        .unwrap();

    let first = send(&adapter, "GET", "http://www.test.com/").unwrap();
    let second = send(&adapter, "GET", "http://www.test.com/").unwrap();

    assert_eq!(first.json::<Value>().unwrap(), json!({"headers_seen": 1}));
    assert_eq!(second.json::<Value>().unwrap(), json!({"headers_seen": 1}));
    assert_eq!(second.headers().get_all("x-count").iter().count(), 2);
}

#[test]
fn content_callback_test() {
    let adapter = Adapter::new();
    adapter
        .register_uri("POST", "http://www.test.com/echo", |m| {
            m.content_with(|req: &RequestView, _: &mut Context| req.body().to_vec())
        })
        .unwrap();

    let req = crate::utils::request_with_body("POST", "http://www.test.com/echo", &[], "ping");
    let res = adapter.send(req, Default::default()).unwrap();

    assert_eq!(res.content().as_ref(), b"ping");
    assert_eq!(res.encoding(), None);
}

#[test]
fn multiple_responses_test() {
    // Arrange
    let adapter = Adapter::new();
    adapter
        .register_uri("GET", "http://www.test.com/", |m| {
            m.response(ResponseSpec::builder().status_code(400).text("first"))
                .response(ResponseSpec::builder().status_code(300).text("second"))
                .response(ResponseSpec::builder().status_code(200).text("third"))
        })
        .unwrap();

    // Act
    let responses: Vec<(u16, String)> = (0..5)
        .map(|_| {
            let res = send(&adapter, "GET", "http://www.test.com/").unwrap();
            (res.status_code(), res.text().to_string())
        })
        .collect();

    // Assert
    assert_eq!(
        responses,
        vec![
            (400, "first".to_string()),
            (300, "second".to_string()),
            (200, "third".to_string()),
            (200, "third".to_string()),
            (200, "third".to_string()),
        ]
    );
}

#[test]
fn response_list_and_inline_arguments_fail_test() {
    let adapter = Adapter::new();

    let err = adapter
        .register_uri("GET", "http://www.test.com/", |m| {
            m.response(ResponseSpec::builder().text("a")).status_code(200)
        })
        .unwrap_err();

    assert!(matches!(err, Error::ResponseListAndInline));
    assert_eq!(
        err.to_string(),
        "You should specify either a list of responses OR response arguments. Not both."
    );
}

#[test]
fn multiple_body_elements_fail_test() {
    let adapter = Adapter::new();

    let err = adapter
        .register_uri("GET", "http://www.test.com/", |m| {
            m.json(json!({"a": 1})).text("a")
        })
        .unwrap_err();

    assert!(matches!(err, Error::MultipleBodySources(_)));

    let err = Response::builder()
        .content(b"a")
        .text("b")
        .build()
        .unwrap_err();

    assert!(matches!(err, Error::MultipleBodySources(ref names) if names == "content, text"));
}

#[derive(Debug)]
struct ConnectionRefused;

impl std::fmt::Display for ConnectionRefused {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "connection refused")
    }
}

impl std::error::Error for ConnectionRefused {}

#[test]
fn raises_exception_test() {
    // Arrange
    let adapter = Adapter::new();
    let matcher = adapter
        .register_uri("GET", "http://www.test.com/", |m| m.exc(ConnectionRefused))
        .unwrap();

    // Act
    let err = send(&adapter, "GET", "http://www.test.com/").unwrap_err();

    // Assert
    match &err {
        Error::Raised(raised) => assert!(raised.downcast_ref::<ConnectionRefused>().is_some()),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(err.to_string(), "connection refused");

    let last = adapter.last_request().unwrap();
    assert_eq!(last.matcher(), Some(matcher.clone()));
    matcher.assert_call_count(1);
}

#[test]
fn raises_exception_with_body_args_fails_test() {
    let adapter = Adapter::new();

    let err = adapter
        .register_uri("GET", "http://www.test.com/", |m| {
            m.exc(ConnectionRefused).text("body")
        })
        .unwrap_err();

    assert!(matches!(err, Error::MultipleBodySources(_)));
}
