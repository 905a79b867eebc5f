//! `httpmock-adapter` replaces the network behind an HTTP client with a table of
//! user-defined responses. Tests declare, per method and URL pattern, what a call should
//! return and afterwards inspect what was actually sent.
//!
//! The crate has four layers:
//!
//! * a **request view** ([RequestView]) exposing the parsed parts of an outgoing request,
//! * a **response builder** ([Response::builder], [ResponseSpec]) describing what to return,
//! * **matchers** ([Matcher]) pairing a method, URL, header and predicate pattern with a
//!   list of responses, and
//! * a **registry** ([Adapter]) that implements the client's [Transport] trait by asking its
//!   matchers, the most recently registered first.
//!
//! [Mocker] and [Session] put adapters on a per-thread stack so that nested mockers can
//! pass unhandled requests on to the next layer.
//!
//! # Getting Started
//! ```rust
//! use httpmock_adapter::prelude::*;
//! use bytes::Bytes;
//! use serde_json::json;
//!
//! // Arrange
//! let adapter = Adapter::new();
//! let matcher = adapter
//!     .register_uri("GET", "http://www.test.com/search?q=rust", |m| {
//!         m.json(json!({"hits": 3}))
//!     })
//!     .unwrap();
//!
//! // Act
//! let req = http::Request::get("http://www.test.com/search?q=rust&page=2")
//!     .body(Bytes::new())
//!     .unwrap();
//! let res = adapter.send(req, TransportOptions::default()).unwrap();
//!
//! // Assert
//! assert_eq!(res.status_code(), 200);
//! assert_eq!(res.text(), r#"{"hits": 3}"#);
//! assert_eq!(adapter.last_request().unwrap().matcher(), Some(matcher.clone()));
//! matcher.assert_call_count(1);
//! ```
//!
//! # Matching
//! A request is handled by a matcher if all of the following hold:
//!
//! * the method is equal, ignoring case, or the matcher accepts [ANY] method,
//! * the URL matches: [ANY] URL, a [Regex] that is found anywhere in the URL, or a literal URL
//!   whose scheme and host (if given), path and query parameters are present in the request.
//!   With `complete_qs` the query must not contain any other parameters,
//! * every required header is present with an equal value,
//! * the `additional_matcher` predicate, if any, returns `true`.
//!
//! URLs are compared lower-cased unless the adapter or matcher is case sensitive.
//!
//! # Responses
//! A matcher with several responses returns them one after another and then keeps returning
//! the last one. Response bodies can be computed from the request with callbacks such as
//! [ResponseSpecBuilder::text_with], which can also change status code and headers through
//! the [Context].
//!
//! # Threads
//! Adapters, matchers and mockers are built on `Rc` and `RefCell`. They are meant to be used
//! from the thread that created them and the compiler enforces this.
mod api;
mod common;
mod server;

pub use api::*;
pub use common::{
    data::{AdapterConfig, ClientCert, Error, Timeout, TransportOptions, Verify},
    request::{parse_query, QueryParams, RequestField, RequestView, UrlParts},
    util::clone_request,
};
pub use http::Method;
pub use regex::Regex;
pub use server::{
    matchers::Mismatch,
    response::{FakeConnection, IntoContent, RawResponse, Response, ResponseBuilder},
};

pub mod prelude {
    #[doc(no_inline)]
    pub use crate::{
        Adapter, Context, Error, Matcher, Mocker, RequestView, Response, ResponseSpec, Session,
        Transport, TransportOptions, ANY,
    };
}
