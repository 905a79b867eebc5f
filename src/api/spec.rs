use crate::{
    api::Matcher,
    common::{data::Error, request::RequestView},
    server::{
        response::{
            check_body_sources, to_header, IntoContent, RawResponse, Response, ResponseBody,
            DEFAULT_STATUS,
        },
        state::{MatcherState, RequestRequirements, UrlRequirement},
    },
};
use bytes::Bytes;
use http::HeaderMap;
use regex::Regex;
use serde_json::Value;
use std::{cell::RefCell, fmt, io, io::Read, rc::Rc, sync::Arc};

// ************************************************************************************************
// Patterns
// ************************************************************************************************
/// Matches any method or any URL. Use the [ANY] constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Any;

/// Wildcard for [Matcher::builder] and [Adapter::register_uri](crate::Adapter::register_uri).
pub const ANY: Any = Any;

/// The HTTP method a matcher accepts. Methods are compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodPattern {
    Any,
    Exact(String),
}

impl From<Any> for MethodPattern {
    fn from(_: Any) -> Self {
        MethodPattern::Any
    }
}

impl From<&str> for MethodPattern {
    fn from(value: &str) -> Self {
        MethodPattern::Exact(value.to_string())
    }
}

impl From<String> for MethodPattern {
    fn from(value: String) -> Self {
        MethodPattern::Exact(value)
    }
}

impl From<http::Method> for MethodPattern {
    fn from(value: http::Method) -> Self {
        MethodPattern::Exact(value.as_str().to_string())
    }
}

impl From<&http::Method> for MethodPattern {
    fn from(value: &http::Method) -> Self {
        MethodPattern::Exact(value.as_str().to_string())
    }
}

impl fmt::Display for MethodPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodPattern::Any => write!(f, "ANY"),
            MethodPattern::Exact(method) => write!(f, "{}", method),
        }
    }
}

/// The URL a matcher accepts.
///
/// * `Any` accepts every URL.
/// * `Regex` accepts every URL the expression finds a match in.
/// * `Exact` is split into scheme, netloc, path and query. Scheme and netloc are only
///   compared if the pattern contains them, the path must be equal and the pattern's query
///   parameters must all be present in the request.
#[derive(Debug, Clone)]
pub enum UrlPattern {
    Any,
    Regex(Regex),
    Exact(String),
}

impl From<Any> for UrlPattern {
    fn from(_: Any) -> Self {
        UrlPattern::Any
    }
}

impl From<&str> for UrlPattern {
    fn from(value: &str) -> Self {
        UrlPattern::Exact(value.to_string())
    }
}

impl From<String> for UrlPattern {
    fn from(value: String) -> Self {
        UrlPattern::Exact(value)
    }
}

impl From<Regex> for UrlPattern {
    fn from(value: Regex) -> Self {
        UrlPattern::Regex(value)
    }
}

// ************************************************************************************************
// Context
// ************************************************************************************************
/// The mutable state handed to response callbacks.
///
/// A fresh context is created for every rendered response, seeded from the status code,
/// reason and headers of the [ResponseSpec]. Whatever a callback leaves in it ends up in
/// the response.
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    pub headers: HeaderMap,
    pub status_code: u16,
    pub reason: Option<String>,
}

type Callback<T> = Box<dyn Fn(&RequestView, &mut Context) -> T>;

enum Source<T> {
    Literal(T),
    Callback(Callback<T>),
}

impl<T: Clone> Source<T> {
    fn resolve(&self, req: &RequestView, context: &mut Context) -> T {
        match self {
            Source::Literal(value) => value.clone(),
            Source::Callback(f) => f(req, context),
        }
    }
}

enum SpecBody {
    Raw(RawResponse),
    // A reader can only be drained once. Later responses rendered from the same spec
    // get an empty body.
    Reader(RefCell<Option<Box<dyn Read>>>),
    ReaderWith(Callback<Box<dyn Read>>),
    Content(Source<Bytes>),
    Text(Source<String>),
    Json(Source<Value>),
    Exc(Arc<dyn std::error::Error + Send + Sync>),
}

// ************************************************************************************************
// ResponseSpec
// ************************************************************************************************
/// A declarative description of one response: status code, reason, headers and at most
/// one body source.
///
/// # Example
/// ```
/// use httpmock_adapter::ResponseSpec;
///
/// let spec = ResponseSpec::builder()
///     .status_code(201)
///     .header("Location", "/items/1")
///     .text("created")
///     .build()
///     .unwrap();
///
/// // A spec must not have more than one body.
/// let err = ResponseSpec::builder().text("a").content(b"b").build();
/// assert!(err.is_err());
/// ```
pub struct ResponseSpec {
    status_code: u16,
    reason: Option<String>,
    headers: HeaderMap,
    body: Option<SpecBody>,
}

impl ResponseSpec {
    pub fn builder() -> ResponseSpecBuilder {
        ResponseSpecBuilder::default()
    }

    pub(crate) fn render(&self, req: &RequestView) -> Result<Response, Error> {
        let mut context = Context {
            headers: self.headers.clone(),
            status_code: self.status_code,
            reason: self.reason.clone(),
        };

        let source = match &self.body {
            Some(SpecBody::Exc(err)) => return Err(Error::Raised(err.clone())),
            Some(SpecBody::Raw(raw)) => return Response::builder().raw(raw.clone()).build(),
            None => None,
            Some(SpecBody::Reader(reader)) => {
                let reader = reader
                    .borrow_mut()
                    .take()
                    .unwrap_or_else(|| Box::new(io::empty()));
                Some(ResponseBody::Reader(reader))
            }
            Some(SpecBody::ReaderWith(f)) => Some(ResponseBody::Reader(f(req, &mut context))),
            Some(SpecBody::Content(content)) => {
                Some(ResponseBody::Content(content.resolve(req, &mut context)))
            }
            Some(SpecBody::Text(text)) => Some(ResponseBody::Text(text.resolve(req, &mut context))),
            Some(SpecBody::Json(json)) => Some(ResponseBody::Json(json.resolve(req, &mut context))),
        };

        let mut builder = Response::builder()
            .status_code(context.status_code)
            .headers(context.headers);

        if let Some(reason) = context.reason {
            builder = builder.reason(reason);
        }

        if let Some(source) = source {
            builder = builder.source(source);
        }

        builder.build()
    }
}

impl fmt::Debug for ResponseSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = match &self.body {
            None => "none",
            Some(SpecBody::Raw(_)) => "raw",
            Some(SpecBody::Reader(_)) | Some(SpecBody::ReaderWith(_)) => "body",
            Some(SpecBody::Content(_)) => "content",
            Some(SpecBody::Text(_)) => "text",
            Some(SpecBody::Json(_)) => "json",
            Some(SpecBody::Exc(_)) => "exc",
        };

        f.debug_struct("ResponseSpec")
            .field("status_code", &self.status_code)
            .field("reason", &self.reason)
            .field("headers", &self.headers)
            .field("body", &body)
            .finish()
    }
}

// ************************************************************************************************
// ResponseSpecBuilder
// ************************************************************************************************
/// Builds a [ResponseSpec]. Nothing is validated before [build](ResponseSpecBuilder::build).
#[derive(Default)]
pub struct ResponseSpecBuilder {
    status_code: Option<u16>,
    reason: Option<String>,
    headers: Vec<(String, String)>,
    bodies: Vec<(&'static str, SpecBody)>,
}

impl ResponseSpecBuilder {
    /// Defaults to 200.
    pub fn status_code(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    pub fn reason<IntoString: Into<String>>(mut self, reason: IntoString) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn header<KeyString: Into<String>, ValueString: Into<String>>(
        mut self,
        name: KeyString,
        value: ValueString,
    ) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Returns this transport response unchanged. Status code, reason and headers of the
    /// spec are not applied to it.
    pub fn raw(mut self, raw: RawResponse) -> Self {
        self.bodies.push(("raw", SpecBody::Raw(raw)));
        self
    }

    /// Reads the body from `reader`. The reader is drained by the first response, so
    /// every further response rendered from this spec has an empty body.
    pub fn body<R: Read + 'static>(mut self, reader: R) -> Self {
        let reader: Box<dyn Read> = Box::new(reader);
        self.bodies
            .push(("body", SpecBody::Reader(RefCell::new(Some(reader)))));
        self
    }

    /// Creates a new reader for every response.
    pub fn body_with<R, F>(mut self, f: F) -> Self
    where
        R: Read + 'static,
        F: Fn(&RequestView, &mut Context) -> R + 'static,
    {
        let callback: Callback<Box<dyn Read>> =
            Box::new(move |req: &RequestView, ctx: &mut Context| {
                Box::new(f(req, ctx)) as Box<dyn Read>
            });
        self.bodies.push(("body", SpecBody::ReaderWith(callback)));
        self
    }

    pub fn content<C: IntoContent>(mut self, content: C) -> Self {
        let content = Source::Literal(content.into_content());
        self.bodies.push(("content", SpecBody::Content(content)));
        self
    }

    pub fn content_with<C, F>(mut self, f: F) -> Self
    where
        C: IntoContent,
        F: Fn(&RequestView, &mut Context) -> C + 'static,
    {
        let callback: Callback<Bytes> =
            Box::new(move |req: &RequestView, ctx: &mut Context| f(req, ctx).into_content());
        self.bodies
            .push(("content", SpecBody::Content(Source::Callback(callback))));
        self
    }

    pub fn text<IntoString: Into<String>>(mut self, text: IntoString) -> Self {
        let text = Source::Literal(text.into());
        self.bodies.push(("text", SpecBody::Text(text)));
        self
    }

    pub fn text_with<IntoString, F>(mut self, f: F) -> Self
    where
        IntoString: Into<String>,
        F: Fn(&RequestView, &mut Context) -> IntoString + 'static,
    {
        let callback: Callback<String> =
            Box::new(move |req: &RequestView, ctx: &mut Context| f(req, ctx).into());
        self.bodies
            .push(("text", SpecBody::Text(Source::Callback(callback))));
        self
    }

    /// Serializes `json` as the response body, e.g. `json!({"a": 1})` becomes `{"a": 1}`.
    pub fn json<IntoValue: Into<Value>>(mut self, json: IntoValue) -> Self {
        let json = Source::Literal(json.into());
        self.bodies.push(("json", SpecBody::Json(json)));
        self
    }

    pub fn json_with<IntoValue, F>(mut self, f: F) -> Self
    where
        IntoValue: Into<Value>,
        F: Fn(&RequestView, &mut Context) -> IntoValue + 'static,
    {
        let callback: Callback<Value> =
            Box::new(move |req: &RequestView, ctx: &mut Context| f(req, ctx).into());
        self.bodies
            .push(("json", SpecBody::Json(Source::Callback(callback))));
        self
    }

    /// Fails the request with `err` instead of responding. The error is handed to the
    /// caller as [Error::Raised] and can be recovered with `downcast_ref`.
    pub fn exc<E: std::error::Error + Send + Sync + 'static>(mut self, err: E) -> Self {
        self.bodies.push(("exc", SpecBody::Exc(Arc::new(err))));
        self
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.status_code.is_none()
            && self.reason.is_none()
            && self.headers.is_empty()
            && self.bodies.is_empty()
    }

    pub fn build(mut self) -> Result<ResponseSpec, Error> {
        let names: Vec<&str> = self.bodies.iter().map(|(name, _)| *name).collect();
        check_body_sources(&names)?;

        let body = self.bodies.pop().map(|(_, body)| body);

        if let Some(SpecBody::Exc(_)) = body {
            let unexpected: Vec<&str> = [
                ("status_code", self.status_code.is_some()),
                ("reason", self.reason.is_some()),
                ("headers", !self.headers.is_empty()),
            ]
            .iter()
            .filter(|(_, given)| *given)
            .map(|(name, _)| *name)
            .collect();

            if !unexpected.is_empty() {
                return Err(Error::UnexpectedArguments(unexpected.join(", ")));
            }
        }

        let mut headers = HeaderMap::new();
        for (name, value) in self.headers {
            let (name, value) = to_header(name, value)?;
            headers.append(name, value);
        }

        Ok(ResponseSpec {
            status_code: self.status_code.unwrap_or(DEFAULT_STATUS),
            reason: self.reason,
            headers,
            body,
        })
    }
}

// ************************************************************************************************
// MatcherBuilder
// ************************************************************************************************
/// Describes the requests a [Matcher] handles and the responses it returns.
///
/// Responses are either given as a list ([response](MatcherBuilder::response),
/// [responses](MatcherBuilder::responses)) or inline through the shortcut setters such as
/// [status_code](MatcherBuilder::status_code) and [text](MatcherBuilder::text). Using both
/// is an error.
///
/// # Example
/// ```
/// use httpmock_adapter::{Adapter, ResponseSpec};
///
/// let adapter = Adapter::new();
///
/// let matcher = adapter
///     .register_uri("GET", "http://www.test.com/path?a=1", |m| {
///         m.complete_qs(true)
///             .response(ResponseSpec::builder().status_code(400))
///             .response(ResponseSpec::builder().status_code(200))
///     })
///     .unwrap();
///
/// assert!(!matcher.called());
/// ```
pub struct MatcherBuilder {
    method: MethodPattern,
    url: UrlPattern,
    headers: Vec<(String, String)>,
    complete_qs: bool,
    additional_matcher: Option<Box<dyn Fn(&RequestView) -> bool>>,
    case_sensitive: Option<bool>,
    responses: Vec<ResponseSpecBuilder>,
    inline: ResponseSpecBuilder,
}

impl fmt::Debug for MatcherBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatcherBuilder")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("complete_qs", &self.complete_qs)
            .field("case_sensitive", &self.case_sensitive)
            .field("responses", &self.responses.len())
            .finish_non_exhaustive()
    }
}

impl MatcherBuilder {
    pub(crate) fn new(method: MethodPattern, url: UrlPattern) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            complete_qs: false,
            additional_matcher: None,
            case_sensitive: None,
            responses: Vec::new(),
            inline: ResponseSpecBuilder::default(),
        }
    }

    /// Requires the query string of the request to contain exactly the parameters of the
    /// URL pattern, no more.
    pub fn complete_qs(mut self, complete_qs: bool) -> Self {
        self.complete_qs = complete_qs;
        self
    }

    /// Requires the request to carry this header with exactly this value.
    pub fn request_header<KeyString: Into<String>, ValueString: Into<String>>(
        mut self,
        name: KeyString,
        value: ValueString,
    ) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Only handle requests for which `f` returns `true`. Runs after all other checks passed.
    pub fn additional_matcher<F: Fn(&RequestView) -> bool + 'static>(mut self, f: F) -> Self {
        self.additional_matcher = Some(Box::new(f));
        self
    }

    /// Compares the URL with its original case, or lower-cased with `false`. Unless this is
    /// called, the setting of the adapter a request is sent through applies.
    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = Some(case_sensitive);
        self
    }

    /// Appends a response to the list. Each listed response is returned once, in order,
    /// and the last one is repeated indefinitely.
    pub fn response(mut self, response: ResponseSpecBuilder) -> Self {
        self.responses.push(response);
        self
    }

    pub fn responses<I: IntoIterator<Item = ResponseSpecBuilder>>(mut self, responses: I) -> Self {
        self.responses.extend(responses);
        self
    }

    pub fn status_code(mut self, status: u16) -> Self {
        self.inline = self.inline.status_code(status);
        self
    }

    pub fn reason<IntoString: Into<String>>(mut self, reason: IntoString) -> Self {
        self.inline = self.inline.reason(reason);
        self
    }

    pub fn header<KeyString: Into<String>, ValueString: Into<String>>(
        mut self,
        name: KeyString,
        value: ValueString,
    ) -> Self {
        self.inline = self.inline.header(name, value);
        self
    }

    pub fn raw(mut self, raw: RawResponse) -> Self {
        self.inline = self.inline.raw(raw);
        self
    }

    pub fn body<R: Read + 'static>(mut self, reader: R) -> Self {
        self.inline = self.inline.body(reader);
        self
    }

    pub fn body_with<R, F>(mut self, f: F) -> Self
    where
        R: Read + 'static,
        F: Fn(&RequestView, &mut Context) -> R + 'static,
    {
        self.inline = self.inline.body_with(f);
        self
    }

    pub fn content<C: IntoContent>(mut self, content: C) -> Self {
        self.inline = self.inline.content(content);
        self
    }

    pub fn content_with<C, F>(mut self, f: F) -> Self
    where
        C: IntoContent,
        F: Fn(&RequestView, &mut Context) -> C + 'static,
    {
        self.inline = self.inline.content_with(f);
        self
    }

    pub fn text<IntoString: Into<String>>(mut self, text: IntoString) -> Self {
        self.inline = self.inline.text(text);
        self
    }

    pub fn text_with<IntoString, F>(mut self, f: F) -> Self
    where
        IntoString: Into<String>,
        F: Fn(&RequestView, &mut Context) -> IntoString + 'static,
    {
        self.inline = self.inline.text_with(f);
        self
    }

    pub fn json<IntoValue: Into<Value>>(mut self, json: IntoValue) -> Self {
        self.inline = self.inline.json(json);
        self
    }

    pub fn json_with<IntoValue, F>(mut self, f: F) -> Self
    where
        IntoValue: Into<Value>,
        F: Fn(&RequestView, &mut Context) -> IntoValue + 'static,
    {
        self.inline = self.inline.json_with(f);
        self
    }

    pub fn exc<E: std::error::Error + Send + Sync + 'static>(mut self, err: E) -> Self {
        self.inline = self.inline.exc(err);
        self
    }

    pub fn build(self) -> Result<Matcher, Error> {
        let responses = if self.responses.is_empty() {
            vec![self.inline.build()?]
        } else if !self.inline.is_empty() {
            return Err(Error::ResponseListAndInline);
        } else {
            self.responses
                .into_iter()
                .map(ResponseSpecBuilder::build)
                .collect::<Result<Vec<_>, _>>()?
        };

        let requirements = RequestRequirements {
            method: self.method,
            url: UrlRequirement::new(self.url),
            headers: self.headers,
            complete_qs: self.complete_qs,
            additional_matcher: self.additional_matcher,
            case_sensitive: self.case_sensitive,
        };

        let state = MatcherState::new(requirements, responses);
        tracing::debug!(
            "Created matcher with id={} for {} {} ({} response(s))",
            state.id,
            state.requirements.method,
            state.requirements.url,
            state.response_count()
        );

        Ok(Matcher::from_state(Rc::new(state)))
    }
}
