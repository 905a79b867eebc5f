use crate::{
    api::{MatcherBuilder, MethodPattern, UrlPattern},
    common::{data::Error, request::RequestView},
    server::{matchers::Mismatch, response::Response, state::MatcherState},
};
use std::{fmt, rc::Rc};

/// A handle to one registered rule: the requests it accepts, the responses it returns and
/// the requests it has handled so far.
///
/// Cloning the handle is cheap and all clones refer to the same matcher. Two handles are
/// equal if they refer to the same matcher.
///
/// # Example
/// ```
/// use httpmock_adapter::{Adapter, TransportOptions};
/// use bytes::Bytes;
///
/// let adapter = Adapter::new();
/// let matcher = adapter
///     .register_uri("GET", "http://www.test.com/", |m| m.status_code(204))
///     .unwrap();
///
/// let req = http::Request::get("http://www.test.com/").body(Bytes::new()).unwrap();
/// adapter.send(req, TransportOptions::default()).unwrap();
///
/// matcher.assert_call_count(1);
/// ```
#[derive(Clone)]
pub struct Matcher {
    pub(crate) state: Rc<MatcherState>,
}

impl Matcher {
    /// Starts describing a matcher that is not yet bound to any adapter. Register the
    /// result with [Adapter::add_matcher](crate::Adapter::add_matcher).
    pub fn builder<IntoMethod, IntoUrl>(method: IntoMethod, url: IntoUrl) -> MatcherBuilder
    where
        IntoMethod: Into<MethodPattern>,
        IntoUrl: Into<UrlPattern>,
    {
        MatcherBuilder::new(method.into(), url.into())
    }

    pub(crate) fn from_state(state: Rc<MatcherState>) -> Self {
        Self { state }
    }

    pub(crate) fn respond(&self, req: &Rc<RequestView>) -> Option<Result<Response, Error>> {
        self.state.respond(req)
    }

    /// Checks the request against this matcher without recording anything.
    pub fn matches(&self, req: &RequestView) -> bool {
        self.state.matches(req)
    }

    /// Lists every requirement the request does not satisfy. Empty if the request matches.
    pub fn mismatches(&self, req: &RequestView) -> Vec<Mismatch> {
        self.state.mismatches(req)
    }

    pub fn call_count(&self) -> usize {
        self.state.history.call_count()
    }

    pub fn called(&self) -> bool {
        self.state.history.called()
    }

    pub fn last_request(&self) -> Option<Rc<RequestView>> {
        self.state.history.last()
    }

    /// All requests handled by this matcher, oldest first.
    pub fn request_history(&self) -> Vec<Rc<RequestView>> {
        self.state.history.snapshot()
    }

    /// Panics if this matcher did not handle exactly `count` requests.
    #[track_caller]
    pub fn assert_call_count(&self, count: usize) {
        let actual = self.call_count();
        if actual != count {
            panic!(
                "The number of matching requests was not as expected for matcher with id={} \
                 ({} {}). Expected: {}, actual: {}.",
                self.state.id,
                self.state.requirements.method,
                self.state.requirements.url,
                count,
                actual
            );
        }
    }
}

impl PartialEq for Matcher {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl Eq for Matcher {}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matcher")
            .field("id", &self.state.id)
            .field("method", &self.state.requirements.method)
            .field("url", &self.state.requirements.url.to_string())
            .field("call_count", &self.call_count())
            .finish()
    }
}
