use crate::{
    api::{adapter::Transport, Matcher, MatcherBuilder, MethodPattern, UrlPattern},
    common::{
        data::{AdapterConfig, Error, TransportOptions},
        request::RequestView,
    },
    server::{response::Response, state::RequestHistory},
};
use bytes::Bytes;
use std::{cell::RefCell, fmt, rc::Rc};

struct AdapterState {
    config: AdapterConfig,
    matchers: RefCell<Vec<Matcher>>,
    history: RequestHistory,
}

/// A fake transport that answers requests from registered matchers instead of the network.
///
/// Matchers are tried from the most recently registered to the oldest and the first one
/// that accepts a request produces the response. Every request sent through the adapter
/// is recorded, whether it was matched or not.
///
/// `Adapter` is a cheap handle: clones share the same matchers and history. It is meant to
/// be used from the thread that created it and is therefore neither `Send` nor `Sync`.
#[derive(Clone)]
pub struct Adapter {
    state: Rc<AdapterState>,
}

impl Adapter {
    pub fn new() -> Self {
        Self::with_config(AdapterConfig::default())
    }

    pub fn with_config(config: AdapterConfig) -> Self {
        Self {
            state: Rc::new(AdapterState {
                config,
                matchers: RefCell::new(Vec::new()),
                history: RequestHistory::default(),
            }),
        }
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.state.config
    }

    /// Registers a matcher for `method` and `url`. `spec` configures the matcher, e.g. its
    /// required headers and responses.
    pub fn register_uri<IntoMethod, IntoUrl, SpecFn>(
        &self,
        method: IntoMethod,
        url: IntoUrl,
        spec: SpecFn,
    ) -> Result<Matcher, Error>
    where
        IntoMethod: Into<MethodPattern>,
        IntoUrl: Into<UrlPattern>,
        SpecFn: FnOnce(MatcherBuilder) -> MatcherBuilder,
    {
        let matcher = spec(Matcher::builder(method, url)).build()?;

        self.add_matcher(matcher.clone());
        Ok(matcher)
    }

    /// Registers a matcher. It takes precedence over every matcher registered before.
    pub fn add_matcher(&self, matcher: Matcher) {
        tracing::debug!("Registering matcher with id={}", matcher.state.id);
        self.state.matchers.borrow_mut().push(matcher);
    }

    pub fn send(
        &self,
        request: http::Request<Bytes>,
        options: TransportOptions,
    ) -> Result<Response, Error> {
        let req = Rc::new(
            RequestView::new(request, options).case_sensitive(self.state.config.case_sensitive),
        );
        self.state.history.push(req.clone());

        // Matchers may register further matchers from inside a callback, so the list must
        // not stay borrowed while they run.
        let matchers = self.state.matchers.borrow().clone();

        for matcher in matchers.iter().rev() {
            if let Some(result) = matcher.respond(&req) {
                return result.map(|mut res| {
                    res.set_connection(Rc::new(self.clone()));
                    res
                });
            }
        }

        tracing::debug!(
            "No matcher found for request {} {}",
            req.method(),
            req.url()
        );
        Err(Error::NoMockAddress(req))
    }

    pub fn last_request(&self) -> Option<Rc<RequestView>> {
        self.state.history.last()
    }

    /// All requests sent through this adapter, oldest first, matched or not.
    pub fn request_history(&self) -> Vec<Rc<RequestView>> {
        self.state.history.snapshot()
    }

    pub fn called(&self) -> bool {
        self.state.history.called()
    }

    pub fn call_count(&self) -> usize {
        self.state.history.call_count()
    }

    /// Registers one matcher per YAML document in `content`. Nothing is registered if
    /// any of the documents is invalid.
    ///
    /// ```yaml
    /// method: GET
    /// url: http://www.test.com/path?a=1
    /// complete_qs: true
    /// request_headers:
    ///   X-Token: secret
    /// responses:
    ///   - status_code: 400
    ///   - json: {"a": 1}
    /// ```
    #[cfg(feature = "definitions")]
    pub fn load_definitions(&self, content: &str) -> Result<Vec<Matcher>, Error> {
        let matchers = crate::server::persistence::deserialize_definitions(content)?
            .into_iter()
            .map(MatcherBuilder::build)
            .collect::<Result<Vec<_>, _>>()?;

        for matcher in &matchers {
            self.add_matcher(matcher.clone());
        }

        Ok(matchers)
    }
}

impl Default for Adapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for Adapter {
    fn send(
        &self,
        request: http::Request<Bytes>,
        options: TransportOptions,
    ) -> Result<Response, Error> {
        Adapter::send(self, request, options)
    }
}

impl fmt::Debug for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapter")
            .field("config", &self.state.config)
            .field("matchers", &self.state.matchers.borrow())
            .field("call_count", &self.call_count())
            .finish()
    }
}
