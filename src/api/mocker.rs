use crate::{
    api::{adapter::Transport, Adapter, Matcher, MatcherBuilder, MethodPattern, UrlPattern},
    common::{
        data::{AdapterConfig, Error, TransportOptions},
        request::RequestView,
        util::clone_request,
    },
    server::response::Response,
};
use bytes::Bytes;
use std::{
    cell::{Cell, RefCell},
    rc::Rc,
    sync::atomic::{AtomicUsize, Ordering},
};

static NEXT_MOCKER_ID: AtomicUsize = AtomicUsize::new(0);

#[derive(Clone)]
struct Layer {
    mocker_id: usize,
    adapter: Adapter,
    real_http: bool,
}

thread_local! {
    // Started mockers of this thread, innermost last.
    static ACTIVE: RefCell<Vec<Layer>> = const { RefCell::new(Vec::new()) };
}

// ************************************************************************************************
// Mocker
// ************************************************************************************************
/// Routes every [Session] of the current thread through an [Adapter] while started.
///
/// Mockers can be nested. The most recently started mocker sees a request first. If it has
/// no matcher for the request and allows real HTTP, the request is passed on to the mocker
/// started before it and finally to the session's real transport.
///
/// # Example
/// ```
/// use httpmock_adapter::{Mocker, Session, TransportOptions};
/// use bytes::Bytes;
///
/// let mocker = Mocker::new();
/// mocker.get("http://www.test.com/", |m| m.text("hello")).unwrap();
///
/// {
///     let _guard = mocker.start().unwrap();
///     let req = http::Request::get("http://www.test.com/").body(Bytes::new()).unwrap();
///     let res = Session::default().send(req, TransportOptions::default()).unwrap();
///     assert_eq!(res.text(), "hello");
/// }
///
/// assert_eq!(mocker.call_count(), 1);
/// ```
pub struct Mocker {
    id: usize,
    adapter: Adapter,
    real_http: bool,
    started: Cell<bool>,
}

impl Mocker {
    pub fn new() -> Self {
        Self {
            id: NEXT_MOCKER_ID.fetch_add(1, Ordering::Relaxed),
            adapter: Adapter::new(),
            real_http: false,
            started: Cell::new(false),
        }
    }

    /// Pass requests without a matching matcher on instead of failing them.
    pub fn real_http(mut self, real_http: bool) -> Self {
        self.real_http = real_http;
        self
    }

    /// Replaces the adapter of this mocker by one using `config`. Matchers registered
    /// before are dropped.
    pub fn config(mut self, config: AdapterConfig) -> Self {
        self.adapter = Adapter::with_config(config);
        self
    }

    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    pub fn is_started(&self) -> bool {
        self.started.get()
    }

    /// Activates this mocker until the returned guard is dropped or [stop](Mocker::stop)
    /// is called.
    pub fn start(&self) -> Result<MockerGuard<'_>, Error> {
        if self.started.get() {
            return Err(Error::AlreadyStarted);
        }

        ACTIVE.with(|active| {
            active.borrow_mut().push(Layer {
                mocker_id: self.id,
                adapter: self.adapter.clone(),
                real_http: self.real_http,
            })
        });
        self.started.set(true);

        tracing::debug!("Started mocker with id={}", self.id);
        Ok(MockerGuard { mocker: self })
    }

    /// Deactivates this mocker. Stopping a mocker that is not started does nothing.
    pub fn stop(&self) {
        if !self.started.replace(false) {
            return;
        }

        ACTIVE.with(|active| {
            active
                .borrow_mut()
                .retain(|layer| layer.mocker_id != self.id)
        });

        tracing::debug!("Stopped mocker with id={}", self.id);
    }

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
        self.adapter.register_uri(method, url, spec)
    }

    pub fn add_matcher(&self, matcher: Matcher) {
        self.adapter.add_matcher(matcher)
    }

    /// Same as [register_uri](Mocker::register_uri).
    pub fn request<IntoMethod, IntoUrl, SpecFn>(
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
        self.adapter.register_uri(method, url, spec)
    }

    pub fn get<IntoUrl, SpecFn>(&self, url: IntoUrl, spec: SpecFn) -> Result<Matcher, Error>
    where
        IntoUrl: Into<UrlPattern>,
        SpecFn: FnOnce(MatcherBuilder) -> MatcherBuilder,
    {
        self.request("GET", url, spec)
    }

    pub fn post<IntoUrl, SpecFn>(&self, url: IntoUrl, spec: SpecFn) -> Result<Matcher, Error>
    where
        IntoUrl: Into<UrlPattern>,
        SpecFn: FnOnce(MatcherBuilder) -> MatcherBuilder,
    {
        self.request("POST", url, spec)
    }

    pub fn put<IntoUrl, SpecFn>(&self, url: IntoUrl, spec: SpecFn) -> Result<Matcher, Error>
    where
        IntoUrl: Into<UrlPattern>,
        SpecFn: FnOnce(MatcherBuilder) -> MatcherBuilder,
    {
        self.request("PUT", url, spec)
    }

    pub fn patch<IntoUrl, SpecFn>(&self, url: IntoUrl, spec: SpecFn) -> Result<Matcher, Error>
    where
        IntoUrl: Into<UrlPattern>,
        SpecFn: FnOnce(MatcherBuilder) -> MatcherBuilder,
    {
        self.request("PATCH", url, spec)
    }

    pub fn delete<IntoUrl, SpecFn>(&self, url: IntoUrl, spec: SpecFn) -> Result<Matcher, Error>
    where
        IntoUrl: Into<UrlPattern>,
        SpecFn: FnOnce(MatcherBuilder) -> MatcherBuilder,
    {
        self.request("DELETE", url, spec)
    }

    pub fn head<IntoUrl, SpecFn>(&self, url: IntoUrl, spec: SpecFn) -> Result<Matcher, Error>
    where
        IntoUrl: Into<UrlPattern>,
        SpecFn: FnOnce(MatcherBuilder) -> MatcherBuilder,
    {
        self.request("HEAD", url, spec)
    }

    pub fn options<IntoUrl, SpecFn>(&self, url: IntoUrl, spec: SpecFn) -> Result<Matcher, Error>
    where
        IntoUrl: Into<UrlPattern>,
        SpecFn: FnOnce(MatcherBuilder) -> MatcherBuilder,
    {
        self.request("OPTIONS", url, spec)
    }

    pub fn last_request(&self) -> Option<Rc<RequestView>> {
        self.adapter.last_request()
    }

    pub fn request_history(&self) -> Vec<Rc<RequestView>> {
        self.adapter.request_history()
    }

    pub fn called(&self) -> bool {
        self.adapter.called()
    }

    pub fn call_count(&self) -> usize {
        self.adapter.call_count()
    }
}

impl Default for Mocker {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Mocker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Keeps a [Mocker] started. Dropping the guard stops it.
#[must_use = "the mocker is stopped as soon as the guard is dropped"]
pub struct MockerGuard<'a> {
    mocker: &'a Mocker,
}

impl Drop for MockerGuard<'_> {
    fn drop(&mut self) {
        self.mocker.stop();
    }
}

// ************************************************************************************************
// Session
// ************************************************************************************************
struct NoRealTransport;

impl Transport for NoRealTransport {
    fn send(&self, request: http::Request<Bytes>, _: TransportOptions) -> Result<Response, Error> {
        Err(Error::InvalidRequest(format!(
            "no real transport available for {} {}",
            request.method(),
            request.uri()
        )))
    }
}

/// The client-side entry point: sends requests through the started mockers of the current
/// thread and, if none of them handles a request, through its real transport.
pub struct Session {
    real: Rc<dyn Transport>,
}

impl Session {
    pub fn new<T: Transport + 'static>(real: T) -> Self {
        Self {
            real: Rc::new(real),
        }
    }

    pub fn send(
        &self,
        request: http::Request<Bytes>,
        options: TransportOptions,
    ) -> Result<Response, Error> {
        let layers: Vec<Layer> = ACTIVE.with(|active| active.borrow().clone());

        for layer in layers.iter().rev() {
            match layer
                .adapter
                .send(clone_request(&request), options.clone())
            {
                Err(Error::NoMockAddress(_)) if layer.real_http => {
                    tracing::trace!(
                        "mocker with id={} passes {} {} on",
                        layer.mocker_id,
                        request.method(),
                        request.uri()
                    );
                }
                result => return result,
            }
        }

        self.real.send(request, options)
    }
}

impl Default for Session {
    /// A session without a real transport. Requests no mocker handles fail.
    fn default() -> Self {
        Self::new(NoRealTransport)
    }
}

impl Transport for Session {
    fn send(
        &self,
        request: http::Request<Bytes>,
        options: TransportOptions,
    ) -> Result<Response, Error> {
        Session::send(self, request, options)
    }

    fn close(&self) {
        self.real.close()
    }
}
