use crate::{
    api::{MethodPattern, ResponseSpec, UrlPattern},
    common::{
        data::Error,
        request::{parse_query, QueryParams, RequestView, UrlParts},
    },
    server::{
        matchers::{self, Mismatch},
        response::Response,
    },
};
use regex::Regex;
use std::{
    cell::RefCell,
    collections::VecDeque,
    fmt,
    rc::Rc,
    sync::atomic::{AtomicUsize, Ordering},
};

static NEXT_MATCHER_ID: AtomicUsize = AtomicUsize::new(0);

// ************************************************************************************************
// RequestHistory
// ************************************************************************************************
/// An append-only list of the requests seen by a registry or a single matcher.
#[derive(Default)]
pub(crate) struct RequestHistory {
    requests: RefCell<Vec<Rc<RequestView>>>,
}

impl RequestHistory {
    pub(crate) fn push(&self, req: Rc<RequestView>) {
        let mut requests = self.requests.borrow_mut();
        requests.push(req);
        tracing::trace!("request history now holds {} entries", requests.len());
    }

    pub(crate) fn last(&self) -> Option<Rc<RequestView>> {
        self.requests.borrow().last().cloned()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.requests.borrow().len()
    }

    pub(crate) fn called(&self) -> bool {
        self.call_count() > 0
    }

    pub(crate) fn snapshot(&self) -> Vec<Rc<RequestView>> {
        self.requests.borrow().clone()
    }
}

// ************************************************************************************************
// RequestRequirements
// ************************************************************************************************
/// A URL pattern split into its components. The query string is parsed up front because it
/// is compared on every request.
pub(crate) struct UrlForm {
    pub parts: UrlParts,
    pub qs: QueryParams,
}

impl UrlForm {
    fn parse(url: &str) -> Self {
        let parts = UrlParts::parse(url);
        let qs = parse_query(&parts.query);
        Self { parts, qs }
    }
}

pub(crate) enum UrlRequirement {
    Any,
    Regex(Regex),
    /// A literal URL, kept both in its original case and lower-cased so that the case
    /// policy can be chosen per request.
    Parts { original: UrlForm, folded: UrlForm },
}

impl UrlRequirement {
    pub(crate) fn new(pattern: UrlPattern) -> Self {
        match pattern {
            UrlPattern::Any => UrlRequirement::Any,
            UrlPattern::Regex(regex) => UrlRequirement::Regex(regex),
            UrlPattern::Exact(url) => UrlRequirement::Parts {
                original: UrlForm::parse(&url),
                folded: UrlForm::parse(&url.to_lowercase()),
            },
        }
    }

    pub(crate) fn form(&self, case_sensitive: bool) -> Option<&UrlForm> {
        match self {
            UrlRequirement::Parts { original, .. } if case_sensitive => Some(original),
            UrlRequirement::Parts { folded, .. } => Some(folded),
            _ => None,
        }
    }
}

impl fmt::Display for UrlRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlRequirement::Any => write!(f, "ANY"),
            UrlRequirement::Regex(regex) => write!(f, "/{}/", regex.as_str()),
            UrlRequirement::Parts { original, .. } => {
                let parts = &original.parts;
                if !parts.scheme.is_empty() {
                    write!(f, "{}:", parts.scheme)?;
                }
                if !parts.netloc.is_empty() {
                    write!(f, "//{}", parts.netloc)?;
                }
                write!(f, "{}", parts.path)?;
                if !parts.query.is_empty() {
                    write!(f, "?{}", parts.query)?;
                }
                Ok(())
            }
        }
    }
}

/// Everything a request has to satisfy to be handled by a matcher.
pub(crate) struct RequestRequirements {
    pub method: MethodPattern,
    pub url: UrlRequirement,
    pub headers: Vec<(String, String)>,
    pub complete_qs: bool,
    pub additional_matcher: Option<Box<dyn Fn(&RequestView) -> bool>>,
    /// `None` follows the request, i.e. the setting of the adapter it was sent through.
    pub case_sensitive: Option<bool>,
}

impl RequestRequirements {
    pub(crate) fn is_case_sensitive_for(&self, req: &RequestView) -> bool {
        self.case_sensitive
            .unwrap_or_else(|| req.is_case_sensitive())
    }

    /// The URL pattern in the case policy that applies to `req`.
    pub(crate) fn url_form(&self, req: &RequestView) -> Option<&UrlForm> {
        self.url.form(self.is_case_sensitive_for(req))
    }
}

// ************************************************************************************************
// MatcherState
// ************************************************************************************************
pub(crate) struct MatcherState {
    pub id: usize,
    pub requirements: RequestRequirements,
    responses: RefCell<VecDeque<Rc<ResponseSpec>>>,
    pub history: RequestHistory,
}

impl MatcherState {
    pub(crate) fn new(requirements: RequestRequirements, responses: Vec<ResponseSpec>) -> Self {
        Self {
            id: NEXT_MATCHER_ID.fetch_add(1, Ordering::Relaxed),
            requirements,
            responses: RefCell::new(responses.into_iter().map(Rc::new).collect()),
            history: RequestHistory::default(),
        }
    }

    pub(crate) fn response_count(&self) -> usize {
        self.responses.borrow().len()
    }

    pub(crate) fn matches(&self, req: &RequestView) -> bool {
        let matched = matchers::request_matches(req, &self.requirements);
        if !matched {
            tracing::trace!(
                "matcher with id={} ({} {}) rejected {} {}",
                self.id,
                self.requirements.method,
                self.requirements.url,
                req.method(),
                req.url()
            );
        }
        matched
    }

    pub(crate) fn mismatches(&self, req: &RequestView) -> Vec<Mismatch> {
        matchers::request_mismatches(req, &self.requirements)
    }

    /// Returns `None` if the request does not satisfy the requirements. Otherwise the request
    /// is recorded and linked back to this matcher before the next queued response is
    /// rendered, so both happen even if rendering fails.
    pub(crate) fn respond(
        self: &Rc<Self>,
        req: &Rc<RequestView>,
    ) -> Option<Result<Response, Error>> {
        if !self.matches(req) {
            return None;
        }

        tracing::debug!(
            "Matched mock with id={} to the following request: {} {}",
            self.id,
            req.method(),
            req.url()
        );

        self.history.push(req.clone());
        req.set_matcher(Rc::downgrade(self));

        let spec = self.next_response();
        let result = match spec {
            Some(spec) => spec.render(req),
            None => Response::builder().build(),
        };

        Some(result.map(|mut res| {
            res.set_request(req.clone());
            res
        }))
    }

    /// Pops the front spec while more than one is queued; the last one is reused forever.
    fn next_response(&self) -> Option<Rc<ResponseSpec>> {
        let mut responses = self.responses.borrow_mut();
        if responses.len() > 1 {
            responses.pop_front()
        } else {
            responses.front().cloned()
        }
    }
}
