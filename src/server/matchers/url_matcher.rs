use crate::{
    common::request::{RequestView, UrlParts},
    server::{
        matchers::{Mismatch, RequirementMatcher},
        state::{RequestRequirements, UrlRequirement},
    },
};
use std::borrow::Cow;

// ************************************************************************************************
// UrlRegexMatcher
// ************************************************************************************************
pub(crate) struct UrlRegexMatcher {}

impl RequirementMatcher for UrlRegexMatcher {
    fn matches(&self, req: &RequestView, requirements: &RequestRequirements) -> bool {
        match &requirements.url {
            UrlRequirement::Regex(regex) => regex.is_match(req.url()),
            _ => true,
        }
    }

    fn mismatches(&self, req: &RequestView, requirements: &RequestRequirements) -> Vec<Mismatch> {
        match &requirements.url {
            UrlRequirement::Regex(regex) if !regex.is_match(req.url()) => vec![Mismatch::new(
                "Request URL does not match the regular expression",
                Some(regex.as_str().to_string()),
                Some(req.url().to_string()),
            )],
            _ => Vec::new(),
        }
    }
}

/// The request URL parts in the case policy the matcher applies to this request.
fn actual_parts<'r>(
    req: &'r RequestView,
    requirements: &RequestRequirements,
) -> Cow<'r, UrlParts> {
    req.url_parts_as(requirements.is_case_sensitive_for(req))
}

// ************************************************************************************************
// SchemeMatcher
// ************************************************************************************************
pub(crate) struct SchemeMatcher {}

impl SchemeMatcher {
    fn expected<'a>(
        &self,
        req: &RequestView,
        requirements: &'a RequestRequirements,
    ) -> Option<&'a str> {
        requirements
            .url_form(req)
            .map(|form| form.parts.scheme.as_str())
            .filter(|scheme| !scheme.is_empty())
    }
}

impl RequirementMatcher for SchemeMatcher {
    fn matches(&self, req: &RequestView, requirements: &RequestRequirements) -> bool {
        self.expected(req, requirements)
            .map_or(true, |scheme| scheme == actual_parts(req, requirements).scheme)
    }

    fn mismatches(&self, req: &RequestView, requirements: &RequestRequirements) -> Vec<Mismatch> {
        let actual = actual_parts(req, requirements);
        match self.expected(req, requirements) {
            Some(scheme) if scheme != actual.scheme => vec![Mismatch::new(
                "Request scheme does not match",
                Some(scheme.to_string()),
                Some(actual.scheme.clone()),
            )],
            _ => Vec::new(),
        }
    }
}

// ************************************************************************************************
// NetlocMatcher
// ************************************************************************************************
pub(crate) struct NetlocMatcher {}

impl NetlocMatcher {
    fn expected<'a>(
        &self,
        req: &RequestView,
        requirements: &'a RequestRequirements,
    ) -> Option<&'a str> {
        requirements
            .url_form(req)
            .map(|form| form.parts.netloc.as_str())
            .filter(|netloc| !netloc.is_empty())
    }
}

impl RequirementMatcher for NetlocMatcher {
    fn matches(&self, req: &RequestView, requirements: &RequestRequirements) -> bool {
        self.expected(req, requirements)
            .map_or(true, |netloc| netloc == actual_parts(req, requirements).netloc)
    }

    fn mismatches(&self, req: &RequestView, requirements: &RequestRequirements) -> Vec<Mismatch> {
        let actual = actual_parts(req, requirements);
        match self.expected(req, requirements) {
            Some(netloc) if netloc != actual.netloc => vec![Mismatch::new(
                "Request host does not match",
                Some(netloc.to_string()),
                Some(actual.netloc.clone()),
            )],
            _ => Vec::new(),
        }
    }
}

// ************************************************************************************************
// PathMatcher
// ************************************************************************************************
pub(crate) struct PathMatcher {}

/// An empty path and `/` address the same resource.
fn normalized(path: &str) -> &str {
    if path.is_empty() {
        "/"
    } else {
        path
    }
}

impl PathMatcher {
    fn expected<'a>(
        &self,
        req: &RequestView,
        requirements: &'a RequestRequirements,
    ) -> Option<&'a str> {
        requirements
            .url_form(req)
            .map(|form| normalized(&form.parts.path))
    }
}

impl RequirementMatcher for PathMatcher {
    fn matches(&self, req: &RequestView, requirements: &RequestRequirements) -> bool {
        self.expected(req, requirements)
            .map_or(true, |path| path == normalized(&actual_parts(req, requirements).path))
    }

    fn mismatches(&self, req: &RequestView, requirements: &RequestRequirements) -> Vec<Mismatch> {
        let actual = actual_parts(req, requirements);
        let actual = normalized(&actual.path);
        match self.expected(req, requirements) {
            Some(path) if path != actual => vec![Mismatch::new(
                "Request path does not match",
                Some(path.to_string()),
                Some(actual.to_string()),
            )],
            _ => Vec::new(),
        }
    }
}
