use crate::{common::request::RequestView, server::state::RequestRequirements};
use std::fmt;

use custom_function_matcher::CustomFunctionMatcher;
use header_matcher::HeaderMatcher;
use method_matcher::MethodMatcher;
use query_parameter_matcher::QueryParameterMatcher;
use url_matcher::{NetlocMatcher, PathMatcher, SchemeMatcher, UrlRegexMatcher};

pub(crate) mod custom_function_matcher;
pub(crate) mod header_matcher;
pub(crate) mod method_matcher;
pub(crate) mod query_parameter_matcher;
pub(crate) mod url_matcher;

/// Describes one reason why a matcher rejected a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub title: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

impl Mismatch {
    pub(crate) fn new<IntoString: Into<String>>(
        title: IntoString,
        expected: Option<String>,
        actual: Option<String>,
    ) -> Self {
        Self {
            title: title.into(),
            expected,
            actual,
        }
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)?;
        if let Some(expected) = &self.expected {
            write!(f, " (expected: {:?}", expected)?;
            match &self.actual {
                Some(actual) => write!(f, ", actual: {:?})", actual)?,
                None => write!(f, ")")?,
            }
        } else if let Some(actual) = &self.actual {
            write!(f, " (actual: {:?})", actual)?;
        }
        Ok(())
    }
}

pub(crate) trait RequirementMatcher {
    fn matches(&self, req: &RequestView, requirements: &RequestRequirements) -> bool;
    fn mismatches(&self, req: &RequestView, requirements: &RequestRequirements) -> Vec<Mismatch>;
}

// The custom function matcher must stay last: user predicates only run once every
// declarative requirement holds.
static MATCHERS: [&(dyn RequirementMatcher + Sync); 8] = [
    &MethodMatcher {},
    &UrlRegexMatcher {},
    &SchemeMatcher {},
    &NetlocMatcher {},
    &PathMatcher {},
    &QueryParameterMatcher {},
    &HeaderMatcher {},
    &CustomFunctionMatcher {},
];

pub(crate) fn all() -> &'static [&'static (dyn RequirementMatcher + Sync)] {
    &MATCHERS
}

pub(crate) fn request_matches(req: &RequestView, requirements: &RequestRequirements) -> bool {
    all().iter().all(|matcher| matcher.matches(req, requirements))
}

pub(crate) fn request_mismatches(
    req: &RequestView,
    requirements: &RequestRequirements,
) -> Vec<Mismatch> {
    all()
        .iter()
        .flat_map(|matcher| matcher.mismatches(req, requirements))
        .collect()
}
