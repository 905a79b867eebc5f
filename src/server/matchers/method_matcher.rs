use crate::{
    api::MethodPattern,
    common::request::RequestView,
    server::{
        matchers::{Mismatch, RequirementMatcher},
        state::RequestRequirements,
    },
};

pub(crate) struct MethodMatcher {}

impl RequirementMatcher for MethodMatcher {
    fn matches(&self, req: &RequestView, requirements: &RequestRequirements) -> bool {
        match &requirements.method {
            MethodPattern::Any => true,
            MethodPattern::Exact(method) => method.eq_ignore_ascii_case(req.method().as_str()),
        }
    }

    fn mismatches(&self, req: &RequestView, requirements: &RequestRequirements) -> Vec<Mismatch> {
        match (&requirements.method, self.matches(req, requirements)) {
            (MethodPattern::Exact(method), false) => vec![Mismatch::new(
                "Request method does not match",
                Some(method.to_owned()),
                Some(req.method().to_string()),
            )],
            _ => Vec::new(),
        }
    }
}
