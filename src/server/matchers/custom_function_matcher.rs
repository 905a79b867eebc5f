use crate::{
    common::request::RequestView,
    server::{
        matchers::{Mismatch, RequirementMatcher},
        state::RequestRequirements,
    },
};

pub(crate) struct CustomFunctionMatcher {}

impl RequirementMatcher for CustomFunctionMatcher {
    fn matches(&self, req: &RequestView, requirements: &RequestRequirements) -> bool {
        requirements
            .additional_matcher
            .as_ref()
            .map_or(true, |f| (f)(req))
    }

    fn mismatches(&self, req: &RequestView, requirements: &RequestRequirements) -> Vec<Mismatch> {
        match self.matches(req, requirements) {
            true => Vec::new(),
            false => vec![Mismatch::new(
                "Request does not satisfy the additional matcher function",
                None,
                None,
            )],
        }
    }
}
