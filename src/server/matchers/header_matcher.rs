use crate::{
    common::request::RequestView,
    server::{
        matchers::{Mismatch, RequirementMatcher},
        state::RequestRequirements,
    },
};

pub(crate) struct HeaderMatcher {}

impl HeaderMatcher {
    fn get_unmatched<'a>(
        &self,
        req: &RequestView,
        requirements: &'a RequestRequirements,
    ) -> Vec<&'a (String, String)> {
        requirements
            .headers
            .iter()
            .filter(|(name, value)| {
                req.headers()
                    .get(name.as_str())
                    .map_or(true, |actual| actual.as_bytes() != value.as_bytes())
            })
            .collect()
    }
}

impl RequirementMatcher for HeaderMatcher {
    fn matches(&self, req: &RequestView, requirements: &RequestRequirements) -> bool {
        self.get_unmatched(req, requirements).is_empty()
    }

    fn mismatches(&self, req: &RequestView, requirements: &RequestRequirements) -> Vec<Mismatch> {
        self.get_unmatched(req, requirements)
            .into_iter()
            .map(|(name, value)| {
                let actual = req
                    .headers()
                    .get(name.as_str())
                    .map(|v| String::from_utf8_lossy(v.as_bytes()).to_string());
                let title = match actual {
                    Some(_) => "Request header does not match",
                    None => "Request header missing",
                };
                Mismatch::new(title, Some(format!("{}: {}", name, value)), actual)
            })
            .collect()
    }
}
