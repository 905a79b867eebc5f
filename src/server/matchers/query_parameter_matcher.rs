use crate::{
    common::request::RequestView,
    server::{
        matchers::{Mismatch, RequirementMatcher},
        state::RequestRequirements,
    },
};

pub(crate) struct QueryParameterMatcher {}

struct Unmatched {
    missing: Vec<(String, String)>,
    unexpected: Vec<(String, String)>,
}

impl Unmatched {
    fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty()
    }
}

impl QueryParameterMatcher {
    /// Every expected value consumes one equal value of the same parameter from the request.
    /// Whatever is left over only counts against the request if the complete query string
    /// is required.
    fn get_unmatched(&self, req: &RequestView, requirements: &RequestRequirements) -> Unmatched {
        let case_sensitive = requirements.is_case_sensitive_for(req);
        let expected = match requirements.url.form(case_sensitive) {
            Some(form) => &form.qs,
            None => {
                return Unmatched {
                    missing: Vec::new(),
                    unexpected: Vec::new(),
                }
            }
        };

        let mut remaining = req.qs_as(case_sensitive).into_owned();
        let mut missing = Vec::new();

        for (key, values) in expected {
            for value in values {
                let consumed = remaining.get_mut(key).and_then(|candidates| {
                    let idx = candidates.iter().position(|c| c == value)?;
                    Some(candidates.remove(idx))
                });

                if consumed.is_none() {
                    missing.push((key.to_owned(), value.to_owned()));
                }
            }
        }

        let unexpected = if requirements.complete_qs {
            remaining
                .into_iter()
                .flat_map(|(key, values)| values.into_iter().map(move |v| (key.clone(), v)))
                .collect()
        } else {
            Vec::new()
        };

        Unmatched {
            missing,
            unexpected,
        }
    }
}

impl RequirementMatcher for QueryParameterMatcher {
    fn matches(&self, req: &RequestView, requirements: &RequestRequirements) -> bool {
        self.get_unmatched(req, requirements).is_empty()
    }

    fn mismatches(&self, req: &RequestView, requirements: &RequestRequirements) -> Vec<Mismatch> {
        let unmatched = self.get_unmatched(req, requirements);

        let missing = unmatched.missing.into_iter().map(|(k, v)| {
            Mismatch::new(
                "Query parameter missing",
                Some(format!("{}={}", k, v)),
                None,
            )
        });

        let unexpected = unmatched.unexpected.into_iter().map(|(k, v)| {
            Mismatch::new(
                "Unexpected query parameter",
                None,
                Some(format!("{}={}", k, v)),
            )
        });

        missing.chain(unexpected).collect()
    }
}
