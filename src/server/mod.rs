pub(crate) mod matchers;
#[cfg(feature = "definitions")]
pub(crate) mod persistence;
pub(crate) mod response;
pub(crate) mod state;
