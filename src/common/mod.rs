pub(crate) mod data;
pub(crate) mod request;
pub(crate) mod util;
