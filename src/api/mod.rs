pub use adapter::{local::Adapter, Transport};
pub use mock::Matcher;
pub use mocker::{Mocker, MockerGuard, Session};
pub use spec::{
    Any, Context, MatcherBuilder, MethodPattern, ResponseSpec, ResponseSpecBuilder, UrlPattern,
    ANY,
};

mod adapter;
mod mock;
mod mocker;
mod spec;
