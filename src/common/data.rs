use crate::common::{request::RequestView, util::read_env};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::PathBuf, rc::Rc, sync::Arc, time::Duration};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("You may only supply one body element. You supplied {0}")]
    MultipleBodySources(String),
    #[error("You should specify either a list of responses OR response arguments. Not both.")]
    ResponseListAndInline,
    #[error("Too many arguments provided. Unexpected arguments {0}.")]
    UnexpectedArguments(String),
    #[error("{0}")]
    InvalidBodyType(String),
    #[error("cannot create header: {0}")]
    InvalidHeader(String),
    #[error("No mock address: {} {}", .0.method(), .0.url())]
    NoMockAddress(Rc<RequestView>),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("cannot parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),
    #[error("bad form data: {0}")]
    FormParse(String),
    #[error("cannot parse multipart body: {0}")]
    MultipartParse(String),
    #[error("cannot read response body: {0}")]
    BodyRead(#[from] std::io::Error),
    #[error(transparent)]
    Raised(Arc<dyn std::error::Error + Send + Sync>),
    #[error("Mocker has already been started")]
    AlreadyStarted,
    #[error("cannot deserialize definition: {0}")]
    Definition(String),
}

impl Error {
    /// Returns the request that could not be matched, if this is a
    /// [NoMockAddress](Error::NoMockAddress) error.
    pub fn unmatched_request(&self) -> Option<&Rc<RequestView>> {
        match self {
            Error::NoMockAddress(request) => Some(request),
            _ => None,
        }
    }
}

/// Timeout setting passed to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timeout {
    /// Explicitly no timeout.
    Disabled,
    Total(Duration),
    /// Separate connect and read timeouts.
    ConnectRead(Duration, Duration),
}

/// TLS certificate verification setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verify {
    Enabled(bool),
    /// Verify against the CA bundle stored at the given path.
    CaBundle(PathBuf),
}

/// Client certificate reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCert {
    /// A single file containing both certificate and private key.
    Pem(PathBuf),
    Pair { cert: PathBuf, key: PathBuf },
}

/// The per-call options a client hands to its transport together with the request.
///
/// Every setting except `proxies` is optional: `None` means the caller did not pass the
/// option at all, which is different from passing an explicit value such as
/// `allow_redirects = false` or [Timeout::Disabled].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportOptions {
    pub timeout: Option<Timeout>,
    pub allow_redirects: Option<bool>,
    pub verify: Option<Verify>,
    pub cert: Option<ClientCert>,
    pub proxies: BTreeMap<String, String>,
}

impl TransportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Timeout) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn allow_redirects(mut self, allow: bool) -> Self {
        self.allow_redirects = Some(allow);
        self
    }

    pub fn verify(mut self, verify: Verify) -> Self {
        self.verify = Some(verify);
        self
    }

    pub fn cert(mut self, cert: ClientCert) -> Self {
        self.cert = Some(cert);
        self
    }

    pub fn proxy<KeyString: Into<String>, ValueString: Into<String>>(
        mut self,
        scheme_or_host: KeyString,
        proxy: ValueString,
    ) -> Self {
        self.proxies.insert(scheme_or_host.into(), proxy.into());
        self
    }
}

/// Settings that apply to a whole [Adapter](crate::Adapter).
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct AdapterConfig {
    /// Compare URLs with their original case. By default both the registered URL and the
    /// request URL are lower-cased before they are compared.
    #[serde(default)]
    pub case_sensitive: bool,
}

impl AdapterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Reads the configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `HTTPMOCK_CASE_SENSITIVE` | `false` |
    pub fn from_env() -> Self {
        let case_sensitive = read_env("HTTPMOCK_CASE_SENSITIVE", "false");
        Self {
            case_sensitive: matches!(case_sensitive.trim(), "1" | "true" | "TRUE" | "True"),
        }
    }
}
