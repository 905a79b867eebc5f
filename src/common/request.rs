use crate::{
    api::Matcher,
    common::{
        data::{ClientCert, Error, Timeout, TransportOptions, Verify},
        util::{find_subslice, printable_body, to_maybe_lossy_str},
    },
    server::state::MatcherState,
};
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use std::{
    borrow::Cow,
    cell::OnceCell,
    collections::BTreeMap,
    fmt,
    rc::{Rc, Weak},
};

/// Parsed query string: parameter name to all of its values, in order of appearance.
pub type QueryParams = BTreeMap<String, Vec<String>>;

/// The components of a URL, split the way URL patterns are compared.
///
/// Splitting never fails: a pattern such as `/path?a=1` simply has an empty scheme and netloc.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlParts {
    pub scheme: String,
    pub netloc: String,
    pub path: String,
    pub query: String,
    pub fragment: String,
}

impl UrlParts {
    pub fn parse(url: &str) -> Self {
        let (rest, fragment) = url.split_once('#').unwrap_or((url, ""));
        let (mut rest, query) = rest.split_once('?').unwrap_or((rest, ""));

        let mut scheme = String::new();
        if let Some(idx) = rest.find(':') {
            let candidate = &rest[..idx];
            let valid = candidate
                .chars()
                .next()
                .map_or(false, |c| c.is_ascii_alphabetic())
                && candidate
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.');
            if valid {
                scheme = candidate.to_ascii_lowercase();
                rest = &rest[idx + 1..];
            }
        }

        let mut netloc = String::new();
        if let Some(after_slashes) = rest.strip_prefix("//") {
            let end = after_slashes.find('/').unwrap_or(after_slashes.len());
            netloc = after_slashes[..end].to_string();
            rest = &after_slashes[end..];
        }

        Self {
            scheme,
            netloc,
            path: rest.to_string(),
            query: query.to_string(),
            fragment: fragment.to_string(),
        }
    }
}

/// Parses a query string into a [QueryParams] map. Parameters without a value are dropped.
pub fn parse_query(query: &str) -> QueryParams {
    let mut params = QueryParams::new();
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        if value.is_empty() {
            continue;
        }
        params
            .entry(key.into_owned())
            .or_default()
            .push(value.into_owned());
    }
    params
}

/// One part of a `multipart/form-data` request body.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestField {
    pub filename: Option<String>,
    pub data: Bytes,
    pub content_type: Option<String>,
    pub headers: HeaderMap,
}

impl RequestField {
    /// The field data as text.
    pub fn text(&self) -> Cow<'_, str> {
        to_maybe_lossy_str(&self.data)
    }
}

/// A read-only view of a request that was sent through an [Adapter](crate::Adapter).
///
/// Parsed URL parts and the query map are computed on first access and then cached.
/// Anything the view does not expose is available on the wrapped request via
/// [inner](RequestView::inner).
pub struct RequestView {
    request: http::Request<Bytes>,
    url: String,
    options: TransportOptions,
    case_sensitive: bool,
    url_parts: OnceCell<UrlParts>,
    qs: OnceCell<QueryParams>,
    matcher: OnceCell<Weak<MatcherState>>,
}

impl RequestView {
    pub fn new(request: http::Request<Bytes>, options: TransportOptions) -> Self {
        let url = request.uri().to_string();
        Self {
            request,
            url,
            options,
            case_sensitive: false,
            url_parts: OnceCell::new(),
            qs: OnceCell::new(),
            matcher: OnceCell::new(),
        }
    }

    /// Keeps the original URL case for [scheme](RequestView::scheme),
    /// [netloc](RequestView::netloc), [path](RequestView::path) and the query accessors.
    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self.url_parts = OnceCell::new();
        self.qs = OnceCell::new();
        self
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// The wrapped request.
    pub fn inner(&self) -> &http::Request<Bytes> {
        &self.request
    }

    pub fn method(&self) -> &http::Method {
        self.request.method()
    }

    /// The full URL, in its original case.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn url_parts(&self) -> &UrlParts {
        self.url_parts
            .get_or_init(|| parse_url(&self.url, self.case_sensitive))
    }

    /// The URL parts in the given case policy. Only parses again if it differs from the
    /// policy of this view.
    pub(crate) fn url_parts_as(&self, case_sensitive: bool) -> Cow<'_, UrlParts> {
        if case_sensitive == self.case_sensitive {
            Cow::Borrowed(self.url_parts())
        } else {
            Cow::Owned(parse_url(&self.url, case_sensitive))
        }
    }

    pub fn scheme(&self) -> &str {
        &self.url_parts().scheme
    }

    pub fn netloc(&self) -> &str {
        &self.url_parts().netloc
    }

    pub fn hostname(&self) -> &str {
        let netloc = self.netloc();
        netloc.split(':').next().unwrap_or_default()
    }

    /// The explicit port of the URL, or the default port of the scheme. Returns 0 if neither
    /// is known.
    pub fn port(&self) -> u16 {
        if let Some(port) = self.netloc().split(':').nth(1) {
            if let Ok(port) = port.parse::<u16>() {
                return port;
            }
        }

        match self.scheme() {
            "https" => 443,
            "http" => 80,
            _ => 0,
        }
    }

    pub fn path(&self) -> &str {
        &self.url_parts().path
    }

    pub fn query(&self) -> &str {
        &self.url_parts().query
    }

    pub fn qs(&self) -> &QueryParams {
        self.qs.get_or_init(|| parse_query(self.query()))
    }

    pub(crate) fn qs_as(&self, case_sensitive: bool) -> Cow<'_, QueryParams> {
        if case_sensitive == self.case_sensitive {
            Cow::Borrowed(self.qs())
        } else {
            Cow::Owned(parse_query(&self.url_parts_as(case_sensitive).query))
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    pub fn body(&self) -> &Bytes {
        self.request.body()
    }

    pub fn text(&self) -> Cow<'_, str> {
        to_maybe_lossy_str(self.request.body())
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        Ok(serde_json::from_slice(self.request.body())?)
    }

    /// Parses an `application/x-www-form-urlencoded` body, rejecting malformed fields.
    pub fn form(&self) -> Result<QueryParams, Error> {
        self.form_with(true)
    }

    /// Parses an `application/x-www-form-urlencoded` body. With `strict` set, a field that
    /// is not a `name=value` pair is an error; otherwise such fields are skipped.
    pub fn form_with(&self, strict: bool) -> Result<QueryParams, Error> {
        let text = self.text();
        let mut form = QueryParams::new();

        if text.is_empty() {
            return Ok(form);
        }

        for field in text.split('&') {
            if !field.contains('=') {
                if strict {
                    return Err(Error::FormParse(format!("bad query field: {:?}", field)));
                }
                continue;
            }

            for (key, value) in form_urlencoded::parse(field.as_bytes()) {
                if value.is_empty() {
                    continue;
                }
                form.entry(key.into_owned())
                    .or_default()
                    .push(value.into_owned());
            }
        }

        Ok(form)
    }

    /// Decodes a `multipart/form-data` body.
    pub fn multipart_form(&self) -> Result<BTreeMap<String, Vec<RequestField>>, Error> {
        let content_type = self
            .headers()
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| Error::MultipartParse("missing content type".to_string()))?;

        let boundary = header_param(content_type, "boundary").ok_or_else(|| {
            Error::MultipartParse(format!("no boundary in content type {:?}", content_type))
        })?;

        parse_multipart(self.body(), &boundary)
    }

    pub fn timeout(&self) -> Option<&Timeout> {
        self.options.timeout.as_ref()
    }

    pub fn allow_redirects(&self) -> Option<bool> {
        self.options.allow_redirects
    }

    pub fn verify(&self) -> Option<&Verify> {
        self.options.verify.as_ref()
    }

    pub fn cert(&self) -> Option<&ClientCert> {
        self.options.cert.as_ref()
    }

    pub fn proxies(&self) -> &BTreeMap<String, String> {
        &self.options.proxies
    }

    pub fn options(&self) -> &TransportOptions {
        &self.options
    }

    /// The matcher that produced the response for this request.
    ///
    /// Returns `None` if the request was not matched or if the matcher no longer exists.
    pub fn matcher(&self) -> Option<Matcher> {
        self.matcher
            .get()
            .and_then(Weak::upgrade)
            .map(Matcher::from_state)
    }

    pub(crate) fn set_matcher(&self, matcher: Weak<MatcherState>) {
        if self.matcher.set(matcher).is_err() {
            tracing::trace!("matcher of request {} was already set", self.url);
        }
    }
}

impl fmt::Debug for RequestView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestView")
            .field("method", self.method())
            .field("url", &self.url)
            .field("headers", self.headers())
            .field("body", &printable_body(self.body()))
            .field("options", &self.options)
            .finish()
    }
}

fn parse_url(url: &str, case_sensitive: bool) -> UrlParts {
    if case_sensitive {
        UrlParts::parse(url)
    } else {
        UrlParts::parse(&url.to_lowercase())
    }
}

/// Extracts a parameter such as `boundary` or `name` from a header value like
/// `multipart/form-data; boundary=xyz`.
fn header_param(value: &str, name: &str) -> Option<String> {
    value.split(';').skip(1).find_map(|param| {
        let (key, val) = param.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case(name) {
            return None;
        }
        Some(val.trim().trim_matches('"').to_string())
    })
}

fn parse_multipart(
    body: &Bytes,
    boundary: &str,
) -> Result<BTreeMap<String, Vec<RequestField>>, Error> {
    let delimiter = format!("--{}", boundary).into_bytes();
    let mut form: BTreeMap<String, Vec<RequestField>> = BTreeMap::new();

    let mut pos = find_subslice(body, &delimiter, 0)
        .ok_or_else(|| Error::MultipartParse("boundary not found in body".to_string()))?;

    loop {
        let part_start = pos + delimiter.len();
        if body[part_start..].starts_with(b"--") {
            break;
        }

        let next = find_subslice(body, &delimiter, part_start)
            .ok_or_else(|| Error::MultipartParse("missing closing boundary".to_string()))?;

        let part = strip_crlf(&body[part_start..next]);
        let (name, field) = parse_part(body.slice_ref(part))?;
        form.entry(name).or_default().push(field);

        pos = next;
    }

    Ok(form)
}

/// Removes the line break that follows a boundary and the one that precedes the next.
fn strip_crlf(part: &[u8]) -> &[u8] {
    let part = part.strip_prefix(b"\r\n").unwrap_or(part);
    part.strip_suffix(b"\r\n").unwrap_or(part)
}

fn parse_part(part: Bytes) -> Result<(String, RequestField), Error> {
    let split = find_subslice(&part, b"\r\n\r\n", 0);
    let (head, data) = match split {
        Some(idx) => (part.slice(..idx), part.slice(idx + 4..)),
        None if part.starts_with(b"\r\n") => (Bytes::new(), part.slice(2..)),
        None => return Err(Error::MultipartParse("part without headers".to_string())),
    };

    let mut headers = HeaderMap::new();
    for line in to_maybe_lossy_str(&head).split("\r\n") {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let name = HeaderName::from_bytes(key.trim().as_bytes())
            .map_err(|err| Error::MultipartParse(err.to_string()))?;
        let value = HeaderValue::from_str(value.trim())
            .map_err(|err| Error::MultipartParse(err.to_string()))?;
        headers.append(name, value);
    }

    let disposition = headers
        .get(http::header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::MultipartParse("part without content disposition".to_string()))?;

    let name = header_param(disposition, "name")
        .ok_or_else(|| Error::MultipartParse("part without a name".to_string()))?;

    let field = RequestField {
        filename: header_param(disposition, "filename"),
        content_type: headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        data,
        headers,
    };

    Ok((name, field))
}
