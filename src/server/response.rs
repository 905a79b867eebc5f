use crate::{
    api::Transport,
    common::{
        data::{Error, TransportOptions},
        request::RequestView,
        util::{printable_body, to_maybe_lossy_str},
    },
};
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::{borrow::Cow, fmt, io, io::Read, rc::Rc};

pub const DEFAULT_STATUS: u16 = 200;

const UTF_8: &str = "utf-8";

/// Values that can be used as raw byte content of a response.
///
/// Text is not accepted here: decoded text belongs in
/// [text](ResponseBuilder::text), which also sets the response encoding.
pub trait IntoContent {
    fn into_content(self) -> Bytes;
}

impl IntoContent for Bytes {
    fn into_content(self) -> Bytes {
        self
    }
}

impl IntoContent for Vec<u8> {
    fn into_content(self) -> Bytes {
        Bytes::from(self)
    }
}

impl IntoContent for &'static [u8] {
    fn into_content(self) -> Bytes {
        Bytes::from_static(self)
    }
}

impl<const N: usize> IntoContent for &'static [u8; N] {
    fn into_content(self) -> Bytes {
        Bytes::from_static(self)
    }
}

// ************************************************************************************************
// RawResponse
// ************************************************************************************************
/// The transport-level representation of a response: what a real adapter would have read
/// off the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub reason: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RawResponse {
    pub fn new<IntoBytes: Into<Bytes>>(status: u16, body: IntoBytes) -> Self {
        Self {
            status,
            reason: None,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }
}

impl Default for RawResponse {
    fn default() -> Self {
        Self::new(DEFAULT_STATUS, Bytes::new())
    }
}

// ************************************************************************************************
// Response
// ************************************************************************************************
/// A response as seen by the client.
pub struct Response {
    raw: RawResponse,
    encoding: Option<&'static str>,
    url: Option<String>,
    request: Option<Rc<RequestView>>,
    connection: Rc<dyn Transport>,
}

impl Response {
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder::default()
    }

    pub fn status_code(&self) -> u16 {
        self.raw.status
    }

    pub fn reason(&self) -> Option<&str> {
        self.raw.reason.as_deref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.raw.headers
    }

    pub fn content(&self) -> &Bytes {
        &self.raw.body
    }

    pub fn text(&self) -> Cow<'_, str> {
        to_maybe_lossy_str(&self.raw.body)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        Ok(serde_json::from_slice(&self.raw.body)?)
    }

    /// The declared text encoding. Only set when the body was produced from text or JSON.
    pub fn encoding(&self) -> Option<&str> {
        self.encoding
    }

    pub fn raw(&self) -> &RawResponse {
        &self.raw
    }

    /// The URL of the request this response answers.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn request(&self) -> Option<&Rc<RequestView>> {
        self.request.as_ref()
    }

    /// The transport further requests can be sent through, e.g. to follow a redirect.
    pub fn connection(&self) -> &dyn Transport {
        self.connection.as_ref()
    }

    pub(crate) fn set_connection(&mut self, connection: Rc<dyn Transport>) {
        self.connection = connection;
    }

    pub(crate) fn set_request(&mut self, request: Rc<RequestView>) {
        self.url = Some(request.url().to_string());
        self.request = Some(request);
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.raw.status)
            .field("reason", &self.raw.reason)
            .field("headers", &self.raw.headers)
            .field("body", &printable_body(&self.raw.body))
            .field("encoding", &self.encoding)
            .field("url", &self.url)
            .finish()
    }
}

// ************************************************************************************************
// FakeConnection
// ************************************************************************************************
/// The connection of a response that was built without one. Sending through it fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct FakeConnection;

impl Transport for FakeConnection {
    fn send(&self, _: http::Request<Bytes>, _: TransportOptions) -> Result<Response, Error> {
        Err(Error::InvalidRequest(
            "This response was created without a connection. You are therefore unable to make \
             a request directly on that connection."
                .to_string(),
        ))
    }
}

// ************************************************************************************************
// ResponseBuilder
// ************************************************************************************************
pub(crate) enum ResponseBody {
    Raw(RawResponse),
    Reader(Box<dyn Read>),
    Content(Bytes),
    Text(String),
    Json(Value),
}

impl ResponseBody {
    fn name(&self) -> &'static str {
        match self {
            ResponseBody::Raw(_) => "raw",
            ResponseBody::Reader(_) => "body",
            ResponseBody::Content(_) => "content",
            ResponseBody::Text(_) => "text",
            ResponseBody::Json(_) => "json",
        }
    }
}

/// Fails if more than one body source was supplied.
pub(crate) fn check_body_sources(names: &[&str]) -> Result<(), Error> {
    if names.len() > 1 {
        return Err(Error::MultipleBodySources(names.join(", ")));
    }
    Ok(())
}

/// Builds a [Response] from HTTP metadata and at most one body source.
#[derive(Default)]
pub struct ResponseBuilder {
    status: Option<u16>,
    reason: Option<String>,
    headers: HeaderMap,
    sources: Vec<ResponseBody>,
    connection: Option<Rc<dyn Transport>>,
    error: Option<Error>,
}

impl ResponseBuilder {
    pub fn status_code(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn reason<IntoString: Into<String>>(mut self, reason: IntoString) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn header<KeyString: Into<String>, ValueString: Into<String>>(
        mut self,
        name: KeyString,
        value: ValueString,
    ) -> Self {
        match to_header(name.into(), value.into()) {
            Ok((name, value)) => {
                self.headers.append(name, value);
            }
            Err(err) => {
                self.error.get_or_insert(err);
            }
        }
        self
    }

    /// Uses a ready-made transport response as is. Status, reason and headers given to this
    /// builder are ignored.
    pub fn raw(mut self, raw: RawResponse) -> Self {
        self.sources.push(ResponseBody::Raw(raw));
        self
    }

    /// Reads the body from `reader` when the response is built.
    pub fn body<R: Read + 'static>(mut self, reader: R) -> Self {
        self.sources.push(ResponseBody::Reader(Box::new(reader)));
        self
    }

    pub fn content<C: IntoContent>(mut self, content: C) -> Self {
        self.sources
            .push(ResponseBody::Content(content.into_content()));
        self
    }

    pub fn text<IntoString: Into<String>>(mut self, text: IntoString) -> Self {
        self.sources.push(ResponseBody::Text(text.into()));
        self
    }

    pub fn json<IntoValue: Into<Value>>(mut self, json: IntoValue) -> Self {
        self.sources.push(ResponseBody::Json(json.into()));
        self
    }

    pub fn connection(mut self, connection: Rc<dyn Transport>) -> Self {
        self.connection = Some(connection);
        self
    }

    pub(crate) fn source(mut self, source: ResponseBody) -> Self {
        self.sources.push(source);
        self
    }

    pub fn build(mut self) -> Result<Response, Error> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }

        let names: Vec<&str> = self.sources.iter().map(ResponseBody::name).collect();
        check_body_sources(&names)?;

        let source = self.sources.pop();
        let (status, reason, headers) = (self.status, self.reason, self.headers);
        let with_body = |body: Bytes| RawResponse {
            status: status.unwrap_or(DEFAULT_STATUS),
            reason,
            headers,
            body,
        };

        let mut encoding = None;
        let raw = match source {
            Some(ResponseBody::Raw(raw)) => raw,
            None => with_body(Bytes::new()),
            Some(ResponseBody::Reader(mut reader)) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf)?;
                with_body(Bytes::from(buf))
            }
            Some(ResponseBody::Content(content)) => with_body(content),
            Some(ResponseBody::Text(text)) => {
                encoding = Some(UTF_8);
                with_body(Bytes::from(text))
            }
            Some(ResponseBody::Json(json)) => {
                encoding = Some(UTF_8);
                with_body(Bytes::from(to_spaced_json(&json)?))
            }
        };

        Ok(Response {
            raw,
            encoding,
            url: None,
            request: None,
            connection: self.connection.unwrap_or_else(|| Rc::new(FakeConnection)),
        })
    }
}

pub(crate) fn to_header(name: String, value: String) -> Result<(HeaderName, HeaderValue), Error> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|err| Error::InvalidHeader(format!("{}: {}", name, err)))?;
    let header_value = HeaderValue::from_str(&value)
        .map_err(|err| Error::InvalidHeader(format!("{}: {}", name, err)))?;
    Ok((header_name, header_value))
}

// ************************************************************************************************
// JSON
// ************************************************************************************************
/// Writes JSON with a space after every `,` and `:` separator. Characters outside ASCII are
/// written as `\uXXXX` escapes, using surrogate pairs beyond the BMP.
struct SpacedFormatter;

impl serde_json::ser::Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (idx, c) in fragment.char_indices() {
            if c.is_ascii() {
                continue;
            }
            writer.write_all(&fragment.as_bytes()[start..idx])?;
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                write!(writer, "\\u{:04x}", unit)?;
            }
            start = idx + c.len_utf8();
        }
        writer.write_all(&fragment.as_bytes()[start..])
    }
}

pub(crate) fn to_spaced_json(value: &Value) -> Result<String, Error> {
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
