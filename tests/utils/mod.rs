use bytes::Bytes;
use httpmock_adapter::{Adapter, Error, RequestView, Response, Transport, TransportOptions};

pub fn request(method: &str, url: &str) -> http::Request<Bytes> {
    http::Request::builder()
        .method(method)
        .uri(url)
        .body(Bytes::new())
        .unwrap()
}

pub fn request_with_body<B: Into<Bytes>>(
    method: &str,
    url: &str,
    headers: &[(&str, &str)],
    body: B,
) -> http::Request<Bytes> {
    let mut builder = http::Request::builder().method(method).uri(url);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(body.into()).unwrap()
}

pub fn view(method: &str, url: &str) -> RequestView {
    RequestView::new(request(method, url), TransportOptions::default())
}

pub fn send(adapter: &Adapter, method: &str, url: &str) -> Result<Response, Error> {
    adapter.send(request(method, url), TransportOptions::default())
}

/// Stands in for the network.
pub struct RealTransport;

impl Transport for RealTransport {
    fn send(&self, _: http::Request<Bytes>, _: TransportOptions) -> Result<Response, Error> {
        Response::builder().status_code(299).text("real response").build()
    }
}
