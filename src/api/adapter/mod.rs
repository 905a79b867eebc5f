use crate::{
    common::data::{Error, TransportOptions},
    server::response::Response,
};
use bytes::Bytes;

pub mod local;

/// The transport-adapter abstraction of the host HTTP client: something a prepared request
/// can be sent through.
///
/// Implementations are used from a single thread and receive the per-call options the
/// client was given.
pub trait Transport {
    fn send(&self, request: http::Request<Bytes>, options: TransportOptions)
        -> Result<Response, Error>;

    fn close(&self) {}
}
