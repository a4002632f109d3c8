//! Outbound HTTP with retry and backoff.

mod client;
mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{FetchOutcome, ResilientClient, RetryPolicy, TERMINAL_STATUSES};
pub use transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport};
