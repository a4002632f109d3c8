// src/http/testing.rs

//! In-memory transport for tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{HttpRequest, HttpResponse, ResilientClient, RetryPolicy, Transport};
use crate::error::{AppError, Result};

/// Replays queued responses in order, then a fixed fallback.
///
/// Routed responses (matched by URL substring) take precedence over the queue
/// and can be served any number of times.
pub(crate) struct ScriptedTransport {
    queue: Mutex<VecDeque<Result<HttpResponse>>>,
    routes: Mutex<Vec<(String, HttpResponse)>>,
    fallback: HttpResponse,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    /// Unmatched requests get a 404, which the client never retries.
    pub fn new() -> Self {
        Self::with_fallback(HttpResponse::new(404, ""))
    }

    pub fn with_fallback(fallback: HttpResponse) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            routes: Mutex::new(Vec::new()),
            fallback,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push(self, response: HttpResponse) -> Self {
        self.queue.lock().unwrap().push_back(Ok(response));
        self
    }

    pub fn push_error(self, message: &str) -> Self {
        self.queue
            .lock()
            .unwrap()
            .push_back(Err(AppError::validation(message)));
        self
    }

    pub fn route(self, url_fragment: &str, response: HttpResponse) -> Self {
        self.routes
            .lock()
            .unwrap()
            .push((url_fragment.to_string(), response));
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Wrap in a client with the default retry policy.
    pub fn into_client(self) -> (Arc<Self>, ResilientClient) {
        let transport = Arc::new(self);
        let client = ResilientClient::new(transport.clone(), RetryPolicy::default());
        (transport, client)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(request.clone());

        let routed = self
            .routes
            .lock()
            .unwrap()
            .iter()
            .find(|(fragment, _)| request.url.contains(fragment.as_str()))
            .map(|(_, response)| response.clone());
        if let Some(response) = routed {
            return Ok(response);
        }

        match self.queue.lock().unwrap().pop_front() {
            Some(next) => next,
            None => Ok(self.fallback.clone()),
        }
    }
}
