#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use futures::StreamExt;
use mediameta_metadata::transport::{HttpRequest, HttpResponse, Method, Transport};
use mediameta_metadata::{Metadata, MetadataError, MetadataStream, ProviderOptions};

type Handler = Box<dyn Fn(&HttpRequest) -> HttpResponse + Send + Sync>;

/// Answers every request with a scripted handler and records what was sent.
pub struct MockTransport {
    handler: Handler,
    calls: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new(handler: impl Fn(&HttpRequest) -> HttpResponse + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<HttpRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&HttpRequest) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|r| pred(r)).count()
    }

    pub fn logins(&self) -> usize {
        self.count(|r| r.method == Method::Post && r.url.ends_with("/login"))
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, MetadataError> {
        let response = (self.handler)(&request);
        self.calls.lock().unwrap().push(request);
        Ok(response)
    }
}

/// Options with dummy credentials routed through `transport`.
pub fn options(transport: &Arc<MockTransport>) -> ProviderOptions {
    ProviderOptions::new()
        .api_key("test-key")
        .pin("test-pin")
        .transport(transport.clone())
}

pub fn missing() -> HttpResponse {
    HttpResponse::new(404, None)
}

pub fn unauthorized() -> HttpResponse {
    HttpResponse::new(401, None)
}

/// Drains a stream, splitting delivered records from the terminal error.
pub async fn collect(mut stream: MetadataStream<'_>) -> (Vec<Metadata>, Option<MetadataError>) {
    let mut records = Vec::new();
    while let Some(item) = stream.next().await {
        match item {
            Ok(meta) => records.push(meta),
            Err(e) => return (records, Some(e)),
        }
    }
    (records, None)
}
