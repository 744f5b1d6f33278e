use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::broker::{extract_trace_context, ConsumeRequest, ConsumeResponse};
use tower::{Layer, Service};
use tracing::{info_span, Instrument};
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Tower layer that opens a consume span per message, parented on the
/// trace context carried in the message headers
#[derive(Clone, Default)]
pub struct ConsumeTracingLayer;

impl ConsumeTracingLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for ConsumeTracingLayer {
    type Service = ConsumeTracingService<S>;

    fn layer(&self, service: S) -> Self::Service {
        ConsumeTracingService { inner: service }
    }
}

#[derive(Clone)]
pub struct ConsumeTracingService<S> {
    inner: S,
}

impl<S> Service<ConsumeRequest> for ConsumeTracingService<S>
where
    S: Service<ConsumeRequest, Response = ConsumeResponse> + Clone + Send + 'static,
    S::Error: Send,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: ConsumeRequest) -> Self::Future {
        let span = info_span!(
            "broker_consume",
            otel.name = %format!("{} receive", req.channel),
            messaging.system = "nats",
            messaging.operation = "receive",
            messaging.destination.name = %req.channel,
            messaging.message.body.size = req.payload.len(),
        );
        span.set_parent(extract_trace_context(&req.headers));

        let mut inner = self.inner.clone();
        Box::pin(async move { inner.call(req).await }.instrument(span))
    }
}
