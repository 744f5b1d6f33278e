use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use crate::broker::{ConsumeOutcome, ConsumeRequest, ConsumeResponse};
use tower::{Layer, Service};
use tracing::{error, info, warn, Instrument, Span};

/// Tower layer logging one line per consumed device event: event kind,
/// owning entity, outcome with its reason, and handling time
#[derive(Clone, Default)]
pub struct ConsumeLoggingLayer;

impl ConsumeLoggingLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for ConsumeLoggingLayer {
    type Service = ConsumeLoggingService<S>;

    fn layer(&self, service: S) -> Self::Service {
        ConsumeLoggingService { inner: service }
    }
}

#[derive(Clone)]
pub struct ConsumeLoggingService<S> {
    inner: S,
}

impl<S> Service<ConsumeRequest> for ConsumeLoggingService<S>
where
    S: Service<ConsumeRequest, Response = ConsumeResponse> + Clone + Send + 'static,
    S::Error: std::fmt::Display + Send,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: ConsumeRequest) -> Self::Future {
        let channel = req.channel.clone();
        let start = Instant::now();
        let mut inner = self.inner.clone();

        let span = Span::current();

        Box::pin(
            async move {
                let result = inner.call(req).await;
                let duration_ms = start.elapsed().as_millis() as u64;

                match &result {
                    Ok(response) => log_response(&channel, response, duration_ms),
                    Err(e) => error!(
                        channel = %channel,
                        duration_ms,
                        error = %e,
                        "failed to handle message from {channel}: {e}"
                    ),
                }

                result
            }
            .instrument(span),
        )
    }
}

fn log_response(channel: &str, response: &ConsumeResponse, duration_ms: u64) {
    let kind = response.kind.as_str();
    let subject = response.subject.as_ref().map(ToString::to_string);
    let outcome = response.outcome.as_str();
    let settle = if response.is_ack() { "ack" } else { "nak" };

    match &response.outcome {
        ConsumeOutcome::Processed => info!(
            channel = %channel,
            event_kind = kind,
            subject = subject.as_deref(),
            outcome,
            settle,
            duration_ms,
            "{kind} handled in {duration_ms}ms"
        ),
        ConsumeOutcome::Rejected(reason) => warn!(
            channel = %channel,
            event_kind = kind,
            subject = subject.as_deref(),
            outcome,
            settle,
            reason = %reason,
            duration_ms,
            "{kind} rejected: {reason}"
        ),
        ConsumeOutcome::Undecodable(reason) => error!(
            channel = %channel,
            event_kind = kind,
            outcome,
            settle,
            reason = %reason,
            "dropping undecodable {kind}: {reason}"
        ),
        ConsumeOutcome::Retry(reason) => error!(
            channel = %channel,
            event_kind = kind,
            subject = subject.as_deref(),
            outcome,
            settle,
            reason = %reason,
            duration_ms,
            "{kind} failed, requesting redelivery: {reason}"
        ),
    }
}
