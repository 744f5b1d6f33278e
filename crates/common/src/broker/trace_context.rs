use bytes::Bytes;
use opentelemetry::{
    global,
    propagation::{Extractor, Injector},
    Context,
};
use std::collections::HashMap;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// W3C Trace Context header names
pub const TRACEPARENT: &str = "traceparent";
pub const TRACESTATE: &str = "tracestate";

struct HeaderInjector<'a>(&'a mut HashMap<String, Bytes>);

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        self.0.insert(key.to_string(), Bytes::from(value));
    }
}

struct HeaderExtractor<'a>(&'a HashMap<String, Bytes>);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| std::str::from_utf8(v).ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }
}

/// Inject the current span's trace context into message headers.
///
/// Call before publishing so consumers continue the producer's trace.
pub fn inject_trace_context(headers: &mut HashMap<String, Bytes>) {
    global::get_text_map_propagator(|propagator| {
        let ctx = tracing::Span::current().context();
        propagator.inject_context(&ctx, &mut HeaderInjector(headers));
    });
}

pub fn extract_trace_context(headers: &HashMap<String, Bytes>) -> Context {
    global::get_text_map_propagator(|propagator| propagator.extract(&HeaderExtractor(headers)))
}

/// Set the parent of the current span from propagated message headers
pub fn set_parent_from_headers(headers: &HashMap<String, Bytes>) {
    let ctx = extract_trace_context(headers);
    tracing::Span::current().set_parent(ctx);
}
