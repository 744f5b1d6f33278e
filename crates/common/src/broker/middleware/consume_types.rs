use crate::domain::{DomainEvent, DomainEventKind, DomainResult, EventSubject};
use bytes::Bytes;
use std::collections::HashMap;
use std::fmt::Display;

/// One delivered message handed to a consume service.
///
/// Owns its data so it can pass through Tower layers freely.
#[derive(Debug, Clone)]
pub struct ConsumeRequest {
    pub channel: String,
    pub payload: Bytes,
    pub headers: HashMap<String, Bytes>,
}

impl ConsumeRequest {
    pub fn new(channel: impl Into<String>, payload: Bytes, headers: HashMap<String, Bytes>) -> Self {
        Self {
            channel: channel.into(),
            payload,
            headers,
        }
    }
}

/// How handling a device event ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumeOutcome {
    Processed,
    /// Body is not a valid event for the channel
    Undecodable(String),
    /// Permanent domain failure (validation, missing device, bad cron)
    Rejected(String),
    /// Transient domain failure, the message is requeued
    Retry(String),
}

impl ConsumeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsumeOutcome::Processed => "processed",
            ConsumeOutcome::Undecodable(_) => "undecodable",
            ConsumeOutcome::Rejected(_) => "rejected",
            ConsumeOutcome::Retry(_) => "retry",
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            ConsumeOutcome::Processed => None,
            ConsumeOutcome::Undecodable(r)
            | ConsumeOutcome::Rejected(r)
            | ConsumeOutcome::Retry(r) => Some(r),
        }
    }
}

/// Settlement decided by a consume service, with what the event was about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumeResponse {
    pub kind: DomainEventKind,
    /// `None` when the body could not be decoded
    pub subject: Option<EventSubject>,
    pub outcome: ConsumeOutcome,
}

impl ConsumeResponse {
    pub fn undecodable(kind: DomainEventKind, error: impl Display) -> Self {
        Self {
            kind,
            subject: None,
            outcome: ConsumeOutcome::Undecodable(error.to_string()),
        }
    }

    /// Settle a routed event. Only retryable domain errors requeue.
    pub fn from_result(event: &DomainEvent, result: &DomainResult<()>) -> Self {
        let outcome = match result {
            Ok(()) => ConsumeOutcome::Processed,
            Err(e) if e.is_retryable() => ConsumeOutcome::Retry(e.to_string()),
            Err(e) => ConsumeOutcome::Rejected(e.to_string()),
        };
        Self {
            kind: event.kind(),
            subject: Some(event.subject()),
            outcome,
        }
    }

    pub fn is_ack(&self) -> bool {
        !self.is_nak()
    }

    pub fn is_nak(&self) -> bool {
        matches!(self.outcome, ConsumeOutcome::Retry(_))
    }

    pub fn reason(&self) -> Option<&str> {
        self.outcome.reason()
    }
}
