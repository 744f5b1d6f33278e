use crate::domain::EventRouter;
use common::broker::{ConsumeRequest, ConsumeResponse};
use common::domain::{DomainEvent, DomainEventKind};
use futures::future::BoxFuture;
use std::task::{Context, Poll};
use tower::Service;

/// Tower service for one event channel.
///
/// This service:
/// 1. Decodes the JSON body as the channel's event kind
/// 2. Routes the event to the lifecycle services
/// 3. Settles from the routing result: permanent failures (malformed
///    payload, missing device, invalid schedule) ack, transient ones nak
#[derive(Clone)]
pub struct DeviceEventService {
    kind: DomainEventKind,
    router: EventRouter,
}

impl DeviceEventService {
    pub fn new(kind: DomainEventKind, router: EventRouter) -> Self {
        Self { kind, router }
    }
}

impl Service<ConsumeRequest> for DeviceEventService {
    type Response = ConsumeResponse;
    type Error = anyhow::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ConsumeRequest) -> Self::Future {
        let router = self.router.clone();
        let kind = self.kind;

        Box::pin(async move {
            let event = match DomainEvent::decode(kind, &req.payload) {
                Ok(event) => event,
                // redelivery cannot fix a malformed body
                Err(e) => return Ok(ConsumeResponse::undecodable(kind, e)),
            };

            let result = router.route(event.clone()).await;
            Ok(ConsumeResponse::from_result(&event, &result))
        })
    }
}
