//! Order lifecycle events, published to NATS when a client is configured.
//!
//! Publishing is best-effort: downstream consumers (fulfillment, analytics)
//! observe the store of record anyway, so a failed publish is logged and
//! never fails the request that produced it.

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent<'a> {
    Created {
        order_id: Uuid,
        user_id: &'a str,
        total_amount: i64,
    },
    Confirmed {
        order_id: Uuid,
        user_id: &'a str,
        total_amount: i64,
    },
}

impl OrderEvent<'_> {
    pub fn subject(&self) -> &'static str {
        match self {
            OrderEvent::Created { .. } => "orders.created",
            OrderEvent::Confirmed { .. } => "orders.confirmed",
        }
    }
}

pub async fn publish(nats: Option<&async_nats::Client>, event: &OrderEvent<'_>) {
    let Some(client) = nats else {
        return;
    };
    let payload = match serde_json::to_vec(event) {
        Ok(payload) => payload,
        Err(error) => {
            tracing::warn!(%error, "event serialization failed");
            return;
        }
    };
    if let Err(error) = client.publish(event.subject(), payload.into()).await {
        tracing::warn!(%error, subject = event.subject(), "event publish failed");
    }
}
