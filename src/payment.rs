//! Payment confirmation and the narrow interface to the client-side widget.
//!
//! The widget itself is a third-party script running in the browser; this
//! service only hands it the session parameters and receives its callback.
//! Verification here is amount/identity matching against the stored order —
//! gateway-side verification is the gateway's own responsibility.

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{Order, OrderItem, OrderStatus, OrderWithItems};

/// Everything the client-side payment widget needs to collect a payment
/// for one order and report back.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSession {
    pub order_id: Uuid,
    pub amount: i64,
    pub order_name: String,
    pub customer_name: Option<String>,
    pub client_key: String,
    pub success_url: String,
    pub fail_url: String,
}

/// Builds the widget parameters for a pending order.
pub fn checkout_session(config: &Config, order: &OrderWithItems) -> Result<CheckoutSession> {
    if order.order.status != OrderStatus::Pending {
        return Err(Error::AlreadyProcessed);
    }
    Ok(CheckoutSession {
        order_id: order.order.id,
        amount: order.order.total_amount,
        order_name: order_display_name(&order.items),
        customer_name: order
            .order
            .shipping_address
            .as_ref()
            .map(|addr| addr.recipient.clone()),
        client_key: config.payment_client_key.clone(),
        success_url: format!("{}/payment/success", config.public_base_url),
        fail_url: format!("{}/payment/fail", config.public_base_url),
    })
}

fn order_display_name(items: &[OrderItem]) -> String {
    match items {
        [] => "Order".to_string(),
        [only] => only.product_name.clone(),
        [first, rest @ ..] => format!("{} and {} more", first.product_name, rest.len()),
    }
}

/// Confirms a client-reported payment against the stored order.
///
/// The amount must equal the stored total exactly (integer minor-unit-free
/// values, no rounding tolerance) and the order must still be pending. The
/// status flip is filtered by `(id, user_id, status)` so a concurrent
/// confirmation or a cross-tenant call cannot slip through.
pub async fn confirm_payment(
    pool: &PgPool,
    user_id: &str,
    payment_reference: &str,
    order_id: Uuid,
    amount: i64,
) -> Result<Order> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 AND user_id = $2")
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(Error::OrderNotFound)?;

    if order.total_amount != amount {
        return Err(Error::AmountMismatch);
    }
    if order.status != OrderStatus::Pending {
        return Err(Error::AlreadyProcessed);
    }

    let confirmed = sqlx::query_as::<_, Order>(
        "UPDATE orders SET status = 'confirmed', updated_at = NOW() \
         WHERE id = $1 AND user_id = $2 AND status = 'pending' RETURNING *",
    )
    .bind(order_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(Error::AlreadyProcessed)?;

    tracing::info!(%order_id, payment_reference, "payment confirmed");
    Ok(confirmed)
}
