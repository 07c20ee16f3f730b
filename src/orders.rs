//! Order creation and retrieval.
//!
//! Creating an order converts the caller's cart into an order plus snapshot
//! line items, decrements stock and clears the cart. Order insert, line-item
//! insert and stock decrement run in one Postgres transaction; the decrement
//! is conditional (`stock_quantity >= quantity`), so two checkouts racing
//! over the same product cannot oversell — the loser rolls back whole.
//! Cart cleanup after commit is best-effort and never fails the order.

use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::cart;
use crate::error::{Error, Result};
use crate::models::{CartItemWithProduct, Order, OrderItem, OrderWithItems, ShippingAddress};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[validate]
    pub shipping_address: ShippingAddress,
    pub order_note: Option<String>,
}

/// Snapshot of one cart line at order time, immune to later catalog edits.
#[derive(Debug, Clone)]
struct OrderLine {
    product_id: Uuid,
    product_name: String,
    price: i64,
    quantity: i32,
}

/// Validates every cart line against current stock and the active flag,
/// failing fast with the offending product, and accumulates the total.
fn build_order_lines(items: &[CartItemWithProduct]) -> Result<(i64, Vec<OrderLine>)> {
    let mut total_amount = 0i64;
    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        if item.quantity > item.stock_quantity {
            return Err(Error::InsufficientStock {
                product: item.product_name.clone(),
                available: item.stock_quantity,
            });
        }
        if !item.is_active {
            return Err(Error::ProductInactive(item.product_name.clone()));
        }
        total_amount += item.line_total();
        lines.push(OrderLine {
            product_id: item.product_id,
            product_name: item.product_name.clone(),
            price: item.price,
            quantity: item.quantity,
        });
    }
    Ok((total_amount, lines))
}

/// Creates a pending order from the caller's cart.
pub async fn create_order(
    pool: &PgPool,
    user_id: &str,
    request: &CreateOrderRequest,
) -> Result<OrderWithItems> {
    request.validate().map_err(Error::InvalidAddress)?;

    let cart_items = cart::get_cart_items(pool, user_id).await?;
    if cart_items.is_empty() {
        return Err(Error::CartEmpty);
    }
    let (total_amount, lines) = build_order_lines(&cart_items)?;

    let mut tx = pool.begin().await?;

    let order = sqlx::query_as::<_, Order>(
        "INSERT INTO orders \
         (id, user_id, total_amount, status, shipping_address, order_note, created_at, updated_at) \
         VALUES ($1, $2, $3, 'pending', $4, $5, NOW(), NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(user_id)
    .bind(total_amount)
    .bind(sqlx::types::Json(&request.shipping_address))
    .bind(&request.order_note)
    .fetch_one(&mut *tx)
    .await?;

    for line in &lines {
        sqlx::query(
            "INSERT INTO order_items \
             (id, order_id, product_id, product_name, price, quantity, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, NOW())",
        )
        .bind(Uuid::now_v7())
        .bind(order.id)
        .bind(line.product_id)
        .bind(&line.product_name)
        .bind(line.price)
        .bind(line.quantity)
        .execute(&mut *tx)
        .await?;
    }

    for line in &lines {
        let updated = sqlx::query(
            "UPDATE products SET stock_quantity = stock_quantity - $2, updated_at = NOW() \
             WHERE id = $1 AND stock_quantity >= $2",
        )
        .bind(line.product_id)
        .bind(line.quantity)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            // A concurrent checkout took the stock between the pre-check
            // and the decrement.
            let available =
                sqlx::query_scalar::<_, i32>("SELECT stock_quantity FROM products WHERE id = $1")
                    .bind(line.product_id)
                    .fetch_optional(&mut *tx)
                    .await?
                    .unwrap_or(0);
            tx.rollback().await?;
            return Err(Error::InsufficientStock {
                product: line.product_name.clone(),
                available,
            });
        }
    }

    tx.commit().await?;

    if let Err(error) = cart::clear_cart(pool, user_id).await {
        tracing::warn!(%error, order_id = %order.id, "cart cleanup after order creation failed");
    }

    get_order_by_id(pool, user_id, order.id)
        .await?
        .ok_or(Error::OrderNotFound)
}

/// One of the caller's orders with its items, or `None` when no such row.
pub async fn get_order_by_id(
    pool: &PgPool,
    user_id: &str,
    order_id: Uuid,
) -> Result<Option<OrderWithItems>> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 AND user_id = $2")
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    let Some(order) = order else {
        return Ok(None);
    };
    let items = order_items(pool, order.id).await?;
    Ok(Some(OrderWithItems { order, items }))
}

/// The caller's orders, newest first, each with items.
pub async fn get_orders(pool: &PgPool, user_id: &str) -> Result<Vec<OrderWithItems>> {
    let orders = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let mut result = Vec::with_capacity(orders.len());
    for order in orders {
        let items = order_items(pool, order.id).await?;
        result.push(OrderWithItems { order, items });
    }
    Ok(result)
}

async fn order_items(pool: &PgPool, order_id: Uuid) -> Result<Vec<OrderItem>> {
    // created_at is the transaction timestamp, identical across one order's
    // lines; the v7 id preserves insertion order.
    let items = sqlx::query_as::<_, OrderItem>(
        "SELECT * FROM order_items WHERE order_id = $1 ORDER BY created_at ASC, id ASC",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn cart_item(name: &str, price: i64, quantity: i32, stock: i32, active: bool) -> CartItemWithProduct {
        CartItemWithProduct {
            id: Uuid::now_v7(),
            user_id: "user_1".into(),
            product_id: Uuid::now_v7(),
            quantity,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            product_name: name.into(),
            price,
            product_category: None,
            stock_quantity: stock,
            is_active: active,
        }
    }

    #[test]
    fn test_total_is_sum_of_price_times_quantity() {
        let items = vec![
            cart_item("Mug", 12_000, 2, 10, true),
            cart_item("Poster", 5_500, 3, 5, true),
        ];
        let (total, lines) = build_order_lines(&items).unwrap();
        assert_eq!(total, 12_000 * 2 + 5_500 * 3);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].product_name, "Mug");
        assert_eq!(lines[0].price, 12_000);
        assert_eq!(lines[0].quantity, 2);
    }

    #[test]
    fn test_rejects_line_over_stock_naming_product() {
        let items = vec![
            cart_item("Mug", 12_000, 2, 10, true),
            cart_item("Poster", 5_500, 6, 5, true),
        ];
        let err = build_order_lines(&items).unwrap_err();
        match err {
            Error::InsufficientStock { product, available } => {
                assert_eq!(product, "Poster");
                assert_eq!(available, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_inactive_product() {
        let items = vec![cart_item("Mug", 12_000, 1, 10, false)];
        let err = build_order_lines(&items).unwrap_err();
        assert!(matches!(err, Error::ProductInactive(name) if name == "Mug"));
    }

    #[test]
    fn test_stock_check_runs_before_active_check() {
        // Matches the storefront UI contract: out-of-stock wins over retired.
        let items = vec![cart_item("Mug", 12_000, 3, 1, false)];
        let err = build_order_lines(&items).unwrap_err();
        assert!(matches!(err, Error::InsufficientStock { .. }));
    }
}
