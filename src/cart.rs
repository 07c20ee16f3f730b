//! Cart operations, owner-scoped by caller identity.
//!
//! Ownership is enforced by filtering on `user_id` inside each statement,
//! never as a separate lookup a concurrent request could slip between.

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{CartItem, CartItemWithProduct};

const CART_WITH_PRODUCT: &str = "SELECT ci.id, ci.user_id, ci.product_id, ci.quantity, \
     ci.created_at, ci.updated_at, \
     p.name AS product_name, p.price, p.category AS product_category, \
     p.stock_quantity, p.is_active \
     FROM cart_items ci JOIN products p ON p.id = ci.product_id \
     WHERE ci.user_id = $1 ORDER BY ci.created_at DESC";

/// The caller's cart, newest first, with product snapshot columns joined in.
pub async fn get_cart_items(pool: &PgPool, user_id: &str) -> Result<Vec<CartItemWithProduct>> {
    let items = sqlx::query_as::<_, CartItemWithProduct>(CART_WITH_PRODUCT)
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    Ok(items)
}

/// Adds `quantity` of a product to the caller's cart, merging with an
/// existing row for the same product.
///
/// The merged quantity may not exceed the product's current stock; the
/// rejection carries the available count for display.
pub async fn add_to_cart(
    pool: &PgPool,
    user_id: &str,
    product_id: Uuid,
    quantity: i32,
) -> Result<CartItem> {
    if quantity <= 0 {
        return Err(Error::InvalidQuantity);
    }

    let product = sqlx::query_as::<_, (String, i32, bool)>(
        "SELECT name, stock_quantity, is_active FROM products WHERE id = $1",
    )
    .bind(product_id)
    .fetch_optional(pool)
    .await?;
    let (name, stock_quantity, is_active) = product.ok_or(Error::ProductNotFound)?;
    if !is_active {
        return Err(Error::ProductInactive(name));
    }

    let existing = sqlx::query_scalar::<_, i32>(
        "SELECT quantity FROM cart_items WHERE user_id = $1 AND product_id = $2",
    )
    .bind(user_id)
    .bind(product_id)
    .fetch_optional(pool)
    .await?;

    let new_quantity = existing.unwrap_or(0) + quantity;
    if new_quantity > stock_quantity {
        return Err(Error::InsufficientStock { product: name, available: stock_quantity });
    }

    let item = sqlx::query_as::<_, CartItem>(
        "INSERT INTO cart_items (id, user_id, product_id, quantity, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, NOW(), NOW()) \
         ON CONFLICT (user_id, product_id) \
         DO UPDATE SET quantity = EXCLUDED.quantity, updated_at = NOW() \
         RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(user_id)
    .bind(product_id)
    .bind(new_quantity)
    .fetch_one(pool)
    .await?;
    Ok(item)
}

/// Sets the quantity of one of the caller's cart rows.
pub async fn update_cart_item_quantity(
    pool: &PgPool,
    user_id: &str,
    cart_item_id: Uuid,
    quantity: i32,
) -> Result<CartItem> {
    if quantity <= 0 {
        return Err(Error::InvalidQuantity);
    }

    let row = sqlx::query_as::<_, (String, i32)>(
        "SELECT p.name, p.stock_quantity FROM cart_items ci \
         JOIN products p ON p.id = ci.product_id \
         WHERE ci.id = $1 AND ci.user_id = $2",
    )
    .bind(cart_item_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    let (name, stock_quantity) = row.ok_or(Error::CartItemNotFound)?;
    if quantity > stock_quantity {
        return Err(Error::InsufficientStock { product: name, available: stock_quantity });
    }

    let item = sqlx::query_as::<_, CartItem>(
        "UPDATE cart_items SET quantity = $3, updated_at = NOW() \
         WHERE id = $1 AND user_id = $2 RETURNING *",
    )
    .bind(cart_item_id)
    .bind(user_id)
    .bind(quantity)
    .fetch_one(pool)
    .await?;
    Ok(item)
}

/// Removes one of the caller's cart rows. Removing an absent row succeeds.
pub async fn remove_from_cart(pool: &PgPool, user_id: &str, cart_item_id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
        .bind(cart_item_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Empties the caller's cart.
pub async fn clear_cart(pool: &PgPool, user_id: &str) -> Result<()> {
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Number of rows in the caller's cart.
///
/// Fails open: unauthenticated callers and storage failures both yield 0,
/// so the cart badge never breaks a page.
pub async fn get_cart_item_count(pool: &PgPool, user_id: Option<&str>) -> i64 {
    let Some(user_id) = user_id else {
        return 0;
    };
    match sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM cart_items WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
    {
        Ok(count) => count,
        Err(error) => {
            tracing::warn!(%error, "cart count query failed, returning 0");
            0
        }
    }
}
