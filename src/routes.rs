//! HTTP surface: the router and thin handlers over the operation modules.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::auth::{Identity, MaybeIdentity};
use crate::cart;
use crate::catalog::{self, ProductQuery, ProductSort, SortOrder};
use crate::error::{Error, Result};
use crate::events::{self, OrderEvent};
use crate::models::{CartItem, CartItemWithProduct, Order, OrderWithItems, Product, Task};
use crate::orders::{self, CreateOrderRequest};
use crate::payment::{self, CheckoutSession};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/products", get(list_products))
        .route("/api/v1/products/:id", get(get_product))
        .route("/api/v1/categories", get(get_categories))
        .route("/api/v1/cart", get(get_cart).post(add_to_cart).delete(clear_cart))
        .route("/api/v1/cart/count", get(cart_count))
        .route("/api/v1/cart/:id", axum::routing::put(update_cart_item).delete(remove_cart_item))
        .route("/api/v1/orders", get(list_orders).post(create_order))
        .route("/api/v1/orders/:id", get(get_order))
        .route("/api/v1/orders/:id/checkout", get(checkout_session))
        .route("/api/v1/payments/confirm", post(confirm_payment))
        .route("/payment/success", get(payment_success))
        .route("/payment/fail", get(payment_fail))
        .route("/api/v1/tasks", get(list_tasks).post(add_task))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "healthy", "service": "storefront"}))
}

// --- catalog ---

#[derive(Debug, Deserialize)]
struct ListProductsParams {
    category: Option<String>,
    sort_by: Option<ProductSort>,
    sort_order: Option<SortOrder>,
    limit: Option<i64>,
    page: Option<i64>,
    page_size: Option<i64>,
    active_only: Option<bool>,
}

impl ListProductsParams {
    fn query(&self) -> ProductQuery {
        ProductQuery {
            active_only: self.active_only.unwrap_or(true),
            category: self.category.clone(),
            sort_by: self.sort_by.unwrap_or_default(),
            sort_order: self.sort_order.unwrap_or_default(),
            limit: self.limit,
        }
    }
}

async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ListProductsParams>,
) -> Result<Response> {
    let query = params.query();
    match (params.page, params.page_size) {
        (Some(page), Some(page_size)) => {
            let page = catalog::list_products_paginated(&state.db, &query, page, page_size).await?;
            Ok(Json(page).into_response())
        }
        _ => {
            let products = catalog::list_products(&state.db, &query).await?;
            Ok(Json(products).into_response())
        }
    }
}

async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>> {
    catalog::get_product_by_id(&state.db, id)
        .await?
        .map(Json)
        .ok_or(Error::ProductNotFound)
}

async fn get_categories(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    Ok(Json(catalog::get_categories(&state.db).await?))
}

// --- cart ---

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
struct AddToCartRequest {
    product_id: Uuid,
    #[serde(default = "default_quantity")]
    quantity: i32,
}

async fn get_cart(
    State(state): State<AppState>,
    Identity(user_id): Identity,
) -> Result<Json<Vec<CartItemWithProduct>>> {
    Ok(Json(cart::get_cart_items(&state.db, &user_id).await?))
}

async fn add_to_cart(
    State(state): State<AppState>,
    Identity(user_id): Identity,
    Json(request): Json<AddToCartRequest>,
) -> Result<(StatusCode, Json<CartItem>)> {
    let item = cart::add_to_cart(&state.db, &user_id, request.product_id, request.quantity).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn cart_count(
    State(state): State<AppState>,
    MaybeIdentity(user_id): MaybeIdentity,
) -> Json<serde_json::Value> {
    let count = cart::get_cart_item_count(&state.db, user_id.as_deref()).await;
    Json(serde_json::json!({"count": count}))
}

#[derive(Debug, Deserialize)]
struct UpdateQuantityRequest {
    quantity: i32,
}

async fn update_cart_item(
    State(state): State<AppState>,
    Identity(user_id): Identity,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateQuantityRequest>,
) -> Result<Json<CartItem>> {
    let item = cart::update_cart_item_quantity(&state.db, &user_id, id, request.quantity).await?;
    Ok(Json(item))
}

async fn remove_cart_item(
    State(state): State<AppState>,
    Identity(user_id): Identity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    cart::remove_from_cart(&state.db, &user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn clear_cart(
    State(state): State<AppState>,
    Identity(user_id): Identity,
) -> Result<StatusCode> {
    cart::clear_cart(&state.db, &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- orders ---

async fn list_orders(
    State(state): State<AppState>,
    Identity(user_id): Identity,
) -> Result<Json<Vec<OrderWithItems>>> {
    Ok(Json(orders::get_orders(&state.db, &user_id).await?))
}

async fn create_order(
    State(state): State<AppState>,
    Identity(user_id): Identity,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderWithItems>)> {
    let order = orders::create_order(&state.db, &user_id, &request).await?;
    events::publish(
        state.nats.as_ref(),
        &OrderEvent::Created {
            order_id: order.order.id,
            user_id: &user_id,
            total_amount: order.order.total_amount,
        },
    )
    .await;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn get_order(
    State(state): State<AppState>,
    Identity(user_id): Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderWithItems>> {
    orders::get_order_by_id(&state.db, &user_id, id)
        .await?
        .map(Json)
        .ok_or(Error::OrderNotFound)
}

async fn checkout_session(
    State(state): State<AppState>,
    Identity(user_id): Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<CheckoutSession>> {
    let order = orders::get_order_by_id(&state.db, &user_id, id)
        .await?
        .ok_or(Error::OrderNotFound)?;
    Ok(Json(payment::checkout_session(&state.config, &order)?))
}

// --- payment ---

#[derive(Debug, Deserialize)]
struct ConfirmPaymentRequest {
    payment_reference: String,
    order_id: Uuid,
    amount: i64,
}

async fn confirm_payment(
    State(state): State<AppState>,
    Identity(user_id): Identity,
    Json(request): Json<ConfirmPaymentRequest>,
) -> Result<Json<Order>> {
    let order = payment::confirm_payment(
        &state.db,
        &user_id,
        &request.payment_reference,
        request.order_id,
        request.amount,
    )
    .await?;
    events::publish(
        state.nats.as_ref(),
        &OrderEvent::Confirmed {
            order_id: order.id,
            user_id: &user_id,
            total_amount: order.total_amount,
        },
    )
    .await;
    Ok(Json(order))
}

/// Success callback from the payment widget redirect. Query parameter names
/// are the widget's, not ours.
#[derive(Debug, Deserialize)]
struct PaymentSuccessParams {
    #[serde(rename = "paymentKey")]
    payment_key: String,
    #[serde(rename = "orderId")]
    order_id: Uuid,
    amount: i64,
}

async fn payment_success(
    State(state): State<AppState>,
    Identity(user_id): Identity,
    Query(params): Query<PaymentSuccessParams>,
) -> Result<Json<serde_json::Value>> {
    let order = payment::confirm_payment(
        &state.db,
        &user_id,
        &params.payment_key,
        params.order_id,
        params.amount,
    )
    .await?;
    events::publish(
        state.nats.as_ref(),
        &OrderEvent::Confirmed {
            order_id: order.id,
            user_id: &user_id,
            total_amount: order.total_amount,
        },
    )
    .await;
    Ok(Json(serde_json::json!({"success": true, "order_id": order.id})))
}

#[derive(Debug, Deserialize)]
struct PaymentFailParams {
    code: Option<String>,
    message: Option<String>,
    #[serde(rename = "orderId")]
    order_id: Option<Uuid>,
}

async fn payment_fail(Query(params): Query<PaymentFailParams>) -> Json<serde_json::Value> {
    tracing::warn!(
        order_id = ?params.order_id,
        code = params.code.as_deref().unwrap_or("unknown"),
        message = params.message.as_deref().unwrap_or(""),
        "payment failed at the widget"
    );
    Json(serde_json::json!({
        "success": false,
        "code": params.code,
        "message": params.message,
        "order_id": params.order_id,
    }))
}

// --- tasks probe ---

#[derive(Debug, Deserialize)]
struct AddTaskRequest {
    name: String,
}

async fn add_task(
    State(state): State<AppState>,
    Identity(user_id): Identity,
    Json(request): Json<AddTaskRequest>,
) -> Result<(StatusCode, Json<Task>)> {
    let task = sqlx::query_as::<_, Task>(
        "INSERT INTO tasks (id, user_id, name, created_at) VALUES ($1, $2, $3, NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&user_id)
    .bind(&request.name)
    .fetch_one(&state.db)
    .await?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn list_tasks(
    State(state): State<AppState>,
    Identity(user_id): Identity,
) -> Result<Json<Vec<Task>>> {
    let tasks = sqlx::query_as::<_, Task>(
        "SELECT * FROM tasks WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(&user_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(tasks))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_to_cart_defaults_to_one() {
        let request: AddToCartRequest =
            serde_json::from_value(serde_json::json!({"product_id": Uuid::now_v7()})).unwrap();
        assert_eq!(request.quantity, 1);
    }

    #[test]
    fn test_success_callback_uses_widget_param_names() {
        let params: PaymentSuccessParams = serde_json::from_value(serde_json::json!({
            "paymentKey": "pay_abc",
            "orderId": Uuid::now_v7(),
            "amount": 29000
        }))
        .unwrap();
        assert_eq!(params.payment_key, "pay_abc");
        assert_eq!(params.amount, 29_000);
    }

    #[test]
    fn test_params_without_pagination_build_default_query() {
        let params = ListProductsParams {
            category: Some("mugs".into()),
            sort_by: None,
            sort_order: None,
            limit: None,
            page: None,
            page_size: None,
            active_only: None,
        };
        let query = params.query();
        assert!(query.active_only);
        assert_eq!(query.category.as_deref(), Some("mugs"));
    }
}
