//! Catalog reads: product listing, lookup and categories.
//!
//! Products are public data; none of these operations require a caller
//! identity. Writes to the catalog happen in an external management tool.

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::Result;
use crate::models::Product;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    CreatedAt,
    Price,
    Name,
}

impl ProductSort {
    fn column(self) -> &'static str {
        match self {
            ProductSort::CreatedAt => "created_at",
            ProductSort::Price => "price",
            ProductSort::Name => "name",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    fn sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProductQuery {
    pub active_only: bool,
    pub category: Option<String>,
    pub sort_by: ProductSort,
    pub sort_order: SortOrder,
    pub limit: Option<i64>,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            active_only: true,
            category: None,
            sort_by: ProductSort::default(),
            sort_order: SortOrder::default(),
            limit: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total_count: i64,
    pub total_pages: i64,
    pub current_page: i64,
    pub page_size: i64,
}

fn push_filters<'a>(builder: &mut QueryBuilder<'a, Postgres>, query: &'a ProductQuery) {
    let mut prefix = " WHERE ";
    if query.active_only {
        builder.push(prefix).push("is_active = TRUE");
        prefix = " AND ";
    }
    if let Some(category) = &query.category {
        builder.push(prefix).push("category = ").push_bind(category.as_str());
    }
}

fn push_order(builder: &mut QueryBuilder<'_, Postgres>, query: &ProductQuery) {
    builder
        .push(" ORDER BY ")
        .push(query.sort_by.column())
        .push(" ")
        .push(query.sort_order.sql());
}

/// Lists products matching `query`, without pagination.
pub async fn list_products(pool: &PgPool, query: &ProductQuery) -> Result<Vec<Product>> {
    let mut builder = QueryBuilder::new("SELECT * FROM products");
    push_filters(&mut builder, query);
    push_order(&mut builder, query);
    if let Some(limit) = query.limit {
        builder.push(" LIMIT ").push_bind(limit);
    }
    let products = builder
        .build_query_as::<Product>()
        .fetch_all(pool)
        .await?;
    Ok(products)
}

/// Lists one page of products together with the total count.
///
/// The count and the page query run concurrently.
pub async fn list_products_paginated(
    pool: &PgPool,
    query: &ProductQuery,
    page: i64,
    page_size: i64,
) -> Result<ProductPage> {
    let page = page.max(1);
    let page_size = page_size.max(1);
    let offset = (page - 1) * page_size;

    let count = async {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM products");
        push_filters(&mut builder, query);
        builder
            .build_query_scalar::<i64>()
            .fetch_one(pool)
            .await
    };
    let rows = async {
        let mut builder = QueryBuilder::new("SELECT * FROM products");
        push_filters(&mut builder, query);
        push_order(&mut builder, query);
        builder
            .push(" LIMIT ")
            .push_bind(page_size)
            .push(" OFFSET ")
            .push_bind(offset);
        builder.build_query_as::<Product>().fetch_all(pool).await
    };
    let (total_count, products) = tokio::try_join!(count, rows)?;

    Ok(ProductPage {
        products,
        total_count,
        total_pages: total_pages(total_count, page_size),
        current_page: page,
        page_size,
    })
}

fn total_pages(total_count: i64, page_size: i64) -> i64 {
    (total_count + page_size - 1) / page_size
}

/// Looks up a single active product. "No row" is `None`, not an error.
pub async fn get_product_by_id(pool: &PgPool, product_id: Uuid) -> Result<Option<Product>> {
    let product =
        sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1 AND is_active = TRUE")
            .bind(product_id)
            .fetch_optional(pool)
            .await?;
    Ok(product)
}

/// Distinct non-null categories among active products, sorted lexically.
pub async fn get_categories(pool: &PgPool) -> Result<Vec<String>> {
    let categories = sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT category FROM products \
         WHERE is_active = TRUE AND category IS NOT NULL ORDER BY category",
    )
    .fetch_all(pool)
    .await?;
    Ok(categories)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages_rounds_up() {
        assert_eq!(total_pages(25, 12), 3);
        assert_eq!(total_pages(24, 12), 2);
        assert_eq!(total_pages(1, 12), 1);
        assert_eq!(total_pages(0, 12), 0);
    }

    #[test]
    fn test_sort_whitelist() {
        assert_eq!(ProductSort::CreatedAt.column(), "created_at");
        assert_eq!(ProductSort::Price.column(), "price");
        assert_eq!(ProductSort::Name.column(), "name");
        assert_eq!(SortOrder::Asc.sql(), "ASC");
    }

    #[test]
    fn test_default_query_is_active_newest_first() {
        let query = ProductQuery::default();
        assert!(query.active_only);
        assert_eq!(query.sort_by, ProductSort::CreatedAt);
        assert_eq!(query.sort_order, SortOrder::Desc);
        assert!(query.category.is_none());
    }
}
