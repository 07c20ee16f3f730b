//! Configuration loaded from environment variables.

use anyhow::Context;

/// Service configuration.
///
/// - `DATABASE_URL` — Postgres connection string (required)
/// - `HOST` / `PORT` — bind address (default `0.0.0.0:8083`)
/// - `PUBLIC_BASE_URL` — external URL the payment callbacks are built from
/// - `PAYMENT_CLIENT_KEY` — client key handed to the payment widget
/// - `NATS_URL` — optional event bus
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub public_base_url: String,
    pub payment_client_key: String,
    pub nats_url: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?,
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8083),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8083".to_string()),
            payment_client_key: std::env::var("PAYMENT_CLIENT_KEY")
                .unwrap_or_else(|_| "test_ck_placeholder".to_string()),
            nats_url: std::env::var("NATS_URL").ok(),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
