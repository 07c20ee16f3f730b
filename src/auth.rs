//! Caller identity, delegated to the external identity provider.
//!
//! The provider (or the gateway fronting it) verifies the session token and
//! forwards the subject id in the `x-user-id` header. Handlers receive the
//! identity as an explicit extractor argument; there is no ambient auth
//! state anywhere in the service.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::convert::Infallible;

use crate::error::Error;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Verified caller identity. Rejects with `auth_required` when absent.
#[derive(Debug, Clone)]
pub struct Identity(pub String);

impl Identity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        header_identity(parts).map(Identity).ok_or(Error::AuthRequired)
    }
}

/// Optional caller identity, for reads that fail open (e.g. the cart badge).
#[derive(Debug, Clone)]
pub struct MaybeIdentity(pub Option<String>);

#[axum::async_trait]
impl<S> FromRequestParts<S> for MaybeIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeIdentity(header_identity(parts)))
    }
}

fn header_identity(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(v) = header {
            builder = builder.header(USER_ID_HEADER, v);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn test_identity_requires_header() {
        let mut parts = parts_with(None);
        let rejected = Identity::from_request_parts(&mut parts, &()).await;
        assert!(matches!(rejected, Err(Error::AuthRequired)));

        let mut parts = parts_with(Some("user_1"));
        let id = Identity::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(id.as_str(), "user_1");
    }

    #[tokio::test]
    async fn test_maybe_identity_is_fail_open() {
        let mut parts = parts_with(None);
        let MaybeIdentity(id) = MaybeIdentity::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(id.is_none());

        let mut parts = parts_with(Some(""));
        let MaybeIdentity(id) = MaybeIdentity::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(id.is_none(), "blank header is treated as unauthenticated");
    }
}
