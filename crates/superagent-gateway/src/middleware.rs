use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

pub const ORG_HEADER: &str = "x-org-id";

/// Tenant id taken from the `X-Org-Id` header. Opaque; never verified.
pub struct OrgId(pub Option<String>);

impl OrgId {
    /// Whether a resource owned by `owner` is visible to this caller.
    pub fn can_see(&self, owner: Option<&str>) -> bool {
        match &self.0 {
            None => true,
            Some(org) => owner == Some(org.as_str()),
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for OrgId {
    type Rejection = Infallible;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let org = parts
            .headers
            .get(ORG_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());

        async move { Ok(OrgId(org)) }
    }
}
