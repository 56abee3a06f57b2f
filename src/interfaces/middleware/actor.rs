use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

/// Header naming the admin session that issued a request
pub const ACTOR_HEADER: &str = "x-portal-actor";

const MAX_ACTOR_LEN: usize = 64;

/// Request-scoped session context handed down to the trash operations.
/// Informational only, nothing is authorized from it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PortalActor(pub Option<String>);

impl PortalActor {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }

    fn from_header(raw: Option<&str>) -> Self {
        let actor = raw
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| value.chars().take(MAX_ACTOR_LEN).collect::<String>());
        PortalActor(actor)
    }
}

impl<S> FromRequestParts<S> for PortalActor
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|value| value.to_str().ok());
        Ok(PortalActor::from_header(raw))
    }
}
