//! Caller identity extraction
//!
//! The API gateway authenticates requests and forwards the caller as
//! `x-actor-id` / `x-actor-role` headers. Handlers take an [`Actor`]
//! argument and never look at the headers themselves.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;
use crate::models::{Actor, ActorRole};
use crate::utils::errors::EventHubError;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, EventHubError> {
    parts
        .headers
        .get(name)
        .ok_or_else(|| EventHubError::Unauthorized(format!("missing {} header", name)))?
        .to_str()
        .map_err(|_| EventHubError::Validation(format!("{} header is not valid text", name)))
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = EventHubError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header(parts, ACTOR_ID_HEADER)?;
        let id = Uuid::parse_str(id.trim())
            .map_err(|_| EventHubError::Validation(format!("invalid actor id: {}", id)))?;

        // role defaults to a plain user when the gateway omits it
        let role = match parts.headers.get(ACTOR_ROLE_HEADER) {
            Some(_) => header(parts, ACTOR_ROLE_HEADER)?.parse::<ActorRole>()?,
            None => ActorRole::User,
        };

        Ok(Actor::new(id, role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use assert_matches::assert_matches;

    async fn extract(request: Request<()>) -> Result<Actor, EventHubError> {
        let (mut parts, _) = request.into_parts();
        Actor::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_extracts_actor_from_headers() {
        let id = Uuid::new_v4();
        let request = Request::builder()
            .header(ACTOR_ID_HEADER, id.to_string())
            .header(ACTOR_ROLE_HEADER, "organizer")
            .body(())
            .unwrap();

        assert_eq!(extract(request).await.unwrap(), Actor::organizer(id));
    }

    #[tokio::test]
    async fn test_role_defaults_to_user() {
        let id = Uuid::new_v4();
        let request = Request::builder().header(ACTOR_ID_HEADER, id.to_string()).body(()).unwrap();

        assert_eq!(extract(request).await.unwrap(), Actor::user(id));
    }

    #[tokio::test]
    async fn test_rejects_missing_or_malformed_identity() {
        let request = Request::builder().body(()).unwrap();
        assert_matches!(extract(request).await, Err(EventHubError::Unauthorized(_)));

        let request = Request::builder().header(ACTOR_ID_HEADER, "42").body(()).unwrap();
        assert_matches!(extract(request).await, Err(EventHubError::Validation(_)));

        let request = Request::builder()
            .header(ACTOR_ID_HEADER, Uuid::new_v4().to_string())
            .header(ACTOR_ROLE_HEADER, "superuser")
            .body(())
            .unwrap();
        assert_matches!(extract(request).await, Err(EventHubError::Validation(_)));
    }
}
