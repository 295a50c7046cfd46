// ABOUTME: Authenticated-actor context for API requests
// ABOUTME: Credential checks happen upstream; handlers receive the resolved identity

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};

use guichet_core::{Actor, Role};

use crate::response::error_response;

/// The already-authenticated actor, carried in `x-actor-*` headers by the
/// authentication front end (id, level code 1-5, optional service id and
/// email).
#[derive(Debug, Clone)]
pub struct ActorContext(pub Actor);

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|value| value.to_str().ok())
}

impl<S> FromRequestParts<S> for ActorContext
where
    S: Send + Sync,
{
    type Rejection = axum::response::Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header(parts, "x-actor-id")
            .and_then(|value| value.parse::<i64>().ok())
            .ok_or_else(|| {
                error_response(
                    StatusCode::UNAUTHORIZED,
                    "Missing or malformed x-actor-id header".to_string(),
                )
            })?;

        let level = header(parts, "x-actor-level")
            .and_then(|value| value.parse::<i64>().ok())
            .ok_or_else(|| {
                error_response(
                    StatusCode::UNAUTHORIZED,
                    "Missing or malformed x-actor-level header".to_string(),
                )
            })?;

        let role = Role::from_level(level).ok_or_else(|| {
            error_response(
                StatusCode::UNAUTHORIZED,
                format!("Unknown actor level: {}", level),
            )
        })?;

        let service_id = header(parts, "x-actor-service").and_then(|value| value.parse::<i64>().ok());
        let email = header(parts, "x-actor-email").map(str::to_string);

        Ok(ActorContext(Actor {
            id,
            role,
            service_id,
            email,
        }))
    }
}
