//! Tenant/actor resolution from request headers.
//!
//! The pipeline core only ever sees the resolved triple
//! (`tenant_id`, `actor_id`, `role`); extraction and role policing happen
//! here at the HTTP boundary. Absent headers fall back to the demo tenant
//! so a local deployment works without an identity provider in front.

use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use mw_schemas::{RequestContext, Role};

use crate::api_types::ErrorResponse;

pub const DEFAULT_TENANT_ID: &str = "demo-tenant";
pub const DEFAULT_ACTOR_ID: &str = "demo-user";

type Refusal = (StatusCode, Json<ErrorResponse>);

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Resolve the request context from `x-tenant-id` / `x-user-id` /
/// `x-user-role`. An unknown role is a 400, not a silent default.
pub fn context_from_headers(headers: &HeaderMap) -> Result<RequestContext, Refusal> {
    let tenant_id = header_str(headers, "x-tenant-id")
        .unwrap_or(DEFAULT_TENANT_ID)
        .to_string();
    let actor_id = header_str(headers, "x-user-id")
        .unwrap_or(DEFAULT_ACTOR_ID)
        .to_string();

    let role = match header_str(headers, "x-user-role") {
        None => Role::Owner,
        Some(raw) => Role::parse(&raw.to_lowercase()).map_err(|_| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: format!("invalid x-user-role header: {raw}"),
                }),
            )
        })?,
    };

    Ok(RequestContext {
        tenant_id,
        actor_id,
        role,
    })
}

/// Role gate for operator actions.
pub fn require_roles(ctx: &RequestContext, allowed: &[Role]) -> Result<(), Refusal> {
    if allowed.contains(&ctx.role) {
        return Ok(());
    }
    Err((
        StatusCode::FORBIDDEN,
        Json(ErrorResponse {
            error: "insufficient permissions".to_string(),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn missing_headers_resolve_to_demo_context() {
        let ctx = context_from_headers(&HeaderMap::new()).unwrap();
        assert_eq!(ctx.tenant_id, DEFAULT_TENANT_ID);
        assert_eq!(ctx.actor_id, DEFAULT_ACTOR_ID);
        assert_eq!(ctx.role, Role::Owner);
    }

    #[test]
    fn explicit_headers_win() {
        let mut headers = HeaderMap::new();
        headers.insert("x-tenant-id", HeaderValue::from_static("t-42"));
        headers.insert("x-user-id", HeaderValue::from_static("u-7"));
        headers.insert("x-user-role", HeaderValue::from_static("Coordinator"));
        let ctx = context_from_headers(&headers).unwrap();
        assert_eq!(ctx.tenant_id, "t-42");
        assert_eq!(ctx.role, Role::Coordinator);
    }

    #[test]
    fn unknown_role_is_a_bad_request() {
        let mut headers = HeaderMap::new();
        headers.insert("x-user-role", HeaderValue::from_static("superadmin"));
        let (status, _) = context_from_headers(&headers).unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn role_gate_refuses_outsiders() {
        let ctx = RequestContext {
            tenant_id: "t".to_string(),
            actor_id: "u".to_string(),
            role: Role::Readonly,
        };
        let (status, _) = require_roles(&ctx, &[Role::Owner, Role::Pm]).unwrap_err();
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
