//! Principal and client-context extraction
//!
//! The upstream identity layer authenticates the user and forwards the
//! resolved identity as `x-user-id` / `x-user-role` headers. The role
//! arrives as a value; this subsystem never derives it from user
//! attributes. Requests without identity headers are anonymous.

use axum::extract::FromRequestParts;
use axum::http::{request::Parts, HeaderMap, StatusCode};
use axum::Json;
use coursevault_core::models::{ClientContext, Principal, Role};
use std::net::IpAddr;
use uuid::Uuid;

use crate::error::ErrorResponse;

const USER_ID_HEADER: &str = "x-user-id";
const USER_ROLE_HEADER: &str = "x-user-role";

/// Extractor wrapper for the requesting principal
#[derive(Debug, Clone, Copy)]
pub struct AuthPrincipal(pub Principal);

impl<S> FromRequestParts<S> for AuthPrincipal
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts.headers.get(USER_ID_HEADER);
        let role = parts.headers.get(USER_ROLE_HEADER);

        match (user_id, role) {
            (None, None) => Ok(AuthPrincipal(Principal::anonymous())),
            (Some(user_id), Some(role)) => {
                let user_id = user_id
                    .to_str()
                    .ok()
                    .and_then(|s| Uuid::parse_str(s).ok())
                    .ok_or_else(|| invalid_principal("x-user-id is not a valid UUID"))?;
                let role: Role = role
                    .to_str()
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| invalid_principal("x-user-role is not a known role"))?;
                Ok(AuthPrincipal(Principal::authenticated(user_id, role)))
            }
            _ => Err(invalid_principal(
                "x-user-id and x-user-role must be sent together",
            )),
        }
    }
}

fn invalid_principal(detail: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: detail.to_string(),
            details: None,
            error_type: None,
            code: "INVALID_PRINCIPAL".to_string(),
            recoverable: false,
            suggested_action: Some("Check the identity headers set by the gateway".to_string()),
        }),
    )
}

/// Extractor wrapper for audit-relevant client context
#[derive(Debug, Clone)]
pub struct ClientInfo(pub ClientContext);

impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientInfo(client_context(&parts.headers)))
    }
}

/// Build the client context from request headers
fn client_context(headers: &HeaderMap) -> ClientContext {
    ClientContext {
        ip_address: extract_client_ip(headers),
        user_agent: headers
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string(),
        referer: headers
            .get("referer")
            .and_then(|v| v.to_str().ok())
            .map(String::from),
    }
}

/// Extract the client IP: first hop of x-forwarded-for, then x-real-ip.
/// Only values that parse as IP addresses are accepted.
fn extract_client_ip(headers: &HeaderMap) -> String {
    if let Some(forwarded_for) = headers.get("x-forwarded-for") {
        if let Ok(value) = forwarded_for.to_str() {
            if let Some(first) = value.split(',').next() {
                let candidate = first.trim();
                if candidate.parse::<IpAddr>().is_ok() {
                    return candidate.to_string();
                }
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(value) = real_ip.to_str() {
            let candidate = value.trim();
            if candidate.parse::<IpAddr>().is_ok() {
                return candidate.to_string();
            }
        }
    }

    "unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                axum::http::HeaderName::try_from(*name).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_forwarded_for_first_hop_wins() {
        let map = headers(&[("x-forwarded-for", "203.0.113.7, 10.0.0.1, 10.0.0.2")]);
        assert_eq!(extract_client_ip(&map), "203.0.113.7");
    }

    #[test]
    fn test_invalid_forwarded_for_falls_back_to_real_ip() {
        let map = headers(&[
            ("x-forwarded-for", "not-an-ip"),
            ("x-real-ip", "198.51.100.9"),
        ]);
        assert_eq!(extract_client_ip(&map), "198.51.100.9");
    }

    #[test]
    fn test_no_headers_is_unknown() {
        assert_eq!(extract_client_ip(&HeaderMap::new()), "unknown");
    }

    #[test]
    fn test_client_context_captures_agent_and_referer() {
        let map = headers(&[
            ("user-agent", "test-agent/1.0"),
            ("referer", "https://lms.example.com/courses/1"),
        ]);
        let ctx = client_context(&map);
        assert_eq!(ctx.user_agent, "test-agent/1.0");
        assert_eq!(
            ctx.referer.as_deref(),
            Some("https://lms.example.com/courses/1")
        );
    }
}
