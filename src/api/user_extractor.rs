use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, StatusCode},
};
use crate::model::UserContext;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLES_HEADER: &str = "x-user-roles";

/// Axum extractor for UserContext from request headers
///
/// Callers arrive already authenticated; the gateway forwards:
/// - X-User-Id: user identifier
/// - X-User-Roles: optional comma separated role list
///
/// Requests without an id are attributed to the anonymous caller.
#[async_trait]
impl<S> FromRequestParts<S> for UserContext
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        Ok(user_from_headers(&parts.headers))
    }
}

fn user_from_headers(headers: &HeaderMap) -> UserContext {
    let Some(user_id) = extract_header_value(headers, USER_ID_HEADER) else {
        return UserContext::anonymous();
    };

    let roles = extract_header_value(headers, USER_ROLES_HEADER)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|role| !role.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    UserContext::new(user_id, roles)
}

/// Extract a non-blank header value as string
fn extract_header_value(headers: &HeaderMap, header_name: &str) -> Option<String> {
    headers
        .get(header_name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|s| s.to_string())
}
