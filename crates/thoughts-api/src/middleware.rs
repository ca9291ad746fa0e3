use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::AppState;
use crate::auth::Caller;

/// Resolve the caller from the Authorization header. Never rejects: a
/// missing or bad token just makes the request anonymous, and gated
/// operations refuse it further down.
pub async fn resolve_caller(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let identity = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(bearer_token)
        .filter(|token| !token.is_empty())
        .and_then(|token| state.signer.verify(token));

    req.extensions_mut().insert(Caller(identity));
    next.run(req).await
}

/// Accepts both `Bearer <token>` and a bare token.
pub fn bearer_token(value: &str) -> &str {
    let value = value.trim();
    match value.strip_prefix("Bearer") {
        Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => rest.trim(),
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_prefix_is_optional() {
        assert_eq!(bearer_token("Bearer abc.def.ghi"), "abc.def.ghi");
        assert_eq!(bearer_token("abc.def.ghi"), "abc.def.ghi");
        assert_eq!(bearer_token("  Bearer   abc  "), "abc");
        assert_eq!(bearer_token("Bearer "), "");
        assert_eq!(bearer_token("Bearerish"), "Bearerish");
    }
}
