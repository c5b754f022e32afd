use crate::error::AppError;
use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response};

/// Alternate header carrying the trigger secret
pub const INGEST_TOKEN_HEADER: &str = "X-Ingest-Token";

/// Credential presented by the caller of a guarded route.
///
/// Only extracted here; it is compared against the configured secret by the
/// query service.
#[derive(Debug, Clone)]
pub struct TriggerCredential(pub String);

/// Trigger authentication middleware
/// Accepts `Authorization: Bearer <secret>` or `X-Ingest-Token: <secret>`
pub async fn trigger_auth_middleware(mut req: Request, next: Next) -> Result<Response, AppError> {
    let credential = extract_credential(req.headers())?.to_string();
    req.extensions_mut().insert(TriggerCredential(credential));

    Ok(next.run(req).await)
}

fn extract_credential(headers: &HeaderMap) -> Result<&str, AppError> {
    if let Some(auth_header) = headers.get("Authorization").and_then(|v| v.to_str().ok()) {
        return extract_bearer_token(auth_header);
    }

    match headers.get(INGEST_TOKEN_HEADER).and_then(|v| v.to_str().ok()) {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        Some(_) => Err(AppError::Unauthorized(format!("{} header is empty", INGEST_TOKEN_HEADER))),
        None => Err(AppError::Unauthorized(format!(
            "Missing Authorization or {} header",
            INGEST_TOKEN_HEADER
        ))),
    }
}

/// Extract Bearer token from Authorization header
fn extract_bearer_token(auth_header: &str) -> Result<&str, AppError> {
    const BEARER_PREFIX: &str = "Bearer ";

    let token = auth_header.strip_prefix(BEARER_PREFIX).ok_or_else(|| {
        AppError::Unauthorized("Authorization header must use Bearer scheme".to_string())
    })?;

    if token.is_empty() {
        return Err(AppError::Unauthorized("Bearer token is empty".to_string()));
    }

    Ok(token)
}
