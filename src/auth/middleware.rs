use actix_web::HttpRequest;

use super::jwt::validate_token;
use super::model::Caller;
use crate::error::MediaError;

/// Extract token from Authorization header
fn extract_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
}

/// Validate the bearer token and return who is calling.
///
/// Role checks happen in the library so every entry point shares them.
pub fn caller_from_request(req: &HttpRequest) -> Result<Caller, MediaError> {
    let token = extract_token(req)
        .ok_or_else(|| MediaError::Unauthorized("Missing authorization token".to_string()))?;

    let claims = validate_token(token).map_err(|e| {
        log::warn!("Token validation failed: {:?}", e);
        MediaError::Unauthorized("Invalid or expired token".to_string())
    })?;

    if claims.token_type != "access" {
        return Err(MediaError::Unauthorized("Invalid token type".to_string()));
    }

    Ok(Caller::from(claims))
}
