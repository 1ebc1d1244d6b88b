use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use tracing::debug;

use shared_models::auth::{JwtClaims, User};

type HmacSha256 = Hmac<Sha256>;

fn sign(input: &str, secret: &str) -> Result<String, String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| "Failed to create HMAC".to_string())?;
    mac.update(input.as_bytes());
    Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
}

fn build_token(claims: &serde_json::Value, secret: &str) -> Result<String, String> {
    let header = json!({ "alg": "HS256", "typ": "JWT" });
    let header_b64 = URL_SAFE_NO_PAD.encode(header.to_string());
    let claims_b64 = URL_SAFE_NO_PAD.encode(claims.to_string());
    let signing_input = format!("{}.{}", header_b64, claims_b64);
    let signature = sign(&signing_input, secret)?;
    Ok(format!("{}.{}", signing_input, signature))
}

/// Issue an HS256 access token for an authenticated staff user.
pub fn issue_token(
    user_id: &str,
    email: &str,
    role: &str,
    secret: &str,
    ttl_hours: i64,
) -> Result<String, String> {
    if secret.is_empty() {
        return Err("JWT secret is not set".to_string());
    }

    let now = Utc::now();
    let exp = now + Duration::hours(ttl_hours);
    let claims = json!({
        "sub": user_id,
        "email": email,
        "role": role,
        "iat": now.timestamp(),
        "exp": exp.timestamp(),
    });

    build_token(&claims, secret)
}

/// Issue a refresh token: same mechanics, longer lifetime, typ claim set so
/// it cannot be replayed as an access token.
pub fn issue_refresh_token(user_id: &str, secret: &str, ttl_hours: i64) -> Result<String, String> {
    if secret.is_empty() {
        return Err("JWT secret is not set".to_string());
    }

    let now = Utc::now();
    let exp = now + Duration::hours(ttl_hours);
    let claims = json!({
        "sub": user_id,
        "typ": "refresh",
        "iat": now.timestamp(),
        "exp": exp.timestamp(),
    });

    build_token(&claims, secret)
}

fn decode_claims(token: &str, jwt_secret: &str) -> Result<JwtClaims, String> {
    if jwt_secret.is_empty() {
        return Err("JWT secret is not set".to_string());
    }

    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err("Invalid token format".to_string());
    }

    let header_b64 = parts[0];
    let claims_b64 = parts[1];
    let signature_b64 = parts[2];

    let signature = match URL_SAFE_NO_PAD.decode(signature_b64) {
        Ok(sig) => sig,
        Err(e) => {
            debug!("Failed to decode signature: {}", e);
            return Err("Invalid signature encoding".to_string());
        }
    };

    let signing_input = format!("{}.{}", header_b64, claims_b64);
    let mut mac = HmacSha256::new_from_slice(jwt_secret.as_bytes())
        .map_err(|_| "Failed to create HMAC".to_string())?;
    mac.update(signing_input.as_bytes());

    if mac.verify_slice(&signature).is_err() {
        debug!("Token signature verification failed");
        return Err("Invalid token signature".to_string());
    }

    let claims_json = URL_SAFE_NO_PAD
        .decode(claims_b64)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(|| "Invalid claims encoding".to_string())?;

    let claims: JwtClaims = serde_json::from_str(&claims_json).map_err(|e| {
        debug!("Failed to parse claims: {}", e);
        "Invalid claims format".to_string()
    })?;

    if let Some(exp) = claims.exp {
        let now = Utc::now().timestamp() as u64;
        if exp < now {
            debug!("Token expired at {} (now: {})", exp, now);
            return Err("Token expired".to_string());
        }
    }

    Ok(claims)
}

/// Validate an access token and map it to the authenticated caller.
pub fn validate_token(token: &str, jwt_secret: &str) -> Result<User, String> {
    let claims = decode_claims(token, jwt_secret)?;

    if claims.typ.as_deref() == Some("refresh") {
        return Err("Refresh token cannot be used for access".to_string());
    }

    let created_at = claims
        .iat
        .and_then(|timestamp| Utc.timestamp_opt(timestamp as i64, 0).single());

    let user = User {
        id: claims.sub,
        email: claims.email,
        role: claims.role,
        created_at,
    };

    debug!("Token validated successfully for user: {}", user.id);
    Ok(user)
}

/// Validate a refresh token and return the subject's user id.
pub fn validate_refresh_token(token: &str, jwt_secret: &str) -> Result<String, String> {
    let claims = decode_claims(token, jwt_secret)?;

    if claims.typ.as_deref() != Some("refresh") {
        return Err("Not a refresh token".to_string());
    }

    Ok(claims.sub)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret-key-that-is-long-enough";

    #[test]
    fn access_token_round_trips() {
        let token = issue_token("user-1", "a@b.test", "admin", SECRET, 1).unwrap();
        let user = validate_token(&token, SECRET).unwrap();
        assert_eq!(user.id, "user-1");
        assert_eq!(user.email.as_deref(), Some("a@b.test"));
        assert_eq!(user.role.as_deref(), Some("admin"));
    }

    #[test]
    fn tokens_signed_with_another_secret_fail() {
        let token = issue_token("user-1", "a@b.test", "admin", "other-secret", 1).unwrap();
        assert!(validate_token(&token, SECRET).is_err());
    }

    #[test]
    fn refresh_tokens_are_not_access_tokens() {
        let refresh = issue_refresh_token("user-1", SECRET, 1).unwrap();
        assert!(validate_token(&refresh, SECRET).is_err());
        assert_eq!(validate_refresh_token(&refresh, SECRET).unwrap(), "user-1");

        let access = issue_token("user-1", "a@b.test", "admin", SECRET, 1).unwrap();
        assert!(validate_refresh_token(&access, SECRET).is_err());
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let token = issue_token("user-1", "a@b.test", "admin", SECRET, -1).unwrap();
        assert_eq!(validate_token(&token, SECRET).unwrap_err(), "Token expired");
    }
}
