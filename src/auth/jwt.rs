use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

/// Token payload. Tokens are issued by the identity service; this crate only
/// verifies them.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    pub sub: String,
    pub role: u8, // role id
    pub exp: usize,
    pub jti: String,

    pub token_type: TokenType,
    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}

/// Decodes and checks an access token. Refresh tokens are refused here.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())?;

    if claims.token_type != TokenType::Access {
        return Err("Not an access token".to_string());
    }
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn token(token_type: TokenType, exp: usize) -> String {
        let claims = Claims {
            user_id: 70,
            sub: "alice".to_string(),
            role: 3,
            exp,
            jti: "t-1".to_string(),
            token_type,
            employee_id: Some(7),
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(b"secret")).unwrap()
    }

    #[test]
    fn access_tokens_verify() {
        let claims = verify_token(&token(TokenType::Access, 4_000_000_000), "secret").unwrap();
        assert_eq!(claims.employee_id, Some(7));
    }

    #[test]
    fn refresh_expired_and_foreign_tokens_are_refused() {
        assert!(verify_token(&token(TokenType::Refresh, 4_000_000_000), "secret").is_err());
        assert!(verify_token(&token(TokenType::Access, 1), "secret").is_err());
        assert!(verify_token(&token(TokenType::Access, 4_000_000_000), "other").is_err());
    }
}
