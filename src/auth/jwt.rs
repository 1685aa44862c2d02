use std::time::{SystemTime, UNIX_EPOCH};

use crate::models::{Claims, TokenType};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

fn now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize
}

pub struct TokenIdentity {
    pub user_id: Uuid,
    pub username: String,
    pub role: i16,
    pub institution_id: Option<Uuid>,
    pub employee_id: Option<String>,
}

pub fn generate_access_token(identity: &TokenIdentity, secret: &str, ttl: usize) -> String {
    let claims = Claims {
        user_id: identity.user_id,
        sub: identity.username.clone(),
        role: identity.role,
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
        token_type: TokenType::Access,
        institution_id: identity.institution_id,
        employee_id: identity.employee_id.clone(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

pub fn generate_refresh_token(
    identity: &TokenIdentity,
    secret: &str,
    ttl: usize,
) -> (String, Claims) {
    let claims = Claims {
        user_id: identity.user_id,
        sub: identity.username.clone(),
        role: identity.role,
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
        token_type: TokenType::Refresh,
        institution_id: identity.institution_id,
        employee_id: identity.employee_id.clone(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap();

    (token, claims)
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> TokenIdentity {
        TokenIdentity {
            user_id: Uuid::new_v4(),
            username: "aisyah".into(),
            role: 3,
            institution_id: Some(Uuid::new_v4()),
            employee_id: Some("EMP-001".into()),
        }
    }

    #[test]
    fn access_token_round_trips() {
        let id = identity();
        let token = generate_access_token(&id, "test-secret", 900);
        let claims = verify_token(&token, "test-secret").unwrap();

        assert_eq!(claims.user_id, id.user_id);
        assert_eq!(claims.sub, "aisyah");
        assert_eq!(claims.role, 3);
        assert_eq!(claims.institution_id, id.institution_id);
        assert_eq!(claims.employee_id.as_deref(), Some("EMP-001"));
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn refresh_token_carries_its_type() {
        let id = identity();
        let (token, issued) = generate_refresh_token(&id, "test-secret", 3600);
        let claims = verify_token(&token, "test-secret").unwrap();

        assert_eq!(claims.token_type, TokenType::Refresh);
        assert_eq!(claims.jti, issued.jti);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_access_token(&identity(), "test-secret", 900);
        assert!(verify_token(&token, "other-secret").is_err());
    }
}
