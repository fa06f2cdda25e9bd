//! Fake session tokens
//!
//! Tokens are real HS256 JWTs signed with a throwaway key so they survive a
//! casual decode by the attacker. Nothing ever verifies them.

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const TOKEN_TTL_SECS: i64 = 3600;

#[derive(Debug, Serialize, Deserialize)]
pub struct FakeClaims {
    pub sub: String,  // Submitted email or "user"
    pub uid: String,  // Fake user id
    pub role: String,
    pub exp: usize,
    pub iat: usize,
}

pub struct FakeTokenIssuer {
    key: EncodingKey,
}

impl FakeTokenIssuer {
    pub fn new(secret: &str) -> Self {
        Self { key: EncodingKey::from_secret(secret.as_bytes()) }
    }

    pub fn issue(&self, subject: &str, user_id: &str) -> String {
        let now = Utc::now();
        let exp = now + Duration::seconds(TOKEN_TTL_SECS);

        let claims = FakeClaims {
            sub: subject.to_string(),
            uid: user_id.to_string(),
            role: "user".to_string(),
            exp: exp.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        match encode(&Header::default(), &claims, &self.key) {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "Fake token signing failed, using opaque token");
                format!("tok_{}", Uuid::new_v4().simple())
            }
        }
    }
}
