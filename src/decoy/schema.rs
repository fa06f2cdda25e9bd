//! Decoy request bodies
//!
//! Deliberately permissive: every field is optional and only bounded in size,
//! so injection strings still reach the fake handlers.

use axum::body::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{AppError, AppResult};

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct LoginRequest {
    #[validate(length(max = 320))]
    pub email: Option<String>,
    #[validate(length(max = 256))]
    pub username: Option<String>,
    #[validate(length(max = 1024))]
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct RegisterRequest {
    #[validate(length(max = 320))]
    pub email: Option<String>,
    #[validate(length(max = 256))]
    pub username: Option<String>,
    #[validate(length(max = 1024))]
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct RefreshRequest {
    #[validate(length(max = 4096))]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 128))]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 128))]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 320))]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 128))]
    pub team: Option<String>,
}

/// Decode and validate a JSON body. An empty body is the all-absent default.
pub fn parse<T>(body: &Bytes) -> AppResult<T>
where
    T: DeserializeOwned + Validate + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }

    let value: T = serde_json::from_slice(body)
        .map_err(|e| AppError::InvalidBody(e.to_string()))?;
    value
        .validate()
        .map_err(|e| AppError::InvalidBody(e.to_string()))?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_injection_strings_are_accepted() {
        let body = Bytes::from_static(br#"{"username":"admin' OR '1'='1","password":"x"}"#);
        let login: LoginRequest = parse(&body).unwrap();
        assert_eq!(login.username.as_deref(), Some("admin' OR '1'='1"));
        assert!(login.email.is_none());
    }

    #[test]
    fn test_empty_body_is_default() {
        let refresh: RefreshRequest = parse(&Bytes::new()).unwrap();
        assert!(refresh.refresh_token.is_none());
    }

    #[test]
    fn test_malformed_json_rejected() {
        let result: AppResult<LoginRequest> = parse(&Bytes::from_static(b"{\"email\":"));
        assert!(matches!(result, Err(AppError::InvalidBody(_))));
    }

    #[test]
    fn test_wrong_field_type_rejected() {
        let result: AppResult<ProfileUpdate> = parse(&Bytes::from_static(br#"{"team": 42}"#));
        assert!(matches!(result, Err(AppError::InvalidBody(_))));
    }

    #[test]
    fn test_oversized_field_rejected() {
        let body = format!(r#"{{"firstName":"{}"}}"#, "a".repeat(500));
        let result: AppResult<ProfileUpdate> = parse(&Bytes::from(body));
        assert!(matches!(result, Err(AppError::InvalidBody(_))));
    }

    #[test]
    fn test_profile_update_echo_skips_absent_fields() {
        let update: ProfileUpdate = parse(&Bytes::from_static(br#"{"team":"Red","role":"admin"}"#)).unwrap();
        assert_eq!(serde_json::to_value(&update).unwrap(), serde_json::json!({"team": "Red"}));
    }
}
