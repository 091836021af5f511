use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Account record as the identity provider reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Value,
}

/// Token pair plus expiry metadata issued by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub user: AuthUser,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// JSON blob carried in the `sb-{project_ref}-auth-token` cookie.
///
/// Deserialization fails when `access_token` is absent, which is exactly the
/// condition under which the cookie fallback must reject the cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthCookie {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub user: Option<AuthUser>,
}

impl From<&AuthSession> for AuthCookie {
    fn from(session: &AuthSession) -> Self {
        AuthCookie {
            access_token: session.access_token.clone(),
            refresh_token: session.refresh_token.clone(),
            expires_at: session.expires_at,
            expires_in: session.expires_in,
            token_type: Some(session.token_type.clone()),
            user: Some(session.user.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_blob_without_access_token_is_rejected() {
        let parsed: Result<AuthCookie, _> =
            serde_json::from_str(r#"{"refresh_token":"abc","token_type":"bearer"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn cookie_blob_round_trips_through_session() {
        let session = AuthSession {
            access_token: "access".into(),
            refresh_token: "refresh".into(),
            expires_in: Some(3600),
            expires_at: Some(1_700_000_000),
            token_type: "bearer".into(),
            user: AuthUser {
                id: Uuid::new_v4(),
                email: Some("driver@example.com".into()),
                user_metadata: serde_json::json!({"name": "Driver"}),
            },
        };
        let blob = serde_json::to_string(&AuthCookie::from(&session)).unwrap();
        let cookie: AuthCookie = serde_json::from_str(&blob).unwrap();
        assert_eq!(cookie.access_token, "access");
        assert_eq!(cookie.refresh_token, "refresh");
        assert_eq!(cookie.user.unwrap().id, session.user.id);
    }
}
