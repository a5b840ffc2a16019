use axum::extract::FromRef;
use jsonwebtoken::{decode, DecodingKey, Validation};
use tracing::debug;

use super::claims::Claims;
use crate::{config::JwtConfig, state::AppState};

/// Verification side of the identity provider's tokens.
#[derive(Clone)]
pub struct JwtKeys {
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    #[cfg(test)]
    secret: String,
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            #[cfg(test)]
            secret: cfg.secret.clone(),
        }
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        JwtKeys::new(&state.config.jwt)
    }
}

#[cfg(test)]
impl JwtKeys {
    /// Mint a token with arbitrary claims, the way the identity provider would.
    pub fn sign_claims(&self, claims: &serde_json::Value) -> String {
        use jsonwebtoken::{encode, EncodingKey, Header};

        encode(&Header::default(), claims, &EncodingKey::from_secret(self.secret.as_bytes())).unwrap()
    }

    pub fn access_claims(&self, user_id: uuid::Uuid, ttl_secs: i64) -> serde_json::Value {
        let exp = time::OffsetDateTime::now_utc().unix_timestamp() + ttl_secs;
        serde_json::json!({
            "sub": user_id,
            "exp": exp,
            "iss": self.issuer,
            "aud": self.audience,
            "token_use": "access",
        })
    }

    pub fn sign_access(&self, user_id: uuid::Uuid) -> String {
        self.sign_claims(&self.access_claims(user_id, 300))
    }
}
