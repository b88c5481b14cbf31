// src/services/auth.rs

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::{
    common::error::AppError,
    models::{
        auth::{CallerIdentity, Claims},
        user::normalize_email,
    },
};

/// Verifica o token do chamador e devolve a identidade confirmada.
pub trait IdentityProvider: Send + Sync {
    fn verify(&self, token: &str) -> Result<CallerIdentity, AppError>;
}

// Provedor baseado em JWT HS256 com segredo compartilhado
#[derive(Clone)]
pub struct JwtIdentityProvider {
    jwt_secret: String,
}

impl JwtIdentityProvider {
    pub fn new(jwt_secret: String) -> Self {
        Self { jwt_secret }
    }

    /// Emite um token para a identidade (ferramentas locais e testes).
    pub fn issue(&self, subject: &str, identity: &CallerIdentity, ttl: chrono::Duration) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            email: identity.email.clone(),
            name: Some(identity.name.clone()),
            picture: identity.photo_url.clone(),
            exp: (now + ttl).timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )
        .map_err(|e| AppError::InternalServerError(anyhow::anyhow!("Falha ao emitir token: {}", e)))
    }
}

impl IdentityProvider for JwtIdentityProvider {
    fn verify(&self, token: &str) -> Result<CallerIdentity, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|e| {
            tracing::debug!(error = %e, "Token recusado");
            AppError::Unauthorized
        })?;

        let mut identity = CallerIdentity::from(token_data.claims);
        identity.email = normalize_email(&identity.email);
        if identity.email.is_empty() {
            return Err(AppError::Unauthorized);
        }
        Ok(identity)
    }
}
