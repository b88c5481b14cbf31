// src/models/auth.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// Identidade já verificada do chamador. É passada como argumento
// explícito para todas as operações do workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CallerIdentity {
    #[schema(example = "joana@acme.com")]
    pub email: String,
    #[schema(example = "Joana Silva")]
    pub name: String,
    pub photo_url: Option<String>,
}

// Estrutura de dados ("claims") dentro do JWT emitido pelo provedor de identidade
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,   // Subject (uid no provedor)
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub exp: usize,    // Expiration time
    pub iat: usize,    // Issued At
}

impl From<Claims> for CallerIdentity {
    fn from(claims: Claims) -> Self {
        // Sem nome no token, usamos a parte local do e-mail
        let name = claims
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| claims.email.split('@').next().unwrap_or_default().to_string());

        Self {
            email: claims.email,
            name,
            photo_url: claims.picture,
        }
    }
}
