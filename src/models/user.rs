// src/models/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// Papel do usuário: "hr" é o tenant (empresa dona dos ativos),
// "employee" é quem recebe os ativos emprestados.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Hr,
    Employee,
}

// ---
// User (tabela 'users')
// ---
// Um único registro para os dois papéis. Os campos de empresa só fazem
// sentido quando role = hr.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    #[schema(example = "rh@acme.com")]
    pub email: String,
    pub name: String,
    pub photo_url: Option<String>,
    pub role: UserRole,

    pub company_name: Option<String>,
    pub company_logo: Option<String>,
    // Máximo de funcionários afiliados ao mesmo tempo
    #[schema(example = 5)]
    pub package_limit: i32,
    // Contador em cache das afiliações ativas
    #[schema(example = 0)]
    pub current_employees: i32,

    #[serde(skip_serializing, default)]
    #[schema(ignore)]
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_hr(&self) -> bool {
        self.role == UserRole::Hr
    }

    /// Quantos assentos ainda restam no pacote contratado.
    pub fn remaining_seats(&self) -> i32 {
        (self.package_limit - self.current_employees).max(0)
    }
}

// Dados já validados para inserir um usuário novo
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub photo_url: Option<String>,
    pub role: UserRole,
    pub company_name: Option<String>,
    pub company_logo: Option<String>,
    pub package_limit: i32,
}

/// E-mails são comparados sem espaços e em minúsculas.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
