// src/services/user_service.rs

use std::sync::Arc;

use tracing::info;

use crate::{
    common::error::AppError,
    db::ledger::LedgerStore,
    models::{
        affiliation::Affiliation,
        auth::CallerIdentity,
        user::{normalize_email, NewUser, User, UserRole},
    },
};

/// Limite padrão quando o RH se cadastra sem escolher pacote.
pub const DEFAULT_PACKAGE_LIMIT: i32 = 5;

#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub role: UserRole,
    pub company_name: Option<String>,
    pub company_logo: Option<String>,
    pub package_limit: Option<i32>,
}

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn LedgerStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Cadastra o chamador. O e-mail vem da identidade verificada, nunca do corpo.
    pub async fn register(&self, caller: &CallerIdentity, input: RegisterInput) -> Result<User, AppError> {
        let (company_name, company_logo, package_limit) = match input.role {
            UserRole::Hr => (
                input.company_name,
                input.company_logo,
                input.package_limit.unwrap_or(DEFAULT_PACKAGE_LIMIT),
            ),
            // Funcionário não tem pacote nem empresa própria
            UserRole::Employee => (None, None, 0),
        };

        let user = self
            .store
            .insert_user(NewUser {
                email: caller.email.clone(),
                name: caller.name.clone(),
                photo_url: caller.photo_url.clone(),
                role: input.role,
                company_name,
                company_logo,
                package_limit,
            })
            .await?;

        info!(email = %user.email, role = ?user.role, "👤 Usuário registrado");
        Ok(user)
    }

    pub async fn get_by_email(&self, email: &str) -> Result<User, AppError> {
        self.store
            .find_user_by_email(&normalize_email(email))
            .await?
            .ok_or(AppError::UserNotFound)
    }

    pub async fn list_my_affiliations(&self, caller: &CallerIdentity) -> Result<Vec<Affiliation>, AppError> {
        self.store.list_affiliations_for_employee(&caller.email).await
    }

    /// Time ativo do RH chamador.
    pub async fn list_team(&self, caller: &CallerIdentity) -> Result<Vec<Affiliation>, AppError> {
        self.store.list_team_for_tenant(&caller.email).await
    }
}
