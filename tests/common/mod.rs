//! Utilitários comuns para os testes de integração
#![allow(dead_code)]

use std::sync::Arc;

use assetverse::{
    build_router,
    common::retry::RetryPolicy,
    db::{InMemoryLedgerStore, LedgerStore},
    models::{
        asset::{Asset, Assignment},
        auth::CallerIdentity,
        request::AssetRequest,
        user::{User, UserRole},
    },
    services::{
        asset_service::CreateAssetInput,
        auth::JwtIdentityProvider,
        user_service::RegisterInput,
        workflow_service::{SubmitRequestInput, WorkflowConfig},
    },
    AppState,
};
use axum::Router;
use uuid::Uuid;

pub const JWT_SECRET: &str = "segredo-de-teste";

pub fn identity(email: &str, name: &str) -> CallerIdentity {
    CallerIdentity {
        email: email.to_string(),
        name: name.to_string(),
        photo_url: None,
    }
}

pub struct TestApp {
    pub store: Arc<InMemoryLedgerStore>,
    pub identity: Arc<JwtIdentityProvider>,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_store(InMemoryLedgerStore::with_retry(RetryPolicy::no_delay(5)))
    }

    pub fn with_store(store: InMemoryLedgerStore) -> Self {
        let store = Arc::new(store);
        let identity = Arc::new(JwtIdentityProvider::new(JWT_SECRET.to_string()));
        let state = AppState::from_parts(
            store.clone() as Arc<dyn LedgerStore>,
            identity.clone(),
            WorkflowConfig::default(),
        );
        Self { store, identity, state }
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    pub fn token(&self, who: &CallerIdentity) -> String {
        self.identity
            .issue(&format!("uid-{}", who.email), who, chrono::Duration::hours(1))
            .unwrap()
    }

    // --- Seeds ---

    pub async fn register_hr(&self, email: &str, company: &str, package_limit: i32) -> CallerIdentity {
        let hr = identity(email, &format!("RH {}", company));
        self.state
            .user_service
            .register(
                &hr,
                RegisterInput {
                    role: UserRole::Hr,
                    company_name: Some(company.to_string()),
                    company_logo: None,
                    package_limit: Some(package_limit),
                },
            )
            .await
            .unwrap();
        hr
    }

    pub async fn register_employee(&self, email: &str, name: &str) -> CallerIdentity {
        let employee = identity(email, name);
        self.state
            .user_service
            .register(
                &employee,
                RegisterInput {
                    role: UserRole::Employee,
                    company_name: None,
                    company_logo: None,
                    package_limit: None,
                },
            )
            .await
            .unwrap();
        employee
    }

    pub async fn create_asset(&self, hr: &CallerIdentity, name: &str, quantity: i32) -> Asset {
        self.state
            .asset_service
            .create_asset(
                hr,
                CreateAssetInput {
                    name: name.to_string(),
                    asset_type: "returnable".to_string(),
                    image: None,
                    quantity,
                },
            )
            .await
            .unwrap()
    }

    pub async fn submit(&self, employee: &CallerIdentity, asset: &Asset, hr_email: &str) -> Uuid {
        self.state
            .workflow_service
            .submit_request(
                employee,
                SubmitRequestInput {
                    asset_id: asset.id,
                    asset_name: asset.name.clone(),
                    asset_type: asset.asset_type.clone(),
                    hr_email: hr_email.to_string(),
                    company_name: "Acme".to_string(),
                    note: None,
                },
            )
            .await
            .unwrap()
    }

    // --- Leituras diretas do ledger ---

    pub async fn asset(&self, id: Uuid) -> Asset {
        self.store.get_asset(id).await.unwrap().unwrap()
    }

    pub async fn user(&self, email: &str) -> User {
        self.store.find_user_by_email(email).await.unwrap().unwrap()
    }

    pub async fn request(&self, id: Uuid) -> AssetRequest {
        self.store.get_request(id).await.unwrap().unwrap()
    }

    pub async fn assignments_for(&self, asset_id: Uuid) -> Vec<Assignment> {
        self.store.list_assignments_for_asset(asset_id).await.unwrap()
    }

    pub async fn affiliation_count(&self, employee_email: &str, hr_email: &str) -> usize {
        self.store
            .list_affiliations_for_employee(employee_email)
            .await
            .unwrap()
            .iter()
            .filter(|a| a.hr_email == hr_email && a.is_active())
            .count()
    }
}
