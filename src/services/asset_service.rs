// src/services/asset_service.rs

use std::sync::Arc;

use tracing::info;

use crate::{
    common::error::AppError,
    db::ledger::LedgerStore,
    models::{
        asset::{Asset, Assignment, NewAsset},
        auth::CallerIdentity,
    },
};

#[derive(Debug, Clone)]
pub struct CreateAssetInput {
    pub name: String,
    pub asset_type: String,
    pub image: Option<String>,
    pub quantity: i32,
}

#[derive(Clone)]
pub struct AssetService {
    store: Arc<dyn LedgerStore>,
}

impl AssetService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    // Só RH cadastrado pode criar ativos
    async fn require_hr(&self, caller: &CallerIdentity) -> Result<(), AppError> {
        match self.store.find_user_by_email(&caller.email).await? {
            Some(user) if user.is_hr() => Ok(()),
            _ => Err(AppError::Forbidden),
        }
    }

    pub async fn create_asset(&self, caller: &CallerIdentity, input: CreateAssetInput) -> Result<Asset, AppError> {
        self.require_hr(caller).await?;

        let asset = self
            .store
            .insert_asset(NewAsset {
                owner_tenant_email: caller.email.clone(),
                name: input.name,
                asset_type: input.asset_type,
                image: input.image,
                quantity: input.quantity,
            })
            .await?;

        info!(asset_id = %asset.id, owner = %asset.owner_tenant_email, quantity = asset.quantity, "📦 Ativo criado");
        Ok(asset)
    }

    pub async fn list_assets(&self, caller: &CallerIdentity) -> Result<Vec<Asset>, AppError> {
        self.store.list_assets_for_tenant(&caller.email).await
    }

    pub async fn list_my_assignments(&self, caller: &CallerIdentity) -> Result<Vec<Assignment>, AppError> {
        self.store.list_assignments_for_employee(&caller.email).await
    }
}
