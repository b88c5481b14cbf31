// src/models/asset.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- 1. Ativo (equipamento) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: Uuid,
    #[schema(example = "rh@acme.com")]
    pub owner_tenant_email: String,
    #[schema(example = "Notebook Dell 5440")]
    pub name: String,
    #[schema(example = "returnable")]
    pub asset_type: String,
    pub image: Option<String>,
    // Estoque disponível. Nunca fica negativo.
    #[schema(example = 3)]
    pub quantity: i32,
    #[serde(skip_serializing, default)]
    #[schema(ignore)]
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Asset {
    pub fn in_stock(&self) -> bool {
        self.quantity > 0
    }

    pub fn is_owned_by(&self, hr_email: &str) -> bool {
        self.owner_tenant_email == hr_email
    }
}

#[derive(Debug, Clone)]
pub struct NewAsset {
    pub owner_tenant_email: String,
    pub name: String,
    pub asset_type: String,
    pub image: Option<String>,
    pub quantity: i32,
}

// --- 2. Atribuição (uma unidade do ativo nas mãos de um funcionário) ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "assignment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    Assigned,
    Returned,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: Uuid,
    pub asset_id: Uuid,
    pub asset_name: String,
    pub asset_image: Option<String>,
    pub asset_type: String,
    pub employee_email: String,
    pub employee_name: String,
    pub hr_email: String,
    pub company_name: String,
    pub assignment_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: AssignmentStatus,
    #[serde(skip_serializing, default)]
    #[schema(ignore)]
    pub version: i64,
}

impl Assignment {
    /// Monta a entrada do livro-razão para uma unidade entregue agora.
    pub fn hand_over(asset: &Asset, employee_email: &str, employee_name: &str, company_name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            asset_id: asset.id,
            asset_name: asset.name.clone(),
            asset_image: asset.image.clone(),
            asset_type: asset.asset_type.clone(),
            employee_email: employee_email.to_string(),
            employee_name: employee_name.to_string(),
            hr_email: asset.owner_tenant_email.clone(),
            company_name: company_name.to_string(),
            assignment_date: Utc::now(),
            return_date: None,
            status: AssignmentStatus::Assigned,
            version: 0,
        }
    }
}
