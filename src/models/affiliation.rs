// src/models/affiliation.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::user::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "affiliation_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AffiliationStatus {
    Active,
    Inactive,
}

// Vínculo funcionário <-> empresa. No máximo um ativo por par
// (employee_email, hr_email).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Affiliation {
    pub id: Uuid,
    pub employee_email: String,
    pub hr_email: String,
    pub company_name: String,
    pub company_logo: Option<String>,
    pub affiliation_date: DateTime<Utc>,
    pub status: AffiliationStatus,
    #[serde(skip_serializing, default)]
    #[schema(ignore)]
    pub version: i64,
}

impl Affiliation {
    pub fn activate(employee_email: &str, tenant: &User) -> Self {
        Self {
            id: Uuid::new_v4(),
            employee_email: employee_email.to_string(),
            hr_email: tenant.email.clone(),
            company_name: tenant.company_name.clone().unwrap_or_default(),
            company_logo: tenant.company_logo.clone(),
            affiliation_date: Utc::now(),
            status: AffiliationStatus::Active,
            version: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AffiliationStatus::Active
    }
}
