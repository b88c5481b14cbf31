// src/models/request.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// pending -> approved | rejected. Os dois últimos são terminais.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "request_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

// Ação do RH sobre um pedido pendente
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProcessAction {
    Approve,
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssetRequest {
    pub id: Uuid,
    pub asset_id: Uuid,
    pub asset_name: String,
    pub asset_type: String,
    pub requester_email: String,
    pub requester_name: String,
    pub requester_photo: Option<String>,
    pub hr_email: String,
    pub company_name: String,
    pub note: Option<String>,
    pub request_date: DateTime<Utc>,
    pub request_status: RequestStatus,
    pub approval_date: Option<DateTime<Utc>>,
    pub processed_by: Option<String>,
    #[serde(skip_serializing, default)]
    #[schema(ignore)]
    pub version: i64,
}

#[derive(Debug, Clone)]
pub struct NewAssetRequest {
    pub asset_id: Uuid,
    pub asset_name: String,
    pub asset_type: String,
    pub requester_email: String,
    pub requester_name: String,
    pub requester_photo: Option<String>,
    pub hr_email: String,
    pub company_name: String,
    pub note: Option<String>,
}
