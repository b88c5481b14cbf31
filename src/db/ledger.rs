// src/db/ledger.rs

//! Contrato do Ledger Store: leitura de registros, snapshots consistentes
//! e o commit atômico de grupos de mutações.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        affiliation::Affiliation,
        asset::{Asset, Assignment, NewAsset},
        request::{AssetRequest, NewAssetRequest, RequestStatus},
        user::{NewUser, User},
    },
};

/// Os cinco tipos de registro guardados no ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    User,
    Asset,
    Request,
    Affiliation,
    Assignment,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordKind::User => "user",
            RecordKind::Asset => "asset",
            RecordKind::Request => "request",
            RecordKind::Affiliation => "affiliation",
            RecordKind::Assignment => "assignment",
        };
        f.write_str(name)
    }
}

/// Uma mutação dentro de um grupo de commit. Toda atualização carrega a
/// versão lida no snapshot; se o registro mudou desde então o grupo
/// inteiro é abortado com `AppError::StaleRecord`.
#[derive(Debug, Clone)]
pub enum CommitOp {
    /// Só aplica se o pedido ainda estiver `pending`.
    ResolveRequest {
        id: Uuid,
        expected_version: i64,
        status: RequestStatus,
        processed_by: String,
        approval_date: DateTime<Utc>,
    },
    /// Soma `delta` em `current_employees`, respeitando `package_limit`.
    AdjustSeats { tenant_id: Uuid, expected_version: i64, delta: i32 },
    /// Soma `delta` em `quantity`; o resultado nunca fica negativo.
    AdjustStock { asset_id: Uuid, expected_version: i64, delta: i32 },
    /// Falha se já houver afiliação ativa para o par.
    InsertAffiliation(Affiliation),
    /// Confirma que a afiliação lida continua ativa e intocada.
    AssertAffiliation { id: Uuid, expected_version: i64 },
    InsertAssignment(Assignment),
    /// Só aplica se a atribuição ainda estiver `assigned`.
    MarkReturned { assignment_id: Uuid, expected_version: i64, return_date: DateTime<Utc> },
}

impl CommitOp {
    /// Registro alvo, para relatar qual pré-condição falhou.
    pub fn target(&self) -> (RecordKind, Uuid) {
        match self {
            CommitOp::ResolveRequest { id, .. } => (RecordKind::Request, *id),
            CommitOp::AdjustSeats { tenant_id, .. } => (RecordKind::User, *tenant_id),
            CommitOp::AdjustStock { asset_id, .. } => (RecordKind::Asset, *asset_id),
            CommitOp::InsertAffiliation(a) => (RecordKind::Affiliation, a.id),
            CommitOp::AssertAffiliation { id, .. } => (RecordKind::Affiliation, *id),
            CommitOp::InsertAssignment(a) => (RecordKind::Assignment, a.id),
            CommitOp::MarkReturned { assignment_id, .. } => (RecordKind::Assignment, *assignment_id),
        }
    }

    pub fn stale(&self) -> AppError {
        let (kind, id) = self.target();
        AppError::StaleRecord { kind, id }
    }
}

/// Tudo que a aprovação precisa, lido de uma só vez.
#[derive(Debug, Clone)]
pub struct ApprovalSnapshot {
    pub request: AssetRequest,
    pub tenant: Option<User>,
    pub asset: Option<Asset>,
    pub affiliation: Option<Affiliation>,
}

/// Leitura consistente para a atribuição direta pelo RH.
#[derive(Debug, Clone)]
pub struct DirectAssignmentSnapshot {
    pub tenant: Option<User>,
    pub employee: Option<User>,
    pub asset: Option<Asset>,
    pub affiliation: Option<Affiliation>,
}

#[derive(Debug, Clone)]
pub struct ReturnSnapshot {
    pub assignment: Assignment,
    pub asset: Option<Asset>,
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    // --- Usuários ---
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn insert_user(&self, user: NewUser) -> Result<User, AppError>;

    // --- Ativos ---
    async fn get_asset(&self, id: Uuid) -> Result<Option<Asset>, AppError>;
    async fn insert_asset(&self, asset: NewAsset) -> Result<Asset, AppError>;
    async fn list_assets_for_tenant(&self, hr_email: &str) -> Result<Vec<Asset>, AppError>;

    // --- Pedidos ---
    async fn get_request(&self, id: Uuid) -> Result<Option<AssetRequest>, AppError>;
    async fn insert_request(&self, request: NewAssetRequest) -> Result<AssetRequest, AppError>;
    /// Mais recentes primeiro.
    async fn list_requests_for_tenant(&self, hr_email: &str) -> Result<Vec<AssetRequest>, AppError>;

    // --- Afiliações e atribuições (somente leitura; escrita só via commit_group) ---
    async fn list_affiliations_for_employee(&self, employee_email: &str) -> Result<Vec<Affiliation>, AppError>;
    async fn list_team_for_tenant(&self, hr_email: &str) -> Result<Vec<Affiliation>, AppError>;
    async fn list_assignments_for_employee(&self, employee_email: &str) -> Result<Vec<Assignment>, AppError>;
    async fn list_assignments_for_asset(&self, asset_id: Uuid) -> Result<Vec<Assignment>, AppError>;

    // --- Snapshots consistentes ---
    /// `RequestNotFound` se o pedido não existir.
    async fn approval_snapshot(&self, request_id: Uuid) -> Result<ApprovalSnapshot, AppError>;
    async fn direct_assignment_snapshot(
        &self,
        hr_email: &str,
        employee_email: &str,
        asset_id: Uuid,
    ) -> Result<DirectAssignmentSnapshot, AppError>;
    /// `AssignmentNotFound` se a atribuição não existir.
    async fn return_snapshot(&self, assignment_id: Uuid) -> Result<ReturnSnapshot, AppError>;

    /// Aplica todas as operações, na ordem, ou nenhuma.
    async fn commit_group(&self, ops: Vec<CommitOp>) -> Result<(), AppError>;
}
