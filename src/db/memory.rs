// src/db/memory.rs

//! Ledger em memória. Usado nos testes e com STORE_BACKEND=memory.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::ledger::{
    ApprovalSnapshot, CommitOp, DirectAssignmentSnapshot, LedgerStore, ReturnSnapshot,
};
use crate::{
    common::{
        error::{AppError, RejectionReason},
        retry::RetryPolicy,
    },
    models::{
        affiliation::Affiliation,
        asset::{Asset, Assignment, AssignmentStatus, NewAsset},
        request::{AssetRequest, NewAssetRequest, RequestStatus},
        user::{NewUser, User},
    },
};

#[derive(Debug, Default, Clone)]
struct Tables {
    users: HashMap<Uuid, User>,
    assets: HashMap<Uuid, Asset>,
    requests: HashMap<Uuid, AssetRequest>,
    affiliations: HashMap<Uuid, Affiliation>,
    assignments: HashMap<Uuid, Assignment>,
}

impl Tables {
    fn user_by_email(&self, email: &str) -> Option<&User> {
        self.users.values().find(|u| u.email == email)
    }

    fn active_affiliation(&self, employee_email: &str, hr_email: &str) -> Option<&Affiliation> {
        self.affiliations
            .values()
            .find(|a| a.is_active() && a.employee_email == employee_email && a.hr_email == hr_email)
    }

    fn apply(&mut self, op: &CommitOp) -> Result<(), AppError> {
        match op {
            CommitOp::ResolveRequest { id, expected_version, status, processed_by, approval_date } => {
                let request = self.requests.get_mut(id).ok_or_else(|| op.stale())?;
                if request.version != *expected_version || request.request_status != RequestStatus::Pending {
                    return Err(op.stale());
                }
                request.request_status = *status;
                request.processed_by = Some(processed_by.clone());
                request.approval_date = Some(*approval_date);
                request.version += 1;
            }
            CommitOp::AdjustSeats { tenant_id, expected_version, delta } => {
                let tenant = self.users.get_mut(tenant_id).ok_or_else(|| op.stale())?;
                if tenant.version != *expected_version {
                    return Err(op.stale());
                }
                let next = tenant.current_employees + delta;
                if next < 0 || next > tenant.package_limit {
                    return Err(AppError::BusinessRejected(RejectionReason::SeatLimitExceeded));
                }
                tenant.current_employees = next;
                tenant.version += 1;
            }
            CommitOp::AdjustStock { asset_id, expected_version, delta } => {
                let asset = self.assets.get_mut(asset_id).ok_or_else(|| op.stale())?;
                if asset.version != *expected_version {
                    return Err(op.stale());
                }
                let next = asset.quantity + delta;
                if next < 0 {
                    return Err(AppError::BusinessRejected(RejectionReason::AssetUnavailable));
                }
                asset.quantity = next;
                asset.version += 1;
            }
            CommitOp::InsertAffiliation(affiliation) => {
                if self.active_affiliation(&affiliation.employee_email, &affiliation.hr_email).is_some() {
                    return Err(op.stale());
                }
                self.affiliations.insert(affiliation.id, affiliation.clone());
            }
            CommitOp::AssertAffiliation { id, expected_version } => {
                let ok = self
                    .affiliations
                    .get(id)
                    .is_some_and(|a| a.is_active() && a.version == *expected_version);
                if !ok {
                    return Err(op.stale());
                }
            }
            CommitOp::InsertAssignment(assignment) => {
                self.assignments.insert(assignment.id, assignment.clone());
            }
            CommitOp::MarkReturned { assignment_id, expected_version, return_date } => {
                let assignment = self.assignments.get_mut(assignment_id).ok_or_else(|| op.stale())?;
                if assignment.version != *expected_version || assignment.status != AssignmentStatus::Assigned {
                    return Err(op.stale());
                }
                assignment.status = AssignmentStatus::Returned;
                assignment.return_date = Some(*return_date);
                assignment.version += 1;
            }
        }
        Ok(())
    }
}

pub struct InMemoryLedgerStore {
    tables: RwLock<Tables>,
    retry: RetryPolicy,
    injected_faults: AtomicU32,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::with_retry(RetryPolicy::default())
    }

    pub fn with_retry(retry: RetryPolicy) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            retry,
            injected_faults: AtomicU32::new(0),
        }
    }

    /// As próximas `count` tentativas de commit falham como transitórias
    /// (para testes de repetição).
    pub fn inject_transient_faults(&self, count: u32) {
        self.injected_faults.store(count, Ordering::SeqCst);
    }

    fn take_fault(&self) -> bool {
        self.injected_faults
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    async fn try_commit(&self, ops: &[CommitOp]) -> Result<(), AppError> {
        if self.take_fault() {
            return Err(AppError::StorageTransient("falha injetada".into()));
        }

        let mut tables = self.tables.write().await;
        // Aplica numa cópia e só troca se todas as operações passarem
        let mut staged = tables.clone();
        for op in ops {
            staged.apply(op)?;
        }
        *tables = staged;
        Ok(())
    }
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.tables.read().await.user_by_email(email).cloned())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, AppError> {
        let mut tables = self.tables.write().await;
        if tables.user_by_email(&user.email).is_some() {
            return Err(AppError::EmailAlreadyExists);
        }
        let record = User {
            id: Uuid::new_v4(),
            email: user.email,
            name: user.name,
            photo_url: user.photo_url,
            role: user.role,
            company_name: user.company_name,
            company_logo: user.company_logo,
            package_limit: user.package_limit,
            current_employees: 0,
            version: 0,
            created_at: Utc::now(),
        };
        tables.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_asset(&self, id: Uuid) -> Result<Option<Asset>, AppError> {
        Ok(self.tables.read().await.assets.get(&id).cloned())
    }

    async fn insert_asset(&self, asset: NewAsset) -> Result<Asset, AppError> {
        let record = Asset {
            id: Uuid::new_v4(),
            owner_tenant_email: asset.owner_tenant_email,
            name: asset.name,
            asset_type: asset.asset_type,
            image: asset.image,
            quantity: asset.quantity,
            version: 0,
            created_at: Utc::now(),
        };
        self.tables.write().await.assets.insert(record.id, record.clone());
        Ok(record)
    }

    async fn list_assets_for_tenant(&self, hr_email: &str) -> Result<Vec<Asset>, AppError> {
        let tables = self.tables.read().await;
        let mut assets: Vec<Asset> = tables
            .assets
            .values()
            .filter(|a| a.owner_tenant_email == hr_email)
            .cloned()
            .collect();
        assets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(assets)
    }

    async fn get_request(&self, id: Uuid) -> Result<Option<AssetRequest>, AppError> {
        Ok(self.tables.read().await.requests.get(&id).cloned())
    }

    async fn insert_request(&self, request: NewAssetRequest) -> Result<AssetRequest, AppError> {
        let record = AssetRequest {
            id: Uuid::new_v4(),
            asset_id: request.asset_id,
            asset_name: request.asset_name,
            asset_type: request.asset_type,
            requester_email: request.requester_email,
            requester_name: request.requester_name,
            requester_photo: request.requester_photo,
            hr_email: request.hr_email,
            company_name: request.company_name,
            note: request.note,
            request_date: Utc::now(),
            request_status: RequestStatus::Pending,
            approval_date: None,
            processed_by: None,
            version: 0,
        };
        self.tables.write().await.requests.insert(record.id, record.clone());
        Ok(record)
    }

    async fn list_requests_for_tenant(&self, hr_email: &str) -> Result<Vec<AssetRequest>, AppError> {
        let tables = self.tables.read().await;
        let mut requests: Vec<AssetRequest> = tables
            .requests
            .values()
            .filter(|r| r.hr_email == hr_email)
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.request_date.cmp(&a.request_date));
        Ok(requests)
    }

    async fn list_affiliations_for_employee(&self, employee_email: &str) -> Result<Vec<Affiliation>, AppError> {
        let tables = self.tables.read().await;
        let mut list: Vec<Affiliation> = tables
            .affiliations
            .values()
            .filter(|a| a.employee_email == employee_email)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.affiliation_date.cmp(&a.affiliation_date));
        Ok(list)
    }

    async fn list_team_for_tenant(&self, hr_email: &str) -> Result<Vec<Affiliation>, AppError> {
        let tables = self.tables.read().await;
        let mut list: Vec<Affiliation> = tables
            .affiliations
            .values()
            .filter(|a| a.hr_email == hr_email && a.is_active())
            .cloned()
            .collect();
        list.sort_by(|a, b| a.affiliation_date.cmp(&b.affiliation_date));
        Ok(list)
    }

    async fn list_assignments_for_employee(&self, employee_email: &str) -> Result<Vec<Assignment>, AppError> {
        let tables = self.tables.read().await;
        let mut list: Vec<Assignment> = tables
            .assignments
            .values()
            .filter(|a| a.employee_email == employee_email)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.assignment_date.cmp(&a.assignment_date));
        Ok(list)
    }

    async fn list_assignments_for_asset(&self, asset_id: Uuid) -> Result<Vec<Assignment>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .assignments
            .values()
            .filter(|a| a.asset_id == asset_id)
            .cloned()
            .collect())
    }

    async fn approval_snapshot(&self, request_id: Uuid) -> Result<ApprovalSnapshot, AppError> {
        let tables = self.tables.read().await;
        let request = tables.requests.get(&request_id).cloned().ok_or(AppError::RequestNotFound)?;
        Ok(ApprovalSnapshot {
            tenant: tables.user_by_email(&request.hr_email).cloned(),
            asset: tables.assets.get(&request.asset_id).cloned(),
            affiliation: tables
                .active_affiliation(&request.requester_email, &request.hr_email)
                .cloned(),
            request,
        })
    }

    async fn direct_assignment_snapshot(
        &self,
        hr_email: &str,
        employee_email: &str,
        asset_id: Uuid,
    ) -> Result<DirectAssignmentSnapshot, AppError> {
        let tables = self.tables.read().await;
        Ok(DirectAssignmentSnapshot {
            tenant: tables.user_by_email(hr_email).cloned(),
            employee: tables.user_by_email(employee_email).cloned(),
            asset: tables.assets.get(&asset_id).cloned(),
            affiliation: tables.active_affiliation(employee_email, hr_email).cloned(),
        })
    }

    async fn return_snapshot(&self, assignment_id: Uuid) -> Result<ReturnSnapshot, AppError> {
        let tables = self.tables.read().await;
        let assignment = tables
            .assignments
            .get(&assignment_id)
            .cloned()
            .ok_or(AppError::AssignmentNotFound)?;
        Ok(ReturnSnapshot {
            asset: tables.assets.get(&assignment.asset_id).cloned(),
            assignment,
        })
    }

    async fn commit_group(&self, ops: Vec<CommitOp>) -> Result<(), AppError> {
        let ops = &ops;
        self.retry.run("commit_group", move || self.try_commit(ops)).await
    }
}
