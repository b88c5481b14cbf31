// src/services/workflow_service.rs

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::{AppError, RejectionReason},
    db::ledger::{CommitOp, LedgerStore},
    models::{
        affiliation::Affiliation,
        asset::{Assignment, AssignmentStatus},
        auth::CallerIdentity,
        request::{AssetRequest, NewAssetRequest, ProcessAction, RequestStatus},
        user::normalize_email,
    },
    services::capacity_guard::{decide_approval, decide_direct_assignment, Decision},
};

#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Quantas vezes o ciclo snapshot -> decisão -> commit é refeito
    /// quando outro commit altera os mesmos registros.
    pub max_commit_attempts: u32,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self { max_commit_attempts: 5 }
    }
}

// Entrada já validada de um pedido novo
#[derive(Debug, Clone)]
pub struct SubmitRequestInput {
    pub asset_id: Uuid,
    pub asset_name: String,
    pub asset_type: String,
    pub hr_email: String,
    pub company_name: String,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ProcessOutcome {
    #[serde(rename_all = "camelCase")]
    Approved { assignment_id: Uuid, affiliation_created: bool },
    Rejected,
}

#[derive(Clone)]
pub struct WorkflowService {
    store: Arc<dyn LedgerStore>,
    config: WorkflowConfig,
}

impl WorkflowService {
    pub fn new(store: Arc<dyn LedgerStore>, config: WorkflowConfig) -> Self {
        Self { store, config }
    }

    // Refaz a tentativa inteira quando perdemos a corrida otimista.
    // Cada tentativa relê o snapshot, então a decisão nunca usa dado velho.
    async fn with_optimistic_retry<T, F, Fut>(&self, op_name: &str, mut attempt_fn: F) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let max_attempts = self.config.max_commit_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match attempt_fn().await {
                Err(AppError::StaleRecord { kind, id }) if attempt < max_attempts => {
                    debug!(op = op_name, attempt, %kind, %id, "Registro alterado durante o commit, refazendo");
                    tokio::task::yield_now().await;
                }
                other => return other,
            }
        }
    }

    // --- SUBMIT ---
    // Sem checagem de capacidade aqui: estoque e assentos só valem na aprovação.
    pub async fn submit_request(
        &self,
        caller: &CallerIdentity,
        input: SubmitRequestInput,
    ) -> Result<Uuid, AppError> {
        let request = self
            .store
            .insert_request(NewAssetRequest {
                asset_id: input.asset_id,
                asset_name: input.asset_name,
                asset_type: input.asset_type,
                requester_email: caller.email.clone(),
                requester_name: caller.name.clone(),
                requester_photo: caller.photo_url.clone(),
                hr_email: normalize_email(&input.hr_email),
                company_name: input.company_name,
                note: input.note,
            })
            .await?;

        info!(
            request_id = %request.id,
            asset_id = %request.asset_id,
            requester = %request.requester_email,
            hr = %request.hr_email,
            "📨 Pedido de ativo registrado"
        );
        Ok(request.id)
    }

    // --- PROCESS (aprovar / rejeitar) ---
    pub async fn process_request(
        &self,
        caller: &CallerIdentity,
        request_id: Uuid,
        action: ProcessAction,
    ) -> Result<ProcessOutcome, AppError> {
        let outcome = self
            .with_optimistic_retry("process_request", move || self.try_process(caller, request_id, action))
            .await?;

        info!(%request_id, processed_by = %caller.email, ?outcome, "Pedido processado");
        Ok(outcome)
    }

    async fn try_process(
        &self,
        caller: &CallerIdentity,
        request_id: Uuid,
        action: ProcessAction,
    ) -> Result<ProcessOutcome, AppError> {
        // 1. Snapshot único: pedido, tenant, ativo e afiliação
        let snapshot = self.store.approval_snapshot(request_id).await?;
        let request = &snapshot.request;

        // 2. Só o RH destinatário processa
        if request.hr_email != caller.email {
            return Err(AppError::Forbidden);
        }

        // 3. Estados terminais não voltam
        if request.request_status.is_terminal() {
            return Err(AppError::RequestAlreadyProcessed);
        }

        let now = Utc::now();

        if action == ProcessAction::Reject {
            self.store
                .commit_group(vec![CommitOp::ResolveRequest {
                    id: request.id,
                    expected_version: request.version,
                    status: RequestStatus::Rejected,
                    processed_by: caller.email.clone(),
                    approval_date: now,
                }])
                .await?;
            return Ok(ProcessOutcome::Rejected);
        }

        // 4. Aprovação
        let tenant = snapshot.tenant.as_ref().ok_or(AppError::TenantNotFound)?;
        let asset = snapshot.asset.as_ref().ok_or(AppError::AssetNotFound)?;
        if !asset.is_owned_by(&request.hr_email) {
            return Err(AppError::BusinessRejected(RejectionReason::AssetNotOwned));
        }

        let effects = match decide_approval(request, tenant, asset, snapshot.affiliation.is_some()) {
            Decision::Approve(effects) => effects,
            Decision::Reject(reason) => {
                info!(%request_id, %reason, "Aprovação vetada pelo Capacity Guard");
                return Err(AppError::BusinessRejected(reason));
            }
        };

        let mut ops = Vec::with_capacity(5);

        if effects.create_affiliation {
            ops.push(CommitOp::InsertAffiliation(Affiliation::activate(&request.requester_email, tenant)));
        } else if let Some(existing) = &snapshot.affiliation {
            // A decisão dependeu dessa afiliação: ela tem que continuar igual
            ops.push(CommitOp::AssertAffiliation { id: existing.id, expected_version: existing.version });
        }

        if effects.increment_seat_count {
            ops.push(CommitOp::AdjustSeats { tenant_id: tenant.id, expected_version: tenant.version, delta: 1 });
        }

        if effects.decrement_asset {
            ops.push(CommitOp::AdjustStock { asset_id: asset.id, expected_version: asset.version, delta: -1 });
        }

        let company_name = tenant.company_name.as_deref().unwrap_or(&request.company_name);
        let assignment = Assignment::hand_over(asset, &request.requester_email, &request.requester_name, company_name);
        let assignment_id = assignment.id;
        ops.push(CommitOp::InsertAssignment(assignment));

        ops.push(CommitOp::ResolveRequest {
            id: request.id,
            expected_version: request.version,
            status: RequestStatus::Approved,
            processed_by: caller.email.clone(),
            approval_date: now,
        });

        // 5. Tudo ou nada
        self.store.commit_group(ops).await?;

        Ok(ProcessOutcome::Approved {
            assignment_id,
            affiliation_created: effects.create_affiliation,
        })
    }

    // --- ATRIBUIÇÃO DIRETA (sem pedido) ---
    pub async fn assign_asset_direct(
        &self,
        caller: &CallerIdentity,
        employee_email: &str,
        asset_id: Uuid,
    ) -> Result<Assignment, AppError> {
        let employee_email = normalize_email(employee_email);
        let employee_email = employee_email.as_str();

        let assignment = self
            .with_optimistic_retry("assign_asset_direct", move || {
                self.try_assign_direct(caller, employee_email, asset_id)
            })
            .await?;

        info!(
            assignment_id = %assignment.id,
            %asset_id,
            employee = %employee_email,
            hr = %caller.email,
            "Ativo atribuído diretamente pelo RH"
        );
        Ok(assignment)
    }

    async fn try_assign_direct(
        &self,
        caller: &CallerIdentity,
        employee_email: &str,
        asset_id: Uuid,
    ) -> Result<Assignment, AppError> {
        let snapshot = self
            .store
            .direct_assignment_snapshot(&caller.email, employee_email, asset_id)
            .await?;

        let tenant = snapshot.tenant.as_ref().filter(|t| t.is_hr()).ok_or(AppError::Forbidden)?;
        let (asset, affiliation) =
            decide_direct_assignment(&caller.email, snapshot.asset.as_ref(), snapshot.affiliation.as_ref())
                .map_err(AppError::BusinessRejected)?;

        let employee_name = snapshot
            .employee
            .as_ref()
            .map(|e| e.name.as_str())
            .unwrap_or(employee_email);
        let company_name = tenant.company_name.as_deref().unwrap_or(&affiliation.company_name);
        let assignment = Assignment::hand_over(asset, employee_email, employee_name, company_name);

        self.store
            .commit_group(vec![
                CommitOp::AssertAffiliation { id: affiliation.id, expected_version: affiliation.version },
                CommitOp::AdjustStock { asset_id: asset.id, expected_version: asset.version, delta: -1 },
                CommitOp::InsertAssignment(assignment.clone()),
            ])
            .await?;

        Ok(assignment)
    }

    // --- DEVOLUÇÃO ---
    // Quem está com o ativo (ou o RH dono) devolve; o estoque volta +1.
    pub async fn return_assignment(
        &self,
        caller: &CallerIdentity,
        assignment_id: Uuid,
    ) -> Result<Assignment, AppError> {
        let returned = self
            .with_optimistic_retry("return_assignment", move || self.try_return(caller, assignment_id))
            .await?;

        info!(%assignment_id, asset_id = %returned.asset_id, by = %caller.email, "↩️ Ativo devolvido");
        Ok(returned)
    }

    async fn try_return(&self, caller: &CallerIdentity, assignment_id: Uuid) -> Result<Assignment, AppError> {
        let snapshot = self.store.return_snapshot(assignment_id).await?;
        let mut assignment = snapshot.assignment;

        if assignment.employee_email != caller.email && assignment.hr_email != caller.email {
            return Err(AppError::Forbidden);
        }
        if assignment.status == AssignmentStatus::Returned {
            return Err(AppError::AssignmentAlreadyReturned);
        }
        let asset = snapshot.asset.ok_or(AppError::AssetNotFound)?;

        let now = Utc::now();
        self.store
            .commit_group(vec![
                CommitOp::MarkReturned {
                    assignment_id: assignment.id,
                    expected_version: assignment.version,
                    return_date: now,
                },
                CommitOp::AdjustStock { asset_id: asset.id, expected_version: asset.version, delta: 1 },
            ])
            .await?;

        assignment.status = AssignmentStatus::Returned;
        assignment.return_date = Some(now);
        assignment.version += 1;
        Ok(assignment)
    }

    // --- LEITURA ---
    pub async fn list_requests_for_tenant(&self, caller: &CallerIdentity) -> Result<Vec<AssetRequest>, AppError> {
        self.store.list_requests_for_tenant(&caller.email).await
    }

    pub async fn get_request(&self, caller: &CallerIdentity, request_id: Uuid) -> Result<AssetRequest, AppError> {
        let request = self.store.get_request(request_id).await?.ok_or(AppError::RequestNotFound)?;
        if request.hr_email != caller.email && request.requester_email != caller.email {
            return Err(AppError::Forbidden);
        }
        Ok(request)
    }
}
