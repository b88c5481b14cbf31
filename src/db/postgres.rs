// src/db/postgres.rs

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
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
        asset::{Asset, Assignment, NewAsset},
        request::{AssetRequest, NewAssetRequest},
        user::{NewUser, User},
    },
};

// Separa o que vale repetir (rede, pool, serialização) do resto.
fn classify(e: sqlx::Error) -> AppError {
    let transient = match &e {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut => true,
        // 40001 serialization_failure, 40P01 deadlock_detected
        sqlx::Error::Database(db_err) => matches!(db_err.code().as_deref(), Some("40001" | "40P01")),
        _ => false,
    };
    if transient {
        AppError::StorageTransient(e.to_string())
    } else {
        AppError::DatabaseError(e)
    }
}

// O COMMIT pode ter sido aplicado mesmo sem resposta: repetir o grupo
// transformaria sucesso em StaleRecord, então encerra aqui.
fn commit_failure(e: sqlx::Error) -> AppError {
    if matches!(e, sqlx::Error::Io(_)) {
        AppError::StorageUnavailable { attempts: 1, last: e.to_string() }
    } else {
        classify(e)
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
    retry: RetryPolicy,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool, retry: RetryPolicy) -> Self {
        Self { pool, retry }
    }

    // Abre uma transação só de leitura com snapshot estável
    async fn begin_snapshot(&self) -> Result<sqlx::Transaction<'static, sqlx::Postgres>, AppError> {
        let mut tx = self.pool.begin().await.map_err(classify)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(classify)?;
        Ok(tx)
    }

    async fn user_by_email(conn: &mut PgConnection, email: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(conn)
            .await
            .map_err(classify)
    }

    async fn asset_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<Asset>, AppError> {
        sqlx::query_as::<_, Asset>("SELECT * FROM assets WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await
            .map_err(classify)
    }

    async fn active_affiliation(
        conn: &mut PgConnection,
        employee_email: &str,
        hr_email: &str,
    ) -> Result<Option<Affiliation>, AppError> {
        sqlx::query_as::<_, Affiliation>(
            r#"
            SELECT * FROM affiliations
            WHERE employee_email = $1 AND hr_email = $2 AND status = 'active'
            "#,
        )
            .bind(employee_email)
            .bind(hr_email)
            .fetch_optional(conn)
            .await
            .map_err(classify)
    }

    async fn try_commit(&self, ops: &[CommitOp]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(classify)?;

        for op in ops {
            // Se falhar aqui, o drop do `tx` faz o rollback
            Self::apply(&mut tx, op).await?;
        }

        tx.commit().await.map_err(commit_failure)?;
        Ok(())
    }

    async fn apply(conn: &mut PgConnection, op: &CommitOp) -> Result<(), AppError> {
        match op {
            CommitOp::ResolveRequest { id, expected_version, status, processed_by, approval_date } => {
                let result = sqlx::query(
                    r#"
                    UPDATE asset_requests
                    SET request_status = $1, processed_by = $2, approval_date = $3, version = version + 1
                    WHERE id = $4 AND version = $5 AND request_status = 'pending'
                    "#,
                )
                    .bind(*status)
                    .bind(processed_by)
                    .bind(approval_date)
                    .bind(id)
                    .bind(expected_version)
                    .execute(&mut *conn)
                    .await
                    .map_err(classify)?;

                if result.rows_affected() == 0 {
                    return Err(op.stale());
                }
            }
            CommitOp::AdjustSeats { tenant_id, expected_version, delta } => {
                let row: Option<(i64, i32, i32)> = sqlx::query_as(
                    "SELECT version, current_employees, package_limit FROM users WHERE id = $1 FOR UPDATE",
                )
                    .bind(tenant_id)
                    .fetch_optional(&mut *conn)
                    .await
                    .map_err(classify)?;

                let (version, current, limit) = row.ok_or_else(|| op.stale())?;
                if version != *expected_version {
                    return Err(op.stale());
                }
                let next = current + delta;
                if next < 0 || next > limit {
                    return Err(AppError::BusinessRejected(RejectionReason::SeatLimitExceeded));
                }

                sqlx::query("UPDATE users SET current_employees = $1, version = version + 1 WHERE id = $2")
                    .bind(next)
                    .bind(tenant_id)
                    .execute(&mut *conn)
                    .await
                    .map_err(classify)?;
            }
            CommitOp::AdjustStock { asset_id, expected_version, delta } => {
                let row: Option<(i64, i32)> =
                    sqlx::query_as("SELECT version, quantity FROM assets WHERE id = $1 FOR UPDATE")
                        .bind(asset_id)
                        .fetch_optional(&mut *conn)
                        .await
                        .map_err(classify)?;

                let (version, quantity) = row.ok_or_else(|| op.stale())?;
                if version != *expected_version {
                    return Err(op.stale());
                }
                let next = quantity + delta;
                if next < 0 {
                    return Err(AppError::BusinessRejected(RejectionReason::AssetUnavailable));
                }

                sqlx::query("UPDATE assets SET quantity = $1, version = version + 1 WHERE id = $2")
                    .bind(next)
                    .bind(asset_id)
                    .execute(&mut *conn)
                    .await
                    .map_err(classify)?;
            }
            CommitOp::InsertAffiliation(a) => {
                // O índice parcial único (employee_email, hr_email) WHERE status = 'active'
                // barra a segunda afiliação ativa
                sqlx::query(
                    r#"
                    INSERT INTO affiliations
                        (id, employee_email, hr_email, company_name, company_logo, affiliation_date, status, version)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, 0)
                    "#,
                )
                    .bind(a.id)
                    .bind(&a.employee_email)
                    .bind(&a.hr_email)
                    .bind(&a.company_name)
                    .bind(&a.company_logo)
                    .bind(a.affiliation_date)
                    .bind(a.status)
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| if is_unique_violation(&e) { op.stale() } else { classify(e) })?;
            }
            CommitOp::AssertAffiliation { id, expected_version } => {
                let found: Option<i32> = sqlx::query_scalar(
                    "SELECT 1 FROM affiliations WHERE id = $1 AND version = $2 AND status = 'active' FOR SHARE",
                )
                    .bind(id)
                    .bind(expected_version)
                    .fetch_optional(&mut *conn)
                    .await
                    .map_err(classify)?;

                if found.is_none() {
                    return Err(op.stale());
                }
            }
            CommitOp::InsertAssignment(a) => {
                sqlx::query(
                    r#"
                    INSERT INTO assignments
                        (id, asset_id, asset_name, asset_image, asset_type, employee_email, employee_name,
                         hr_email, company_name, assignment_date, return_date, status, version)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 0)
                    "#,
                )
                    .bind(a.id)
                    .bind(a.asset_id)
                    .bind(&a.asset_name)
                    .bind(&a.asset_image)
                    .bind(&a.asset_type)
                    .bind(&a.employee_email)
                    .bind(&a.employee_name)
                    .bind(&a.hr_email)
                    .bind(&a.company_name)
                    .bind(a.assignment_date)
                    .bind(a.return_date)
                    .bind(a.status)
                    .execute(&mut *conn)
                    .await
                    .map_err(classify)?;
            }
            CommitOp::MarkReturned { assignment_id, expected_version, return_date } => {
                let result = sqlx::query(
                    r#"
                    UPDATE assignments
                    SET status = 'returned', return_date = $1, version = version + 1
                    WHERE id = $2 AND version = $3 AND status = 'assigned'
                    "#,
                )
                    .bind(return_date)
                    .bind(assignment_id)
                    .bind(expected_version)
                    .execute(&mut *conn)
                    .await
                    .map_err(classify)?;

                if result.rows_affected() == 0 {
                    return Err(op.stale());
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.retry
            .run("find_user_by_email", move || async move {
                let mut conn = self.pool.acquire().await.map_err(classify)?;
                Self::user_by_email(&mut conn, email).await
            })
            .await
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, AppError> {
        let user = &user;
        self.retry
            .run("insert_user", move || async move {
                sqlx::query_as::<_, User>(
                    r#"
                    INSERT INTO users (id, email, name, photo_url, role, company_name, company_logo, package_limit)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                    RETURNING *
                    "#,
                )
                    .bind(Uuid::new_v4())
                    .bind(&user.email)
                    .bind(&user.name)
                    .bind(&user.photo_url)
                    .bind(user.role)
                    .bind(&user.company_name)
                    .bind(&user.company_logo)
                    .bind(user.package_limit)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(|e| {
                        // Converte erro de violação de chave única em um erro mais amigável
                        if is_unique_violation(&e) {
                            return AppError::EmailAlreadyExists;
                        }
                        classify(e)
                    })
            })
            .await
    }

    async fn get_asset(&self, id: Uuid) -> Result<Option<Asset>, AppError> {
        self.retry
            .run("get_asset", move || async move {
                let mut conn = self.pool.acquire().await.map_err(classify)?;
                Self::asset_by_id(&mut conn, id).await
            })
            .await
    }

    async fn insert_asset(&self, asset: NewAsset) -> Result<Asset, AppError> {
        let asset = &asset;
        self.retry
            .run("insert_asset", move || async move {
                sqlx::query_as::<_, Asset>(
                    r#"
                    INSERT INTO assets (id, owner_tenant_email, name, asset_type, image, quantity)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    RETURNING *
                    "#,
                )
                    .bind(Uuid::new_v4())
                    .bind(&asset.owner_tenant_email)
                    .bind(&asset.name)
                    .bind(&asset.asset_type)
                    .bind(&asset.image)
                    .bind(asset.quantity)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(classify)
            })
            .await
    }

    async fn list_assets_for_tenant(&self, hr_email: &str) -> Result<Vec<Asset>, AppError> {
        self.retry
            .run("list_assets_for_tenant", move || async move {
                sqlx::query_as::<_, Asset>("SELECT * FROM assets WHERE owner_tenant_email = $1 ORDER BY name ASC")
                    .bind(hr_email)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(classify)
            })
            .await
    }

    async fn get_request(&self, id: Uuid) -> Result<Option<AssetRequest>, AppError> {
        self.retry
            .run("get_request", move || async move {
                sqlx::query_as::<_, AssetRequest>("SELECT * FROM asset_requests WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(classify)
            })
            .await
    }

    async fn insert_request(&self, request: NewAssetRequest) -> Result<AssetRequest, AppError> {
        let request = &request;
        self.retry
            .run("insert_request", move || async move {
                sqlx::query_as::<_, AssetRequest>(
                    r#"
                    INSERT INTO asset_requests
                        (id, asset_id, asset_name, asset_type, requester_email, requester_name,
                         requester_photo, hr_email, company_name, note)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                    RETURNING *
                    "#,
                )
                    .bind(Uuid::new_v4())
                    .bind(request.asset_id)
                    .bind(&request.asset_name)
                    .bind(&request.asset_type)
                    .bind(&request.requester_email)
                    .bind(&request.requester_name)
                    .bind(&request.requester_photo)
                    .bind(&request.hr_email)
                    .bind(&request.company_name)
                    .bind(&request.note)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(classify)
            })
            .await
    }

    async fn list_requests_for_tenant(&self, hr_email: &str) -> Result<Vec<AssetRequest>, AppError> {
        self.retry
            .run("list_requests_for_tenant", move || async move {
                sqlx::query_as::<_, AssetRequest>(
                    "SELECT * FROM asset_requests WHERE hr_email = $1 ORDER BY request_date DESC",
                )
                    .bind(hr_email)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(classify)
            })
            .await
    }

    async fn list_affiliations_for_employee(&self, employee_email: &str) -> Result<Vec<Affiliation>, AppError> {
        self.retry
            .run("list_affiliations_for_employee", move || async move {
                sqlx::query_as::<_, Affiliation>(
                    "SELECT * FROM affiliations WHERE employee_email = $1 ORDER BY affiliation_date DESC",
                )
                    .bind(employee_email)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(classify)
            })
            .await
    }

    async fn list_team_for_tenant(&self, hr_email: &str) -> Result<Vec<Affiliation>, AppError> {
        self.retry
            .run("list_team_for_tenant", move || async move {
                sqlx::query_as::<_, Affiliation>(
                    r#"
                    SELECT * FROM affiliations
                    WHERE hr_email = $1 AND status = 'active'
                    ORDER BY affiliation_date ASC
                    "#,
                )
                    .bind(hr_email)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(classify)
            })
            .await
    }

    async fn list_assignments_for_employee(&self, employee_email: &str) -> Result<Vec<Assignment>, AppError> {
        self.retry
            .run("list_assignments_for_employee", move || async move {
                sqlx::query_as::<_, Assignment>(
                    "SELECT * FROM assignments WHERE employee_email = $1 ORDER BY assignment_date DESC",
                )
                    .bind(employee_email)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(classify)
            })
            .await
    }

    async fn list_assignments_for_asset(&self, asset_id: Uuid) -> Result<Vec<Assignment>, AppError> {
        self.retry
            .run("list_assignments_for_asset", move || async move {
                sqlx::query_as::<_, Assignment>("SELECT * FROM assignments WHERE asset_id = $1")
                    .bind(asset_id)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(classify)
            })
            .await
    }

    async fn approval_snapshot(&self, request_id: Uuid) -> Result<ApprovalSnapshot, AppError> {
        self.retry
            .run("approval_snapshot", move || async move {
                let mut tx = self.begin_snapshot().await?;

                let request = sqlx::query_as::<_, AssetRequest>("SELECT * FROM asset_requests WHERE id = $1")
                    .bind(request_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(classify)?
                    .ok_or(AppError::RequestNotFound)?;

                let tenant = Self::user_by_email(&mut tx, &request.hr_email).await?;
                let asset = Self::asset_by_id(&mut tx, request.asset_id).await?;
                let affiliation =
                    Self::active_affiliation(&mut tx, &request.requester_email, &request.hr_email).await?;

                tx.commit().await.map_err(classify)?;
                Ok(ApprovalSnapshot { request, tenant, asset, affiliation })
            })
            .await
    }

    async fn direct_assignment_snapshot(
        &self,
        hr_email: &str,
        employee_email: &str,
        asset_id: Uuid,
    ) -> Result<DirectAssignmentSnapshot, AppError> {
        self.retry
            .run("direct_assignment_snapshot", move || async move {
                let mut tx = self.begin_snapshot().await?;

                let tenant = Self::user_by_email(&mut tx, hr_email).await?;
                let employee = Self::user_by_email(&mut tx, employee_email).await?;
                let asset = Self::asset_by_id(&mut tx, asset_id).await?;
                let affiliation = Self::active_affiliation(&mut tx, employee_email, hr_email).await?;

                tx.commit().await.map_err(classify)?;
                Ok(DirectAssignmentSnapshot { tenant, employee, asset, affiliation })
            })
            .await
    }

    async fn return_snapshot(&self, assignment_id: Uuid) -> Result<ReturnSnapshot, AppError> {
        self.retry
            .run("return_snapshot", move || async move {
                let mut tx = self.begin_snapshot().await?;

                let assignment = sqlx::query_as::<_, Assignment>("SELECT * FROM assignments WHERE id = $1")
                    .bind(assignment_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(classify)?
                    .ok_or(AppError::AssignmentNotFound)?;
                let asset = Self::asset_by_id(&mut tx, assignment.asset_id).await?;

                tx.commit().await.map_err(classify)?;
                Ok(ReturnSnapshot { assignment, asset })
            })
            .await
    }

    async fn commit_group(&self, ops: Vec<CommitOp>) -> Result<(), AppError> {
        let ops = &ops;
        self.retry.run("commit_group", move || self.try_commit(ops)).await
    }
}

#[cfg(test)]
mod tests {
    use std::{borrow::Cow, error::Error as StdError, io};

    use sqlx::error::{DatabaseError, ErrorKind};

    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("erro do servidor {code}")]
    struct ServerError {
        code: &'static str,
        kind: ErrorKind,
    }

    impl DatabaseError for ServerError {
        fn message(&self) -> &str {
            "erro do servidor"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.code))
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            match &self.kind {
                ErrorKind::UniqueViolation => ErrorKind::UniqueViolation,
                ErrorKind::CheckViolation => ErrorKind::CheckViolation,
                _ => ErrorKind::Other,
            }
        }
    }

    fn server(code: &'static str, kind: ErrorKind) -> sqlx::Error {
        sqlx::Error::Database(Box::new(ServerError { code, kind }))
    }

    fn io_error() -> sqlx::Error {
        sqlx::Error::Io(io::Error::new(io::ErrorKind::ConnectionReset, "conexão caiu"))
    }

    #[test]
    fn serialization_deadlock_io_and_pool_timeout_are_transient() {
        for e in [
            server("40001", ErrorKind::Other),
            server("40P01", ErrorKind::Other),
            io_error(),
            sqlx::Error::PoolTimedOut,
        ] {
            assert!(matches!(classify(e), AppError::StorageTransient(_)));
        }
    }

    #[test]
    fn other_errors_are_permanent() {
        // 23514 check_violation, 23505 unique_violation
        for e in [
            server("23514", ErrorKind::CheckViolation),
            server("23505", ErrorKind::UniqueViolation),
            sqlx::Error::RowNotFound,
        ] {
            assert!(matches!(classify(e), AppError::DatabaseError(_)));
        }
    }

    #[test]
    fn unique_violation_is_detected() {
        assert!(is_unique_violation(&server("23505", ErrorKind::UniqueViolation)));
        assert!(!is_unique_violation(&server("23514", ErrorKind::CheckViolation)));
        assert!(!is_unique_violation(&io_error()));
    }

    #[test]
    fn lost_commit_reply_is_not_retried() {
        match commit_failure(io_error()) {
            AppError::StorageUnavailable { attempts, .. } => assert_eq!(attempts, 1),
            other => panic!("esperava StorageUnavailable, veio {:?}", other),
        }
        // Servidor respondeu com erro: nada foi aplicado, pode repetir
        assert!(matches!(commit_failure(server("40001", ErrorKind::Other)), AppError::StorageTransient(_)));
    }
}
