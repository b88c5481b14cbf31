use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::{db::ledger::RecordKind, middleware::i18n::Locale};

// Motivo de veto de negócio (Capacity Guard e atribuição direta).
// O `code` é estável e vai no corpo da resposta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    AssetUnavailable,
    SeatLimitExceeded,
    NotAffiliated,
    AssetNotOwned,
}

impl RejectionReason {
    pub fn code(self) -> &'static str {
        match self {
            RejectionReason::AssetUnavailable => "asset_unavailable",
            RejectionReason::SeatLimitExceeded => "seat_limit_exceeded",
            RejectionReason::NotAffiliated => "not_affiliated",
            RejectionReason::AssetNotOwned => "asset_not_owned",
        }
    }
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            RejectionReason::AssetUnavailable => "asset unavailable",
            RejectionReason::SeatLimitExceeded => "seat limit exceeded",
            RejectionReason::NotAffiliated => "employee not affiliated",
            RejectionReason::AssetNotOwned => "asset not owned by tenant",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Identidade do chamador ausente ou inválida")]
    Unauthorized,

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("Empresa (RH) não encontrada")]
    TenantNotFound,

    #[error("Ativo não encontrado")]
    AssetNotFound,

    #[error("Pedido não encontrado")]
    RequestNotFound,

    #[error("Atribuição não encontrada")]
    AssignmentNotFound,

    #[error("Acesso negado a este registro")]
    Forbidden,

    #[error("Pedido já processado")]
    RequestAlreadyProcessed,

    #[error("Ativo já devolvido")]
    AssignmentAlreadyReturned,

    // Perdeu a corrida otimista: o registro mudou entre a leitura e o commit
    #[error("Registro desatualizado: {kind} {id}")]
    StaleRecord { kind: RecordKind, id: Uuid },

    #[error("Rejeitado pela regra de negócio: {0}")]
    BusinessRejected(RejectionReason),

    // Falha de infraestrutura que ainda pode ser repetida
    #[error("Falha transitória de armazenamento: {0}")]
    StorageTransient(String),

    // Orçamento de tentativas esgotado
    #[error("Armazenamento indisponível após {attempts} tentativas: {last}")]
    StorageUnavailable { attempts: u32, last: String },

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::UserNotFound
            | AppError::TenantNotFound
            | AppError::AssetNotFound
            | AppError::RequestNotFound
            | AppError::AssignmentNotFound => StatusCode::NOT_FOUND,
            AppError::EmailAlreadyExists
            | AppError::RequestAlreadyProcessed
            | AppError::AssignmentAlreadyReturned
            | AppError::StaleRecord { .. } => StatusCode::CONFLICT,
            AppError::BusinessRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::StorageTransient(_) | AppError::StorageUnavailable { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "validation_failed",
            AppError::Unauthorized => "unauthorized",
            AppError::EmailAlreadyExists => "email_already_exists",
            AppError::UserNotFound
            | AppError::TenantNotFound
            | AppError::AssetNotFound
            | AppError::RequestNotFound
            | AppError::AssignmentNotFound => "not_found",
            AppError::Forbidden => "forbidden",
            AppError::RequestAlreadyProcessed | AppError::AssignmentAlreadyReturned => "already_processed",
            AppError::StaleRecord { .. } => "conflict",
            AppError::BusinessRejected(reason) => reason.code(),
            AppError::StorageTransient(_) | AppError::StorageUnavailable { .. } => "storage_unavailable",
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => "internal_error",
        }
    }

    fn message(&self, lang: &str) -> &'static str {
        let pt = lang == "pt";
        match self {
            AppError::ValidationError(_) if pt => "Um ou mais campos são inválidos.",
            AppError::ValidationError(_) => "One or more fields are invalid.",
            AppError::Unauthorized if pt => "Acesso não autorizado.",
            AppError::Unauthorized => "Unauthorized access.",
            AppError::EmailAlreadyExists if pt => "Este e-mail já está em uso.",
            AppError::EmailAlreadyExists => "User already exists.",
            AppError::UserNotFound if pt => "Usuário não encontrado.",
            AppError::UserNotFound => "User not found.",
            AppError::TenantNotFound if pt => "Empresa não encontrada.",
            AppError::TenantNotFound => "Company not found.",
            AppError::AssetNotFound if pt => "Ativo não encontrado.",
            AppError::AssetNotFound => "Asset not found.",
            AppError::RequestNotFound if pt => "Pedido não encontrado.",
            AppError::RequestNotFound => "Request not found.",
            AppError::AssignmentNotFound if pt => "Atribuição não encontrada.",
            AppError::AssignmentNotFound => "Assignment not found.",
            AppError::Forbidden if pt => "Você não tem acesso a este registro.",
            AppError::Forbidden => "You are not allowed to act on this record.",
            AppError::RequestAlreadyProcessed if pt => "Este pedido já foi processado.",
            AppError::RequestAlreadyProcessed => "Request already processed.",
            AppError::AssignmentAlreadyReturned if pt => "Este ativo já foi devolvido.",
            AppError::AssignmentAlreadyReturned => "Asset already returned.",
            AppError::StaleRecord { .. } if pt => "O registro foi alterado por outra operação. Tente novamente.",
            AppError::StaleRecord { .. } => "The record was changed by another operation. Try again.",
            AppError::BusinessRejected(RejectionReason::AssetUnavailable) if pt => "Ativo sem estoque disponível.",
            AppError::BusinessRejected(RejectionReason::AssetUnavailable) => "Asset unavailable.",
            AppError::BusinessRejected(RejectionReason::SeatLimitExceeded) if pt => "Limite de funcionários do pacote atingido.",
            AppError::BusinessRejected(RejectionReason::SeatLimitExceeded) => "Seat limit exceeded.",
            AppError::BusinessRejected(RejectionReason::NotAffiliated) if pt => "Funcionário não está afiliado à sua empresa.",
            AppError::BusinessRejected(RejectionReason::NotAffiliated) => "Employee is not affiliated with your company.",
            AppError::BusinessRejected(RejectionReason::AssetNotOwned) if pt => "O ativo não pertence à sua empresa.",
            AppError::BusinessRejected(RejectionReason::AssetNotOwned) => "Asset is not owned by your company.",
            AppError::StorageTransient(_) | AppError::StorageUnavailable { .. } if pt => "Armazenamento temporariamente indisponível.",
            AppError::StorageTransient(_) | AppError::StorageUnavailable { .. } => "Storage temporarily unavailable.",
            _ if pt => "Ocorreu um erro inesperado.",
            _ => "An unexpected error occurred.",
        }
    }

    /// Converte o erro de domínio na resposta HTTP, já traduzida.
    pub fn to_api_error(&self, locale: &Locale) -> ApiError {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR || status == StatusCode::SERVICE_UNAVAILABLE {
            tracing::error!(error = %self, "Erro Interno do Servidor");
        }

        let details = match self {
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                Some(json!(details))
            }
            AppError::BusinessRejected(reason) => Some(json!({ "reason": reason.to_string() })),
            _ => None,
        };

        ApiError {
            status,
            error: self.message(&locale.0).to_string(),
            code: self.code(),
            details,
        }
    }
}

// Resposta de erro que sai pela API
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub code: &'static str,
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "code": self.code, "details": details }),
            None => json!({ "error": self.error, "code": self.code }),
        };
        (self.status, Json(body)).into_response()
    }
}

// Para middlewares que não têm o Locale em mãos
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default()).into_response()
    }
}
