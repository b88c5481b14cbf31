// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration};

use anyhow::{bail, Context};
use sqlx::postgres::PgPoolOptions;

use crate::{
    common::retry::RetryPolicy,
    db::{InMemoryLedgerStore, LedgerStore, PgLedgerStore},
    services::{
        asset_service::AssetService,
        auth::{IdentityProvider, JwtIdentityProvider},
        user_service::UserService,
        workflow_service::{WorkflowConfig, WorkflowService},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "pg" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => bail!("STORE_BACKEND inválido: '{}' (use 'postgres' ou 'memory')", other),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub port: u16,
    pub jwt_secret: String,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub retry: RetryPolicy,
    pub workflow: WorkflowConfig,
}

// Lê uma variável opcional, usando o padrão se ausente
fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{} inválido ('{}'): {}", key, raw, e)),
        Err(_) => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;
        let store_backend = env_or("STORE_BACKEND", StoreBackend::Postgres)?;
        let database_url = env::var("DATABASE_URL").ok();
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            bail!("DATABASE_URL deve ser definida quando STORE_BACKEND=postgres");
        }

        let retry = RetryPolicy {
            initial_backoff: Duration::from_millis(env_or("STORE_RETRY_INITIAL_MS", 20)?),
            max_backoff: Duration::from_millis(env_or("STORE_RETRY_MAX_MS", 500)?),
            max_attempts: env_or("STORE_RETRY_MAX_ATTEMPTS", 5)?,
            ..RetryPolicy::default()
        };

        Ok(Self {
            port: env_or("PORT", 3000)?,
            jwt_secret,
            store_backend,
            database_url,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 5)?,
            retry,
            workflow: WorkflowConfig {
                max_commit_attempts: env_or("WORKFLOW_MAX_COMMIT_ATTEMPTS", 5)?,
            },
        })
    }
}

// O estado compartilhado que será acessível em toda a aplicação.
// Nada global: o ledger é criado aqui e injetado nos serviços.
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<dyn IdentityProvider>,
    pub user_service: UserService,
    pub asset_service: AssetService,
    pub workflow_service: WorkflowService,
}

impl AppState {
    pub async fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn LedgerStore> = match config.store_backend {
            StoreBackend::Postgres => {
                let database_url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL deve ser definida")?;

                let db_pool = PgPoolOptions::new()
                    .max_connections(config.db_max_connections)
                    .acquire_timeout(Duration::from_secs(3))
                    .connect(database_url)
                    .await?;
                tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

                sqlx::migrate!()
                    .run(&db_pool)
                    .await
                    .context("Falha ao rodar as migrações do banco de dados")?;
                tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

                Arc::new(PgLedgerStore::new(db_pool, config.retry.clone()))
            }
            StoreBackend::Memory => {
                tracing::warn!("Usando ledger em memória: nada será persistido");
                Arc::new(InMemoryLedgerStore::with_retry(config.retry.clone()))
            }
        };

        let identity = Arc::new(JwtIdentityProvider::new(config.jwt_secret.clone()));
        Ok(Self::from_parts(store, identity, config.workflow.clone()))
    }

    // --- Monta o gráfico de dependências ---
    pub fn from_parts(
        store: Arc<dyn LedgerStore>,
        identity: Arc<dyn IdentityProvider>,
        workflow: WorkflowConfig,
    ) -> Self {
        Self {
            identity,
            user_service: UserService::new(store.clone()),
            asset_service: AssetService::new(store.clone()),
            workflow_service: WorkflowService::new(store, workflow),
        }
    }
}
