// src/common/retry.rs

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::common::error::AppError;

/// Política de repetição para falhas transitórias do armazenamento.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Espera antes da segunda tentativa
    pub initial_backoff: Duration,
    /// Teto da espera entre tentativas
    pub max_backoff: Duration,
    pub multiplier: f64,
    /// Total de tentativas, contando a primeira
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(20),
            max_backoff: Duration::from_millis(500),
            multiplier: 2.0,
            max_attempts: 5,
        }
    }
}

impl RetryPolicy {
    pub fn no_delay(max_attempts: u32) -> Self {
        Self {
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            multiplier: 1.0,
            max_attempts,
        }
    }

    fn next_backoff(&self, current: Duration) -> Duration {
        Duration::from_secs_f64(current.as_secs_f64() * self.multiplier).min(self.max_backoff)
    }

    /// Executa `op` repetindo apenas `AppError::StorageTransient`.
    /// Qualquer outro erro sai na hora. Esgotado o orçamento, vira
    /// `StorageUnavailable`.
    pub async fn run<T, F, Fut>(&self, op_name: &str, mut op: F) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut backoff = self.initial_backoff;
        let mut attempt = 0;

        loop {
            attempt += 1;
            match op().await {
                Err(AppError::StorageTransient(cause)) => {
                    if attempt >= max_attempts {
                        return Err(AppError::StorageUnavailable { attempts: attempt, last: cause });
                    }
                    warn!(
                        op = op_name,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        %cause,
                        "Falha transitória no armazenamento, tentando de novo"
                    );
                    sleep(backoff).await;
                    backoff = self.next_backoff(backoff);
                }
                other => return other,
            }
        }
    }
}
