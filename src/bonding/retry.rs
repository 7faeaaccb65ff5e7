//! Poller limitado para leituras de saldo após um hop.
//!
//! Só leituras são repetidas; o envio de uma troca nunca passa por aqui.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

/// Política de novas tentativas: `max_attempts` releituras após a primeira,
/// espera `delay·backoff^i` entre elas, tudo dentro de `deadline`.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub backoff: f64,
    pub deadline: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            delay: Duration::from_millis(500),
            backoff: 1.0,
            deadline: Some(Duration::from_secs(10)),
        }
    }
}

/// Resultado de um `poll`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Ready(T),
    Exhausted { attempts: u32 },
    DeadlineElapsed { attempts: u32 },
    Cancelled,
}

impl<T> PollOutcome<T> {
    pub fn ready(self) -> Option<T> {
        match self {
            PollOutcome::Ready(v) => Some(v),
            _ => None,
        }
    }
}

impl RetryPolicy {
    /// Atraso fixo, sem prazo global.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay, backoff: 1.0, deadline: None }
    }

    pub fn with_backoff(mut self, backoff: f64) -> Self {
        self.backoff = if backoff.is_finite() && backoff >= 1.0 { backoff } else { 1.0 };
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Espera antes da releitura `retry` (0-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        if self.backoff == 1.0 {
            return self.delay;
        }
        let factor = self.backoff.powi(retry.min(i32::MAX as u32) as i32);
        Duration::try_from_secs_f64(self.delay.as_secs_f64() * factor).unwrap_or(Duration::MAX)
    }

    /// Chama `read(tentativa)` até devolver `Some`, esgotar as tentativas,
    /// estourar o prazo ou ser cancelado. A primeira chamada não espera.
    pub async fn poll<T, F, Fut>(&self, cancel: Option<&CancelSignal>, mut read: F) -> PollOutcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        let started = Instant::now();
        let mut attempt: u32 = 0;
        loop {
            if cancel.is_some_and(CancelSignal::is_cancelled) {
                return PollOutcome::Cancelled;
            }
            if let Some(value) = read(attempt).await {
                return PollOutcome::Ready(value);
            }
            if attempt >= self.max_attempts {
                return PollOutcome::Exhausted { attempts: attempt + 1 };
            }
            let wait = self.delay_for(attempt);
            if let Some(deadline) = self.deadline {
                if started.elapsed().saturating_add(wait) > deadline {
                    return PollOutcome::DeadlineElapsed { attempts: attempt + 1 };
                }
            }
            tracing::debug!(attempt, wait_ms = wait.as_millis() as u64, "releitura agendada");
            match cancel {
                Some(signal) => {
                    tokio::select! {
                        _ = tokio::time::sleep(wait) => {}
                        _ = signal.cancelled() => return PollOutcome::Cancelled,
                    }
                }
                None => tokio::time::sleep(wait).await,
            }
            attempt += 1;
        }
    }
}

/// Lado emissor do cancelamento.
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

/// Lado observador do cancelamento; clonável.
#[derive(Clone, Debug)]
pub struct CancelSignal(watch::Receiver<bool>);

/// Par emissor/observador ligado a um `watch`.
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle(tx), CancelSignal(rx))
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }
}

impl CancelSignal {
    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolve quando cancelado; nunca resolve se o emissor sumir sem cancelar.
    pub async fn cancelled(&self) {
        let mut rx = self.0.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}
