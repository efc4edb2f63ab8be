//! Single-slot model loader
//!
//! Guarantees at most one model resident in accelerator memory at a time.
//! Residency is guarded by a non-reentrant async mutex held for the entire
//! body of [`ModelSlot::with_model`], so a loaded model stays resident from
//! load through body completion and concurrent callers are totally ordered
//! by lock acquisition.

use crate::config::EngineConfig;
use crate::deadline::Deadline;
use crate::ports::model_runtime::{ModelRuntime, RuntimeError};
use colloquy_domain::ModelDescriptor;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Errors surfaced by the model slot.
#[derive(Error, Debug)]
pub enum SlotError {
    #[error("Failed to load model {model} after {attempts} attempts")]
    LoadFailed { model: String, attempts: u32 },

    #[error("Deadline expired before the model could be loaded")]
    DeadlineExceeded,

    #[error("Cancelled while waiting for the model slot")]
    Cancelled,
}

/// The single accelerator-memory slot.
pub struct ModelSlot {
    runtime: Arc<dyn ModelRuntime>,
    current: Mutex<Option<String>>,
    load_retries: u32,
    backoff_base: Duration,
    settle: Duration,
    load_timeout: Duration,
}

impl ModelSlot {
    pub fn new(runtime: Arc<dyn ModelRuntime>, config: &EngineConfig) -> Self {
        Self {
            runtime,
            current: Mutex::new(None),
            load_retries: config.model_load_retries,
            backoff_base: config.model_load_backoff_base,
            settle: config.model_swap_settle,
            load_timeout: config.load_attempt_timeout,
        }
    }

    /// Run `body` with `model` resident, swapping out any other model first.
    ///
    /// The slot lock is held from before the swap until `body` returns, and
    /// released on every exit path. Cancellation aborts load-retry waits
    /// promptly.
    pub async fn with_model<T, F, Fut>(
        &self,
        model: &ModelDescriptor,
        deadline: Deadline,
        cancel: &CancellationToken,
        body: F,
    ) -> Result<T, SlotError>
    where
        F: FnOnce(Arc<dyn ModelRuntime>) -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        let mut current = tokio::select! {
            guard = self.current.lock() => guard,
            _ = cancel.cancelled() => return Err(SlotError::Cancelled),
        };

        if current.as_deref() != Some(model.id.as_str()) {
            if let Some(resident) = current.take() {
                info!(from = %resident, to = %model.id, "Swapping model");
                if let Err(e) = self.runtime.unload(&resident).await {
                    warn!(model = %resident, error = %e, "Unload failed, continuing");
                }
                // Give the runtime time to free accelerator memory.
                self.wait(self.settle, deadline, cancel).await?;
            }

            self.load_with_retries(&model.id, deadline, cancel).await?;
            *current = Some(model.id.clone());
        } else {
            debug!(model = %model.id, "Model already resident");
        }

        Ok(body(Arc::clone(&self.runtime)).await)
    }

    /// Best-effort unload of whatever is resident. Called on shutdown.
    pub async fn release(&self) {
        let mut current = self.current.lock().await;
        if let Some(resident) = current.take() {
            info!(model = %resident, "Releasing model slot");
            if let Err(e) = self.runtime.unload(&resident).await {
                warn!(model = %resident, error = %e, "Unload on release failed");
            }
        }
    }

    /// The id of the resident model, if any.
    pub async fn resident(&self) -> Option<String> {
        self.current.lock().await.clone()
    }

    async fn load_with_retries(
        &self,
        model_id: &str,
        deadline: Deadline,
        cancel: &CancellationToken,
    ) -> Result<(), SlotError> {
        for attempt in 0..self.load_retries {
            if deadline.is_expired() {
                return Err(SlotError::DeadlineExceeded);
            }

            let timeout = deadline.bounded(self.load_timeout);
            debug!(model = model_id, attempt = attempt + 1, "Loading model");

            let result = tokio::select! {
                result = self.runtime.load(model_id, timeout) => result,
                _ = cancel.cancelled() => return Err(SlotError::Cancelled),
            };

            match result {
                Ok(()) => {
                    info!(model = model_id, attempt = attempt + 1, "Model loaded");
                    return Ok(());
                }
                Err(RuntimeError::Timeout) => {
                    warn!(model = model_id, attempt = attempt + 1, "Load attempt timed out");
                    // A timeout only earns another attempt if the overall
                    // deadline still has room.
                    if deadline.is_expired() {
                        return Err(SlotError::DeadlineExceeded);
                    }
                }
                Err(e) => {
                    warn!(model = model_id, attempt = attempt + 1, error = %e, "Load attempt failed");
                }
            }

            if attempt + 1 < self.load_retries {
                let backoff = self.backoff_base * 2u32.saturating_pow(attempt);
                self.wait(backoff, deadline, cancel).await?;
            }
        }

        Err(SlotError::LoadFailed {
            model: model_id.to_string(),
            attempts: self.load_retries,
        })
    }

    /// Sleep bounded by the deadline, aborting promptly on cancellation.
    async fn wait(
        &self,
        duration: Duration,
        deadline: Deadline,
        cancel: &CancellationToken,
    ) -> Result<(), SlotError> {
        let bounded = deadline.bounded(duration);
        tokio::select! {
            _ = tokio::time::sleep(bounded) => Ok(()),
            _ = cancel.cancelled() => Err(SlotError::Cancelled),
        }
    }
}
