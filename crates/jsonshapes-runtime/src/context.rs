//! Per-call operation context: options plus an optional cancellation signal.

use crate::{OperationError, Options};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A cooperative cancellation flag shared between a caller and a running
/// operation. Operations check it at every recursive step.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Context {
    pub options: Options,
    pub cancel: Option<CancelToken>,
}

impl Context {
    pub fn new(options: Options) -> Self {
        Self {
            options,
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Fails with [`OperationError::Cancelled`] once the token is set.
    pub fn checkpoint(&self) -> Result<(), OperationError> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => {
                tracing::warn!("shape operation cancelled");
                Err(OperationError::Cancelled)
            }
            _ => Ok(()),
        }
    }
}
