// Error reporting utilities
// Alertable failures are forwarded to an operational sink by the scheduler.

use async_trait::async_trait;

use crate::types::OperatorError;

/// Destination for alertable reconcile failures
#[async_trait]
pub trait ErrorSink: Send + Sync {
    async fn report(&self, error: &OperatorError);
}

/// Sink that emits alertable errors as `tracing` events
#[derive(Debug, Default, Clone)]
pub struct TracingErrorSink;

impl TracingErrorSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ErrorSink for TracingErrorSink {
    async fn report(&self, error: &OperatorError) {
        if !error.alert() {
            return;
        }
        let object = error
            .context()
            .map(ToString::to_string)
            .unwrap_or_default();
        tracing::error!(
            error_code = error.kind().code(),
            retry = error.retry(),
            object = %object,
            "Reconcile failed: {}",
            error.message()
        );
    }
}

/// Forward `error` to `sink` when it is alertable, returning it unchanged
pub async fn report_if_alertable(sink: &dyn ErrorSink, error: OperatorError) -> OperatorError {
    if error.alert() {
        sink.report(&error).await;
    }
    error
}
