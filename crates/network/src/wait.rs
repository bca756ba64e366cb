//! Waiting for asynchronous operations.
//!
//! Every mutating call returns an [`Operation`]. [`OperationWaiter`] polls it
//! until it reaches `DONE`, bounded by a timeout and by the caller's
//! [`CancellationToken`]. It is the only polling loop in the crate.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Error, Result, ResultExt};
use crate::key::{Key, ResourceKind};
use crate::providers::gcp::models::{Operation, OperationState};
use crate::providers::OperationClient;

/// Polling interval when waiting for operations.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;

/// Overall bound on a single operation wait.
const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 300;

/// Wait loop configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitConfig {
    /// Delay between polls.
    pub poll_interval: Duration,
    /// Maximum time to wait for one operation.
    pub timeout: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            timeout: Duration::from_secs(DEFAULT_OPERATION_TIMEOUT_SECS),
        }
    }
}

/// Run a provider call, aborting promptly if `cancel` fires.
///
/// # Errors
/// Returns [`Error::Cancelled`] on cancellation, otherwise the call's result.
pub async fn cancellable<T, F>(cancel: &CancellationToken, resource: &Key, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Error::Cancelled { resource: resource.to_string() }),
        result = call => result,
    }
}

/// Blocks until operations reach a terminal state.
#[derive(Clone)]
pub struct OperationWaiter {
    operations: Arc<dyn OperationClient>,
    config: WaitConfig,
}

impl OperationWaiter {
    #[must_use]
    pub fn new(operations: Arc<dyn OperationClient>, config: WaitConfig) -> Self {
        Self { operations, config }
    }

    /// Wait for the operation produced by a mutating call on `key`.
    ///
    /// If the call itself failed, that error is returned without waiting.
    ///
    /// # Errors
    /// - the submitting call's error, wrapped with the resource identity
    /// - [`Error::Operation`] when the operation finishes with an error
    /// - [`Error::Timeout`] when the operation is not done within the timeout
    /// - [`Error::Cancelled`] when `cancel` fires
    pub async fn wait(
        &self,
        cancel: &CancellationToken,
        action: &'static str,
        kind: ResourceKind,
        key: &Key,
        submitted: Result<Operation>,
    ) -> Result<()> {
        let operation = submitted.for_resource(action, kind, key)?;
        let resource = format!("{kind} {key}");

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(Error::Cancelled { resource }),
            outcome = tokio::time::timeout(
                self.config.timeout,
                self.poll_until_done(operation, action, kind, key),
            ) => match outcome {
                Ok(result) => result,
                Err(_) => Err(Error::Timeout {
                    resource,
                    secs: self.config.timeout.as_secs(),
                }),
            },
        }
    }

    /// Like [`wait`](Self::wait), but a `NotFound` from the submitting delete
    /// counts as success.
    ///
    /// # Errors
    /// Same as [`wait`](Self::wait).
    pub async fn wait_delete(
        &self,
        cancel: &CancellationToken,
        kind: ResourceKind,
        key: &Key,
        submitted: Result<Operation>,
    ) -> Result<()> {
        match submitted {
            Err(e) if e.is_not_found() => {
                debug!(kind = %kind, key = %key, "Already absent");
                Ok(())
            }
            other => self.wait(cancel, "delete", kind, key, other).await,
        }
    }

    async fn poll_until_done(
        &self,
        mut operation: Operation,
        action: &'static str,
        kind: ResourceKind,
        key: &Key,
    ) -> Result<()> {
        loop {
            match operation.state() {
                OperationState::Succeeded => {
                    debug!(kind = %kind, key = %key, operation = %operation.name, "Operation done");
                    return Ok(());
                }
                OperationState::Failed(message) => {
                    return Err(Error::Operation {
                        resource: format!("{kind} {key}"),
                        operation: operation.name,
                        message,
                    });
                }
                OperationState::Pending => {
                    debug!(
                        kind = %kind,
                        key = %key,
                        operation = %operation.name,
                        status = ?operation.status,
                        "Polling operation"
                    );
                }
            }

            tokio::time::sleep(self.config.poll_interval).await;
            operation = self
                .operations
                .get_operation(&operation)
                .await
                .for_resource(action, kind, key)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::gcp::models::{OperationErrorItem, OperationErrors, OperationStatus};
    use crate::providers::MockOperationClient;

    fn fast() -> WaitConfig {
        WaitConfig {
            poll_interval: Duration::from_millis(1),
            timeout: Duration::from_millis(200),
        }
    }

    fn op(status: OperationStatus) -> Operation {
        Operation {
            name: "operation-123".into(),
            status,
            ..Default::default()
        }
    }

    fn key() -> Key {
        Key::global("my-network")
    }

    #[tokio::test]
    async fn test_polls_until_done() {
        let mut mock = MockOperationClient::new();
        let mut calls = 0;
        mock.expect_get_operation().times(2).returning(move |_| {
            calls += 1;
            Ok(op(if calls < 2 {
                OperationStatus::Running
            } else {
                OperationStatus::Done
            }))
        });

        let waiter = OperationWaiter::new(Arc::new(mock), fast());
        let result = waiter
            .wait(
                &CancellationToken::new(),
                "insert",
                ResourceKind::Network,
                &key(),
                Ok(op(OperationStatus::Pending)),
            )
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_done_operation_needs_no_poll() {
        let mut mock = MockOperationClient::new();
        mock.expect_get_operation().times(0);

        let waiter = OperationWaiter::new(Arc::new(mock), fast());
        waiter
            .wait(
                &CancellationToken::new(),
                "insert",
                ResourceKind::Network,
                &key(),
                Ok(op(OperationStatus::Done)),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_operation_error_is_surfaced() {
        let mut mock = MockOperationClient::new();
        mock.expect_get_operation().returning(|_| {
            let mut done = op(OperationStatus::Done);
            done.error = Some(OperationErrors {
                errors: vec![OperationErrorItem {
                    code: "QUOTA_EXCEEDED".into(),
                    message: "Quota 'NETWORKS' exceeded".into(),
                }],
            });
            Ok(done)
        });

        let waiter = OperationWaiter::new(Arc::new(mock), fast());
        let err = waiter
            .wait(
                &CancellationToken::new(),
                "insert",
                ResourceKind::Network,
                &key(),
                Ok(op(OperationStatus::Running)),
            )
            .await
            .unwrap_err();

        assert!(err.is_operation_failure());
        assert!(!err.is_timeout());
        assert!(err.to_string().contains("QUOTA_EXCEEDED"));
        assert!(err.to_string().contains("network global/my-network"));
    }

    #[tokio::test]
    async fn test_timeout_is_distinguishable() {
        let mut mock = MockOperationClient::new();
        mock.expect_get_operation()
            .returning(|_| Ok(op(OperationStatus::Running)));

        let waiter = OperationWaiter::new(
            Arc::new(mock),
            WaitConfig {
                poll_interval: Duration::from_millis(5),
                timeout: Duration::from_millis(30),
            },
        );
        let err = waiter
            .wait(
                &CancellationToken::new(),
                "insert",
                ResourceKind::Network,
                &key(),
                Ok(op(OperationStatus::Pending)),
            )
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(!err.is_operation_failure());
    }

    #[tokio::test]
    async fn test_cancellation_aborts_wait() {
        let mut mock = MockOperationClient::new();
        mock.expect_get_operation()
            .returning(|_| Ok(op(OperationStatus::Running)));

        let cancel = CancellationToken::new();
        cancel.cancel();

        let waiter = OperationWaiter::new(Arc::new(mock), WaitConfig::default());
        let err = waiter
            .wait(
                &cancel,
                "insert",
                ResourceKind::Network,
                &key(),
                Ok(op(OperationStatus::Pending)),
            )
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(!err.is_timeout());
    }

    #[tokio::test]
    async fn test_submit_error_skips_waiting() {
        let mut mock = MockOperationClient::new();
        mock.expect_get_operation().times(0);

        let waiter = OperationWaiter::new(Arc::new(mock), fast());
        let err = waiter
            .wait(
                &CancellationToken::new(),
                "insert",
                ResourceKind::Network,
                &key(),
                Err(Error::Api {
                    status: 409,
                    message: "already exists".into(),
                }),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Resource { action: "insert", .. }));
    }

    #[tokio::test]
    async fn test_wait_delete_tolerates_not_found() {
        let mut mock = MockOperationClient::new();
        mock.expect_get_operation().times(0);

        let waiter = OperationWaiter::new(Arc::new(mock), fast());
        waiter
            .wait_delete(
                &CancellationToken::new(),
                ResourceKind::Network,
                &key(),
                Err(Error::NotFound("gone".into())),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancellable_call() {
        let cancel = CancellationToken::new();
        let value = cancellable(&cancel, &key(), async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);

        cancel.cancel();
        let err = cancellable(&cancel, &key(), std::future::pending::<Result<u32>>())
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
