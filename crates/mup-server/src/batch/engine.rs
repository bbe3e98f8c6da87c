//! Batch execution: sequential with optional rollback, or parallel.

use serde_json::Value;

use mup_components::Compensation;

use crate::context::SharedRegistry;
use crate::types::{BatchRequest, BatchSummary, ExecutionMode, MupError, MupResult, OperationOutcome};

use super::operation::{describe, Operation};

/// Runs batch operations against the shared registry.
#[derive(Debug, Clone)]
pub struct BatchEngine {
    registry: SharedRegistry,
    operation_limit: usize,
}

impl BatchEngine {
    pub fn new(registry: SharedRegistry, operation_limit: usize) -> Self {
        Self {
            registry,
            operation_limit,
        }
    }

    /// Maximum operations accepted in one batch.
    pub fn operation_limit(&self) -> usize {
        self.operation_limit
    }

    /// Execute a batch.
    ///
    /// Only a rolled-back sequential batch returns `Err`; every other
    /// failure is reported in its operation's slot.
    pub async fn execute(&self, request: BatchRequest) -> MupResult<BatchSummary> {
        let total = request.operations.len();
        if total > self.operation_limit {
            return Err(MupError::InvalidParams(format!(
                "batch has {total} operations; limit is {}",
                self.operation_limit
            )));
        }

        tracing::debug!(
            "Running {total} operation(s) {} (rollback_on_error={})",
            request.execution_mode.as_str(),
            request.rollback_on_error
        );

        let results = match request.execution_mode {
            ExecutionMode::Sequential => {
                self.run_sequential(request.operations, request.rollback_on_error)
                    .await?
            }
            ExecutionMode::Parallel => {
                if request.rollback_on_error {
                    tracing::debug!("rollback_on_error ignored for parallel batch");
                }
                self.run_parallel(request.operations).await
            }
        };

        Ok(BatchSummary::new(results, request.execution_mode, total))
    }

    async fn run_sequential(
        &self,
        operations: Vec<Value>,
        rollback_on_error: bool,
    ) -> MupResult<Vec<OperationOutcome>> {
        let mut results = Vec::with_capacity(operations.len());
        let mut applied: Vec<Compensation> = Vec::new();

        for raw in &operations {
            match self.apply_one(raw).await {
                Ok((outcome, compensation)) => {
                    results.push(outcome);
                    applied.push(compensation);
                }
                Err(err) if rollback_on_error => {
                    let (operation_id, _) = describe(raw);
                    tracing::warn!(
                        "Batch operation {} failed ({err}); rolling back {} applied",
                        operation_id.as_deref().unwrap_or("<unnamed>"),
                        applied.len()
                    );
                    self.rollback(applied).await;
                    return Err(MupError::BatchFailed(format!(
                        "operation {}: {err}",
                        operation_id.as_deref().unwrap_or("<unnamed>")
                    )));
                }
                Err(err) => {
                    let (operation_id, component_id) = describe(raw);
                    results.push(OperationOutcome::failure(operation_id, component_id, &err));
                }
            }
        }

        Ok(results)
    }

    async fn run_parallel(&self, operations: Vec<Value>) -> Vec<OperationOutcome> {
        let handles: Vec<_> = operations
            .into_iter()
            .map(|raw| {
                let engine = self.clone();
                let (operation_id, component_id) = describe(&raw);
                let handle = tokio::spawn(async move {
                    match engine.apply_one(&raw).await {
                        Ok((outcome, _)) => outcome,
                        Err(err) => {
                            let (operation_id, component_id) = describe(&raw);
                            OperationOutcome::failure(operation_id, component_id, &err)
                        }
                    }
                });
                (operation_id, component_id, handle)
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (operation_id, component_id, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(join_err) => {
                    tracing::error!("Batch operation task failed: {join_err}");
                    let err = MupError::Internal(format!("operation task failed: {join_err}"));
                    OperationOutcome::failure(operation_id, component_id, &err)
                }
            };
            results.push(outcome);
        }
        results
    }

    async fn apply_one(&self, raw: &Value) -> MupResult<(OperationOutcome, Compensation)> {
        let operation = Operation::parse(raw)?;
        let mut registry = self.registry.lock().await;
        operation.apply(&mut registry)
    }

    /// Undo applied operations, newest first, under one registry lock.
    async fn rollback(&self, applied: Vec<Compensation>) {
        let mut registry = self.registry.lock().await;
        for compensation in applied.into_iter().rev() {
            let component_id = compensation.component_id().to_string();
            if let Err(e) = registry.compensate(compensation) {
                tracing::warn!("Skipping compensation for {component_id}: {e}");
            }
        }
    }
}
