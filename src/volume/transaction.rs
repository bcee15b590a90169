//! Ordered steps with reverse-order compensation.
//!
//! Steps are plain function pointers over a shared context so the runner
//! never has to reason about closure lifetimes. A failed step triggers the
//! compensations of every step committed before it, newest first.

use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;

/// Future produced by a step action or compensation.
pub type StepFuture<'c, E> = Pin<Box<dyn Future<Output = Result<(), E>> + Send + 'c>>;

/// Action or compensation over context `C`.
pub type StepFn<C, E> = for<'c> fn(&'c C) -> StepFuture<'c, E>;

/// One unit of work in a [`Transaction`].
pub struct Step<C, E> {
    name: &'static str,
    action: StepFn<C, E>,
    compensation: Option<StepFn<C, E>>,
}

impl<C, E> Step<C, E> {
    /// Creates a step without compensation.
    #[must_use]
    pub const fn new(name: &'static str, action: StepFn<C, E>) -> Self {
        Self {
            name,
            action,
            compensation: None,
        }
    }

    /// Attaches the compensation run when a later step fails.
    #[must_use]
    pub const fn with_compensation(mut self, compensation: StepFn<C, E>) -> Self {
        self.compensation = Some(compensation);
        self
    }
}

/// Sequence of steps committed in order.
pub struct Transaction<C, E> {
    steps: Vec<Step<C, E>>,
}

impl<C, E> Default for Transaction<C, E> {
    fn default() -> Self {
        Self { steps: Vec::new() }
    }
}

impl<C, E> Transaction<C, E>
where
    C: Sync,
    E: Display + Send,
{
    /// Creates an empty transaction.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step.
    #[must_use]
    pub fn step(mut self, step: Step<C, E>) -> Self {
        self.steps.push(step);
        self
    }

    /// Runs every step in order.
    ///
    /// On failure the compensations of committed steps run in reverse unless
    /// `skip_rollback` accepts the error. Compensation failures are logged.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing step.
    pub async fn commit<P>(&self, context: &C, skip_rollback: P) -> Result<(), E>
    where
        P: Fn(&E) -> bool + Send,
    {
        let mut committed: Vec<&Step<C, E>> = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            tracing::debug!(step = step.name, "running step");
            if let Err(err) = (step.action)(context).await {
                if skip_rollback(&err) {
                    tracing::warn!(step = step.name, error = %err, "step failed, rollback skipped");
                } else {
                    tracing::warn!(step = step.name, error = %err, "step failed, rolling back");
                    Self::rollback(context, &committed).await;
                }
                return Err(err);
            }
            committed.push(step);
        }
        Ok(())
    }

    async fn rollback(context: &C, committed: &[&Step<C, E>]) {
        for step in committed.iter().rev() {
            let Some(compensation) = step.compensation else {
                continue;
            };
            if let Err(err) = compensation(context).await {
                tracing::warn!(step = step.name, error = %err, "compensation failed");
            }
        }
    }
}
