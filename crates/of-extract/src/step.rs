//! The step abstraction the engine sequences.

use crate::context::StepContext;
use crate::error::StepResult;
use async_trait::async_trait;
use of_core::StepKind;

/// One stage of an extraction run.
///
/// A step must be safe to re-execute: retries and resumed runs call
/// `execute` again after partial progress, and every write goes through
/// the merge engine so repeats converge.
#[async_trait]
pub trait ExtractionStep: Send + Sync {
    fn kind(&self) -> StepKind;

    /// Run the step. The returned string summarizes what it did.
    async fn execute(&self, ctx: &StepContext) -> StepResult<String>;
}
