//! The six extraction steps, in run order.

mod classification;
mod enrichment;
mod finalization;
mod profiling;
mod relationships;
mod terminology;

pub use classification::ClassificationStep;
pub use enrichment::EnrichmentStep;
pub use finalization::{FinalizationStep, OntologySummary};
pub use profiling::ProfilingStep;
pub use relationships::RelationshipDiscoveryStep;
pub use terminology::TerminologyStep;

use crate::step::ExtractionStep;
use std::sync::Arc;

/// One implementation per [`of_core::StepKind`].
pub fn default_steps() -> Vec<Arc<dyn ExtractionStep>> {
    vec![
        Arc::new(ProfilingStep),
        Arc::new(ClassificationStep),
        Arc::new(RelationshipDiscoveryStep),
        Arc::new(EnrichmentStep),
        Arc::new(TerminologyStep),
        Arc::new(FinalizationStep),
    ]
}
