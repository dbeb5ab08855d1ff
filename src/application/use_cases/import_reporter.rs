use crate::application::use_cases::reconciler::ReconcileResult;
use crate::domain::{ImportReport, RowError, Taxon};

/// What actually happened when a plan was written to the store.
#[derive(Debug, Clone, Default)]
pub struct ApplyOutcome {
    pub created: Vec<Taxon>,
    pub updated: Vec<Taxon>,
    /// Planned writes the store refused, keyed by their first source row
    pub failures: Vec<RowError>,
}

/// Counts persisted results only. A planned create that the store refused is
/// an error, never a create.
pub fn build_report(plan: &ReconcileResult, outcome: &ApplyOutcome) -> ImportReport {
    let mut errors: Vec<&RowError> = plan.errors.iter().chain(outcome.failures.iter()).collect();
    errors.sort_by_key(|error| error.row);

    ImportReport {
        created: outcome.created.len(),
        updated: outcome.updated.len(),
        skipped: plan.skipped.len(),
        errors: errors.into_iter().map(ToString::to_string).collect(),
        warnings: plan.warnings.clone(),
    }
}
