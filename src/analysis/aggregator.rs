//! Library module aggregation.
//!
//! The coordinator turns one round's marked units into at most one
//! aggregator. Writing an aggregator means the round is not final: the new
//! file only becomes visible to lookups in the next round, so anything that
//! needs to reference it has to wait.

use crate::analysis::classifier::RoleClassifier;
use crate::codegen::ArtifactWriter;
use crate::error::ProcessorError;
use crate::models::{AggregatorSpec, CompilationUnit, Role, RoundUnitSet, Signal};
use std::sync::Arc;
use tracing::{debug, info};

/// Builds the aggregator of all library modules found in a round.
///
/// Holds no state between rounds.
pub struct AggregationCoordinator {
    classifier: Arc<RoleClassifier>,
}

impl AggregationCoordinator {
    pub fn new(classifier: Arc<RoleClassifier>) -> Self {
        Self { classifier }
    }

    /// Process one round.
    ///
    /// Returns `Continue` after writing an aggregator and `Done` when there
    /// was nothing to aggregate. A unit that is neither a root nor a library
    /// module aborts the round before anything is written.
    pub fn run(
        &self,
        units: &RoundUnitSet,
        writer: &mut dyn ArtifactWriter,
    ) -> Result<Signal, ProcessorError> {
        let primary = self.library_modules(units)?;

        debug!(
            "Round {}: got library modules: {:?}",
            units.round,
            primary.iter().map(|u| &u.qualified_name).collect::<Vec<_>>()
        );

        let Some(spec) = AggregatorSpec::new(primary, units.round) else {
            return Ok(Signal::Done);
        };

        writer.write_aggregator(&spec)?;

        info!(
            "Round {}: wrote {}, deferring root module to the next round",
            units.round,
            spec.type_name()
        );

        Ok(Signal::Continue)
    }

    /// Library modules of a round, in scan order.
    ///
    /// Roots are skipped; they belong to the root module generator.
    pub fn library_modules(
        &self,
        units: &RoundUnitSet,
    ) -> Result<Vec<CompilationUnit>, ProcessorError> {
        let mut primary = Vec::new();

        for unit in units.iter() {
            match self.classifier.classify(unit) {
                Role::Root => continue,
                Role::Primary => primary.push(unit.clone()),
                Role::Invalid => {
                    return Err(ProcessorError::ClassificationConflict {
                        unit: unit.qualified_name.clone(),
                        path: unit.source_path.clone(),
                        shapes: self.classifier.shapes(),
                    });
                }
            }
        }

        Ok(primary)
    }
}
