//! Round processing: classification, aggregation and root module generation.

pub mod aggregator;
pub mod classifier;
pub mod root;

pub use aggregator::AggregationCoordinator;
pub use classifier::RoleClassifier;
pub use root::RootModuleGenerator;

use crate::codegen::ArtifactWriter;
use crate::error::ProcessorError;
use crate::models::Signal;
use crate::pipeline::{scan, RoundContext};
use std::sync::Arc;
use tracing::debug;

/// Runs the coordinator and the root module generator for each round.
///
/// The root module is only written in a round where the coordinator had
/// nothing to aggregate, so every aggregator it must reference is already
/// visible.
pub struct ModuleProcessor {
    coordinator: AggregationCoordinator,
    roots: RootModuleGenerator,
}

impl ModuleProcessor {
    pub fn new(classifier: RoleClassifier) -> Self {
        let classifier = Arc::new(classifier);
        Self {
            coordinator: AggregationCoordinator::new(Arc::clone(&classifier)),
            roots: RootModuleGenerator::new(classifier),
        }
    }

    /// Process one round. Returns whether the host must run another round.
    pub fn process(
        &mut self,
        ctx: &dyn RoundContext,
        writer: &mut dyn ArtifactWriter,
    ) -> Result<Signal, ProcessorError> {
        let units = scan(ctx);
        if units.is_empty() {
            debug!("Round {}: no marked units", ctx.round());
        } else {
            debug!("Round {}: processing {} marked units", ctx.round(), units.len());
        }

        let signal = self.coordinator.run(&units, writer)?;
        self.roots.collect(&units);

        if signal.more_rounds() {
            return Ok(Signal::Continue);
        }

        if self.roots.is_written() {
            debug!("Round {}: root module already written", ctx.round());
        } else if self.roots.roots().is_empty() {
            debug!("Round {}: no root module declared", ctx.round());
        } else {
            self.roots
                .maybe_write(ctx.round(), &ctx.aggregators(), writer)?;
        }

        Ok(Signal::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::MemoryWriter;
    use crate::models::{AggregatorRef, CompilationUnit};
    use crate::pipeline::SourceRound;
    use std::path::PathBuf;

    fn library(name: &str) -> CompilationUnit {
        CompilationUnit::new(name, "src/lib.rs")
            .marked()
            .with_supertype("LibraryModule")
    }

    fn app(name: &str) -> CompilationUnit {
        library(name).with_supertype("AppModule")
    }

    #[test]
    fn test_root_waits_for_aggregator() {
        let mut processor = ModuleProcessor::new(RoleClassifier::default());
        let mut writer = MemoryWriter::default();

        // Round 1: A and B are aggregated, the root module is deferred.
        let round1 = SourceRound::new(
            1,
            vec![library("crate::A"), library("crate::B"), app("crate::C")],
            Vec::new(),
        );
        assert_eq!(processor.process(&round1, &mut writer).unwrap(), Signal::Continue);
        assert_eq!(writer.aggregators.len(), 1);
        assert!(writer.roots.is_empty());

        // Round 2: the aggregator is now visible and nothing new is marked.
        let visible = AggregatorRef {
            type_name: writer.aggregators[0].type_name(),
            modules: writer.aggregators[0].module_names(),
            source_path: PathBuf::from("gen/idx.rs"),
        };
        let round2 = SourceRound::new(2, Vec::new(), vec![visible]);
        assert_eq!(processor.process(&round2, &mut writer).unwrap(), Signal::Done);

        assert_eq!(writer.aggregators.len(), 1);
        assert_eq!(writer.roots.len(), 1);
        assert_eq!(writer.roots[0].root.qualified_name, "crate::C");
        assert_eq!(writer.roots[0].modules, vec!["crate::A", "crate::B"]);

        // Round 3: nothing left to do.
        let round3 = SourceRound::new(3, Vec::new(), Vec::new());
        assert_eq!(processor.process(&round3, &mut writer).unwrap(), Signal::Done);
        assert_eq!(writer.roots.len(), 1);
    }

    #[test]
    fn test_root_only_written_immediately() {
        let mut processor = ModuleProcessor::new(RoleClassifier::default());
        let mut writer = MemoryWriter::default();

        let round1 = SourceRound::new(1, vec![app("crate::App")], Vec::new());
        assert_eq!(processor.process(&round1, &mut writer).unwrap(), Signal::Done);

        assert!(writer.aggregators.is_empty());
        assert_eq!(writer.roots.len(), 1);
        assert!(writer.roots[0].modules.is_empty());
    }

    #[test]
    fn test_conflict_skips_root_collection() {
        let mut processor = ModuleProcessor::new(RoleClassifier::default());
        let mut writer = MemoryWriter::default();

        let round1 = SourceRound::new(
            1,
            vec![app("crate::App"), CompilationUnit::new("crate::X", "src/x.rs").marked()],
            Vec::new(),
        );
        assert!(processor.process(&round1, &mut writer).is_err());
        assert!(writer.aggregators.is_empty());
        assert!(writer.roots.is_empty());
    }
}
