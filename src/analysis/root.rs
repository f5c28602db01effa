//! Root module generation.
//!
//! Collects the application module across rounds and, once no aggregator
//! is pending, writes a root module that references every library module
//! known to the aggregators visible in the current round.

use crate::analysis::classifier::RoleClassifier;
use crate::codegen::ArtifactWriter;
use crate::error::ProcessorError;
use crate::models::{AggregatorRef, CompilationUnit, Role, RootSpec, RoundUnitSet};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

pub struct RootModuleGenerator {
    classifier: Arc<RoleClassifier>,
    roots: Vec<CompilationUnit>,
    written: bool,
}

impl RootModuleGenerator {
    pub fn new(classifier: Arc<RoleClassifier>) -> Self {
        Self {
            classifier,
            roots: Vec::new(),
            written: false,
        }
    }

    /// Remember the root units of a round.
    pub fn collect(&mut self, units: &RoundUnitSet) {
        for unit in units.iter() {
            if self.classifier.classify(unit) != Role::Root {
                continue;
            }
            if self
                .roots
                .iter()
                .any(|r| r.qualified_name == unit.qualified_name)
            {
                continue;
            }
            debug!("Round {}: found root module {}", units.round, unit);
            self.roots.push(unit.clone());
        }
    }

    pub fn roots(&self) -> &[CompilationUnit] {
        &self.roots
    }

    pub fn is_written(&self) -> bool {
        self.written
    }

    /// Write the root module if one is known and it has not been written yet.
    ///
    /// `aggregators` must be the lookups visible in the current round.
    pub fn maybe_write(
        &mut self,
        round: u32,
        aggregators: &[AggregatorRef],
        writer: &mut dyn ArtifactWriter,
    ) -> Result<Option<RootSpec>, ProcessorError> {
        if self.written {
            return Ok(None);
        }

        let root = match self.roots.as_slice() {
            [] => return Ok(None),
            [root] => root.clone(),
            many => {
                return Err(ProcessorError::MultipleRoots {
                    units: many.iter().map(|r| r.qualified_name.clone()).collect(),
                });
            }
        };

        // The same aggregator can be visible twice, e.g. read from disk and
        // registered after being written.
        let mut names = HashSet::new();
        let aggregators: Vec<&AggregatorRef> = aggregators
            .iter()
            .filter(|a| names.insert(a.type_name.clone()))
            .collect();

        let mut seen = HashSet::new();
        let modules: Vec<String> = aggregators
            .iter()
            .flat_map(|a| a.modules.iter())
            .filter(|m| seen.insert(m.to_string()))
            .cloned()
            .collect();

        let spec = RootSpec {
            root,
            modules,
            aggregators: aggregators.iter().map(|a| a.type_name.clone()).collect(),
            round,
        };

        writer.write_root(&spec)?;
        self.written = true;

        info!(
            "Round {}: wrote root module for {} from {} aggregators",
            round,
            spec.root,
            spec.aggregators.len()
        );

        Ok(Some(spec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::MemoryWriter;
    use std::path::PathBuf;

    fn app(name: &str) -> CompilationUnit {
        CompilationUnit::new(name, "src/app.rs")
            .marked()
            .with_supertype("LibraryModule")
            .with_supertype("AppModule")
    }

    fn aggregator(name: &str, modules: &[&str]) -> AggregatorRef {
        AggregatorRef {
            type_name: name.to_string(),
            modules: modules.iter().map(|m| m.to_string()).collect(),
            source_path: PathBuf::from(format!("gen/{}.rs", name)),
        }
    }

    fn generator() -> RootModuleGenerator {
        RootModuleGenerator::new(Arc::new(RoleClassifier::default()))
    }

    #[test]
    fn test_no_root_writes_nothing() {
        let mut roots = generator();
        let mut writer = MemoryWriter::default();

        let spec = roots
            .maybe_write(1, &[aggregator("Indexer_a_A", &["crate::a::A"])], &mut writer)
            .unwrap();

        assert!(spec.is_none());
        assert!(writer.roots.is_empty());
    }

    #[test]
    fn test_writes_root_once() {
        let mut roots = generator();
        roots.collect(&RoundUnitSet::new(1, vec![app("crate::App")]));
        let mut writer = MemoryWriter::default();
        let visible = [
            aggregator("Indexer_a_A__b_B", &["crate::a::A", "crate::b::B"]),
            aggregator("Indexer_b_B__c_C", &["crate::b::B", "crate::c::C"]),
        ];

        let spec = roots.maybe_write(2, &visible, &mut writer).unwrap().unwrap();
        assert_eq!(spec.root.qualified_name, "crate::App");
        assert_eq!(spec.modules, vec!["crate::a::A", "crate::b::B", "crate::c::C"]);
        assert_eq!(spec.aggregators, vec!["Indexer_a_A__b_B", "Indexer_b_B__c_C"]);

        assert!(roots.maybe_write(3, &visible, &mut writer).unwrap().is_none());
        assert_eq!(writer.roots.len(), 1);
        assert!(roots.is_written());
    }

    #[test]
    fn test_repeated_aggregator_is_referenced_once() {
        let mut roots = generator();
        roots.collect(&RoundUnitSet::new(1, vec![app("crate::App")]));
        let mut writer = MemoryWriter::default();
        let visible = [
            aggregator("Indexer_a_A", &["crate::a::A"]),
            aggregator("Indexer_a_A", &["crate::a::A"]),
        ];

        let spec = roots.maybe_write(2, &visible, &mut writer).unwrap().unwrap();

        assert_eq!(spec.aggregators, vec!["Indexer_a_A"]);
        assert_eq!(spec.modules, vec!["crate::a::A"]);
    }

    #[test]
    fn test_collect_ignores_library_modules_and_duplicates() {
        let mut roots = generator();
        let library = CompilationUnit::new("crate::a::A", "src/a.rs")
            .marked()
            .with_supertype("LibraryModule");

        roots.collect(&RoundUnitSet::new(1, vec![library, app("crate::App")]));
        roots.collect(&RoundUnitSet::new(2, vec![app("crate::App")]));

        assert_eq!(roots.roots().len(), 1);
    }

    #[test]
    fn test_multiple_roots_are_fatal() {
        let mut roots = generator();
        roots.collect(&RoundUnitSet::new(1, vec![app("crate::One"), app("crate::Two")]));
        let mut writer = MemoryWriter::default();

        let err = roots.maybe_write(1, &[], &mut writer).unwrap_err();

        assert!(matches!(err, ProcessorError::MultipleRoots { ref units } if units.len() == 2));
        assert!(writer.roots.is_empty());
    }
}
