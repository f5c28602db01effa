//! Artifact writing.
//!
//! The coordinator hands finished specs to an [`ArtifactWriter`]. The
//! filesystem implementation records every path it writes so the host
//! pipeline can make those files visible in the next round.

pub mod generator;

use crate::error::ProcessorError;
use crate::models::{AggregatorSpec, RootSpec};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

pub use generator::{generate_aggregator_source, generate_root_source};

/// Persists generated artifacts.
///
/// Implementations fail only on I/O problems; they never judge the spec.
pub trait ArtifactWriter {
    fn write_aggregator(&mut self, spec: &AggregatorSpec) -> Result<(), ProcessorError>;

    fn write_root(&mut self, spec: &RootSpec) -> Result<(), ProcessorError>;
}

/// Writes artifacts as Rust source files into an output directory.
pub struct SourceFiler {
    out_dir: PathBuf,
    written: Vec<PathBuf>,
}

impl SourceFiler {
    pub fn new(out_dir: PathBuf) -> Self {
        Self {
            out_dir,
            written: Vec::new(),
        }
    }

    /// Paths written since the last call, in write order.
    pub fn take_written(&mut self) -> Vec<PathBuf> {
        std::mem::take(&mut self.written)
    }

    fn write_file(&mut self, file_name: &str, content: &str) -> Result<(), ProcessorError> {
        fs::create_dir_all(&self.out_dir)
            .map_err(|e| ProcessorError::write(&self.out_dir, e))?;

        let path = self.out_dir.join(file_name);
        fs::write(&path, content).map_err(|e| ProcessorError::write(&path, e))?;

        debug!("Wrote {} bytes to {}", content.len(), path.display());
        self.written.push(path);
        Ok(())
    }
}

impl ArtifactWriter for SourceFiler {
    fn write_aggregator(&mut self, spec: &AggregatorSpec) -> Result<(), ProcessorError> {
        let content = generate_aggregator_source(spec);
        self.write_file(&generator::aggregator_file_name(spec), &content)?;
        info!(
            "Generated {} referencing {} modules",
            spec.type_name(),
            spec.modules().len()
        );
        Ok(())
    }

    fn write_root(&mut self, spec: &RootSpec) -> Result<(), ProcessorError> {
        let content = generate_root_source(spec);
        self.write_file(&generator::root_file_name(), &content)?;
        info!(
            "Generated root module for {} with {} modules",
            spec.root.qualified_name,
            spec.modules.len()
        );
        Ok(())
    }
}

/// In-memory writer that records what it was given.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryWriter {
    pub aggregators: Vec<AggregatorSpec>,
    pub roots: Vec<RootSpec>,
    pub fail: bool,
}

#[cfg(test)]
impl ArtifactWriter for MemoryWriter {
    fn write_aggregator(&mut self, spec: &AggregatorSpec) -> Result<(), ProcessorError> {
        if self.fail {
            return Err(ProcessorError::write(
                spec.type_name(),
                std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            ));
        }
        self.aggregators.push(spec.clone());
        Ok(())
    }

    fn write_root(&mut self, spec: &RootSpec) -> Result<(), ProcessorError> {
        if self.fail {
            return Err(ProcessorError::write(
                "root",
                std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            ));
        }
        self.roots.push(spec.clone());
        Ok(())
    }
}
