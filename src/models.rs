//! Data models for module discovery.
//!
//! This module contains the core data structures shared by the scanner,
//! the round coordinator, the code generator and the build report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Attribute marking a type as a candidate for discovery.
pub const MARKER_ATTRIBUTE: &str = "index_module";

/// Attribute carried by generated aggregators.
pub const AGGREGATOR_ATTRIBUTE: &str = "index_aggregator";

/// Attribute carried by the generated root module.
pub const ROOT_ATTRIBUTE: &str = "index_root";

/// Name of the generated root module type.
pub const ROOT_MODULE_NAME: &str = "GeneratedRootModule";

/// Generated names longer than this are replaced by a hash.
const MAX_AGGREGATOR_NAME_LEN: usize = 120;

/// A declared type in the source tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilationUnit {
    /// Fully qualified path, e.g. `crate::net::HttpModule`.
    pub qualified_name: String,
    /// File the type was declared in.
    pub source_path: PathBuf,
    /// Whether the declaration carries the marker attribute.
    pub marked: bool,
    /// Traits the type implements, as written in the source.
    pub supertypes: Vec<String>,
}

impl CompilationUnit {
    /// Creates an unmarked unit with no supertypes.
    pub fn new(qualified_name: impl Into<String>, source_path: impl Into<PathBuf>) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            source_path: source_path.into(),
            marked: false,
            supertypes: Vec::new(),
        }
    }

    /// Marks the unit with the marker attribute.
    pub fn marked(mut self) -> Self {
        self.marked = true;
        self
    }

    /// Records an implemented trait; repeats are ignored.
    pub fn add_supertype(&mut self, name: &str) {
        if !self.supertypes.iter().any(|s| s == name) {
            self.supertypes.push(name.to_string());
        }
    }

    #[cfg(test)]
    pub fn with_supertype(mut self, name: impl Into<String>) -> Self {
        self.supertypes.push(name.into());
        self
    }

    /// Whether the unit implements a trait, compared by last path segment.
    pub fn implements(&self, trait_name: &str) -> bool {
        let wanted = last_segment(trait_name);
        self.supertypes.iter().any(|s| last_segment(s) == wanted)
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path).trim()
}

impl fmt::Display for CompilationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified_name)
    }
}

/// Role a marked unit plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Application-style module; handled by the root module generator.
    Root,
    /// Library-style module; referenced by the aggregator.
    Primary,
    /// Matches neither shape.
    Invalid,
}

impl Role {
    /// Evaluation priority; lower is tested first.
    pub fn priority(&self) -> u8 {
        match self {
            Role::Root => 0,
            Role::Primary => 1,
            Role::Invalid => u8::MAX,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Root => write!(f, "Root"),
            Role::Primary => write!(f, "Primary"),
            Role::Invalid => write!(f, "Invalid"),
        }
    }
}

/// Marked units visible in one round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundUnitSet {
    /// Round number, starting at 1.
    pub round: u32,
    /// Units in scan order.
    pub units: Vec<CompilationUnit>,
}

impl RoundUnitSet {
    pub fn new(round: u32, units: Vec<CompilationUnit>) -> Self {
        Self { round, units }
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CompilationUnit> {
        self.units.iter()
    }
}

/// Logical content of a generated aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregatorSpec {
    modules: Vec<CompilationUnit>,
    /// Round the aggregator was generated in.
    pub round: u32,
}

impl AggregatorSpec {
    /// Builds a spec, or `None` if there is nothing to aggregate.
    pub fn new(modules: Vec<CompilationUnit>, round: u32) -> Option<Self> {
        if modules.is_empty() {
            return None;
        }
        Some(Self { modules, round })
    }

    /// Referenced modules in discovery order.
    pub fn modules(&self) -> &[CompilationUnit] {
        &self.modules
    }

    /// Qualified names of the referenced modules.
    pub fn module_names(&self) -> Vec<String> {
        self.modules
            .iter()
            .map(|m| m.qualified_name.clone())
            .collect()
    }

    /// Type name of the generated aggregator.
    ///
    /// Derived only from the module names so that rebuilding the same input
    /// yields the same artifact.
    pub fn type_name(&self) -> String {
        let joined = self
            .modules
            .iter()
            .map(|m| {
                m.qualified_name
                    .trim_start_matches("crate::")
                    .replace("::", "_")
            })
            .collect::<Vec<_>>()
            .join("__");

        let name = format!("Indexer_{}", joined);
        if name.len() > MAX_AGGREGATOR_NAME_LEN {
            format!("Indexer_{:016x}", fnv1a(joined.as_bytes()))
        } else {
            name
        }
    }
}

/// 64-bit FNV-1a; stable across toolchains, unlike `DefaultHasher`.
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// A generated aggregator visible to lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatorRef {
    pub type_name: String,
    pub modules: Vec<String>,
    pub source_path: PathBuf,
}

/// Logical content of the generated root module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RootSpec {
    /// The application-style module.
    pub root: CompilationUnit,
    /// Library modules collected from every visible aggregator.
    pub modules: Vec<String>,
    /// Aggregators the modules were collected from.
    pub aggregators: Vec<String>,
    /// Round the root module was generated in.
    pub round: u32,
}

/// Result of one coordinator invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    /// An artifact was written; dependent work must wait for the next round.
    Continue,
    /// Nothing further from this engine.
    Done,
}

impl Signal {
    /// Whether the host must run another round.
    pub fn more_rounds(&self) -> bool {
        matches!(self, Signal::Continue)
    }
}

impl From<Signal> for bool {
    fn from(signal: Signal) -> Self {
        signal.more_rounds()
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Continue => write!(f, "Continue"),
            Signal::Done => write!(f, "Done"),
        }
    }
}

/// What happened in a single round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundSummary {
    pub round: u32,
    /// Marked units visible in the round.
    pub marked_units: Vec<String>,
    pub signal: Signal,
    /// Artifacts written during the round.
    pub artifacts: Vec<PathBuf>,
}

/// Metadata about a build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    pub build_date: DateTime<Utc>,
    pub duration_seconds: f64,
}

/// Summary of a complete round sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    pub metadata: ReportMetadata,
    pub rounds: Vec<RoundSummary>,
}

impl BuildReport {
    /// All artifacts written across rounds, in order.
    pub fn artifacts(&self) -> Vec<&PathBuf> {
        self.rounds.iter().flat_map(|r| &r.artifacts).collect()
    }
}
