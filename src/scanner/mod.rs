//! Source scanner for discovering declared types.
//!
//! This module walks a source tree, respecting configuration for
//! extensions, excludes, and file size limits, and extracts type
//! declarations together with their attributes and implemented traits.

pub mod blocks;

use crate::models::{AggregatorRef, CompilationUnit, AGGREGATOR_ATTRIBUTE, MARKER_ATTRIBUTE};
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// A `struct` or `enum` declaration with its leading attributes and doc comments.
///
/// Attributes may span lines and nest one level of brackets, which covers
/// rustfmt's wrapped `#[derive(...)]` lists and `modules = [...]` lists.
static DECLARATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^[ \t]*((?:(?:#\[(?:[^\[\]]|\[[^\[\]]*\])*\]|///[^\n]*)\s*)*)(?:pub(?:\([^)\n]*\))?[ \t]+)?(?:struct|enum)[ \t]+([A-Za-z_][A-Za-z0-9_]*)",
    )
    .expect("declaration pattern is valid")
});

/// `impl Trait for Type`, tolerating simple generics on either side.
static IMPL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\bimpl(?:\s*<[^>{]*>)?\s+([A-Za-z_][A-Za-z0-9_:]*)(?:<[^>{]*>)?\s+for\s+([A-Za-z_][A-Za-z0-9_:]*)",
    )
    .expect("impl pattern is valid")
});

static MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"#\[\s*{}\s*\]", MARKER_ATTRIBUTE)).expect("marker pattern is valid")
});

static AGGREGATOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"#\[\s*{}\s*\(\s*modules\s*=\s*\[([^\]]*)\]\s*\)\s*\]",
        AGGREGATOR_ATTRIBUTE
    ))
    .expect("aggregator pattern is valid")
});

/// Configuration for source scanning.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// File extensions to include (e.g., ["rs"])
    pub extensions: Vec<String>,
    /// Names to exclude (e.g., ["target", ".git"])
    pub excludes: Vec<String>,
    /// Maximum file size in bytes
    pub max_file_size: usize,
    /// Directories skipped entirely, such as the generated output
    pub excluded_dirs: Vec<PathBuf>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::from(&crate::config::ScannerConfig::default())
    }
}

impl From<&crate::config::ScannerConfig> for ScanConfig {
    fn from(config: &crate::config::ScannerConfig) -> Self {
        Self {
            extensions: config.extensions.clone(),
            excludes: config.excludes.clone(),
            max_file_size: config.max_file_size,
            excluded_dirs: Vec::new(),
        }
    }
}

/// An `impl Trait for Type` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraitImpl {
    pub trait_name: String,
    /// Implementing type as written; may be a path.
    pub target: String,
    /// Module the impl block sits in.
    pub module: String,
}

/// Everything extracted from one or more source files.
#[derive(Debug, Clone, Default)]
pub struct ParsedSource {
    /// Every declared type, marked or not, in source order.
    pub units: Vec<CompilationUnit>,
    /// Generated aggregators found among the declarations.
    pub aggregators: Vec<AggregatorRef>,
    /// Trait impls, whether or not their target was found.
    pub impls: Vec<TraitImpl>,
}

impl ParsedSource {
    pub fn extend(&mut self, other: ParsedSource) {
        self.units.extend(other.units);
        self.aggregators.extend(other.aggregators);
        self.impls.extend(other.impls);
    }

    /// Attach every collected impl to the unit it implements.
    ///
    /// The target path is resolved against the impl's module first (`crate::`,
    /// `self::` and `super::` included). If that names no declared unit, the
    /// impl goes to every unit with the same type name, which covers targets
    /// brought in with `use`.
    pub fn link_impls(&mut self) {
        let mut by_path: HashMap<String, usize> = HashMap::new();
        let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, unit) in self.units.iter().enumerate() {
            by_path.entry(unit.qualified_name.clone()).or_insert(idx);
            by_name
                .entry(type_name(&unit.qualified_name).to_string())
                .or_default()
                .push(idx);
        }

        for imp in &self.impls {
            let resolved = resolve_path(&imp.module, &imp.target).and_then(|p| by_path.get(&p));
            let targets = match resolved {
                Some(&idx) => vec![idx],
                None => {
                    let candidates = by_name
                        .get(type_name(&imp.target))
                        .cloned()
                        .unwrap_or_default();
                    if candidates.len() > 1 {
                        debug!(
                            "impl {} for {} in {} matches {} types by name",
                            imp.trait_name,
                            imp.target,
                            imp.module,
                            candidates.len()
                        );
                    }
                    candidates
                }
            };

            for idx in targets {
                self.units[idx].add_supertype(&imp.trait_name);
            }
        }
    }

    /// Units carrying the marker attribute.
    pub fn marked_units(&self) -> impl Iterator<Item = &CompilationUnit> {
        self.units.iter().filter(|u| u.marked)
    }
}

/// Source scanner for discovering declarations.
pub struct SourceScanner {
    config: ScanConfig,
    root: PathBuf,
    module_prefix: String,
}

impl SourceScanner {
    /// Create a new scanner. Module paths are built as `module_prefix::relative::path`.
    pub fn new(root: PathBuf, config: ScanConfig, module_prefix: impl Into<String>) -> Self {
        Self {
            config,
            root,
            module_prefix: module_prefix.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scan every matching file under the root.
    ///
    /// Files are visited in file-name order so repeated scans of the same
    /// tree produce units in the same order.
    pub fn scan(&self) -> Result<ParsedSource> {
        let mut parsed = ParsedSource::default();

        if !self.root.is_dir() {
            debug!("Scan root is not a directory: {}", self.root.display());
            return Ok(parsed);
        }

        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !self.is_excluded_entry(e));

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if entry.file_type().is_file() && self.matches(entry.path()) {
                match self.read_file(entry.path()) {
                    Ok(file) => parsed.extend(file),
                    Err(e) => warn!("Failed to parse {}: {:#}", entry.path().display(), e),
                }
            }
        }

        parsed.link_impls();

        debug!(
            "Scanned {}: {} declarations, {} aggregators",
            self.root.display(),
            parsed.units.len(),
            parsed.aggregators.len()
        );

        Ok(parsed)
    }

    /// Parse a single file, linking impls within it.
    pub fn parse_file(&self, path: &Path) -> Result<ParsedSource> {
        let mut parsed = self.read_file(path)?;
        parsed.link_impls();
        Ok(parsed)
    }

    fn read_file(&self, path: &Path) -> Result<ParsedSource> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read source file: {}", path.display()))?;

        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let module = module_path(&self.module_prefix, relative);

        Ok(extract(&module, path, &content))
    }

    /// Check if a file matches scan criteria.
    pub fn matches(&self, path: &Path) -> bool {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !self.config.extensions.iter().any(|e| e == ext) {
            return false;
        }

        match fs::metadata(path) {
            Ok(metadata) => metadata.len() <= self.config.max_file_size as u64,
            Err(_) => false,
        }
    }

    fn is_excluded_entry(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 {
            return false;
        }

        if self
            .config
            .excluded_dirs
            .iter()
            .any(|dir| entry.path().starts_with(dir))
        {
            return true;
        }

        let name = entry.file_name().to_string_lossy();
        self.is_excluded(&name)
    }

    /// Check if a name matches exclusion patterns.
    fn is_excluded(&self, name: &str) -> bool {
        // Hidden files
        if name.starts_with('.') {
            return true;
        }

        self.config.excludes.iter().any(|pattern| name == pattern)
    }
}

/// Absolute, symlink-free form of a directory that may not exist yet.
///
/// The longest existing ancestor is canonicalized and the rest appended, so
/// `src`, `./src` and `/abs/src` compare equal with `Path::starts_with`.
pub fn resolve_dir(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .context("Failed to read the working directory")?
            .join(path)
    };

    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => break,
        }
    }

    let mut resolved = fs::canonicalize(existing)
        .with_context(|| format!("Failed to resolve {}", path.display()))?;
    for name in missing.iter().rev() {
        resolved.push(name);
    }
    Ok(resolved)
}

/// Build a module path from a prefix and a path relative to the scan root.
///
/// `a/b.rs` becomes `prefix::a::b`; `mod.rs`, `lib.rs` and `main.rs` name
/// their parent module.
pub fn module_path(prefix: &str, relative: &Path) -> String {
    let mut segments: Vec<String> = Vec::new();
    if !prefix.is_empty() {
        segments.push(prefix.to_string());
    }

    for component in relative.with_extension("").components() {
        if let Component::Normal(part) = component {
            segments.push(part.to_string_lossy().to_string());
        }
    }

    if segments.len() > 1
        && matches!(
            segments.last().map(String::as_str),
            Some("mod" | "lib" | "main")
        )
    {
        segments.pop();
    }

    segments.join("::")
}

/// Extract declarations from source text belonging to `module`.
///
/// Types inside inline `mod name { ... }` blocks get that module appended to
/// their path. Impls are linked within the text only; [`SourceScanner::scan`]
/// links them across the whole tree.
pub fn parse_source(module: &str, path: &Path, content: &str) -> ParsedSource {
    let mut parsed = extract(module, path, content);
    parsed.link_impls();
    parsed
}

fn extract(module: &str, path: &Path, content: &str) -> ParsedSource {
    let inline = blocks::inline_modules(content);
    let mut parsed = ParsedSource::default();

    for cap in IMPL_RE.captures_iter(content) {
        if let (Some(trait_name), Some(target)) = (cap.get(1), cap.get(2)) {
            parsed.impls.push(TraitImpl {
                trait_name: trait_name.as_str().to_string(),
                target: target.as_str().to_string(),
                module: blocks::module_at(module, &inline, target.start()),
            });
        }
    }

    for cap in DECLARATION_RE.captures_iter(content) {
        let attrs = cap.get(1).map_or("", |m| m.as_str());
        let Some(name) = cap.get(2) else {
            continue;
        };

        let scope = blocks::module_at(module, &inline, name.start());
        let name = name.as_str();
        let qualified_name = if scope.is_empty() {
            name.to_string()
        } else {
            format!("{}::{}", scope, name)
        };

        let mut unit = CompilationUnit::new(qualified_name, path);
        if MARKER_RE.is_match(attrs) {
            unit = unit.marked();
        }

        if let Some(agg) = AGGREGATOR_RE.captures(attrs) {
            let modules = agg.get(1).map_or("", |m| m.as_str());
            parsed.aggregators.push(AggregatorRef {
                type_name: name.to_string(),
                modules: parse_string_list(modules),
                source_path: path.to_path_buf(),
            });
        }

        parsed.units.push(unit);
    }

    parsed
}

/// Resolve an impl target written in `module` to a qualified path.
fn resolve_path(module: &str, target: &str) -> Option<String> {
    let mut segments: Vec<&str> = target.split("::").collect();
    if segments.first() == Some(&"crate") {
        return Some(target.to_string());
    }

    let mut base: Vec<&str> = if module.is_empty() {
        Vec::new()
    } else {
        module.split("::").collect()
    };

    while let Some(&first) = segments.first() {
        match first {
            "self" => {}
            "super" => {
                base.pop()?;
            }
            _ => break,
        }
        segments.remove(0);
    }

    base.extend(segments);
    Some(base.join("::"))
}

fn type_name(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

/// Parse `"a", "b"` into `["a", "b"]`.
fn parse_string_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|item| item.trim().trim_matches('"').trim())
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"
use crate::modules::{AppModule, LibraryModule};

/// Network stack registration.
#[index_module]
#[derive(Debug, Default)]
pub struct HttpModule;

impl LibraryModule for HttpModule {}

#[index_module]
pub(crate) struct App {
    name: String,
}

impl LibraryModule for App {}
impl crate::modules::AppModule for App {}

pub enum Unmarked {
    A,
}

// struct Commented;
"#;

    #[test]
    fn test_parse_source_finds_declarations() {
        let parsed = parse_source("crate::net", Path::new("src/net.rs"), SOURCE);
        let names: Vec<_> = parsed
            .units
            .iter()
            .map(|u| u.qualified_name.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["crate::net::HttpModule", "crate::net::App", "crate::net::Unmarked"]
        );
    }

    #[test]
    fn test_parse_source_marker_and_supertypes() {
        let parsed = parse_source("crate::net", Path::new("src/net.rs"), SOURCE);
        let marked: Vec<_> = parsed.marked_units().collect();
        assert_eq!(marked.len(), 2);

        assert!(marked[0].implements("LibraryModule"));
        assert!(!marked[0].implements("AppModule"));
        assert!(marked[1].implements("LibraryModule"));
        assert!(marked[1].implements("AppModule"));
        assert!(!parsed.units[2].marked);
    }

    #[test]
    fn test_parse_source_generic_impl() {
        let src = "#[index_module]\npub struct Cache<T>(T);\nimpl<T> LibraryModule for Cache<T> {}\n";
        let parsed = parse_source("crate", Path::new("src/lib.rs"), src);
        assert_eq!(parsed.units.len(), 1);
        assert!(parsed.units[0].marked);
        assert!(parsed.units[0].implements("LibraryModule"));
    }

    #[test]
    fn test_parse_source_aggregator() {
        let src = r#"
#[index_aggregator(modules = ["crate::a::A", "crate::b::B"])]
#[allow(non_camel_case_types)]
pub struct Indexer_a_A__b_B;
"#;
        let parsed = parse_source("crate::generated", Path::new("gen/x.rs"), src);
        assert_eq!(parsed.aggregators.len(), 1);
        assert_eq!(parsed.aggregators[0].type_name, "Indexer_a_A__b_B");
        assert_eq!(parsed.aggregators[0].modules, vec!["crate::a::A", "crate::b::B"]);
        assert_eq!(parsed.marked_units().count(), 0);
    }

    #[test]
    fn test_module_path() {
        assert_eq!(module_path("crate", Path::new("lib.rs")), "crate");
        assert_eq!(module_path("crate", Path::new("net/mod.rs")), "crate::net");
        assert_eq!(module_path("crate", Path::new("net/http.rs")), "crate::net::http");
        assert_eq!(module_path("", Path::new("net/http.rs")), "net::http");
    }

    #[test]
    fn test_scan_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("net")).unwrap();
        fs::create_dir_all(root.join("target")).unwrap();
        fs::write(
            root.join("net/mod.rs"),
            "#[index_module]\npub struct B;\nimpl LibraryModule for B {}\n",
        )
        .unwrap();
        fs::write(
            root.join("a.rs"),
            "#[index_module]\npub struct A;\nimpl LibraryModule for A {}\n",
        )
        .unwrap();
        fs::write(root.join("target/junk.rs"), "#[index_module]\npub struct Junk;\n").unwrap();
        fs::write(root.join("notes.txt"), "#[index_module]\npub struct Txt;\n").unwrap();

        let scanner = SourceScanner::new(root.to_path_buf(), ScanConfig::default(), "crate");
        let parsed = scanner.scan().unwrap();
        let names: Vec<_> = parsed
            .marked_units()
            .map(|u| u.qualified_name.as_str())
            .collect();

        assert_eq!(names, vec!["crate::a::A", "crate::net::B"]);
    }

    #[test]
    fn test_scan_skips_excluded_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("generated")).unwrap();
        fs::write(root.join("generated/old.rs"), "#[index_module]\npub struct Old;\n").unwrap();

        let config = ScanConfig {
            excluded_dirs: vec![root.join("generated")],
            ..ScanConfig::default()
        };
        let scanner = SourceScanner::new(root.to_path_buf(), config, "crate");
        assert!(scanner.scan().unwrap().units.is_empty());
    }

    #[test]
    fn test_parse_source_multiline_attribute() {
        let src = "#[index_module]\n#[derive(\n    Debug,\n    Default,\n)]\npub struct A;\nimpl LibraryModule for A {}\n";
        let parsed = parse_source("crate", Path::new("src/lib.rs"), src);

        let marked: Vec<_> = parsed.marked_units().collect();
        assert_eq!(marked.len(), 1);
        assert_eq!(marked[0].qualified_name, "crate::A");
        assert!(marked[0].implements("LibraryModule"));
    }

    #[test]
    fn test_parse_source_marker_after_wrapped_attribute() {
        let src = "#[derive(\n    Clone,\n    Debug,\n)]\n#[index_module]\npub struct B;\n";
        let parsed = parse_source("crate", Path::new("src/lib.rs"), src);
        assert_eq!(parsed.marked_units().count(), 1);
    }

    #[test]
    fn test_parse_source_inline_modules() {
        let src = r#"
pub mod inner {
    #[index_module]
    pub struct Nested;

    impl LibraryModule for Nested {}
}

#[index_module]
pub struct Outer;
impl LibraryModule for inner::Nested {}
impl AppModule for self::Outer {}
"#;
        let parsed = parse_source("crate::file", Path::new("src/file.rs"), src);
        let names: Vec<_> = parsed
            .units
            .iter()
            .map(|u| u.qualified_name.as_str())
            .collect();

        assert_eq!(names, vec!["crate::file::inner::Nested", "crate::file::Outer"]);
        assert_eq!(parsed.units[0].supertypes, vec!["LibraryModule"]);
        assert!(parsed.units[1].implements("AppModule"));
    }

    #[test]
    fn test_scan_links_impls_across_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("a.rs"), "#[index_module]\npub struct A;\n").unwrap();
        fs::write(
            root.join("impls.rs"),
            "use crate::a::A;\nuse crate::b;\n\nimpl LibraryModule for A {}\nimpl AppModule for crate::b::B {}\n",
        )
        .unwrap();
        fs::write(root.join("b.rs"), "#[index_module]\npub struct B;\n").unwrap();

        let parsed = SourceScanner::new(root.to_path_buf(), ScanConfig::default(), "crate")
            .scan()
            .unwrap();

        let a = &parsed.units[0];
        assert_eq!(a.qualified_name, "crate::a::A");
        assert!(a.implements("LibraryModule"));
        let b = &parsed.units[1];
        assert_eq!(b.qualified_name, "crate::b::B");
        assert!(b.implements("AppModule"));
        assert!(!b.implements("LibraryModule"));
    }

    #[test]
    fn test_link_prefers_resolved_path_over_name() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(
            root.join("a.rs"),
            "#[index_module]\npub struct Module;\nimpl LibraryModule for Module {}\n",
        )
        .unwrap();
        fs::write(root.join("b.rs"), "#[index_module]\npub struct Module;\n").unwrap();

        let parsed = SourceScanner::new(root.to_path_buf(), ScanConfig::default(), "crate")
            .scan()
            .unwrap();

        assert!(parsed.units[0].implements("LibraryModule"));
        assert!(parsed.units[1].supertypes.is_empty());
    }

    #[test]
    fn test_resolve_path() {
        assert_eq!(resolve_path("crate::a", "B").as_deref(), Some("crate::a::B"));
        assert_eq!(resolve_path("crate::a", "crate::x::B").as_deref(), Some("crate::x::B"));
        assert_eq!(resolve_path("crate::a::m", "super::B").as_deref(), Some("crate::a::B"));
        assert_eq!(resolve_path("crate::a", "self::m::B").as_deref(), Some("crate::a::m::B"));
        assert_eq!(resolve_path("", "super::B"), None);
    }

    #[test]
    fn test_resolve_dir_normalizes_equivalent_paths() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();

        let direct = resolve_dir(&dir.path().join("src")).unwrap();
        let roundabout = resolve_dir(&dir.path().join("src").join("..").join("src")).unwrap();
        let missing = resolve_dir(&dir.path().join("src/generated")).unwrap();

        assert_eq!(direct, roundabout);
        assert!(direct.is_absolute());
        assert!(missing.starts_with(&direct));
        assert_eq!(missing, direct.join("generated"));
    }

    #[test]
    fn test_scan_missing_root_is_empty() {
        let scanner = SourceScanner::new(
            PathBuf::from("/definitely/not/here"),
            ScanConfig::default(),
            "crate",
        );
        assert!(scanner.scan().unwrap().units.is_empty());
    }
}
