//! Filesystem-backed round sequencing.
//!
//! Round 1 sees every authored unit. Each later round sees only the units
//! declared in files written during the round before it, while aggregator
//! lookups accumulate over the whole build.

use crate::analysis::ModuleProcessor;
use crate::codegen::SourceFiler;
use crate::error::ProcessorError;
use crate::models::{AggregatorRef, CompilationUnit, RoundSummary};
use crate::pipeline::{scan, RoundContext, SourceRound};
use crate::scanner::{resolve_dir, ScanConfig, SourceScanner};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Module prefix of authored sources.
const AUTHORED_PREFIX: &str = "crate";

/// Units and aggregators known to the host, and what each round may see.
pub struct SourceTree {
    generated: SourceScanner,
    pending: Vec<CompilationUnit>,
    visible: Vec<AggregatorRef>,
    round: u32,
}

impl SourceTree {
    /// Parse the authored sources under `src`. The output directory is never
    /// scanned as authored source, so leftovers from an earlier build are ignored.
    ///
    /// Both directories are resolved first; generated files must be filed
    /// under [`SourceTree::output_dir`] to be registered with the right module.
    pub fn load(
        src: PathBuf,
        out: PathBuf,
        scan_config: ScanConfig,
        module_prefix: &str,
    ) -> Result<Self> {
        let src = resolve_dir(&src)?;
        let out = resolve_dir(&out)?;
        debug!("Resolved source {} and output {}", src.display(), out.display());

        let mut authored_config = scan_config.clone();
        authored_config.excluded_dirs.push(out.clone());

        let authored = SourceScanner::new(src, authored_config, AUTHORED_PREFIX)
            .scan()
            .context("Failed to scan source tree")?;

        info!(
            "Loaded {} declarations ({} marked)",
            authored.units.len(),
            authored.marked_units().count()
        );

        Ok(Self {
            generated: SourceScanner::new(out, scan_config, module_prefix),
            pending: authored.units,
            visible: authored.aggregators,
            round: 0,
        })
    }

    /// Number of rounds started so far.
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Start the next round.
    ///
    /// The returned round owns a snapshot; files registered afterwards do
    /// not show up in it.
    pub fn begin_round(&mut self) -> SourceRound {
        self.round += 1;
        SourceRound::new(
            self.round,
            std::mem::take(&mut self.pending),
            self.visible.clone(),
        )
    }

    /// Make freshly written files visible from the next round on.
    pub fn register_generated(&mut self, paths: &[PathBuf]) -> Result<()> {
        for path in paths {
            let parsed = self
                .generated
                .parse_file(path)
                .with_context(|| format!("Failed to read generated file {}", path.display()))?;

            debug!(
                "Registered {}: {} declarations, {} aggregators",
                path.display(),
                parsed.units.len(),
                parsed.aggregators.len()
            );

            self.pending.extend(parsed.units);
            self.visible.extend(parsed.aggregators);
        }

        Ok(())
    }

    pub fn output_dir(&self) -> &Path {
        self.generated.root()
    }
}

/// Runs rounds until the build reaches a fixed point.
pub struct RoundDriver {
    max_rounds: u32,
}

impl RoundDriver {
    pub fn new(max_rounds: u32) -> Self {
        Self { max_rounds }
    }

    /// Run rounds until one writes nothing and signals `Done`.
    pub fn run(
        &self,
        tree: &mut SourceTree,
        processor: &mut ModuleProcessor,
        filer: &mut SourceFiler,
    ) -> Result<Vec<RoundSummary>> {
        let mut rounds = Vec::new();

        loop {
            if tree.round() >= self.max_rounds {
                return Err(ProcessorError::RoundLimitExceeded(self.max_rounds).into());
            }

            let ctx = tree.begin_round();
            let round = ctx.round();
            let marked_units: Vec<String> = scan(&ctx)
                .iter()
                .map(|u| u.qualified_name.clone())
                .collect();

            info!("Round {}: {} marked units", round, marked_units.len());

            let signal = processor
                .process(&ctx, filer)
                .with_context(|| format!("Round {} failed", round))?;

            let artifacts = filer.take_written();
            tree.register_generated(&artifacts)?;

            debug!(
                "Round {} finished with {} ({} artifacts)",
                round,
                signal,
                artifacts.len()
            );

            let settled = artifacts.is_empty() && !signal.more_rounds();
            rounds.push(RoundSummary {
                round,
                marked_units,
                signal,
                artifacts,
            });

            if settled {
                break;
            }
        }

        info!("Build settled after {} rounds", rounds.len());
        Ok(rounds)
    }
}
