//! Host pipeline: round contexts and the round driver.
//!
//! A unit generated in round N is visible to lookups from round N+1 on.
//! That rule lives here, behind [`RoundContext`], so the processors can be
//! exercised with hand-built rounds.

pub mod rounds;

pub use rounds::{RoundDriver, SourceTree};

use crate::models::{AggregatorRef, CompilationUnit, RoundUnitSet};

/// What a processor can see during one round.
pub trait RoundContext {
    /// Round number, starting at 1.
    fn round(&self) -> u32;

    /// Units introduced for this round, marked or not.
    fn units(&self) -> &[CompilationUnit];

    /// Generated aggregators visible to lookups this round.
    fn aggregators(&self) -> Vec<AggregatorRef>;
}

/// Marked units visible in a round, in the order the host supplied them.
pub fn scan(ctx: &dyn RoundContext) -> RoundUnitSet {
    let units = ctx.units().iter().filter(|u| u.marked).cloned().collect();
    RoundUnitSet::new(ctx.round(), units)
}

/// A snapshot of one round.
#[derive(Debug, Clone, Default)]
pub struct SourceRound {
    round: u32,
    units: Vec<CompilationUnit>,
    aggregators: Vec<AggregatorRef>,
}

impl SourceRound {
    pub fn new(round: u32, units: Vec<CompilationUnit>, aggregators: Vec<AggregatorRef>) -> Self {
        Self {
            round,
            units,
            aggregators,
        }
    }
}

impl RoundContext for SourceRound {
    fn round(&self) -> u32 {
        self.round
    }

    fn units(&self) -> &[CompilationUnit] {
        &self.units
    }

    fn aggregators(&self) -> Vec<AggregatorRef> {
        self.aggregators.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_keeps_marked_units_in_order() {
        let ctx = SourceRound::new(
            3,
            vec![
                CompilationUnit::new("crate::B", "src/b.rs").marked(),
                CompilationUnit::new("crate::Plain", "src/p.rs"),
                CompilationUnit::new("crate::A", "src/a.rs").marked(),
            ],
            Vec::new(),
        );

        let set = scan(&ctx);

        assert_eq!(set.round, 3);
        let names: Vec<_> = set.iter().map(|u| u.qualified_name.as_str()).collect();
        assert_eq!(names, vec!["crate::B", "crate::A"]);
    }

    #[test]
    fn test_scan_empty_round() {
        let set = scan(&SourceRound::new(1, Vec::new(), Vec::new()));
        assert!(set.is_empty());
    }
}
