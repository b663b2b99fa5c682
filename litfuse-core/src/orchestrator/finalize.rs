//! Result finalization with progressive relaxation.
//!
//! Canonical records are ranked by composite score and selected level by
//! level until the target count is reached.
//!
//! # State Machine
//!
//! ```text
//! ┌────────┐ short ┌────────────────────┐ short ┌──────────────┐ short ┌─────────────┐
//! │ Strict ├──────►│ DropHardExclusions ├──────►│ BroadenPool  ├──────►│ LastResort  │
//! └───┬────┘       └─────────┬──────────┘       └──────┬───────┘       └──────┬──────┘
//!     │ full                 │ full                    │ full                 │ always
//!     ▼                      ▼                         ▼                      ▼
//!                              Finished
//! ```
//!
//! Each level only fills the shortfall and never removes earlier picks, so
//! the selection after level `k` is a subset of the selection after `k + 1`.

use std::cmp::Ordering;

use crate::config::AggregatorConfig;
use crate::text::TokenText;
use crate::types::{CanonicalRecord, LevelFill, RelaxationLevel};

/// Result of one finalizer step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Still short of the target; moved to the given looser level.
    Advance(RelaxationLevel),
    /// Target reached or every level exhausted.
    Finished,
}

/// Output of a completed finalizer run.
#[derive(Debug, Clone)]
pub struct FinalizeOutcome {
    pub results: Vec<CanonicalRecord>,
    /// Last level the state machine entered.
    pub level_used: RelaxationLevel,
    pub fills: Vec<LevelFill>,
}

/// Canonical record with the text facts every level needs.
#[derive(Debug)]
struct Candidate {
    record: CanonicalRecord,
    hard_excluded: bool,
    has_generic_term: bool,
    blacklisted: bool,
    taken: bool,
}

/// Relaxation state machine over a ranked pool of canonical records.
#[derive(Debug)]
pub struct Finalizer {
    pool: Vec<Candidate>,
    selected: Vec<usize>,
    target: usize,
    level: RelaxationLevel,
    fills: Vec<LevelFill>,
}

/// Ranking order: composite score descending, then title, then source preference.
pub fn rank_order(config: &AggregatorConfig, a: &CanonicalRecord, b: &CanonicalRecord) -> Ordering {
    b.composite_score()
        .total_cmp(&a.composite_score())
        .then_with(|| a.title().cmp(b.title()))
        .then_with(|| config.source_rank(a.source()).cmp(&config.source_rank(b.source())))
}

impl Finalizer {
    /// Rank `pool` and start at [`RelaxationLevel::Strict`].
    pub fn new(mut pool: Vec<CanonicalRecord>, target: usize, config: &AggregatorConfig) -> Self {
        pool.sort_by(|a, b| rank_order(config, a, b));
        let terms = &config.terms;
        let pool = pool
            .into_iter()
            .map(|record| {
                let design = TokenText::new(&record.best.record.title_and_abstract());
                let full = TokenText::new(&record.best.record.combined_text());
                Candidate {
                    hard_excluded: design.contains_any(&terms.hard_exclusions),
                    has_generic_term: full.contains_any(&terms.generic_domain),
                    blacklisted: full.contains_any(&terms.blacklist),
                    taken: false,
                    record,
                }
            })
            .collect();
        Self {
            pool,
            selected: Vec::new(),
            target,
            level: RelaxationLevel::Strict,
            fills: Vec::new(),
        }
    }

    pub fn level(&self) -> RelaxationLevel {
        self.level
    }

    pub fn is_satisfied(&self) -> bool {
        self.selected.len() >= self.target
    }

    /// Records selected so far, in selection order.
    pub fn selected(&self) -> impl Iterator<Item = &CanonicalRecord> {
        self.selected.iter().map(|&idx| &self.pool[idx].record)
    }

    fn eligible(level: RelaxationLevel, candidate: &Candidate) -> bool {
        let record = &candidate.record.best.record;
        let titled = !record.title.trim().is_empty();
        match level {
            RelaxationLevel::Strict => candidate.record.admitted && !candidate.hard_excluded,
            RelaxationLevel::DropHardExclusions => {
                candidate.record.admitted
                    && candidate.hard_excluded
                    && titled
                    && record.authors.iter().any(|a| !a.trim().is_empty())
            }
            RelaxationLevel::BroadenPool => !candidate.record.admitted && candidate.has_generic_term,
            RelaxationLevel::LastResort => titled && !candidate.blacklisted,
        }
    }

    /// Fill the shortfall from the current level, then decide what comes next.
    pub fn step(&mut self) -> Transition {
        let level = self.level;
        let mut added = 0;
        for idx in 0..self.pool.len() {
            if self.is_satisfied() {
                break;
            }
            let candidate = &self.pool[idx];
            if !candidate.taken && Self::eligible(level, candidate) {
                self.pool[idx].taken = true;
                self.selected.push(idx);
                added += 1;
            }
        }
        self.fills.push(LevelFill { level, added });
        tracing::debug!(%level, added, selected = self.selected.len(), target = self.target, "relaxation level applied");

        if self.is_satisfied() {
            return Transition::Finished;
        }
        match level.next() {
            Some(next) => {
                self.level = next;
                Transition::Advance(next)
            }
            None => Transition::Finished,
        }
    }

    /// Step until finished and return the selection.
    pub fn run(mut self) -> FinalizeOutcome {
        while let Transition::Advance(_) = self.step() {}
        let level_used = self.level();
        let titles: Vec<&str> = self.selected().map(CanonicalRecord::title).collect();
        tracing::trace!(level = %level_used, ?titles, "selection finished");
        let Self {
            mut pool,
            selected,
            fills,
            ..
        } = self;
        let mut slots: Vec<Option<CanonicalRecord>> =
            pool.drain(..).map(|c| Some(c.record)).collect();
        let results = selected
            .into_iter()
            .filter_map(|idx| slots[idx].take())
            .collect();
        FinalizeOutcome {
            results,
            level_used,
            fills,
        }
    }
}

/// Rank and select up to `target` canonical records.
pub fn finalize(pool: Vec<CanonicalRecord>, target: usize, config: &AggregatorConfig) -> FinalizeOutcome {
    Finalizer::new(pool, target, config).run()
}
