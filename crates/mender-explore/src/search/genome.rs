//! The genome capability set and its fix instantiation.
//!
//! The genetic driver is generic over anything that can produce an initial
//! population, cross over, mutate, and score — `EFix` is one concrete
//! genome; expression-level genomes can be added without touching the
//! driver.

use mender_ir::{Problem, SitePath};
use mender_oracle::{CompilerOracle, OracleConfig};
use mender_sandbox::{CheckRunner, SandboxConfig, Verdict};
use tracing::warn;

use crate::checks::check_fixes;
use crate::fitness::{verdict_fitness, FitnessCache};
use crate::fix::EFix;
use crate::repair::repair_attempt;
use crate::rng::SearchRng;
use crate::search::minimize::minimize_fix;
use crate::SearchError;

/// Fixes larger than this are returned unminimized; subset enumeration is
/// exponential in the entry count.
pub const MINIMIZE_MAX_ENTRIES: usize = 10;

/// Capabilities the genetic driver needs from a genome.
pub trait GenomeHost {
    type Gene: Clone + PartialEq;

    fn rng(&mut self) -> &mut SearchRng;

    /// A fresh population of `n` individuals. Errors abort the search.
    fn initial_population(&mut self, n: usize) -> Result<Vec<Self::Gene>, SearchError>;

    fn crossover(
        &mut self,
        a: &Self::Gene,
        b: &Self::Gene,
    ) -> (Self::Gene, Self::Gene);

    /// Mutate one individual. Infallible: hosts absorb failures and return
    /// the individual unchanged.
    fn mutate(&mut self, gene: Self::Gene) -> Self::Gene;

    /// Cached fitness in [0, 1]; 0 is perfect.
    fn fitness(&mut self, gene: &Self::Gene) -> f64;

    /// Equivalent genes no larger than `gene`, best (smallest) first.
    /// The default keeps the gene as-is.
    fn minimize(&mut self, gene: &Self::Gene) -> Vec<Self::Gene> {
        vec![gene.clone()]
    }
}

/// The fix genome: single-step repairs as mutations, span-list splicing as
/// crossover, verdict-backed cached fitness.
pub struct RepairHost<'a, O: CompilerOracle> {
    oracle: &'a O,
    cfg: OracleConfig,
    runner: CheckRunner,
    problem: &'a Problem,
    rng: SearchRng,
    cache: FitnessCache,
    drop_rate: f64,
}

impl<'a, O: CompilerOracle> RepairHost<'a, O> {
    pub fn new(
        oracle: &'a O,
        cfg: OracleConfig,
        sandbox: SandboxConfig,
        problem: &'a Problem,
        seed: u64,
        drop_rate: f64,
    ) -> Self {
        RepairHost {
            oracle,
            cfg,
            runner: CheckRunner::new(sandbox),
            problem,
            rng: SearchRng::seeded(seed),
            cache: FitnessCache::new(),
            drop_rate,
        }
    }

    pub fn problem(&self) -> &Problem {
        self.problem
    }

    pub fn cache(&self) -> &FitnessCache {
        &self.cache
    }

    fn verdict_for(&self, fix: &EFix) -> Verdict {
        check_fixes(
            self.oracle,
            &self.cfg,
            &self.runner,
            self.problem,
            std::slice::from_ref(fix),
        )
        .pop()
        .unwrap_or(Verdict::AllFail)
    }

    fn split_point(&mut self, len: usize) -> usize {
        if len == 0 {
            0
        } else {
            self.rng.uniform_range(1, len)
        }
    }
}

impl<'a, O: CompilerOracle> GenomeHost for RepairHost<'a, O> {
    type Gene = EFix;

    fn rng(&mut self) -> &mut SearchRng {
        &mut self.rng
    }

    fn initial_population(&mut self, n: usize) -> Result<Vec<EFix>, SearchError> {
        let attempt = repair_attempt(self.oracle, &self.cfg, &self.runner, self.problem)?;
        if attempt.is_empty() {
            // The input is presumed broken; no candidate edits at all means
            // the invariant does not hold.
            return Err(SearchError::NoInitialEdits);
        }
        for (fix, verdict) in &attempt {
            self.cache.insert(fix.clone(), verdict_fitness(verdict));
        }
        let mut population = Vec::with_capacity(n);
        for _ in 0..n {
            let (fix, _) = self
                .rng
                .uniform_pick(&attempt)
                .expect("attempt is non-empty");
            population.push(fix.clone());
        }
        Ok(population)
    }

    /// Splice the span lists at independent crossover points; both children
    /// are rebuilt under the merge-overlap rule.
    fn crossover(&mut self, a: &EFix, b: &EFix) -> (EFix, EFix) {
        let list_a = a.to_list();
        let list_b = b.to_list();
        let cut_a = self.split_point(list_a.len());
        let cut_b = self.split_point(list_b.len());
        let (prefix_a, suffix_a) = list_a.split_at(cut_a);
        let (prefix_b, suffix_b) = list_b.split_at(cut_b);
        let child_a =
            EFix::from_list(prefix_a.to_vec()).merge(&EFix::from_list(suffix_b.to_vec()));
        let child_b =
            EFix::from_list(prefix_b.to_vec()).merge(&EFix::from_list(suffix_a.to_vec()));
        (child_a, child_b)
    }

    fn mutate(&mut self, gene: EFix) -> EFix {
        if self.rng.coin(self.drop_rate) && !gene.is_empty() {
            let sites: Vec<SitePath> = gene.sites().cloned().collect();
            let dropped = self
                .rng
                .uniform_pick(&sites)
                .expect("fix is non-empty")
                .clone();
            let mut shrunk = gene;
            shrunk.remove(&dropped);
            return shrunk;
        }

        let patched = self.problem.with_target(gene.apply(&self.problem.target));
        let attempt = match repair_attempt(self.oracle, &self.cfg, &self.runner, &patched) {
            Ok(attempt) => attempt,
            Err(e) => {
                warn!(error = %e, "repair attempt failed during mutation");
                return gene;
            }
        };
        // No further local edits available; keep the individual unchanged.
        if attempt.is_empty() {
            return gene;
        }
        let (step, verdict) = self
            .rng
            .uniform_pick(&attempt)
            .expect("attempt is non-empty");
        // The new edit wins over entries it encloses.
        let merged = step.merge(&gene);
        self.cache.insert(merged.clone(), verdict_fitness(verdict));
        merged
    }

    fn fitness(&mut self, gene: &EFix) -> f64 {
        if let Some(score) = self.cache.get(gene) {
            return score;
        }
        let score = verdict_fitness(&self.verdict_for(gene));
        self.cache.insert(gene.clone(), score);
        score
    }

    fn minimize(&mut self, gene: &EFix) -> Vec<EFix> {
        if gene.len() > MINIMIZE_MAX_ENTRIES {
            return vec![gene.clone()];
        }
        let minimized = minimize_fix(self, gene);
        if minimized.is_empty() {
            vec![gene.clone()]
        } else {
            minimized
        }
    }
}
