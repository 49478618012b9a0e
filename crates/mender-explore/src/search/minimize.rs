//! Winner minimization by subset enumeration.
//!
//! For a fix of size k, all 2^k entry subsets are re-scored; the perfect
//! ones come back sorted by ascending size. Exponential by construction —
//! callers gate on fix size.

use crate::fix::EFix;
use crate::search::genome::GenomeHost;
use crate::search::genetic::WIN_THRESHOLD;

/// Every subset of `fix` whose fitness is perfect, smallest first. The
/// full fix is itself a subset, so for a genuine winner the result is
/// non-empty.
pub fn minimize_fix<H: GenomeHost<Gene = EFix>>(host: &mut H, fix: &EFix) -> Vec<EFix> {
    let entries = fix.to_list();
    let k = entries.len();
    if k >= usize::BITS as usize {
        return vec![fix.clone()];
    }

    let mut passing = Vec::new();
    for mask in 0usize..(1 << k) {
        let subset = EFix::from_list(
            entries
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, entry)| entry.clone())
                .collect(),
        );
        if host.fitness(&subset) == WIN_THRESHOLD {
            passing.push(subset);
        }
    }
    passing.sort_by_key(EFix::len);
    passing
}

#[cfg(test)]
mod tests {
    use super::*;
    use mender_ir::{Expr, SitePath};
    use crate::rng::SearchRng;
    use crate::SearchError;

    /// A host whose fitness is scripted: a fix is perfect iff its sites
    /// include every required site and nothing forbidden.
    struct ScriptedHost {
        rng: SearchRng,
        required: Vec<SitePath>,
    }

    impl GenomeHost for ScriptedHost {
        type Gene = EFix;

        fn rng(&mut self) -> &mut SearchRng {
            &mut self.rng
        }

        fn initial_population(&mut self, _n: usize) -> Result<Vec<EFix>, SearchError> {
            Ok(Vec::new())
        }

        fn crossover(&mut self, a: &EFix, b: &EFix) -> (EFix, EFix) {
            (a.clone(), b.clone())
        }

        fn mutate(&mut self, gene: EFix) -> EFix {
            gene
        }

        fn fitness(&mut self, gene: &EFix) -> f64 {
            let sites: Vec<&SitePath> = gene.sites().collect();
            if self.required.iter().all(|r| sites.contains(&r)) {
                0.0
            } else {
                1.0
            }
        }
    }

    fn entry(step: usize) -> (SitePath, Expr) {
        (SitePath(vec![step]), Expr::var("x"))
    }

    #[test]
    fn test_minimize_keeps_only_perfect_subsets() {
        let mut host = ScriptedHost {
            rng: SearchRng::seeded(0),
            required: vec![SitePath(vec![1])],
        };
        let fix = EFix::from_list(vec![entry(0), entry(1), entry(2)]);
        let minimized = minimize_fix(&mut host, &fix);

        // Every returned subset is perfect and a subset of the input.
        assert!(!minimized.is_empty());
        for subset in &minimized {
            assert_eq!(host.fitness(subset), 0.0);
            for (site, _) in subset.to_list() {
                assert!(fix.to_list().iter().any(|(s, _)| *s == site));
            }
        }
        // Smallest first: the singleton {1}.
        assert_eq!(minimized[0].len(), 1);
        assert!(minimized[0].sites().any(|s| *s == SitePath(vec![1])));
        // 4 subsets contain the required entry: {1}, {0,1}, {1,2}, {0,1,2}.
        assert_eq!(minimized.len(), 4);
    }

    #[test]
    fn test_minimize_requires_both_entries() {
        let mut host = ScriptedHost {
            rng: SearchRng::seeded(0),
            required: vec![SitePath(vec![0]), SitePath(vec![2])],
        };
        let fix = EFix::from_list(vec![entry(0), entry(1), entry(2)]);
        let minimized = minimize_fix(&mut host, &fix);
        assert_eq!(minimized[0].len(), 2);
        assert_eq!(minimized.len(), 2);
    }

    #[test]
    fn test_empty_fix_on_solved_problem() {
        // With nothing required, the empty subset wins and sorts first.
        let mut host = ScriptedHost {
            rng: SearchRng::seeded(0),
            required: vec![],
        };
        let fix = EFix::from_list(vec![entry(0)]);
        let minimized = minimize_fix(&mut host, &fix);
        assert_eq!(minimized[0].len(), 0);
    }
}
