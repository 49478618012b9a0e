//! The generation loop: pairing, crossover, mutation, selection, winner
//! extraction, island migration, and the three termination conditions
//! (generations exhausted, wall clock spent, perfect individual found).
//!
//! A single driver loop maintains the populations, the iteration budget,
//! and the accumulated winners; the wall clock is checked between
//! generations only, so an in-flight generation always runs to completion.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::search::genome::GenomeHost;
use crate::search::{GeneticConfig, IslandConfig, TournamentConfig};
use crate::SearchError;

/// Fitness of a perfect individual.
pub const WIN_THRESHOLD: f64 = 0.0;

#[derive(Debug, Clone)]
pub struct SearchOutcome<G> {
    /// Perfect individuals, in discovery order across generations.
    pub winners: Vec<G>,
    /// Generations actually run.
    pub generations: u64,
    pub elapsed: Duration,
}

/// Evolve populations of the host's genome until a termination condition
/// holds. Winners accumulate across generations in discovery order.
pub fn genetic_search<H: GenomeHost>(
    host: &mut H,
    cfg: &GeneticConfig,
) -> Result<SearchOutcome<H::Gene>, SearchError> {
    cfg.validate()?;
    let start = Instant::now();
    let budget = Duration::from_secs(cfg.timeout_minutes.saturating_mul(60));

    let island_count = cfg.island.as_ref().map(|i| i.count).unwrap_or(1);
    let mut islands: Vec<Vec<H::Gene>> = Vec::with_capacity(island_count);
    for _ in 0..island_count {
        islands.push(host.initial_population(cfg.population_size)?);
    }

    let mut winners: Vec<H::Gene> = Vec::new();
    let mut generations = 0u64;

    while generations < cfg.iterations && start.elapsed() < budget {
        generations += 1;
        for island in islands.iter_mut() {
            let population = std::mem::take(island);
            *island = evolve_generation(host, cfg, population);
        }

        // Winner extraction is per-generation: any perfect individual in
        // the surviving population counts, whether or not an equal one was
        // recorded before. Only the returned list deduplicates.
        let mut generation_has_winners = false;
        for island in &islands {
            for gene in island {
                if host.fitness(gene) == WIN_THRESHOLD {
                    generation_has_winners = true;
                    if !winners.contains(gene) {
                        winners.push(gene.clone());
                    }
                }
            }
        }
        debug!(
            generation = generations,
            winners = winners.len(),
            "generation complete"
        );

        if cfg.stop_on_results && !winners.is_empty() {
            break;
        }
        if cfg.replace_winners && generation_has_winners {
            for island in islands.iter_mut() {
                let kept: Vec<H::Gene> = std::mem::take(island)
                    .into_iter()
                    .filter(|g| host.fitness(g) > WIN_THRESHOLD)
                    .collect();
                let deficit = cfg.population_size.saturating_sub(kept.len());
                *island = kept;
                if deficit > 0 {
                    island.extend(host.initial_population(deficit)?);
                }
            }
        }
        if let Some(island_cfg) = &cfg.island {
            if islands.len() > 1 && generations % island_cfg.migration_interval == 0 {
                migrate(host, &mut islands, island_cfg);
            }
        }
    }

    if cfg.try_minimize_fixes {
        let mut minimized: Vec<H::Gene> = Vec::new();
        for winner in winners {
            let best = host
                .minimize(&winner)
                .into_iter()
                .next()
                .unwrap_or(winner);
            if !minimized.contains(&best) {
                minimized.push(best);
            }
        }
        winners = minimized;
    }

    Ok(SearchOutcome {
        winners,
        generations,
        elapsed: start.elapsed(),
    })
}

/// One generation over one population: pair, cross over, mutate, select.
fn evolve_generation<H: GenomeHost>(
    host: &mut H,
    cfg: &GeneticConfig,
    population: Vec<H::Gene>,
) -> Vec<H::Gene> {
    let pairs = match &cfg.tournament {
        Some(tournament) => {
            let champions: Vec<H::Gene> = (0..population.len())
                .map(|_| tournament_pick(host, &population, tournament))
                .collect();
            host.rng().partition_in_pairs(champions)
        }
        None => host.rng().partition_in_pairs(population.clone()),
    };

    let mut children = Vec::with_capacity(population.len());
    for (a, b) in pairs {
        let (x, y) = if host.rng().coin(cfg.crossover_rate) {
            host.crossover(&a, &b)
        } else {
            (a, b)
        };
        children.push(x);
        children.push(y);
    }
    let children: Vec<H::Gene> = children
        .into_iter()
        .map(|child| {
            if host.rng().coin(cfg.mutation_rate) {
                host.mutate(child)
            } else {
                child
            }
        })
        .collect();

    match &cfg.tournament {
        // Tournament pre-selection is the elitism; children replace
        // parents directly.
        Some(_) => children,
        // Environmental selection: parents and children compete, top
        // population_size survive. The stable sort keeps parents ahead of
        // equally fit children.
        None => {
            let mut scored: Vec<(f64, H::Gene)> = population
                .into_iter()
                .chain(children)
                .map(|g| (host.fitness(&g), g))
                .collect();
            scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
            scored
                .into_iter()
                .take(cfg.population_size)
                .map(|(_, g)| g)
                .collect()
        }
    }
}

/// One champion: draw `size` individuals with replacement, keep the
/// fittest; repeat `rounds` times, keeping the running best.
fn tournament_pick<H: GenomeHost>(
    host: &mut H,
    population: &[H::Gene],
    tournament: &TournamentConfig,
) -> H::Gene {
    let mut best: Option<(f64, H::Gene)> = None;
    for _ in 0..tournament.rounds {
        for _ in 0..tournament.size {
            let index = host
                .rng()
                .pick_index(population.len())
                .expect("population is never empty");
            let gene = population[index].clone();
            let score = host.fitness(&gene);
            if best.as_ref().map_or(true, |(b, _)| score < *b) {
                best = Some((score, gene));
            }
        }
    }
    best.expect("tournament draws at least once").1
}

/// Exchange individuals between islands: each island's best leave as
/// migrants, its worst are dropped to make room, and the migrant groups
/// rotate ring-wise or shuffle across islands.
fn migrate<H: GenomeHost>(
    host: &mut H,
    islands: &mut Vec<Vec<H::Gene>>,
    cfg: &IslandConfig,
) {
    let mut migrant_groups: Vec<Vec<H::Gene>> = Vec::with_capacity(islands.len());
    for island in islands.iter_mut() {
        let mut scored: Vec<(f64, H::Gene)> = std::mem::take(island)
            .into_iter()
            .map(|g| (host.fitness(&g), g))
            .collect();
        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        let m = cfg.migration_size.min(scored.len());
        let migrants: Vec<H::Gene> = scored[..m].iter().map(|(_, g)| g.clone()).collect();
        scored.truncate(scored.len() - m);
        *island = scored.into_iter().map(|(_, g)| g).collect();
        migrant_groups.push(migrants);
    }

    if cfg.ringwise {
        migrant_groups.rotate_left(1);
    } else {
        migrant_groups = host.rng().shuffle(migrant_groups);
    }
    for (island, incoming) in islands.iter_mut().zip(migrant_groups) {
        island.extend(incoming);
    }
}
