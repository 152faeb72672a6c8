//! Rank propagation and the rank-to-cost transform
//!
//! Every category starts with one credit plus one credit per member page.
//! Credit is then pushed along one adjacency direction with a PageRank-style
//! power iteration. Mass handed to categories without out-links is dropped,
//! so ranks sum to at most 1 and every rank stays strictly inside `(0, 1)`.

use crate::types::{CategoryGraphConfig, PropagationDirection};
use tracing::debug;

/// Result of a rank propagation run
#[derive(Debug, Clone)]
pub struct PropagationResult {
    /// Final rank per dense category index
    pub ranks: Vec<f64>,
    /// Total absolute change after each round
    pub errors: Vec<f64>,
    /// Number of rounds performed
    pub iterations: usize,
    /// Whether the error reached exactly zero before the round limit
    pub converged: bool,
}

impl PropagationResult {
    /// Error of the last round (infinity if no round ran)
    pub fn final_error(&self) -> f64 {
        self.errors.last().copied().unwrap_or(f64::INFINITY)
    }
}

/// Seed ranks: `(1 + pages[i]) / (num_categories + sum(pages))`
pub fn seed_ranks(page_counts: &[usize]) -> Vec<f64> {
    let total_credits = page_counts.len() + page_counts.iter().sum::<usize>();
    if total_credits == 0 {
        return Vec::new();
    }
    let total = total_credits as f64;
    page_counts
        .iter()
        .map(|&pages| (1 + pages) as f64 / total)
        .collect()
}

/// Power-iteration rank propagation over the category graph
#[derive(Debug, Clone)]
pub struct RankPropagation {
    damping: f64,
    max_iterations: usize,
    direction: PropagationDirection,
}

impl Default for RankPropagation {
    fn default() -> Self {
        Self::new()
    }
}

impl RankPropagation {
    /// Create with damping 0.85, 20 rounds, credit flowing to parents
    pub fn new() -> Self {
        Self {
            damping: 0.85,
            max_iterations: 20,
            direction: PropagationDirection::Parents,
        }
    }

    /// Create from a graph config
    pub fn from_config(config: &CategoryGraphConfig) -> Self {
        Self {
            damping: config.damping,
            max_iterations: config.max_iterations,
            direction: config.direction,
        }
    }

    /// Set the damping factor
    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    /// Set the maximum number of rounds
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Direction credit flows in
    pub fn direction(&self) -> PropagationDirection {
        self.direction
    }

    /// Run the iteration. `out_links[i]` lists the categories `i` hands
    /// credit to (its parents or children, per the configured direction).
    pub fn run(&self, seed: Vec<f64>, out_links: &[Vec<u32>]) -> PropagationResult {
        let n = seed.len();
        if n == 0 {
            return PropagationResult {
                ranks: seed,
                errors: Vec::new(),
                iterations: 0,
                converged: true,
            };
        }

        let teleport = (1.0 - self.damping) / n as f64;
        let mut ranks = seed;
        let mut next = vec![0.0; n];
        let mut errors = Vec::with_capacity(self.max_iterations);
        let mut converged = false;

        for round in 0..self.max_iterations {
            next.fill(teleport);
            for (i, links) in out_links.iter().enumerate() {
                if links.is_empty() {
                    continue;
                }
                let share = self.damping * ranks[i] / links.len() as f64;
                for &j in links {
                    next[j as usize] += share;
                }
            }

            let error: f64 = ranks
                .iter()
                .zip(next.iter())
                .map(|(old, new)| (old - new).abs())
                .sum();
            std::mem::swap(&mut ranks, &mut next);
            errors.push(error);
            debug!(round, error, "rank propagation round");

            if error == 0.0 {
                converged = true;
                break;
            }
        }

        PropagationResult {
            iterations: errors.len(),
            ranks,
            errors,
            converged,
        }
    }
}

/// Transform ranks into traversal costs with `1 / -ln(r)`
pub fn ranks_to_costs(ranks: &[f64]) -> Vec<f64> {
    ranks.iter().map(|&r| 1.0 / -r.ln()).collect()
}

/// Smallest cost, or infinity for an empty slice
pub fn min_cost(costs: &[f64]) -> f64 {
    costs.iter().copied().fold(f64::INFINITY, f64::min)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_ranks() {
        // Chain A -> B -> C with one page under C.
        let seed = seed_ranks(&[0, 0, 1]);
        assert_eq!(seed, vec![0.25, 0.25, 0.5]);
        assert!(seed_ranks(&[]).is_empty());
    }

    #[test]
    fn test_propagation_chain() {
        // Dense indices: 0 = A, 1 = B, 2 = C; parents: B -> A, C -> B.
        let parents = vec![vec![], vec![0], vec![1]];
        let result = RankPropagation::new().run(seed_ranks(&[0, 0, 1]), &parents);

        assert!(result.iterations <= 20);
        assert!(result.ranks.iter().all(|&r| r > 0.0 && r < 1.0));
        // Credit accumulates toward the root.
        assert!(result.ranks[0] > result.ranks[2]);
        let sum: f64 = result.ranks.iter().sum();
        assert!(sum <= 1.0 + 1e-12);
    }

    #[test]
    fn test_error_non_increasing() {
        let parents = vec![vec![], vec![0], vec![0], vec![1, 2], vec![3], vec![3, 1]];
        let result = RankPropagation::new()
            .with_max_iterations(20)
            .run(seed_ranks(&[0, 2, 1, 0, 5, 3]), &parents);
        for pair in result.errors.windows(2) {
            assert!(pair[1] <= pair[0] + 1e-15, "errors: {:?}", result.errors);
        }
    }

    #[test]
    fn test_no_links_converges_immediately_after_teleport() {
        // Without links every category collapses to the teleport mass.
        let result = RankPropagation::new().run(seed_ranks(&[0, 0]), &[vec![], vec![]]);
        assert!(result.converged);
        assert_eq!(result.iterations, 2);
        assert!((result.ranks[0] - 0.075).abs() < 1e-12);
    }

    #[test]
    fn test_costs_from_ranks() {
        let costs = ranks_to_costs(&[0.1, 0.01]);
        assert!((costs[0] - 1.0 / 10f64.ln()).abs() < 1e-12);
        // Higher rank means higher cost.
        assert!(costs[0] > costs[1]);
        assert!((min_cost(&costs) - costs[1]).abs() < 1e-15);
        assert_eq!(min_cost(&[]), f64::INFINITY);
    }
}
