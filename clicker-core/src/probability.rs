use rand::Rng;

/// Weighted outcome table sampled with a single uniform draw in `[0, 1)`.
///
/// Weights are walked in listing order and accumulated; the first outcome
/// whose cumulative weight is `>=` the draw wins, so a draw sitting exactly on
/// a boundary resolves to the earlier outcome. When the weights sum to less
/// than the draw (an under-specified table, or float rounding just below 1.0)
/// the last listed outcome is returned.
#[derive(Debug, Clone, Copy)]
pub struct ProbabilityTable<'a, T> {
    outcomes: &'a [(T, f64)],
}

impl<'a, T> ProbabilityTable<'a, T> {
    /// # Panics
    ///
    /// Panics if `outcomes` is empty. In a `const` item this is a compile error.
    pub const fn new(outcomes: &'a [(T, f64)]) -> Self {
        assert!(!outcomes.is_empty(), "probability table needs at least one outcome");
        Self { outcomes }
    }

    pub fn try_new(outcomes: &'a [(T, f64)]) -> Option<Self> {
        if outcomes.is_empty() {
            None
        } else {
            Some(Self { outcomes })
        }
    }

    pub fn resolve(&self, draw: f64) -> &'a T {
        let mut cumulative = 0.0;
        for (outcome, weight) in self.outcomes {
            cumulative += weight;
            if draw <= cumulative {
                return outcome;
            }
        }

        // Non-empty by construction
        &self.outcomes[self.outcomes.len() - 1].0
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> &'a T {
        self.resolve(rng.r#gen::<f64>())
    }

    pub fn total_weight(&self) -> f64 {
        self.outcomes.iter().map(|(_, weight)| weight).sum()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Upper cumulative boundary of every outcome, in listing order.
    pub fn boundaries(&self) -> Vec<f64> {
        self.outcomes
            .iter()
            .scan(0.0, |cumulative, (_, weight)| {
                *cumulative += weight;
                Some(*cumulative)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const COLORS: ProbabilityTable<'static, &str> =
        ProbabilityTable::new(&[("red", 0.5), ("green", 0.3), ("blue", 0.2)]);

    // Sums to 0.9, leaving a residual bucket.
    const SHORT: ProbabilityTable<'static, &str> =
        ProbabilityTable::new(&[("a", 0.4), ("b", 0.3), ("c", 0.2)]);

    #[test]
    fn test_draw_selects_band_by_cumulative_weight() {
        assert_eq!(*COLORS.resolve(0.0), "red");
        assert_eq!(*COLORS.resolve(0.49), "red");
        assert_eq!(*COLORS.resolve(0.51), "green");
        assert_eq!(*COLORS.resolve(0.79), "green");
        assert_eq!(*COLORS.resolve(0.81), "blue");
        assert_eq!(*COLORS.resolve(0.999_999), "blue");
    }

    #[test]
    fn test_boundary_draw_resolves_to_earlier_outcome() {
        assert_eq!(*COLORS.resolve(0.5), "red");
        let boundaries = COLORS.boundaries();
        assert_eq!(*COLORS.resolve(boundaries[1]), "green");
    }

    #[test]
    fn test_band_membership_matches_boundaries() {
        let boundaries = COLORS.boundaries();
        let outcomes = ["red", "green", "blue"];
        for step in 0..1000 {
            let draw = step as f64 / 1000.0;
            let expected = boundaries
                .iter()
                .position(|upper| draw <= *upper)
                .unwrap_or(outcomes.len() - 1);
            assert_eq!(*COLORS.resolve(draw), outcomes[expected], "draw {draw}");
        }
    }

    #[test]
    fn test_residual_mass_falls_back_to_last_outcome() {
        assert!((SHORT.total_weight() - 0.9).abs() < 1e-9);
        assert_eq!(*SHORT.resolve(0.85), "c");
        assert_eq!(*SHORT.resolve(0.95), "c");
        assert_eq!(*SHORT.resolve(0.999_999_999), "c");
    }

    #[test]
    fn test_single_outcome_always_wins() {
        let only = ProbabilityTable::new(&[("only", 0.0)]);
        assert_eq!(*only.resolve(0.0), "only");
        assert_eq!(*only.resolve(0.7), "only");
    }

    #[test]
    fn test_try_new_rejects_empty_table() {
        let empty: &[(u8, f64)] = &[];
        assert!(ProbabilityTable::try_new(empty).is_none());
        assert!(ProbabilityTable::try_new(&[(1u8, 1.0)]).is_some());
    }

    #[test]
    fn test_sampling_frequencies_converge_to_weights() {
        let mut rng = StdRng::seed_from_u64(7);
        let draws = 100_000;
        let mut counts = [0usize; 3];
        for _ in 0..draws {
            match *COLORS.sample(&mut rng) {
                "red" => counts[0] += 1,
                "green" => counts[1] += 1,
                _ => counts[2] += 1,
            }
        }
        let expected = [0.5, 0.3, 0.2];
        for (count, weight) in counts.iter().zip(expected) {
            let frequency = *count as f64 / draws as f64;
            assert!((frequency - weight).abs() < 0.01, "{frequency} vs {weight}");
        }
    }
}
