use crate::model::{Roster, RosterMember};

/// Number of players consumed per formed match.
pub const MATCH_SIZE: usize = 4;

/// A claimed queue row reduced to what the split scoring needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub player_id: String,
    pub mu: f64,
    pub sigma: f64,
}

impl From<Candidate> for RosterMember {
    fn from(c: Candidate) -> Self {
        RosterMember {
            player_id: c.player_id,
            mu: c.mu,
            sigma: c.sigma,
        }
    }
}

/// The chosen 2v2 partition of four claimed players.
#[derive(Debug, Clone)]
pub struct SplitPlan {
    pub roster: Roster,
    pub score: f64,
    pub quality: f64,
}

/// Deterministic 2v2 team splitter.
///
/// Enumerates the three possible partitions of four players and keeps the one
/// with minimal `|mean(muA) - mean(muB)| + beta * (mean(sigmaA) + mean(sigmaB))`.
/// Ties keep the earliest partition in enumeration order, so the result is a
/// pure function of the input order.
#[derive(Debug, Clone, Copy)]
pub struct SplitPlanner {
    pub beta: f64,
}

/// The three 2-2 partitions of indices 0..4, in tie-break order.
const PARTITIONS: [([usize; 2], [usize; 2]); 3] =
    [([0, 1], [2, 3]), ([0, 2], [1, 3]), ([0, 3], [1, 2])];

impl SplitPlanner {
    pub fn new(beta: f64) -> Self {
        Self { beta }
    }

    /// Pick the best split of exactly four candidates, in store return order.
    pub fn plan(&self, four: &[Candidate]) -> SplitPlan {
        assert_eq!(four.len(), MATCH_SIZE, "split requires exactly 4 players");

        let mut best: Option<(usize, f64)> = None;
        for (idx, (a, b)) in PARTITIONS.iter().enumerate() {
            let score = self.score_split(four, a, b);
            match best {
                Some((_, best_score)) if score >= best_score => {}
                _ => best = Some((idx, score)),
            }
        }

        let (idx, score) = best.expect("three partitions were scored");
        let (a, b) = PARTITIONS[idx];
        let roster = Roster {
            team_a: vec![four[a[0]].clone().into(), four[a[1]].clone().into()],
            team_b: vec![four[b[0]].clone().into(), four[b[1]].clone().into()],
        };

        SplitPlan {
            roster,
            score,
            quality: 1.0 / (1.0 + score),
        }
    }

    fn score_split(&self, four: &[Candidate], a: &[usize; 2], b: &[usize; 2]) -> f64 {
        let mean = |idx: &[usize; 2], f: fn(&Candidate) -> f64| {
            (f(&four[idx[0]]) + f(&four[idx[1]])) / 2.0
        };

        let mu_a = mean(a, |c| c.mu);
        let mu_b = mean(b, |c| c.mu);
        let sigma_a = mean(a, |c| c.sigma);
        let sigma_b = mean(b, |c| c.sigma);

        (mu_a - mu_b).abs() + self.beta * (sigma_a + sigma_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(mus: [f64; 4], sigma: f64) -> Vec<Candidate> {
        mus.iter()
            .enumerate()
            .map(|(i, &mu)| Candidate {
                player_id: format!("p{}", i + 1),
                mu,
                sigma,
            })
            .collect()
    }

    fn ids(members: &[RosterMember]) -> Vec<&str> {
        members.iter().map(|m| m.player_id.as_str()).collect()
    }

    #[test]
    fn equal_players_score_and_quality() {
        let planner = SplitPlanner::new(0.1);
        let plan = planner.plan(&candidates([25.0; 4], 8.333));

        // mu diff 0, score = 0.1 * (8.333 + 8.333)
        assert!((plan.score - 1.6666).abs() < 1e-3);
        assert!((plan.quality - 1.0 / (1.0 + 1.6666)).abs() < 1e-3);
        assert!(plan.quality > 0.0 && plan.quality <= 1.0);
    }

    #[test]
    fn equal_players_tie_break_keeps_first_partition() {
        let planner = SplitPlanner::new(0.1);
        let plan = planner.plan(&candidates([25.0; 4], 8.333));
        assert_eq!(ids(&plan.roster.team_a), ["p1", "p2"]);
        assert_eq!(ids(&plan.roster.team_b), ["p3", "p4"]);
    }

    #[test]
    fn pairs_extremes_to_balance_means() {
        // {30,10}|{20,20} has mu diff 0 and beats {30,20}|{10,20} (diff 10).
        let planner = SplitPlanner::new(0.1);
        let plan = planner.plan(&candidates([30.0, 10.0, 20.0, 20.0], 8.333));

        assert_eq!(ids(&plan.roster.team_a), ["p1", "p2"]);
        assert_eq!(ids(&plan.roster.team_b), ["p3", "p4"]);
        assert!((plan.score - 0.1 * (8.333 + 8.333)).abs() < 1e-9);
    }

    #[test]
    fn chosen_score_is_the_minimum_of_all_three() {
        let planner = SplitPlanner::new(0.1);
        let four = candidates([31.0, 18.0, 24.0, 27.0], 6.5);
        let plan = planner.plan(&four);

        for (a, b) in [([0, 1], [2, 3]), ([0, 2], [1, 3]), ([0, 3], [1, 2])] {
            let score = planner.score_split(&four, &a, &b);
            assert!(plan.score <= score + 1e-12);
        }
    }

    #[test]
    fn zero_beta_ignores_uncertainty() {
        let planner = SplitPlanner::new(0.0);
        let plan = planner.plan(&candidates([25.0; 4], 100.0));
        assert!((plan.score).abs() < 1e-12);
        assert!((plan.quality - 1.0).abs() < 1e-12);
    }
}
