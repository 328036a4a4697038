use serde::{Deserialize, Serialize};

/// A player's posterior skill: mean and standard deviation of a Gaussian.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Rating {
    pub mu: f64,
    pub sigma: f64,
}

impl Rating {
    pub fn new(mu: f64, sigma: f64) -> Self {
        Self { mu, sigma }
    }

    /// Conservative estimate of skill (mu - 3*sigma).
    pub fn conservative(&self) -> f64 {
        self.mu - 3.0 * self.sigma
    }
}

/// TrueSkill rating environment.
///
/// Holds the global constants of the model. The defaults are the canonical
/// ones: new players start at `mu = 25`, `sigma = 25/3`, per-player
/// performance noise `beta = 25/6`, dynamics `tau = 25/300`, and a 10% draw
/// probability feeding the draw margin.
#[derive(Debug, Clone, Copy)]
pub struct TrueSkill {
    pub mu: f64,
    pub sigma: f64,
    pub beta: f64,
    pub tau: f64,
    pub draw_probability: f64,
}

impl Default for TrueSkill {
    fn default() -> Self {
        let mu = 25.0;
        Self {
            mu,
            sigma: mu / 3.0,
            beta: mu / 6.0,
            tau: mu / 300.0,
            draw_probability: 0.10,
        }
    }
}

impl TrueSkill {
    /// The prior handed to a freshly registered player.
    pub fn default_rating(&self) -> Rating {
        Rating::new(self.mu, self.sigma)
    }

    /// Bayesian update for a decided two-team game.
    ///
    /// `winners` ranked 0, `losers` ranked 1. Each team's performance is the
    /// sum of its players'. Returns the posterior ratings in input order.
    pub fn rate_two_teams(
        &self,
        winners: &[Rating],
        losers: &[Rating],
    ) -> (Vec<Rating>, Vec<Rating>) {
        let tau_sq = self.tau * self.tau;

        // Dynamics: uncertainty grows a little with every played game.
        let win_var: Vec<f64> = winners
            .iter()
            .map(|r| r.sigma * r.sigma + tau_sq)
            .collect();
        let lose_var: Vec<f64> = losers
            .iter()
            .map(|r| r.sigma * r.sigma + tau_sq)
            .collect();

        let player_count = (winners.len() + losers.len()) as f64;
        let sum_var: f64 = win_var.iter().chain(lose_var.iter()).sum();
        let c = (sum_var + player_count * self.beta * self.beta).sqrt();

        let delta: f64 =
            winners.iter().map(|r| r.mu).sum::<f64>() - losers.iter().map(|r| r.mu).sum::<f64>();

        let draw_margin =
            inv_cdf((self.draw_probability + 1.0) / 2.0) * player_count.sqrt() * self.beta;

        let t = delta / c;
        let eps = draw_margin / c;
        let v = v_win(t, eps);
        let w = w_win(t, eps);

        let updated = |mu: f64, var: f64, sign: f64| -> Rating {
            let mu_new = mu + sign * (var / c) * v;
            let sigma_new = (var * (1.0 - (var / (c * c)) * w)).sqrt();
            Rating::new(mu_new, sigma_new)
        };

        let new_winners = winners
            .iter()
            .zip(&win_var)
            .map(|(r, &var)| updated(r.mu, var, 1.0))
            .collect();
        let new_losers = losers
            .iter()
            .zip(&lose_var)
            .map(|(r, &var)| updated(r.mu, var, -1.0))
            .collect();

        (new_winners, new_losers)
    }
}

/// Mean additive truncated-Gaussian correction for a win.
fn v_win(t: f64, eps: f64) -> f64 {
    let x = t - eps;
    let denom = cdf(x);
    if denom > f64::MIN_POSITIVE {
        pdf(x) / denom
    } else {
        -x
    }
}

/// Variance multiplicative truncated-Gaussian correction for a win.
fn w_win(t: f64, eps: f64) -> f64 {
    let x = t - eps;
    let v = v_win(t, eps);
    (v * (v + x)).clamp(0.0, 1.0)
}

fn pdf(x: f64) -> f64 {
    const INV_SQRT_2PI: f64 = 0.398_942_280_401_432_7;
    INV_SQRT_2PI * (-0.5 * x * x).exp()
}

/// Standard normal CDF via the Abramowitz & Stegun 7.1.26 erf polynomial.
fn cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + 0.327_591_1 * x);
    let poly = t
        * (0.254_829_592
            + t * (-0.284_496_736 + t * (1.421_413_741 + t * (-1.453_152_027 + t * 1.061_405_429))));
    sign * (1.0 - poly * (-x * x).exp())
}

/// Inverse standard normal CDF (Acklam's rational approximation).
fn inv_cdf(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_690e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239e0,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838e0,
        -2.549_732_539_343_734e0,
        4.374_664_141_464_968e0,
        2.938_163_982_698_783e0,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996e0,
        3.754_408_661_907_416e0,
    ];
    const P_LOW: f64 = 0.02425;

    debug_assert!(p > 0.0 && p < 1.0);

    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-3;

    #[test]
    fn gaussian_helpers_hit_known_values() {
        assert!((cdf(0.0) - 0.5).abs() < 1e-9);
        assert!((cdf(1.959_964) - 0.975).abs() < 1e-6);
        assert!((inv_cdf(0.975) - 1.959_964).abs() < 1e-5);
        assert!((inv_cdf(0.55) - 0.125_661).abs() < 1e-5);
        assert!((pdf(0.0) - 0.398_942).abs() < 1e-6);
    }

    #[test]
    fn one_v_one_default_update_matches_reference() {
        let env = TrueSkill::default();
        let (w, l) = env.rate_two_teams(&[env.default_rating()], &[env.default_rating()]);
        // Canonical first-game result for the default environment.
        assert!((w[0].mu - 29.396).abs() < EPS, "winner mu {}", w[0].mu);
        assert!((l[0].mu - 20.604).abs() < EPS, "loser mu {}", l[0].mu);
        assert!((w[0].sigma - 7.171).abs() < EPS);
        assert!((l[0].sigma - 7.171).abs() < EPS);
    }

    #[test]
    fn two_v_two_default_update_matches_reference() {
        let env = TrueSkill::default();
        let team = vec![env.default_rating(), env.default_rating()];
        let (w, l) = env.rate_two_teams(&team, &team);
        for r in &w {
            assert!((r.mu - 28.108).abs() < EPS, "winner mu {}", r.mu);
            assert!((r.sigma - 7.774).abs() < EPS, "winner sigma {}", r.sigma);
        }
        for r in &l {
            assert!((r.mu - 21.892).abs() < EPS, "loser mu {}", r.mu);
            assert!((r.sigma - 7.774).abs() < EPS);
        }
    }

    #[test]
    fn upset_moves_ratings_further() {
        let env = TrueSkill::default();
        let favorite = vec![Rating::new(35.0, 5.0), Rating::new(35.0, 5.0)];
        let underdog = vec![Rating::new(20.0, 5.0), Rating::new(20.0, 5.0)];

        let (w_expected, _) = env.rate_two_teams(&favorite, &underdog);
        let (w_upset, _) = env.rate_two_teams(&underdog, &favorite);

        let expected_gain = w_expected[0].mu - 35.0;
        let upset_gain = w_upset[0].mu - 20.0;
        assert!(upset_gain > expected_gain);
    }

    #[test]
    fn sigma_always_shrinks_mu_moves_in_the_right_direction() {
        let env = TrueSkill::default();
        let winners = vec![Rating::new(27.0, 6.0), Rating::new(23.0, 7.5)];
        let losers = vec![Rating::new(25.0, 8.0), Rating::new(26.0, 4.0)];
        let (new_w, new_l) = env.rate_two_teams(&winners, &losers);

        for (old, new) in winners.iter().zip(&new_w) {
            assert!(new.mu > old.mu);
            assert!(new.sigma < old.sigma);
        }
        for (old, new) in losers.iter().zip(&new_l) {
            assert!(new.mu < old.mu);
            assert!(new.sigma < old.sigma);
        }
    }

    #[test]
    fn conservative_rating() {
        let r = Rating::new(25.0, 25.0 / 3.0);
        assert!(r.conservative().abs() < 1e-9);
    }
}
