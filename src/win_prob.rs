use statrs::function::factorial::binomial;

use crate::constants::{ELO_AT_ZERO_WIN_PCT, ELO_PER_WIN_PCT, ELO_SCALE};

/// Calculate the probability of team1 beating team2 in a single game.
///
/// Uses the logistic ELO curve on the rating difference, so
/// `p(r1, r2) == 1 - p(r2, r1)`.
///
/// # Arguments
/// * `rating1` - First team's rating
/// * `rating2` - Second team's rating
///
/// # Returns
/// Probability of team1 winning (0.0-1.0)
pub fn calculate_win_prob(rating1: f64, rating2: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf(-(rating1 - rating2) / ELO_SCALE))
}

/// Wins needed to take a best-of-`best_of` series
pub fn wins_needed(best_of: u32) -> u32 {
    best_of / 2 + 1
}

/// Calculate the probability of the home team winning a best-of-N series.
///
/// Each game is an independent trial at the single-game probability. The
/// home team takes the series when it reaches `k` wins before the opponent,
/// i.e. after losing `j < k` games:
///
/// `P = sum_{j=0}^{k-1} C(k-1+j, j) p^k (1-p)^j`
///
/// The result is 0.5 at zero rating gap and grows with `best_of` for a
/// favoured home team.
pub fn series_win_prob(best_of: u32, rating_home: f64, rating_away: f64) -> f64 {
    let p = calculate_win_prob(rating_home, rating_away);
    let q = 1.0 - p;
    let k = wins_needed(best_of.max(1));

    let p_k = p.powi(k as i32);
    (0..k)
        .map(|j| binomial((k - 1 + j) as u64, j as u64) * p_k * q.powi(j as i32))
        .sum()
}

/// Convert a projected win percentage to a rating on the ELO scale.
pub fn elo_from_win_pct(win_pct: f64) -> f64 {
    win_pct * ELO_PER_WIN_PCT + ELO_AT_ZERO_WIN_PCT
}
