use rand::distributions::Distribution;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;
use std::collections::HashMap;

use crate::constants::PERTURBATION_OFFSETS;
use crate::error::{Result, SimError};
use crate::game::{GameResult, RemainingGame};
use crate::win_prob::calculate_win_prob;

/// Noise added to team ratings once per trial to model rating uncertainty.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RatingPerturbation {
    #[default]
    None,

    /// Shift each rating by `-magnitude`, `+magnitude`, or nothing
    Offsets { magnitude: f64 },

    /// Add zero-mean Gaussian noise
    Normal { std_dev: f64 },
}

impl RatingPerturbation {
    pub fn is_enabled(&self) -> bool {
        match self {
            RatingPerturbation::None => false,
            RatingPerturbation::Offsets { magnitude } => *magnitude != 0.0,
            RatingPerturbation::Normal { std_dev } => *std_dev != 0.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            RatingPerturbation::None => Ok(()),
            RatingPerturbation::Offsets { magnitude } if magnitude.is_finite() => Ok(()),
            RatingPerturbation::Normal { std_dev } if std_dev.is_finite() && *std_dev >= 0.0 => {
                Ok(())
            }
            other => Err(SimError::InvalidConfig(format!(
                "invalid rating perturbation: {:?}",
                other
            ))),
        }
    }
}

/// Simulated outcome of every remaining game in one trial.
///
/// `team1_won[i]` is the result of the i-th remaining game in schedule order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialOutcomes {
    pub trial: u32,
    pub team1_won: Vec<bool>,
}

impl TrialOutcomes {
    pub fn new(trial: u32, team1_won: Vec<bool>) -> Self {
        TrialOutcomes { trial, team1_won }
    }

    /// Winner/loser form of this trial's games
    pub fn results(&self, remaining: &[RemainingGame]) -> Vec<GameResult> {
        remaining
            .iter()
            .zip(&self.team1_won)
            .map(|(game, &team1_won)| game.result(team1_won))
            .collect()
    }
}

/// Team1's win probability for each remaining game.
pub fn compute_win_probs(
    remaining: &[RemainingGame],
    ratings: &HashMap<String, f64>,
) -> Result<Vec<f64>> {
    let rating = |team: &String| {
        ratings
            .get(team)
            .copied()
            .ok_or_else(|| SimError::MissingRating { team: team.clone() })
    };

    remaining
        .iter()
        .map(|game| Ok(calculate_win_prob(rating(&game.team1)?, rating(&game.team2)?)))
        .collect()
}

/// Apply one draw of rating noise to every team.
pub fn perturb_ratings<R: Rng>(
    ratings: &HashMap<String, f64>,
    perturbation: RatingPerturbation,
    rng: &mut R,
) -> Result<HashMap<String, f64>> {
    // Draw in code order so a seeded rng gives the same ratings every run
    let mut codes: Vec<&String> = ratings.keys().collect();
    codes.sort();

    match perturbation {
        RatingPerturbation::None => Ok(ratings.clone()),
        RatingPerturbation::Offsets { magnitude } => Ok(codes
            .into_iter()
            .map(|code| {
                let offset = PERTURBATION_OFFSETS.choose(rng).copied().unwrap_or(0.0);
                (code.clone(), ratings[code] + offset * magnitude)
            })
            .collect()),
        RatingPerturbation::Normal { std_dev } => {
            let normal = Normal::new(0.0, std_dev)
                .map_err(|e| SimError::InvalidConfig(format!("rating noise: {}", e)))?;
            Ok(codes
                .into_iter()
                .map(|code| (code.clone(), ratings[code] + normal.sample(rng)))
                .collect())
        }
    }
}

/// Decide one game: team1 wins when the draw falls below its win probability.
pub fn simulate_game<R: Rng>(team1_win_prob: f64, rng: &mut R) -> bool {
    rng.gen::<f64>() < team1_win_prob
}

/// Simulate the remaining schedule `num_trials` times.
///
/// Trials are numbered from `first_trial`. Without perturbation the win
/// probabilities are computed once; with it, each trial perturbs the
/// ratings once and every game in that trial uses the perturbed set.
///
/// # Errors
/// `SimError::NoRemainingGames` when the schedule is empty, and
/// `SimError::MissingRating` when a scheduled team has no rating.
pub fn simulate_trials<R: Rng>(
    remaining: &[RemainingGame],
    ratings: &HashMap<String, f64>,
    num_trials: u32,
    first_trial: u32,
    perturbation: RatingPerturbation,
    rng: &mut R,
) -> Result<Vec<TrialOutcomes>> {
    if remaining.is_empty() {
        return Err(SimError::NoRemainingGames);
    }

    let fixed_probs = if perturbation.is_enabled() {
        None
    } else {
        Some(compute_win_probs(remaining, ratings)?)
    };

    let mut trials = Vec::with_capacity(num_trials as usize);
    for i in 0..num_trials {
        let perturbed_probs;
        let probs = match &fixed_probs {
            Some(probs) => probs,
            None => {
                let perturbed = perturb_ratings(ratings, perturbation, rng)?;
                perturbed_probs = compute_win_probs(remaining, &perturbed)?;
                &perturbed_probs
            }
        };

        let team1_won = probs.iter().map(|&p| simulate_game(p, rng)).collect();
        trials.push(TrialOutcomes::new(first_trial + i, team1_won));
    }

    Ok(trials)
}
