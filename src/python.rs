use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;

use crate::config::SimConfig;
use crate::error::SimError;
use crate::game::{PlayedGame, RemainingGame};
use crate::season::SeasonState;
use crate::summary::{RunSummary, TeamSummary};
use crate::team::{LeagueStructure, Team};
use crate::win_prob;

impl From<SimError> for PyErr {
    fn from(err: SimError) -> PyErr {
        match err {
            SimError::Io(e) => PyIOError::new_err(e.to_string()),
            other => PyValueError::new_err(other.to_string()),
        }
    }
}

/// Season simulation handle.
///
/// Teams are `(code, division, league, rating)` tuples, played games
/// `(game_id, team1, team2, score1, score2)` and remaining games
/// `(game_id, team1, team2)`.
#[pyclass(name = "Season")]
#[derive(Clone)]
pub struct PySeason {
    state: SeasonState,
}

#[pymethods]
impl PySeason {
    #[new]
    #[pyo3(signature = (teams, played, remaining, config_json = None))]
    fn new(
        teams: Vec<(String, String, String, f64)>,
        played: Vec<(u64, String, String, u32, u32)>,
        remaining: Vec<(u64, String, String)>,
        config_json: Option<&str>,
    ) -> PyResult<Self> {
        let structure = LeagueStructure::new(
            teams
                .into_iter()
                .map(|(code, division, league, rating)| Team::new(code, division, league, rating)),
        )?;
        let played = played
            .into_iter()
            .map(|(id, t1, t2, s1, s2)| PlayedGame::new(id, t1, t2, s1, s2))
            .collect();
        let remaining = remaining
            .into_iter()
            .map(|(id, t1, t2)| RemainingGame::new(id, t1, t2))
            .collect();
        let config = match config_json {
            Some(json) => SimConfig::from_json_str(json)?,
            None => SimConfig::default(),
        };

        Ok(PySeason {
            state: SeasonState::new(structure, played, remaining, config)?,
        })
    }

    /// Run `num_jobs` batches and return per-team summary statistics.
    #[pyo3(signature = (num_jobs, seed = None))]
    fn run(
        &self,
        py: Python<'_>,
        num_jobs: u32,
        seed: Option<u64>,
    ) -> HashMap<String, HashMap<String, f64>> {
        let mut rng = match seed {
            Some(s) => ChaCha8Rng::seed_from_u64(s),
            None => ChaCha8Rng::from_entropy(),
        };
        let tasks = self.state.plan_batches(num_jobs, &mut rng);
        let summary = py.allow_threads(|| self.state.run(&tasks));
        summary_to_dicts(&summary)
    }

    /// Current standings as `(team, wins, losses)`, best first
    fn current_standings(&self) -> Vec<(String, u32, u32)> {
        self.state
            .current_standings()
            .iter()
            .map(|(team, r)| (team.to_string(), r.wins, r.losses))
            .collect()
    }

    /// Add known tiebreak orders, best first
    fn add_known_tiebreakers(&mut self, orders: Vec<Vec<String>>) {
        self.state = self.state.clone().with_known_tiebreakers(&orders);
    }

    /// Create a modified copy with a team's rating adjusted
    fn with_team_adjustment(&self, code: &str, rating_delta: f64) -> PyResult<Self> {
        Ok(PySeason {
            state: self.state.with_team_adjustment(code, rating_delta)?,
        })
    }

    fn __repr__(&self) -> String {
        format!(
            "Season({} teams, {} played, {} remaining)",
            self.state.structure().len(),
            self.state.played().len(),
            self.state.remaining().len()
        )
    }
}

fn team_to_dict(summary: &TeamSummary, round_names: &[String]) -> HashMap<String, f64> {
    let trials = summary.trials.max(1) as f64;
    let mut out = HashMap::new();
    out.insert("trials".to_string(), summary.trials as f64);
    out.insert("mean_wins".to_string(), summary.mean_wins().unwrap_or(0.0));
    out.insert("median_wins".to_string(), summary.median_wins().unwrap_or(0.0));
    out.insert("min_wins".to_string(), summary.min_wins as f64);
    out.insert("max_wins".to_string(), summary.max_wins as f64);
    out.insert("division_wins".to_string(), summary.division_wins as f64 / trials);
    out.insert("byes".to_string(), summary.byes as f64 / trials);
    out.insert("playoffs".to_string(), summary.playoff_appearances as f64 / trials);
    out.insert("p_home_game".to_string(), summary.p_home_game / trials);
    for (i, name) in round_names.iter().enumerate() {
        out.insert(name.clone(), summary.share(i) / trials);
    }
    for rank in 1..=summary.rank_counts.len() as u32 {
        out.insert(format!("r{}", rank), summary.rank_count(rank) as f64);
    }
    out
}

fn summary_to_dicts(summary: &RunSummary) -> HashMap<String, HashMap<String, f64>> {
    summary
        .teams
        .iter()
        .map(|(team, s)| (team.clone(), team_to_dict(s, &summary.round_names)))
        .collect()
}

/// Single-game win probability for a rating pair.
#[pyfunction]
fn calculate_win_prob(rating1: f64, rating2: f64) -> f64 {
    win_prob::calculate_win_prob(rating1, rating2)
}

/// Probability the home-seeded team wins a best-of-N series.
#[pyfunction]
fn series_win_prob(best_of: u32, rating_home: f64, rating_away: f64) -> f64 {
    win_prob::series_win_prob(best_of, rating_home, rating_away)
}

/// Convert a projected win percentage to the rating scale.
#[pyfunction]
fn elo_from_win_pct(win_pct: f64) -> f64 {
    win_prob::elo_from_win_pct(win_pct)
}

/// Python module definition
#[pymodule]
fn pennant_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PySeason>()?;

    m.add_function(wrap_pyfunction!(calculate_win_prob, m)?)?;
    m.add_function(wrap_pyfunction!(series_win_prob, m)?)?;
    m.add_function(wrap_pyfunction!(elo_from_win_pct, m)?)?;

    m.add("ELO_SCALE", crate::constants::ELO_SCALE)?;
    m.add("DEFAULT_PLAYOFF_SEEDS", crate::constants::DEFAULT_PLAYOFF_SEEDS)?;

    Ok(())
}
