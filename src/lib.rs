//! Pennant Core - Monte Carlo simulation of a league's remaining season.
//!
//! Simulates the remaining schedule from team ratings, builds each trial's
//! final standings, breaks ties, seeds the playoff field, and computes
//! every playoff team's chance of getting through each round. Batches run
//! in parallel and merge into one summary.
//!
//! Python bindings are available behind the `python` feature.

pub mod advancement;
pub mod clinched;
pub mod config;
pub mod constants;
pub mod error;
pub mod game;
pub mod season;
pub mod seeding;
pub mod simulator;
pub mod standings;
pub mod summary;
pub mod team;
pub mod tiebreak;
pub mod win_prob;

#[cfg(feature = "python")]
mod python;

pub use advancement::{compute_advancement, BracketEntry, BracketTemplate, RoundTemplate, SeedMatchup};
pub use clinched::ClinchedTiebreakers;
pub use config::SimConfig;
pub use error::{Result, SimError};
pub use game::{GameResult, PlayedGame, RemainingGame};
pub use season::{job_size_distribution, BatchResult, BatchTask, SeasonState};
pub use seeding::{seed_trial, StandingsRow, TrialKey};
pub use simulator::{simulate_trials, RatingPerturbation, TrialOutcomes};
pub use standings::{compute_standings, compute_standings_from_results, h2h_standings, Record, Standings};
pub use summary::{games_back, ranks_by_trial, RunSummary, TeamSummary};
pub use team::{LeagueStructure, Team};
pub use tiebreak::{Criterion, Resolution, TieBreak, TieBreaker};
pub use win_prob::{calculate_win_prob, elo_from_win_pct, series_win_prob};
