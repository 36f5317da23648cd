use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::advancement::{compute_advancement, BracketEntry};
use crate::clinched::ClinchedTiebreakers;
use crate::config::SimConfig;
use crate::constants::{JOB_SIZE_STEPS, RUN_ID_STRIDE};
use crate::error::{Result, SimError};
use crate::game::{played_results, GameResult, PlayedGame, RemainingGame};
use crate::seeding::{seed_trial, SeedingContext, StandingsRow, TrialKey};
use crate::simulator::simulate_trials;
use crate::standings::{compute_standings_from_results, Standings};
use crate::summary::RunSummary;
use crate::team::LeagueStructure;

/// One unit of work: a job id and the number of trials it owns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchTask {
    pub job_id: u32,
    pub trials: u32,
    /// Base seed; combined with the job id so batches draw independent streams
    pub seed: Option<u64>,
}

impl BatchTask {
    pub fn new(job_id: u32, trials: u32, seed: Option<u64>) -> Self {
        BatchTask {
            job_id,
            trials,
            seed,
        }
    }

    fn rng(&self) -> ChaCha8Rng {
        match self.seed {
            Some(seed) => {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                rng.set_stream(self.job_id as u64);
                rng
            }
            None => ChaCha8Rng::from_entropy(),
        }
    }
}

/// Everything one batch produced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub job_id: u32,
    pub standings: Vec<StandingsRow>,
    pub bracket: Vec<BracketEntry>,
    pub summary: RunSummary,
}

/// Season inputs shared read-only by every batch.
#[derive(Clone, Debug)]
pub struct SeasonState {
    structure: LeagueStructure,
    played: Vec<PlayedGame>,
    remaining: Vec<RemainingGame>,
    config: SimConfig,
    played_results: Vec<GameResult>,
    current: Standings,
    clinched: ClinchedTiebreakers,
}

impl SeasonState {
    /// Validate the inputs and build the per-season tables.
    ///
    /// # Errors
    /// `SimError::UnknownTeam` when a game names a team outside the
    /// structure, `SimError::TeamMissingFromGames` for a structure team with
    /// no played or remaining game, `SimError::TiedScore` for a drawn played
    /// game, and any config validation error.
    pub fn new(
        structure: LeagueStructure,
        played: Vec<PlayedGame>,
        remaining: Vec<RemainingGame>,
        config: SimConfig,
    ) -> Result<Self> {
        config.validate()?;

        let games = played
            .iter()
            .flat_map(|g| [&g.team1, &g.team2])
            .chain(remaining.iter().flat_map(|g| [&g.team1, &g.team2]));
        let mut scheduled = HashSet::new();
        for team in games {
            structure.team(team)?;
            scheduled.insert(team.as_str());
        }
        if let Some(team) = structure.codes().find(|c| !scheduled.contains(c.as_str())) {
            return Err(SimError::TeamMissingFromGames { team: team.clone() });
        }

        let played_results = played_results(&played)?;
        let current = Standings::from_results(&played_results);
        let clinched = ClinchedTiebreakers::from_schedule(&played_results, &remaining, &structure);

        Ok(SeasonState {
            structure,
            played,
            remaining,
            config,
            played_results,
            current,
            clinched,
        })
    }

    /// Add known tiebreak orders, best first, replacing computed ones
    pub fn with_known_tiebreakers<S: AsRef<str>>(mut self, known: &[Vec<S>]) -> Self {
        self.clinched = self.clinched.with_known(known);
        self
    }

    pub fn with_known_tiebreakers_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        self.clinched.read_known_from_file(path)?;
        Ok(self)
    }

    /// Create a modified copy with a team's rating adjusted
    pub fn with_team_adjustment(&self, code: &str, rating_delta: f64) -> Result<Self> {
        let mut new_state = self.clone();
        new_state.structure = self.structure.with_team_adjustment(code, rating_delta)?;
        Ok(new_state)
    }

    pub fn structure(&self) -> &LeagueStructure {
        &self.structure
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn played(&self) -> &[PlayedGame] {
        &self.played
    }

    pub fn remaining(&self) -> &[RemainingGame] {
        &self.remaining
    }

    pub fn current_standings(&self) -> &Standings {
        &self.current
    }

    pub fn clinched(&self) -> &ClinchedTiebreakers {
        &self.clinched
    }

    /// Simulate one batch end to end: games, standings, seeding, bracket.
    pub fn simulate_batch(&self, task: &BatchTask) -> Result<BatchResult> {
        if task.trials == 0 {
            return Err(SimError::InvalidConfig(format!(
                "job {} has no trials",
                task.job_id
            )));
        }
        // Trial indices must stay below the run id stride
        if task.trials as u64 > RUN_ID_STRIDE {
            return Err(SimError::InvalidConfig(format!(
                "job {} has {} trials, more than the {} a run id can hold",
                task.job_id, task.trials, RUN_ID_STRIDE
            )));
        }

        let start = Instant::now();
        debug!(job_id = task.job_id, trials = task.trials, "starting batch");
        let mut rng = task.rng();

        let outcomes = simulate_trials(
            &self.remaining,
            &self.structure.ratings(),
            task.trials,
            0,
            self.config.perturbation,
            &mut rng,
        )?;

        let incoming = (!self.played_results.is_empty()).then_some(&self.current);
        let records = compute_standings_from_results(&outcomes, &self.remaining, incoming);

        let ctx = SeedingContext {
            structure: &self.structure,
            clinched: &self.clinched,
            played: &self.played_results,
        };
        let mut standings = Vec::with_capacity(outcomes.len() * self.structure.len());
        for (trial, trial_records) in outcomes.iter().zip(&records) {
            let simulated = trial.results(&self.remaining);
            let key = TrialKey::new(task.job_id, trial_records.trial);
            standings.extend(seed_trial(
                key,
                &trial_records.records,
                &simulated,
                &ctx,
                &mut rng,
            )?);
        }

        let bracket = compute_advancement(&standings, &self.config.bracket);
        let summary = RunSummary::from_batch(&standings, &bracket, &self.config.bracket);

        info!(
            job_id = task.job_id,
            trials = task.trials,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "finished batch"
        );

        Ok(BatchResult {
            job_id: task.job_id,
            standings,
            bracket,
            summary,
        })
    }

    /// Run batches in parallel. Results come back in task order.
    pub fn run_batches(&self, tasks: &[BatchTask]) -> Vec<Result<BatchResult>> {
        tasks
            .par_iter()
            .map(|task| self.simulate_batch(task))
            .collect()
    }

    /// Run batches in parallel and merge their summaries.
    ///
    /// A batch that fails is logged and left out; the summary covers the
    /// batches that completed.
    pub fn run(&self, tasks: &[BatchTask]) -> RunSummary {
        let start = Instant::now();
        let summaries: Vec<RunSummary> = self
            .run_batches(tasks)
            .into_iter()
            .zip(tasks)
            .filter_map(|(result, task)| match result {
                Ok(batch) => Some(batch.summary),
                Err(e) => {
                    warn!(job_id = task.job_id, error = %e, "dropping failed batch");
                    None
                }
            })
            .collect();

        let summary = RunSummary::merge_all(&summaries);
        info!(
            batches = summaries.len(),
            failed = tasks.len() - summaries.len(),
            trials = summary.trials,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "finished run"
        );
        summary
    }

    /// Tasks for `num_jobs` batches with staggered sizes around the
    /// configured trials per batch.
    pub fn plan_batches<R: Rng>(&self, num_jobs: u32, rng: &mut R) -> Vec<BatchTask> {
        let sizes = job_size_distribution(self.config.trials_per_batch, rng);
        (0..num_jobs)
            .map(|job_id| {
                let trials = sizes[job_id as usize % sizes.len()];
                BatchTask::new(job_id, trials, self.config.seed)
            })
            .collect()
    }
}

/// Largest batch `job_size_distribution` produces for `avg`
pub fn largest_job_size(avg: u32) -> u32 {
    let step = avg / (JOB_SIZE_STEPS + 1);
    avg + (JOB_SIZE_STEPS - 1) / 2 * step
}

/// Batch sizes spread evenly around `avg` so parallel jobs finish at
/// different times.
///
/// The first entry is always `avg`, so a single job runs the requested
/// size, and the whole distribution averages to `avg`.
pub fn job_size_distribution<R: Rng>(avg: u32, rng: &mut R) -> Vec<u32> {
    let step = avg / (JOB_SIZE_STEPS + 1);
    let one_way = largest_job_size(avg) - avg;
    let mut sizes: Vec<u32> = (0..JOB_SIZE_STEPS)
        .map(|i| avg - one_way + i * step)
        .collect();
    sizes.shuffle(rng);
    sizes.insert(0, avg);
    sizes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::team::Team;
    use crate::win_prob::calculate_win_prob;
    use std::collections::HashMap;

    fn four_team_structure() -> LeagueStructure {
        LeagueStructure::new(vec![
            Team::new("A", "LE", "L", 1600.0),
            Team::new("B", "LE", "L", 1500.0),
            Team::new("C", "LE", "L", 1550.0),
            Team::new("D", "LE", "L", 1450.0),
        ])
        .unwrap()
    }

    fn four_team_state(seed: u64) -> SeasonState {
        let remaining = vec![RemainingGame::new(1, "A", "B"), RemainingGame::new(2, "C", "D")];
        SeasonState::new(
            four_team_structure(),
            vec![],
            remaining,
            SimConfig::default().with_seed(seed),
        )
        .unwrap()
    }

    fn two_league_state() -> SeasonState {
        let mut teams = Vec::new();
        for league in ["A", "N"] {
            for div in ["E", "C", "W"] {
                for i in 0..5 {
                    let code = format!("{}{}{}", league, div, i);
                    let rating = 1450.0 + 25.0 * i as f64;
                    teams.push(Team::new(code, format!("{}L{}", league, div), league, rating));
                }
            }
        }
        let structure = LeagueStructure::new(teams).unwrap();
        let codes: Vec<String> = structure.codes().cloned().collect();

        let mut played = Vec::new();
        let mut remaining = Vec::new();
        let mut id = 0;
        for (i, home) in codes.iter().enumerate() {
            for away in &codes[i + 1..] {
                id += 1;
                if id % 3 == 0 {
                    remaining.push(RemainingGame::new(id, home.as_str(), away.as_str()));
                } else {
                    let (s1, s2) = if (id / 3) % 2 == 0 { (5, 2) } else { (1, 4) };
                    played.push(PlayedGame::new(id, home.as_str(), away.as_str(), s1, s2));
                }
            }
        }

        SeasonState::new(structure, played, remaining, SimConfig::default().with_seed(11)).unwrap()
    }

    #[test]
    fn test_four_team_scenario() {
        let state = four_team_state(2024);
        let tasks: Vec<BatchTask> = (0..4).map(|job| BatchTask::new(job, 2_500, Some(2024))).collect();

        let summary = state.run(&tasks);

        assert_eq!(summary.trials, 10_000);
        for team in ["A", "B", "C", "D"] {
            let s = summary.team(team).unwrap();
            assert_eq!(s.rank_counts.iter().sum::<u64>(), 10_000);
            assert_eq!(s.rank_counts.len(), 4);
        }

        // A plays one game, so its mean win total is its win rate
        let a_rate = summary.team("A").unwrap().mean_wins().unwrap();
        assert!((a_rate - calculate_win_prob(1600.0, 1500.0)).abs() < 0.02);
        let c_rate = summary.team("C").unwrap().mean_wins().unwrap();
        assert!((c_rate - calculate_win_prob(1550.0, 1450.0)).abs() < 0.02);
    }

    #[test]
    fn test_batch_rows_respect_game_counts() {
        let state = two_league_state();
        let batch = state.simulate_batch(&BatchTask::new(3, 20, Some(5))).unwrap();

        assert_eq!(batch.standings.len(), 20 * 30);
        for row in &batch.standings {
            let played = state
                .played()
                .iter()
                .filter(|g| g.team1 == row.team || g.team2 == row.team)
                .count();
            let remaining = state.remaining().iter().filter(|g| g.involves(&row.team)).count();
            assert_eq!((row.wins + row.losses) as usize, played + remaining);
            assert_eq!(row.key.job_id, 3);
        }
    }

    #[test]
    fn test_batch_ranks_are_dense_and_divisions_have_one_winner() {
        let state = two_league_state();
        let batch = state.simulate_batch(&BatchTask::new(0, 10, Some(8))).unwrap();

        let mut by_league: HashMap<(TrialKey, &str), Vec<u32>> = HashMap::new();
        let mut div_winners: HashMap<(TrialKey, &str), u32> = HashMap::new();
        for row in &batch.standings {
            by_league.entry((row.key, row.league.as_str())).or_default().push(row.lg_rank);
            *div_winners.entry((row.key, row.division.as_str())).or_default() += row.div_win as u32;
        }
        for ranks in by_league.values_mut() {
            ranks.sort();
            assert_eq!(*ranks, (1..=15).collect::<Vec<u32>>());
        }
        assert!(div_winners.values().all(|&n| n == 1));

        // twelve playoff teams per trial
        assert_eq!(batch.bracket.len(), 10 * 12);
    }

    #[test]
    fn test_seeded_batches_are_reproducible() {
        let state = two_league_state();
        let task = BatchTask::new(1, 5, Some(99));
        assert_eq!(
            state.simulate_batch(&task).unwrap(),
            state.simulate_batch(&task).unwrap()
        );
    }

    #[test]
    fn test_parallel_run_matches_merged_batches() {
        let state = two_league_state();
        let tasks: Vec<BatchTask> = (0..3).map(|job| BatchTask::new(job, 8, Some(4))).collect();

        let merged = RunSummary::merge_all(
            tasks
                .iter()
                .map(|t| state.simulate_batch(t).unwrap().summary)
                .collect::<Vec<_>>()
                .iter(),
        );

        assert_eq!(state.run(&tasks), merged);
    }

    #[test]
    fn test_failed_batch_is_dropped() {
        let state = four_team_state(1);
        let tasks = vec![
            BatchTask::new(0, 50, Some(1)),
            BatchTask::new(1, 0, Some(1)),
            BatchTask::new(2, 50, Some(1)),
        ];

        let results = state.run_batches(&tasks);
        assert!(results[1].is_err());

        let summary = state.run(&tasks);
        assert_eq!(summary.trials, 100);
    }

    #[test]
    fn test_oversized_batch_rejected() {
        let state = four_team_state(1);
        let result = state.simulate_batch(&BatchTask::new(1, 10_001, Some(1)));
        assert!(matches!(result, Err(SimError::InvalidConfig(_))));
        assert_eq!(largest_job_size(7_000), 9_544);
    }

    #[test]
    fn test_no_remaining_games() {
        let played = vec![PlayedGame::new(1, "A", "B", 3, 2), PlayedGame::new(2, "C", "D", 4, 1)];
        let state =
            SeasonState::new(four_team_structure(), played, vec![], SimConfig::default()).unwrap();

        let result = state.simulate_batch(&BatchTask::new(0, 10, Some(1)));
        assert!(matches!(result, Err(SimError::NoRemainingGames)));
        assert_eq!(state.run(&[BatchTask::new(0, 10, None)]).trials, 0);
    }

    #[test]
    fn test_team_without_games_rejected() {
        let played = vec![PlayedGame::new(1, "A", "C", 2, 1)];
        let remaining = vec![RemainingGame::new(2, "A", "B")];
        let result = SeasonState::new(four_team_structure(), played, remaining, SimConfig::default());
        assert!(matches!(result, Err(SimError::TeamMissingFromGames { ref team }) if team == "D"));
    }

    #[test]
    fn test_unknown_team_rejected() {
        let remaining = vec![RemainingGame::new(1, "A", "Z")];
        let result = SeasonState::new(four_team_structure(), vec![], remaining, SimConfig::default());
        assert!(matches!(result, Err(SimError::UnknownTeam { .. })));
    }

    #[test]
    fn test_team_adjustment_shifts_results() {
        let state = four_team_state(7);
        let boosted = state.with_team_adjustment("B", 400.0).unwrap();
        let task = [BatchTask::new(0, 2_000, Some(7))];

        let base = state.run(&task).team("B").unwrap().mean_wins().unwrap();
        let after = boosted.run(&task).team("B").unwrap().mean_wins().unwrap();
        assert!(after > base + 0.2);
        assert!(state.with_team_adjustment("Z", 1.0).is_err());
    }

    #[test]
    fn test_known_tiebreakers_reach_seeding() {
        let played = vec![
            PlayedGame::new(1, "A", "C", 1, 0),
            PlayedGame::new(2, "C", "A", 1, 0),
            PlayedGame::new(3, "B", "D", 1, 0),
            PlayedGame::new(4, "B", "D", 2, 0),
        ];
        let remaining = vec![RemainingGame::new(5, "B", "D")];
        let state = SeasonState::new(four_team_structure(), played, remaining, SimConfig::default())
            .unwrap()
            .with_known_tiebreakers(&[vec!["C", "A"]]);

        let batch = state.simulate_batch(&BatchTask::new(0, 20, Some(3))).unwrap();

        // A and C finish 1-1 in every trial; the known order puts C ahead
        let rank = |key: TrialKey, team: &str| {
            batch
                .standings
                .iter()
                .find(|r| r.key == key && r.team == team)
                .unwrap()
                .lg_rank
        };
        for trial in 0..20 {
            let key = TrialKey::new(0, trial);
            assert_eq!(rank(key, "B"), 1);
            assert!(rank(key, "C") < rank(key, "A"));
        }
    }

    #[test]
    fn test_job_size_distribution() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let sizes = job_size_distribution(100, &mut rng);

        assert_eq!(sizes.len(), 10);
        assert_eq!(sizes[0], 100);
        assert_eq!(sizes.iter().sum::<u32>(), 1000);
        assert_eq!(*sizes.iter().min().unwrap(), 60);
        assert_eq!(*sizes.iter().max().unwrap(), 140);
        assert_eq!(largest_job_size(100), 140);

        assert!(job_size_distribution(5, &mut rng).iter().all(|&s| s == 5));
    }

    #[test]
    fn test_plan_batches_cycles_sizes() {
        let state = four_team_state(1);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let tasks = state.plan_batches(25, &mut rng);

        assert_eq!(tasks.len(), 25);
        assert_eq!(tasks[0].trials, 100);
        assert_eq!(tasks[10].trials, 100);
        assert!(tasks.iter().all(|t| t.seed == Some(1)));
        assert_eq!(tasks[7].job_id, 7);
    }
}
