use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::advancement::{BracketEntry, BracketTemplate};
use crate::seeding::{StandingsRow, TrialKey};
use crate::standings::{by_win_pct_desc, Record, Standings};
use crate::team::LeagueStructure;

/// Totals for one team over every trial seen so far.
///
/// All fields are sums or histograms, so two summaries for the same team
/// merge exactly regardless of how the trials were split into batches.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamSummary {
    pub team: String,
    pub trials: u64,
    pub win_sum: u64,
    pub min_wins: u32,
    pub max_wins: u32,
    /// Final win total -> number of trials
    pub win_counts: BTreeMap<u32, u64>,
    /// `rank_counts[r - 1]` counts trials finishing at league rank `r`;
    /// one slot per team in the league
    pub rank_counts: Vec<u64>,
    pub division_wins: u64,
    pub byes: u64,
    pub playoff_appearances: u64,
    /// Summed probability of getting through each round
    pub round_shares: Vec<f64>,
    pub p_home_game: f64,
}

impl TeamSummary {
    pub fn new(team: impl Into<String>, num_rounds: usize) -> Self {
        TeamSummary {
            team: team.into(),
            round_shares: vec![0.0; num_rounds],
            ..Default::default()
        }
    }

    fn record_wins(&mut self, wins: u32) {
        if self.trials == 0 {
            self.min_wins = wins;
            self.max_wins = wins;
        } else {
            self.min_wins = self.min_wins.min(wins);
            self.max_wins = self.max_wins.max(wins);
        }
        self.trials += 1;
        self.win_sum += wins as u64;
        *self.win_counts.entry(wins).or_default() += 1;
    }

    /// Make sure ranks 1..=`league_size` all have a slot, even at zero
    fn widen_ranks(&mut self, league_size: usize) {
        if self.rank_counts.len() < league_size {
            self.rank_counts.resize(league_size, 0);
        }
    }

    fn record_rank(&mut self, rank: u32) {
        if rank == 0 {
            return;
        }
        let idx = rank as usize - 1;
        if self.rank_counts.len() <= idx {
            self.rank_counts.resize(idx + 1, 0);
        }
        self.rank_counts[idx] += 1;
    }

    fn record_advancement(&mut self, entry: &BracketEntry) {
        if self.round_shares.len() < entry.advance.len() {
            self.round_shares.resize(entry.advance.len(), 0.0);
        }
        for (share, p) in self.round_shares.iter_mut().zip(&entry.advance) {
            *share += p;
        }
        self.p_home_game += entry.p_home_game;
    }

    pub fn mean_wins(&self) -> Option<f64> {
        (self.trials > 0).then(|| self.win_sum as f64 / self.trials as f64)
    }

    /// Median final win total; the mean of the middle pair for an even count
    pub fn median_wins(&self) -> Option<f64> {
        if self.trials == 0 {
            return None;
        }
        let lower = self.nth_wins((self.trials - 1) / 2)?;
        let upper = self.nth_wins(self.trials / 2)?;
        Some((lower as f64 + upper as f64) / 2.0)
    }

    /// Win total at zero-based position `n` in sorted order
    fn nth_wins(&self, n: u64) -> Option<u32> {
        let mut seen = 0;
        for (&wins, &count) in &self.win_counts {
            seen += count;
            if seen > n {
                return Some(wins);
            }
        }
        None
    }

    pub fn rank_count(&self, rank: u32) -> u64 {
        match rank {
            0 => 0,
            r => self.rank_counts.get(r as usize - 1).copied().unwrap_or(0),
        }
    }

    /// Summed advancement probability for a round; 0 for an unknown round
    pub fn share(&self, round: usize) -> f64 {
        self.round_shares.get(round).copied().unwrap_or(0.0)
    }

    pub fn merge(&mut self, other: &TeamSummary) {
        if other.trials > 0 {
            if self.trials == 0 {
                self.min_wins = other.min_wins;
                self.max_wins = other.max_wins;
            } else {
                self.min_wins = self.min_wins.min(other.min_wins);
                self.max_wins = self.max_wins.max(other.max_wins);
            }
        }
        self.trials += other.trials;
        self.win_sum += other.win_sum;
        for (&wins, &count) in &other.win_counts {
            *self.win_counts.entry(wins).or_default() += count;
        }

        if self.rank_counts.len() < other.rank_counts.len() {
            self.rank_counts.resize(other.rank_counts.len(), 0);
        }
        for (mine, theirs) in self.rank_counts.iter_mut().zip(&other.rank_counts) {
            *mine += theirs;
        }

        self.division_wins += other.division_wins;
        self.byes += other.byes;
        self.playoff_appearances += other.playoff_appearances;

        if self.round_shares.len() < other.round_shares.len() {
            self.round_shares.resize(other.round_shares.len(), 0.0);
        }
        for (mine, theirs) in self.round_shares.iter_mut().zip(&other.round_shares) {
            *mine += theirs;
        }
        self.p_home_game += other.p_home_game;
    }
}

/// League-wide summary of one or more batches.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub teams: BTreeMap<String, TeamSummary>,
    pub round_names: Vec<String>,
    /// Distinct trials seen
    pub trials: u64,
}

impl RunSummary {
    /// Summarise one batch of standings rows and bracket entries.
    ///
    /// A team outside the playoff field in a trial simply adds nothing to
    /// its shares for that trial.
    pub fn from_batch(
        rows: &[StandingsRow],
        bracket: &[BracketEntry],
        template: &BracketTemplate,
    ) -> Self {
        let round_names = template.round_names();
        let bye_seeds: HashSet<u32> = template
            .rounds
            .first()
            .map(|r| r.byes.iter().copied().collect())
            .unwrap_or_default();

        let mut per_trial: HashMap<(TrialKey, &str), usize> = HashMap::new();
        for row in rows {
            *per_trial.entry((row.key, row.league.as_str())).or_default() += 1;
        }
        let mut league_sizes: HashMap<&str, usize> = HashMap::new();
        for ((_, league), n) in per_trial {
            let size = league_sizes.entry(league).or_default();
            *size = (*size).max(n);
        }

        let mut teams: BTreeMap<String, TeamSummary> = BTreeMap::new();
        let mut keys: HashSet<TrialKey> = HashSet::new();

        for row in rows {
            keys.insert(row.key);
            let summary = teams
                .entry(row.team.clone())
                .or_insert_with(|| TeamSummary::new(&row.team, round_names.len()));
            summary.widen_ranks(league_sizes.get(row.league.as_str()).copied().unwrap_or(0));
            summary.record_wins(row.wins);
            summary.record_rank(row.lg_rank);
            if row.div_win {
                summary.division_wins += 1;
            }
            if row.lg_rank >= 1 && row.lg_rank <= template.playoff_seeds {
                summary.playoff_appearances += 1;
                if bye_seeds.contains(&row.lg_rank) {
                    summary.byes += 1;
                }
            }
        }

        for entry in bracket {
            teams
                .entry(entry.team.clone())
                .or_insert_with(|| TeamSummary::new(&entry.team, round_names.len()))
                .record_advancement(entry);
        }

        RunSummary {
            teams,
            round_names,
            trials: keys.len() as u64,
        }
    }

    /// Fold another summary into this one. Batches cover disjoint trials.
    pub fn merge(&mut self, other: &RunSummary) {
        if self.round_names.is_empty() {
            self.round_names = other.round_names.clone();
        }
        for (team, summary) in &other.teams {
            self.teams
                .entry(team.clone())
                .or_insert_with(|| TeamSummary::new(team, 0))
                .merge(summary);
        }
        self.trials += other.trials;
    }

    pub fn merge_all<'a>(summaries: impl IntoIterator<Item = &'a RunSummary>) -> Self {
        summaries
            .into_iter()
            .fold(RunSummary::default(), |mut acc, s| {
                acc.merge(s);
                acc
            })
    }

    pub fn team(&self, code: &str) -> Option<&TeamSummary> {
        self.teams.get(code)
    }

    /// Summed share for a named round
    pub fn share(&self, code: &str, round: &str) -> f64 {
        let Some(idx) = self.round_names.iter().position(|r| r == round) else {
            return 0.0;
        };
        self.team(code).map_or(0.0, |t| t.share(idx))
    }
}

/// Teams of one league in one trial, best rank first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeagueOrder {
    pub key: TrialKey,
    pub league: String,
    pub teams: Vec<String>,
}

pub fn ranks_by_trial(rows: &[StandingsRow]) -> Vec<LeagueOrder> {
    let mut groups: BTreeMap<(TrialKey, &str), Vec<&StandingsRow>> = BTreeMap::new();
    for row in rows {
        groups.entry((row.key, row.league.as_str())).or_default().push(row);
    }

    groups
        .into_iter()
        .map(|((key, league), mut members)| {
            members.sort_by_key(|r| r.lg_rank);
            LeagueOrder {
                key,
                league: league.to_string(),
                teams: members.into_iter().map(|r| r.team.clone()).collect(),
            }
        })
        .collect()
}

/// Current standings line with distance from the division leader.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GamesBackRow {
    pub division: String,
    pub team: String,
    pub wins: u32,
    pub losses: u32,
    pub wpct: f64,
    pub games_back: f64,
}

/// Division tables for the current standings, leaders first.
///
/// Teams without a game yet appear as 0-0.
pub fn games_back(structure: &LeagueStructure, standings: &Standings) -> Vec<GamesBackRow> {
    let mut out = Vec::with_capacity(structure.len());

    for division in structure.divisions() {
        let mut records: Vec<(&str, Record)> = structure
            .teams_in_division(&division)
            .map(|t| (t.code.as_str(), standings.get(&t.code).unwrap_or_default()))
            .collect();
        records.sort_by(|a, b| by_win_pct_desc((a.0, &a.1), (b.0, &b.1)));

        let Some(&(_, leader)) = records.first() else {
            continue;
        };
        for (team, record) in records {
            let behind = (leader.wins as f64 - record.wins as f64)
                + (record.losses as f64 - leader.losses as f64);
            out.push(GamesBackRow {
                division: division.clone(),
                team: team.to_string(),
                wins: record.wins,
                losses: record.losses,
                wpct: record.win_pct(),
                games_back: behind / 2.0,
            });
        }
    }

    out
}
