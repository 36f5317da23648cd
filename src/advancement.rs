use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::constants::DEFAULT_PLAYOFF_SEEDS;
use crate::error::{Result, SimError};
use crate::seeding::{StandingsRow, TrialKey};
use crate::win_prob::series_win_prob;

/// A possible series in a round: the higher seed hosts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedMatchup {
    pub home: u32,
    pub away: u32,
}

impl SeedMatchup {
    pub fn new(home: u32, away: u32) -> Self {
        SeedMatchup { home, away }
    }
}

/// One within-league playoff round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundTemplate {
    pub name: String,
    /// Series length; the winner needs `best_of / 2 + 1` wins
    pub best_of: u32,
    /// Every pairing that can occur in this round
    pub matchups: Vec<SeedMatchup>,
    /// Seeds that skip this round
    #[serde(default)]
    pub byes: Vec<u32>,
}

/// Final round between the league champions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChampionshipTemplate {
    pub name: String,
    pub best_of: u32,
}

/// Playoff format, independent of any trial.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketTemplate {
    /// Teams per league that qualify, seeded by league rank
    pub playoff_seeds: u32,
    pub rounds: Vec<RoundTemplate>,
    pub championship: ChampionshipTemplate,
}

impl Default for BracketTemplate {
    fn default() -> Self {
        Self::mlb()
    }
}

impl BracketTemplate {
    /// Twelve-team format: division winners take seeds 1-3, seeds 1 and 2
    /// skip the wild card round, and the bracket is fixed from there on.
    pub fn mlb() -> Self {
        let m = SeedMatchup::new;
        BracketTemplate {
            playoff_seeds: DEFAULT_PLAYOFF_SEEDS,
            rounds: vec![
                RoundTemplate {
                    name: "wild_card".to_string(),
                    best_of: 3,
                    matchups: vec![m(3, 6), m(4, 5)],
                    byes: vec![1, 2],
                },
                RoundTemplate {
                    name: "division_series".to_string(),
                    best_of: 5,
                    matchups: vec![m(1, 4), m(1, 5), m(2, 3), m(2, 6)],
                    byes: vec![],
                },
                RoundTemplate {
                    name: "league_championship".to_string(),
                    best_of: 7,
                    matchups: vec![
                        m(1, 2),
                        m(1, 3),
                        m(1, 6),
                        m(2, 4),
                        m(2, 5),
                        m(3, 4),
                        m(3, 5),
                        m(4, 6),
                        m(5, 6),
                    ],
                    byes: vec![],
                },
            ],
            championship: ChampionshipTemplate {
                name: "world_series".to_string(),
                best_of: 7,
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(SimError::InvalidBracket(msg));

        if self.playoff_seeds == 0 {
            return invalid("playoff_seeds must be positive".to_string());
        }
        if self.rounds.is_empty() {
            return invalid("at least one round is required".to_string());
        }
        if self.championship.best_of % 2 == 0 {
            return invalid(format!(
                "{}: series length {} is not odd",
                self.championship.name, self.championship.best_of
            ));
        }

        let in_field = |seed: u32| (1..=self.playoff_seeds).contains(&seed);
        for (r, round) in self.rounds.iter().enumerate() {
            if round.best_of % 2 == 0 {
                return invalid(format!(
                    "{}: series length {} is not odd",
                    round.name, round.best_of
                ));
            }
            for matchup in &round.matchups {
                if matchup.home == matchup.away {
                    return invalid(format!("{}: seed {} plays itself", round.name, matchup.home));
                }
                if !in_field(matchup.home) || !in_field(matchup.away) {
                    return invalid(format!(
                        "{}: matchup {}v{} outside the playoff field",
                        round.name, matchup.home, matchup.away
                    ));
                }
            }
            if let Some(&seed) = round.byes.iter().find(|&&s| !in_field(s)) {
                return invalid(format!("{}: bye seed {} outside the playoff field", round.name, seed));
            }

            // Opening round pairings all happen, so a seed may appear only once
            if r == 0 {
                let mut seen = HashSet::new();
                let seeds = round
                    .matchups
                    .iter()
                    .flat_map(|m| [m.home, m.away])
                    .chain(round.byes.iter().copied());
                for seed in seeds {
                    if !seen.insert(seed) {
                        return invalid(format!("{}: seed {} appears twice", round.name, seed));
                    }
                }
            }
        }

        Ok(())
    }

    /// Round names, with the championship last
    pub fn round_names(&self) -> Vec<String> {
        self.rounds
            .iter()
            .map(|r| r.name.clone())
            .chain(std::iter::once(self.championship.name.clone()))
            .collect()
    }

    pub fn num_rounds(&self) -> usize {
        self.rounds.len() + 1
    }

    /// Seeds that host or skip the opening round
    pub fn guaranteed_home_seeds(&self) -> HashSet<u32> {
        self.rounds
            .first()
            .map(|round| {
                round
                    .matchups
                    .iter()
                    .map(|m| m.home)
                    .chain(round.byes.iter().copied())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// A playoff team in one trial and its chance of getting through each round.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BracketEntry {
    pub key: TrialKey,
    pub team: String,
    pub league: String,
    pub seed: u32,
    pub rating: f64,
    pub wpct: f64,
    /// `advance[r]` is the probability of winning round `r`; the last entry
    /// is the championship
    pub advance: Vec<f64>,
    /// Probability of hosting at least one game in the opening rounds
    pub p_home_game: f64,
}

impl BracketEntry {
    pub fn advance_past(&self, round: usize) -> f64 {
        self.advance.get(round).copied().unwrap_or(0.0)
    }

    pub fn championship(&self) -> f64 {
        self.advance.last().copied().unwrap_or(0.0)
    }
}

/// Advancement probabilities for every playoff team in every trial.
///
/// Rows may span any number of trials; each trial is computed on its own.
pub fn compute_advancement(rows: &[StandingsRow], template: &BracketTemplate) -> Vec<BracketEntry> {
    let mut by_trial: BTreeMap<TrialKey, Vec<&StandingsRow>> = BTreeMap::new();
    for row in rows.iter().filter(|r| r.lg_rank >= 1 && r.lg_rank <= template.playoff_seeds) {
        by_trial.entry(row.key).or_default().push(row);
    }

    by_trial
        .into_values()
        .flat_map(|field| advance_trial(&field, template))
        .collect()
}

fn advance_trial(field: &[&StandingsRow], template: &BracketTemplate) -> Vec<BracketEntry> {
    let mut entries: Vec<BracketEntry> = field
        .iter()
        .map(|row| BracketEntry {
            key: row.key,
            team: row.team.clone(),
            league: row.league.clone(),
            seed: row.lg_rank,
            rating: row.rating,
            wpct: row.wpct,
            advance: vec![0.0; template.num_rounds()],
            p_home_game: 0.0,
        })
        .collect();
    entries.sort_by(|a, b| a.league.cmp(&b.league).then(a.seed.cmp(&b.seed)));

    let index: HashMap<(String, u32), usize> = entries
        .iter()
        .enumerate()
        .map(|(i, e)| ((e.league.clone(), e.seed), i))
        .collect();
    let mut leagues: Vec<String> = entries.iter().map(|e| e.league.clone()).collect();
    leagues.dedup();

    // Probability of having reached the current round
    let mut reached = vec![1.0; entries.len()];

    for (r, round) in template.rounds.iter().enumerate() {
        let mut next = vec![0.0; entries.len()];
        for league in &leagues {
            for &seed in &round.byes {
                if let Some(&i) = index.get(&(league.clone(), seed)) {
                    next[i] += reached[i];
                }
            }
            for matchup in &round.matchups {
                let (Some(&h), Some(&a)) = (
                    index.get(&(league.clone(), matchup.home)),
                    index.get(&(league.clone(), matchup.away)),
                ) else {
                    continue;
                };
                let likelihood = reached[h] * reached[a];
                let p_home = series_win_prob(round.best_of, entries[h].rating, entries[a].rating);
                next[h] += likelihood * p_home;
                next[a] += likelihood * (1.0 - p_home);
            }
        }
        for (entry, &p) in entries.iter_mut().zip(&next) {
            entry.advance[r] = p;
        }
        reached = next;
    }

    let last = template.rounds.len();
    let mut champion = vec![0.0; entries.len()];
    for i in 0..entries.len() {
        for j in (i + 1)..entries.len() {
            if entries[i].league == entries[j].league {
                continue;
            }
            let likelihood = reached[i] * reached[j];
            if likelihood == 0.0 {
                continue;
            }
            let (h, a) = match home_field(&entries[i], &entries[j]) {
                Ordering::Less => (j, i),
                _ => (i, j),
            };
            let p_home = series_win_prob(
                template.championship.best_of,
                entries[h].rating,
                entries[a].rating,
            );
            champion[h] += likelihood * p_home;
            champion[a] += likelihood * (1.0 - p_home);
        }
    }

    let guaranteed = template.guaranteed_home_seeds();
    for (entry, &p) in entries.iter_mut().zip(&champion) {
        entry.advance[last] = p;
        entry.p_home_game = if guaranteed.contains(&entry.seed) {
            1.0
        } else {
            entry.advance_past(0)
        };
    }

    entries
}

/// `Greater` when `a` hosts: better record, then higher rating, then code.
fn home_field(a: &BracketEntry, b: &BracketEntry) -> Ordering {
    a.wpct
        .total_cmp(&b.wpct)
        .then(a.rating.total_cmp(&b.rating))
        .then(b.team.cmp(&a.team))
}
