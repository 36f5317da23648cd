use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::ops::Add;

use crate::error::Result;
use crate::game::{GameResult, PlayedGame, RemainingGame};
use crate::simulator::TrialOutcomes;

/// Win/loss record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub wins: u32,
    pub losses: u32,
}

impl Record {
    pub fn new(wins: u32, losses: u32) -> Self {
        Record { wins, losses }
    }

    pub fn games(&self) -> u32 {
        self.wins + self.losses
    }

    /// Win percentage; a team with no games has 0.0.
    ///
    /// Equal fractions produce identical values, so records can be grouped
    /// on this directly.
    pub fn win_pct(&self) -> f64 {
        if self.games() == 0 {
            0.0
        } else {
            self.wins as f64 / self.games() as f64
        }
    }
}

impl Add for Record {
    type Output = Record;

    fn add(self, other: Record) -> Record {
        Record::new(self.wins + other.wins, self.losses + other.losses)
    }
}

/// Descending win percentage, ties broken by team code.
pub(crate) fn by_win_pct_desc(a: (&str, &Record), b: (&str, &Record)) -> Ordering {
    b.1.win_pct()
        .total_cmp(&a.1.win_pct())
        .then_with(|| a.0.cmp(b.0))
}

/// Per-team records ordered by win percentage, best first.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Standings {
    rows: Vec<(String, Record)>,
}

impl Standings {
    pub fn from_records(records: HashMap<String, Record>) -> Self {
        let mut rows: Vec<(String, Record)> = records.into_iter().collect();
        rows.sort_by(|a, b| by_win_pct_desc((a.0.as_str(), &a.1), (b.0.as_str(), &b.1)));
        Standings { rows }
    }

    /// Standings from game results
    pub fn from_results<'a>(games: impl IntoIterator<Item = &'a GameResult>) -> Self {
        let mut records: HashMap<String, Record> = HashMap::new();
        for game in games {
            records.entry(game.winner.clone()).or_default().wins += 1;
            records.entry(game.loser.clone()).or_default().losses += 1;
        }
        Self::from_records(records)
    }

    pub fn get(&self, team: &str) -> Option<Record> {
        self.rows.iter().find(|(t, _)| t == team).map(|(_, r)| *r)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Record)> {
        self.rows.iter().map(|(t, r)| (t.as_str(), r))
    }

    pub fn teams(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|(t, _)| t.as_str())
    }

    pub fn to_map(&self) -> BTreeMap<String, Record> {
        self.rows.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Current standings from played games
pub fn compute_standings(played: &[PlayedGame]) -> Result<Standings> {
    let results = crate::game::played_results(played)?;
    Ok(Standings::from_results(&results))
}

/// Standings restricted to games played exclusively between `teams`
pub fn h2h_standings<'a, S: AsRef<str>>(
    games: impl IntoIterator<Item = &'a GameResult>,
    teams: &[S],
) -> Standings {
    Standings::from_results(games.into_iter().filter(|g| g.is_between(teams)))
}

/// Season records for one trial: played record plus simulated games.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrialStandings {
    pub trial: u32,
    pub records: BTreeMap<String, Record>,
}

/// Add each trial's simulated wins and losses to the incoming record.
///
/// With no incoming standings (no games played yet) the simulated records
/// stand alone.
pub fn compute_standings_from_results(
    trials: &[TrialOutcomes],
    remaining: &[RemainingGame],
    incoming: Option<&Standings>,
) -> Vec<TrialStandings> {
    let base = incoming.map(Standings::to_map).unwrap_or_default();

    trials
        .iter()
        .map(|outcomes| {
            let mut records = base.clone();
            for (game, &team1_won) in remaining.iter().zip(&outcomes.team1_won) {
                let (winner, loser) = if team1_won {
                    (&game.team1, &game.team2)
                } else {
                    (&game.team2, &game.team1)
                };
                records.entry(winner.clone()).or_default().wins += 1;
                records.entry(loser.clone()).or_default().losses += 1;
            }
            TrialStandings {
                trial: outcomes.trial,
                records,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn played() -> Vec<PlayedGame> {
        vec![
            PlayedGame::new(1, "A", "B", 3, 1),
            PlayedGame::new(2, "A", "C", 2, 5),
            PlayedGame::new(3, "B", "C", 4, 0),
            PlayedGame::new(4, "A", "B", 6, 2),
        ]
    }

    #[test]
    fn test_compute_standings_ordered() {
        let standings = compute_standings(&played()).unwrap();

        let order: Vec<&str> = standings.teams().collect();
        assert_eq!(order, vec!["A", "C", "B"]);
        assert_eq!(standings.get("A"), Some(Record::new(2, 1)));
        assert_eq!(standings.get("B"), Some(Record::new(1, 2)));
        assert!((standings.get("C").unwrap().win_pct() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_h2h_standings_filters_to_group() {
        let results = crate::game::played_results(&played()).unwrap();
        let h2h = h2h_standings(&results, &["A", "B"]);

        assert_eq!(h2h.len(), 2);
        assert_eq!(h2h.get("A"), Some(Record::new(2, 0)));
        assert_eq!(h2h.get("B"), Some(Record::new(0, 2)));
        assert_eq!(h2h.get("C"), None);
    }

    #[test]
    fn test_zero_games_has_zero_pct() {
        assert_eq!(Record::default().win_pct(), 0.0);
        assert_eq!(Record::new(2, 4).win_pct(), Record::new(1, 2).win_pct());
    }

    #[test]
    fn test_standings_from_results_adds_incoming() {
        let incoming = compute_standings(&played()).unwrap();
        let remaining = vec![RemainingGame::new(10, "A", "B"), RemainingGame::new(11, "C", "D")];
        let trials = vec![
            TrialOutcomes::new(0, vec![true, false]),
            TrialOutcomes::new(1, vec![false, true]),
        ];

        let by_trial = compute_standings_from_results(&trials, &remaining, Some(&incoming));

        assert_eq!(by_trial.len(), 2);
        assert_eq!(by_trial[0].records["A"], Record::new(3, 1));
        assert_eq!(by_trial[0].records["D"], Record::new(1, 0));
        assert_eq!(by_trial[1].records["B"], Record::new(2, 2));
        assert_eq!(by_trial[1].records["C"], Record::new(2, 1));
    }

    #[test]
    fn test_standings_from_results_without_incoming() {
        let remaining = vec![RemainingGame::new(10, "A", "B")];
        let trials = vec![TrialOutcomes::new(0, vec![false])];

        let by_trial = compute_standings_from_results(&trials, &remaining, None);

        assert_eq!(by_trial[0].records.len(), 2);
        assert_eq!(by_trial[0].records["B"], Record::new(1, 0));
        assert_eq!(by_trial[0].records["A"], Record::new(0, 1));
    }

    #[test]
    fn test_wins_plus_losses_invariant() {
        let played = played();
        let incoming = compute_standings(&played).unwrap();
        let remaining = vec![
            RemainingGame::new(10, "A", "B"),
            RemainingGame::new(11, "A", "C"),
            RemainingGame::new(12, "B", "C"),
        ];
        let trials: Vec<TrialOutcomes> = (0..8)
            .map(|i| TrialOutcomes::new(i, vec![i & 1 == 0, i & 2 == 0, i & 4 == 0]))
            .collect();

        for trial in compute_standings_from_results(&trials, &remaining, Some(&incoming)) {
            for (team, record) in &trial.records {
                let played_ct = played.iter().filter(|g| &g.team1 == team || &g.team2 == team).count();
                let remaining_ct = remaining.iter().filter(|g| g.involves(team)).count();
                assert_eq!(record.games() as usize, played_ct + remaining_ct);
            }
        }
    }
}
