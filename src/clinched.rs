use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::debug;

use crate::error::{Result, SimError};
use crate::game::{count_games_between, GameResult, RemainingGame};
use crate::standings::h2h_standings;
use crate::team::LeagueStructure;

/// Tiebreak orders that are already decided before any trial is simulated.
///
/// Orders are stored under the sorted team set, so lookups do not depend on
/// the order the tied teams are supplied in. The table is built once per
/// batch and only read while trials run.
#[derive(Clone, Debug, Default)]
pub struct ClinchedTiebreakers {
    orders: HashMap<Vec<String>, Vec<String>>,
}

fn key<S: AsRef<str>>(teams: &[S]) -> Vec<String> {
    let mut key: Vec<String> = teams.iter().map(|t| t.as_ref().to_string()).collect();
    key.sort();
    key
}

impl ClinchedTiebreakers {
    pub fn new() -> Self {
        ClinchedTiebreakers {
            orders: HashMap::new(),
        }
    }

    /// Find every same-league pair whose head-to-head season series is
    /// already decided.
    ///
    /// A pair is clinched when the leader's head-to-head margin (wins minus
    /// losses) exceeds the number of head-to-head games left, so no trial
    /// can overturn it.
    pub fn from_schedule(
        played: &[GameResult],
        remaining: &[RemainingGame],
        structure: &LeagueStructure,
    ) -> Self {
        let mut table = ClinchedTiebreakers::new();

        for league in structure.leagues() {
            let codes: Vec<&str> = structure
                .teams_in_league(&league)
                .map(|t| t.code.as_str())
                .collect();
            for (i, &team1) in codes.iter().enumerate() {
                for &team2 in &codes[i + 1..] {
                    let pair = [team1, team2];
                    if let Some(order) = Self::check_pair(played, remaining, &pair) {
                        table.orders.insert(key(&pair), order);
                    }
                }
            }
        }

        debug!(clinched = table.len(), "computed clinched tiebreakers");
        table
    }

    fn check_pair(
        played: &[GameResult],
        remaining: &[RemainingGame],
        pair: &[&str; 2],
    ) -> Option<Vec<String>> {
        let h2h = h2h_standings(played, pair);
        let (leader, record) = h2h.iter().next()?;
        let margin = record.wins as i64 - record.losses as i64;
        let left = count_games_between(remaining, pair) as i64;
        if margin <= left {
            return None;
        }
        let trailer = pair.iter().find(|&&t| t != leader)?;
        Some(vec![leader.to_string(), trailer.to_string()])
    }

    /// Read known tiebreak orders from a file, one order per line with team
    /// codes separated by commas, best first. Blank lines and lines starting
    /// with `#` are skipped.
    pub fn read_known_from_file(&mut self, filepath: impl AsRef<Path>) -> Result<()> {
        let file = File::open(filepath.as_ref())?;
        let reader = BufReader::new(file);

        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let order: Vec<&str> = line.split(',').map(str::trim).collect();
            if order.len() < 2 || order.iter().any(|t| t.is_empty()) {
                return Err(SimError::InvalidConfig(format!(
                    "invalid tiebreak order: {}",
                    line
                )));
            }
            self.add_known(&order);
        }

        Ok(())
    }

    /// Add or replace the order for a team set, best first.
    pub fn add_known<S: AsRef<str>>(&mut self, order: &[S]) {
        let order: Vec<String> = order.iter().map(|t| t.as_ref().to_string()).collect();
        self.orders.insert(key(&order), order);
    }

    /// Merge known orders, replacing computed ones for the same team set.
    pub fn with_known<S: AsRef<str>>(mut self, known: &[Vec<S>]) -> Self {
        for order in known {
            self.add_known(order);
        }
        self
    }

    /// The decided order for exactly this team set, if there is one.
    pub fn get<S: AsRef<str>>(&self, teams: &[S]) -> Option<&[String]> {
        self.orders.get(&key(teams)).map(Vec::as_slice)
    }

    pub fn contains<S: AsRef<str>>(&self, teams: &[S]) -> bool {
        self.orders.contains_key(&key(teams))
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}
