use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::{Result, SimError};

/// Team with its place in the league and a strength rating.
///
/// Ratings are on an ELO-like scale centred near 1500.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub code: String,

    pub division: String,

    pub league: String,

    /// Strength rating (ELO scale)
    pub rating: f64,
}

impl Team {
    pub fn new(
        code: impl Into<String>,
        division: impl Into<String>,
        league: impl Into<String>,
        rating: f64,
    ) -> Self {
        Team {
            code: code.into(),
            division: division.into(),
            league: league.into(),
            rating,
        }
    }

    /// Create a team with its rating shifted by `rating_delta`
    pub fn with_adjustment(&self, rating_delta: f64) -> Self {
        Team {
            rating: self.rating + rating_delta,
            ..self.clone()
        }
    }
}

/// Indexed team → division/league/rating mapping.
///
/// Built once per batch and shared by reference with every component that
/// needs to join team metadata onto games or standings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LeagueStructure {
    teams: BTreeMap<String, Team>,
}

impl LeagueStructure {
    pub fn new(teams: impl IntoIterator<Item = Team>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for team in teams {
            if map.contains_key(&team.code) {
                return Err(SimError::DuplicateTeam { team: team.code });
            }
            map.insert(team.code.clone(), team);
        }
        Ok(LeagueStructure { teams: map })
    }

    /// Join (team, division, league) assignments with a ratings table.
    pub fn from_assignments<I, S>(assignments: I, ratings: &HashMap<String, f64>) -> Result<Self>
    where
        I: IntoIterator<Item = (S, S, S)>,
        S: Into<String>,
    {
        let mut teams = Vec::new();
        for (code, division, league) in assignments {
            let code = code.into();
            let rating = *ratings
                .get(&code)
                .ok_or_else(|| SimError::MissingRating { team: code.clone() })?;
            teams.push(Team::new(code, division, league, rating));
        }
        Self::new(teams)
    }

    /// Parse the compact division listing, one division per line:
    ///
    /// ```text
    /// NLW: AZ COL LAD SD SF
    /// ALE: TB TOR BAL NYY BOS
    /// ```
    ///
    /// The league is the first character of the division name.
    pub fn from_division_text(text: &str, ratings: &HashMap<String, f64>) -> Result<Self> {
        let mut assignments = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (division, codes) = line.split_once(':').ok_or_else(|| {
                SimError::InvalidConfig(format!("division line without ':': {}", line))
            })?;
            let division = division.trim();
            let league = division
                .chars()
                .next()
                .map(String::from)
                .ok_or_else(|| SimError::InvalidConfig(format!("empty division name: {}", line)))?;
            for code in codes.split_whitespace() {
                assignments.push((code.to_string(), division.to_string(), league.clone()));
            }
        }
        Self::from_assignments(assignments, ratings)
    }

    pub fn get(&self, code: &str) -> Option<&Team> {
        self.teams.get(code)
    }

    pub fn team(&self, code: &str) -> Result<&Team> {
        self.teams.get(code).ok_or_else(|| SimError::UnknownTeam {
            team: code.to_string(),
        })
    }

    pub fn contains(&self, code: &str) -> bool {
        self.teams.contains_key(code)
    }

    pub fn division_of(&self, code: &str) -> Result<&str> {
        self.team(code).map(|t| t.division.as_str())
    }

    pub fn league_of(&self, code: &str) -> Result<&str> {
        self.team(code).map(|t| t.league.as_str())
    }

    /// Teams in code order
    pub fn teams(&self) -> impl Iterator<Item = &Team> {
        self.teams.values()
    }

    pub fn codes(&self) -> impl Iterator<Item = &String> {
        self.teams.keys()
    }

    pub fn leagues(&self) -> Vec<String> {
        let leagues: BTreeSet<&String> = self.teams.values().map(|t| &t.league).collect();
        leagues.into_iter().cloned().collect()
    }

    pub fn divisions(&self) -> Vec<String> {
        let divisions: BTreeSet<&String> = self.teams.values().map(|t| &t.division).collect();
        divisions.into_iter().cloned().collect()
    }

    pub fn teams_in_league<'a>(&'a self, league: &'a str) -> impl Iterator<Item = &'a Team> + 'a {
        self.teams.values().filter(move |t| t.league == league)
    }

    pub fn teams_in_division<'a>(&'a self, division: &'a str) -> impl Iterator<Item = &'a Team> + 'a {
        self.teams.values().filter(move |t| t.division == division)
    }

    pub fn ratings(&self) -> HashMap<String, f64> {
        self.teams
            .iter()
            .map(|(code, team)| (code.clone(), team.rating))
            .collect()
    }

    /// Create a copy with one team's rating adjusted
    pub fn with_team_adjustment(&self, code: &str, rating_delta: f64) -> Result<Self> {
        let mut adjusted = self.clone();
        let team = adjusted
            .teams
            .get_mut(code)
            .ok_or_else(|| SimError::UnknownTeam { team: code.to_string() })?;
        *team = team.with_adjustment(rating_delta);
        Ok(adjusted)
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }
}
