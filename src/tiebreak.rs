//! Resolution of ties in win percentage into a strict finishing order.
//!
//! The cascade mirrors league rules: a decided (clinched) order wins
//! outright, three-way ties first try the pairwise head-to-head shortcut,
//! and everything else walks head-to-head, intradivisional and
//! interdivisional records, re-splitting the group after each criterion.
//! Ties that no criterion separates fall back to a random order.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

use crate::clinched::ClinchedTiebreakers;
use crate::error::{Result, SimError};
use crate::game::{GameLog, GameResult};
use crate::standings::{by_win_pct_desc, Record};
use crate::team::LeagueStructure;

/// Record-based tiebreak criterion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Criterion {
    /// Record in games among the tied teams only
    HeadToHead,
    /// Record in games against division rivals
    Intradivisional,
    /// Record in same-league games outside the division
    Interdivisional,
}

impl Criterion {
    /// Criteria in the order they are applied
    pub const CASCADE: [Criterion; 3] = [
        Criterion::HeadToHead,
        Criterion::Intradivisional,
        Criterion::Interdivisional,
    ];
}

/// What decided a tie.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    /// Only one team; nothing to break
    Single,
    /// Order taken from the clinched table
    Clinched,
    /// Three-way tie decided by the pairwise results
    ThreeWay,
    /// First criterion that separated the group
    Criterion(Criterion),
    /// No criterion separated the group; order is random
    Random,
}

/// Strict order of a tied group, best first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TieBreak {
    pub order: Vec<String>,
    pub resolution: Resolution,
}

/// Result of applying one criterion to a group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CriterionOutcome {
    /// Every team has a distinct value; best first
    Separated(Vec<String>),
    /// Sub-groups by descending value; at least one still tied
    PartiallySeparated(Vec<Vec<String>>),
    /// All teams equal, or the criterion does not apply to every team
    Unseparated,
}

/// Result of the pairwise shortcut for a three-way tie.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ThreeWayOutcome {
    Resolved(Vec<String>),
    /// Each team won exactly one of its pairwise tiebreakers
    Cyclic,
    /// A pairwise tiebreaker was itself only settled at random
    Undetermined,
}

/// Tie resolution for one trial.
///
/// Holds only shared references: the league structure, the clinched table
/// and the trial's game log. Calls share no state, so one instance can
/// resolve any number of ties in its trial.
#[derive(Clone, Copy, Debug)]
pub struct TieBreaker<'a> {
    structure: &'a LeagueStructure,
    clinched: &'a ClinchedTiebreakers,
    games: GameLog<'a>,
}

impl<'a> TieBreaker<'a> {
    pub fn new(
        structure: &'a LeagueStructure,
        clinched: &'a ClinchedTiebreakers,
        games: GameLog<'a>,
    ) -> Self {
        TieBreaker {
            structure,
            clinched,
            games,
        }
    }

    /// Order a group of teams tied on win percentage, best first.
    ///
    /// The returned order is always a permutation of `teams`.
    ///
    /// # Errors
    /// `SimError::UnknownTeam` when a team is not in the league structure and
    /// `SimError::TeamMissingFromGames` when a team has no game in the log.
    pub fn break_tie<R: Rng>(&self, teams: &[String], rng: &mut R) -> Result<TieBreak> {
        if teams.len() <= 1 {
            return Ok(TieBreak {
                order: teams.to_vec(),
                resolution: Resolution::Single,
            });
        }
        self.validate(teams)?;
        self.resolve(teams, rng)
    }

    fn validate(&self, teams: &[String]) -> Result<()> {
        for team in teams {
            self.structure.team(team)?;
            if !self.games.iter().any(|g| g.involves(team)) {
                return Err(SimError::TeamMissingFromGames { team: team.clone() });
            }
        }
        Ok(())
    }

    fn resolve<R: Rng>(&self, teams: &[String], rng: &mut R) -> Result<TieBreak> {
        if teams.len() <= 1 {
            return Ok(TieBreak {
                order: teams.to_vec(),
                resolution: Resolution::Single,
            });
        }

        if let Some(order) = self.clinched.get(teams) {
            return Ok(audit(teams, order.to_vec(), Resolution::Clinched));
        }

        if teams.len() == 3 {
            if let ThreeWayOutcome::Resolved(order) = self.three_way_shortcut(teams, rng)? {
                return Ok(audit(teams, order, Resolution::ThreeWay));
            }
        }

        self.resolve_by_criteria(teams, rng)
    }

    /// Walk the criteria cascade, skipping the clinched table and the
    /// three-way shortcut for this group. Sub-groups left tied by a partial
    /// split go back through the full resolution.
    pub fn resolve_by_criteria<R: Rng>(&self, teams: &[String], rng: &mut R) -> Result<TieBreak> {
        for criterion in Criterion::CASCADE {
            match self.apply_criterion(criterion, teams)? {
                CriterionOutcome::Separated(order) => {
                    return Ok(audit(teams, order, Resolution::Criterion(criterion)));
                }
                CriterionOutcome::PartiallySeparated(groups) => {
                    let mut order = Vec::with_capacity(teams.len());
                    for group in groups {
                        if group.len() == 1 {
                            order.extend(group);
                        } else {
                            order.extend(self.resolve(&group, rng)?.order);
                        }
                    }
                    return Ok(audit(teams, order, Resolution::Criterion(criterion)));
                }
                CriterionOutcome::Unseparated => {}
            }
        }

        let mut order = teams.to_vec();
        order.shuffle(rng);
        warn!(teams = ?teams, order = ?order, "unbroken tie, using random order");
        Ok(TieBreak {
            order,
            resolution: Resolution::Random,
        })
    }

    /// Pairwise shortcut for a three-way tie.
    ///
    /// A team that wins both of its pairwise tiebreakers goes first and the
    /// other two follow in their own pairwise order; failing that, a team
    /// that loses both goes last.
    pub fn three_way_shortcut<R: Rng>(
        &self,
        teams: &[String],
        rng: &mut R,
    ) -> Result<ThreeWayOutcome> {
        let trio = match teams {
            [a, b, c] => [a, b, c],
            _ => return Ok(ThreeWayOutcome::Undetermined),
        };

        let mut pairwise: Vec<(String, String)> = Vec::with_capacity(3);
        for (i, j) in [(0, 1), (0, 2), (1, 2)] {
            let pair = [trio[i].clone(), trio[j].clone()];
            let tb = self.resolve(&pair, rng)?;
            if tb.resolution == Resolution::Random {
                return Ok(ThreeWayOutcome::Undetermined);
            }
            pairwise.push((tb.order[0].clone(), tb.order[1].clone()));
        }

        let others_in_order = |excluded: &String| -> Vec<String> {
            pairwise
                .iter()
                .find(|(w, l)| w != excluded && l != excluded)
                .map(|(w, l)| vec![w.clone(), l.clone()])
                .unwrap_or_default()
        };

        for team in trio {
            if pairwise.iter().filter(|(w, _)| w == team).count() == 2 {
                let mut order = vec![team.clone()];
                order.extend(others_in_order(team));
                return Ok(ThreeWayOutcome::Resolved(order));
            }
        }
        for team in trio {
            if pairwise.iter().filter(|(_, l)| l == team).count() == 2 {
                let mut order = others_in_order(team);
                order.push(team.clone());
                return Ok(ThreeWayOutcome::Resolved(order));
            }
        }

        Ok(ThreeWayOutcome::Cyclic)
    }

    /// Apply a single criterion to the group and split it by the result.
    pub fn apply_criterion(&self, criterion: Criterion, teams: &[String]) -> Result<CriterionOutcome> {
        let mut ranked = self.criterion_records(criterion, teams)?;
        if ranked.iter().any(|(_, r)| r.games() == 0) {
            return Ok(CriterionOutcome::Unseparated);
        }
        ranked.sort_by(|a, b| by_win_pct_desc((a.0.as_str(), &a.1), (b.0.as_str(), &b.1)));

        let mut groups: Vec<Vec<String>> = Vec::new();
        let mut last_pct: Option<f64> = None;
        for (team, record) in ranked {
            let pct = record.win_pct();
            if last_pct != Some(pct) {
                groups.push(Vec::new());
                last_pct = Some(pct);
            }
            if let Some(group) = groups.last_mut() {
                group.push(team);
            }
        }

        Ok(match groups.len() {
            1 => CriterionOutcome::Unseparated,
            n if n == teams.len() => {
                CriterionOutcome::Separated(groups.into_iter().flatten().collect())
            }
            _ => CriterionOutcome::PartiallySeparated(groups),
        })
    }

    /// Each team's record in the games a criterion counts.
    pub fn criterion_records(
        &self,
        criterion: Criterion,
        teams: &[String],
    ) -> Result<Vec<(String, Record)>> {
        let mut records: HashMap<&str, Record> =
            teams.iter().map(|t| (t.as_str(), Record::default())).collect();

        for game in self.games.iter() {
            let winner_tied = records.contains_key(game.winner.as_str());
            let loser_tied = records.contains_key(game.loser.as_str());
            if !(winner_tied || loser_tied) || !self.counts(criterion, game, teams)? {
                continue;
            }
            if let Some(r) = records.get_mut(game.winner.as_str()) {
                r.wins += 1;
            }
            if let Some(r) = records.get_mut(game.loser.as_str()) {
                r.losses += 1;
            }
        }

        Ok(teams
            .iter()
            .map(|t| (t.clone(), records[t.as_str()]))
            .collect())
    }

    fn counts(&self, criterion: Criterion, game: &GameResult, teams: &[String]) -> Result<bool> {
        Ok(match criterion {
            Criterion::HeadToHead => game.is_between(teams),
            Criterion::Intradivisional => {
                let winner = self.structure.team(&game.winner)?;
                let loser = self.structure.team(&game.loser)?;
                winner.division == loser.division
            }
            Criterion::Interdivisional => {
                let winner = self.structure.team(&game.winner)?;
                let loser = self.structure.team(&game.loser)?;
                winner.league == loser.league && winner.division != loser.division
            }
        })
    }
}

fn audit(teams: &[String], order: Vec<String>, resolution: Resolution) -> TieBreak {
    info!(teams = ?teams, order = ?order, resolution = ?resolution, "broke tie");
    TieBreak { order, resolution }
}
